//! Table-driven acceptance/rejection cases for the validator's tail-position
//! rules, covering each composition form that turns an otherwise-recursive
//! call into a non-tail one, plus the shapes that are deliberately accepted
//! despite looking superficially similar.

use tco_core::{decorate, Config};
use test_case::test_case;

fn accepts(source: &str, name: &str) -> bool {
    decorate(source, name, "optimize", &Config::default()).is_ok()
}

#[test_case("def f(n):\n    if n == 0:\n        return 0\n    return f(n - 1)\n", "f", true; "plain tail call")]
#[test_case("def f(n):\n    return 1 + f(n - 1)\n", "f", false; "arithmetic composition")]
#[test_case("def f(n):\n    return n and f(n - 1)\n", "f", false; "boolop composition")]
#[test_case("def f(n):\n    return f(n - 1) or 0\n", "f", false; "boolop composition reversed")]
#[test_case("def f(n):\n    return [f(n - 1)][0]\n", "f", false; "subscript composition")]
#[test_case("def f(n):\n    return g(f(n - 1))\n", "f", false; "call argument composition")]
#[test_case("def f(n):\n    return f.__wrapped__(n - 1)\n", "f", false; "accessor style self call")]
#[test_case("def f(n):\n    g = f\n    return 0\n", "f", true; "bare alias is not a call")]
#[test_case("def f(n, acc):\n    return acc if n == 0 else f(n - 1, acc)\n", "f", true; "conditional expression tail call")]
#[test_case("def f(n):\n    return (f(n - 1),)[0]\n", "f", false; "tuple then subscript composition")]
#[test_case("def f(n):\n    if n == 0:\n        return 0\n    return f(n=n - 1)\n", "f", true; "keyword argument tail call")]
fn tie_break_table(source: &str, name: &str, expect_accepted: bool) {
    assert_eq!(accepts(source, name), expect_accepted, "source: {source}");
}
