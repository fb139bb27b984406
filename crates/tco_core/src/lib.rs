//! Pure-Rust validator and transformer for tail-call trampolining of
//! Python functions. No PyO3 dependency here — this crate is AST/string in,
//! AST/string out, and is unit-testable on its own; `tco_pyo3` is the only
//! crate in this workspace that talks to a live Python interpreter.

pub mod ast_build;
pub mod collect;
pub mod config;
pub mod decorator;
pub mod error;
pub mod eval;
pub mod guard;
pub mod hoist;
pub mod locator;
pub mod names;
pub mod params;
pub mod printer;
pub mod substitute;
pub mod tailcall;
pub mod transform;
pub mod validator;

use rustpython_ast::{Stmt, StmtFunctionDef};
use rustpython_parser::{parse, Mode};

pub use config::Config;
pub use error::{Result, TcoError, Violation};

use locator::LineIndex;

/// The rewritten function definition the host's re-materializer compiles
/// and binds. Carried as an AST node rather than text so a PyO3-style
/// bridge can convert it directly into live interpreter objects without a
/// text round trip; `pretty_print` exists purely for debugging and tests.
pub struct Decorated {
    pub function: StmtFunctionDef,
}

impl Decorated {
    pub fn pretty_print(&self) -> String {
        printer::pretty_print_function(&self.function)
    }
}

/// Runs the full pipeline (guard → parse → validate → transform) over a
/// single function's source text.
///
/// `qualname` is the host's qualified name for the function (used to detect
/// definition inside another function); `own_decorator_name` is the simple
/// or dotted name the decorator is bound under in the user's module, used
/// by Pass A to recognize and strip it.
#[tracing::instrument(skip(source, config), fields(qualname = %qualname))]
pub fn decorate(
    source: &str,
    qualname: &str,
    own_decorator_name: &str,
    config: &Config,
) -> Result<Decorated> {
    guard::check_not_nested(qualname)?;

    let module = parse(source, Mode::Module, "<tco>").map_err(|e| TcoError::SourceUnavailable {
        reason: e.to_string(),
    })?;
    let body = module
        .module()
        .ok_or_else(|| TcoError::SourceUnavailable {
            reason: "parsed source did not contain a module body".into(),
        })?
        .body;

    let mut stmts = body.into_iter();
    let func = match stmts.next() {
        Some(Stmt::FunctionDef(func)) => func,
        Some(Stmt::AsyncFunctionDef(_)) => return Err(TcoError::AsyncRejected),
        _ => {
            return Err(TcoError::SourceUnavailable {
                reason: "decorated source did not parse to a single function definition".into(),
            })
        }
    };

    guard::check_not_generator(&func.body)?;

    let lines = LineIndex::new(source);
    validator::validate_tail_positions(&func.body, func.name.as_str(), &lines, config.verbose_errors)?;

    let rewritten = transform::transform_function(func, own_decorator_name)?;

    tracing::debug!(function = rewritten.name.as_str(), verbose_errors = config.verbose_errors, "decoration complete");

    Ok(Decorated { function: rewritten })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_async_function() {
        let err = decorate(
            "async def f(n):\n    return 0\n",
            "f",
            "optimize",
            &Config::default(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), "ASYNC_REJECTED");
    }

    #[test]
    fn rejects_nested_qualname() {
        let err = decorate(
            "def inner(n):\n    return 0\n",
            "outer.<locals>.inner",
            "optimize",
            &Config::default(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), "NESTED_REJECTED");
    }

    #[test]
    fn rejects_non_tail_self_call() {
        let err = decorate(
            "def bad(n):\n    if n == 0:\n        return 1\n    else:\n        return n * bad(n - 1)\n",
            "bad",
            "optimize",
            &Config::default(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), "NOT_TAIL_RECURSIVE");
    }

    #[test]
    fn accepts_and_rewrites_sum_to_n() {
        let out = decorate(
            "@tco.optimize\ndef sum_to_n(n, acc=0):\n    if n == 0:\n        return acc\n    return sum_to_n(n - 1, acc + n)\n",
            "sum_to_n",
            "tco.optimize",
            &Config::default(),
        )
        .expect("properly tail-recursive function should be accepted");
        assert!(out.function.decorator_list.is_empty());
        let printed = out.pretty_print();
        assert!(printed.contains("while True:"));
    }

    #[test]
    fn accepts_loop_tail_scenario() {
        let out = decorate(
            "def loop_tail(n):\n    if n <= 0:\n        return 0\n    for i in range(3):\n        return loop_tail(n - 1)\n    return 0\n",
            "loop_tail",
            "optimize",
            &Config::default(),
        )
        .expect("loop-nested tail call should be accepted");
        let printed = out.pretty_print();
        assert!(printed.contains("for i in range(3):"));
        assert!(printed.contains("break"));
    }
}
