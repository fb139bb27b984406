//! Snapshot tests for the pretty-printer, with the per-decoration random
//! fresh-name prefix normalized to a stable placeholder first — otherwise
//! every run would produce a spurious snapshot diff.

use tco_core::{decorate, Config};

/// Replaces every `_tco_<tag>_<16 hex digits>` run with
/// `_tco_<tag>_PREFIX` so the snapshot is stable across runs.
fn normalize_prefixes(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;
    loop {
        let next = rest
            .find("_tco_p_")
            .map(|i| (i, "_tco_p_", "p"))
            .into_iter()
            .chain(rest.find("_tco_loop_").map(|i| (i, "_tco_loop_", "loop")))
            .min_by_key(|(i, ..)| *i);
        let Some((idx, marker, tag)) = next else {
            out.push_str(rest);
            break;
        };
        out.push_str(&rest[..idx]);
        let after_marker = &rest[idx + marker.len()..];
        let hex_len = after_marker.bytes().take_while(|b| b.is_ascii_hexdigit()).count();
        if hex_len == 16 {
            out.push_str("_tco_");
            out.push_str(tag);
            out.push_str("_PREFIX");
            rest = &after_marker[hex_len..];
        } else {
            out.push_str(marker);
            rest = after_marker;
        }
    }
    out
}

#[test]
fn sum_to_n_snapshot() {
    let decorated = decorate(
        "@tco.optimize\ndef sum_to_n(n, acc=0):\n    if n == 0:\n        return acc\n    return sum_to_n(n - 1, acc + n)\n",
        "sum_to_n",
        "tco.optimize",
        &Config::default(),
    )
    .expect("properly tail-recursive function should be accepted");
    let printed = normalize_prefixes(&decorated.pretty_print());
    insta::assert_snapshot!(printed, @r###"
    def sum_to_n(n, acc=0):
        _tco_p_PREFIX_n = n
        _tco_p_PREFIX_acc = acc
        while True:
            if (_tco_p_PREFIX_n == 0):
                return _tco_p_PREFIX_acc
            (_tco_p_PREFIX_n, _tco_p_PREFIX_acc) = ((_tco_p_PREFIX_n - 1), (_tco_p_PREFIX_acc + _tco_p_PREFIX_n))
            continue
    "###);
}

#[test]
fn loop_tail_snapshot() {
    let decorated = decorate(
        "def loop_tail(n):\n    if n <= 0:\n        return 0\n    for i in range(3):\n        return loop_tail(n - 1)\n    return 0\n",
        "loop_tail",
        "optimize",
        &Config::default(),
    )
    .expect("loop-nested tail call should be accepted");
    let printed = normalize_prefixes(&decorated.pretty_print());
    insta::assert_snapshot!(printed, @r###"
    def loop_tail(n):
        _tco_p_PREFIX_n = n
        while True:
            if (_tco_p_PREFIX_n <= 0):
                return 0
            _tco_loop_PREFIX_0 = False
            for i in range(3):
                _tco_p_PREFIX_n = (_tco_p_PREFIX_n - 1)
                _tco_loop_PREFIX_0 = True
                break
            if _tco_loop_PREFIX_0:
                continue
            return 0
    "###);
}

#[test]
fn gcd_snapshot() {
    let decorated = decorate(
        "def gcd(a, b):\n    if b == 0:\n        return a\n    return gcd(b, a % b)\n",
        "gcd",
        "optimize",
        &Config::default(),
    )
    .expect("properly tail-recursive function should be accepted");
    let printed = normalize_prefixes(&decorated.pretty_print());
    insta::assert_snapshot!(printed, @r###"
    def gcd(a, b):
        _tco_p_PREFIX_a = a
        _tco_p_PREFIX_b = b
        while True:
            if (_tco_p_PREFIX_b == 0):
                return _tco_p_PREFIX_a
            (_tco_p_PREFIX_a, _tco_p_PREFIX_b) = (_tco_p_PREFIX_b, (_tco_p_PREFIX_a % _tco_p_PREFIX_b))
            continue
    "###);
}
