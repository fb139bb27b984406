//! Stage 3 of the pipeline: proves that every self-call in F's body occurs
//! in tail position, or accumulates every violation it finds and rejects.
//!
//! The traversal carries one context bit down through expressions: whether
//! the position currently being visited is one whose value is, without
//! further computation, the function's return value. Only `return <expr>`
//! and the
//! surviving branch of a conditional expression that is itself in tail
//! position ever set that bit; everything else — arithmetic, attribute
//! access, indexing, boolean/comparison operators, collection literals,
//! formatted strings, and call arguments — clears it for its children, by
//! construction, by simply never forwarding `tail` into recursion there.

use rustpython_ast::{Expr, Stmt};

use crate::error::{Result, TcoError};
use crate::locator::LineIndex;
use crate::printer::write_expr_source;

/// Bundles the traversal's read-only context: the function's own name (for
/// recognizing self-calls), the line index (for diagnostic positions), and
/// whether violation messages should carry the offending sub-expression's
/// reconstructed source (`Config::verbose_errors`) alongside the bare
/// category label.
struct Ctx<'a> {
    self_name: &'a str,
    lines: &'a LineIndex,
    verbose: bool,
}

pub fn validate_tail_positions(
    body: &[Stmt],
    self_name: &str,
    lines: &LineIndex,
    verbose: bool,
) -> Result<()> {
    let cx = Ctx {
        self_name,
        lines,
        verbose,
    };
    let mut violations = Vec::new();
    for stmt in body {
        check_stmt(stmt, &cx, &mut violations);
    }
    if violations.is_empty() {
        Ok(())
    } else {
        Err(TcoError::NotTailRecursive { violations })
    }
}

fn check_stmt(stmt: &Stmt, cx: &Ctx, violations: &mut Vec<crate::error::Violation>) {
    match stmt {
        Stmt::Return(s) => {
            if let Some(value) = &s.value {
                check_expr(value, true, cx, violations);
            }
            // A bare `return` has no value and therefore contains no
            // self-call; nothing to check.
        }
        Stmt::If(s) => {
            check_expr(&s.test, false, cx, violations);
            for inner in &s.body {
                check_stmt(inner, cx, violations);
            }
            for inner in &s.orelse {
                check_stmt(inner, cx, violations);
            }
        }
        Stmt::For(s) => {
            check_expr(&s.iter, false, cx, violations);
            for inner in s.body.iter().chain(s.orelse.iter()) {
                check_stmt(inner, cx, violations);
            }
        }
        Stmt::While(s) => {
            check_expr(&s.test, false, cx, violations);
            for inner in s.body.iter().chain(s.orelse.iter()) {
                check_stmt(inner, cx, violations);
            }
        }
        Stmt::With(s) => {
            for item in &s.items {
                check_expr(&item.context_expr, false, cx, violations);
            }
            for inner in &s.body {
                check_stmt(inner, cx, violations);
            }
        }
        Stmt::Try(s) => {
            for inner in s
                .body
                .iter()
                .chain(s.orelse.iter())
                .chain(s.finalbody.iter())
            {
                check_stmt(inner, cx, violations);
            }
            for handler in &s.handlers {
                for inner in &handler.body {
                    check_stmt(inner, cx, violations);
                }
            }
        }
        Stmt::Assign(s) => check_expr(&s.value, false, cx, violations),
        Stmt::AugAssign(s) => check_expr(&s.value, false, cx, violations),
        Stmt::AnnAssign(s) => {
            if let Some(value) = &s.value {
                check_expr(value, false, cx, violations);
            }
        }
        Stmt::Expr(s) => check_expr(&s.value, false, cx, violations),
        Stmt::Assert(s) => check_expr(&s.test, false, cx, violations),
        Stmt::Raise(s) => {
            if let Some(exc) = &s.exc {
                check_expr(exc, false, cx, violations);
            }
        }
        Stmt::FunctionDef(inner) => {
            check_nested_aliasing(&inner.body, cx, violations, &inner.name);
        }
        Stmt::Pass(_) | Stmt::Break(_) | Stmt::Continue(_) => {}
        _ => {}
    }
}

/// A nested function definition inside F's body is conservatively rejected
/// if it references F's own name anywhere in its body: the host's
/// source-text lookup for decorating
/// *that* inner function would return F's own source, making it impossible
/// to reliably re-extract and reason about aliasing. This is folded into
/// the same accumulating-violations list rather than a separate hard error,
/// since it is, like the accessor-style self-call case, a conservative
/// "cannot prove this is safe" rejection rather than a structural guard.
fn check_nested_aliasing(
    nested_body: &[Stmt],
    cx: &Ctx,
    violations: &mut Vec<crate::error::Violation>,
    nested_name: &str,
) {
    if nested_body.iter().any(|s| stmt_references_name(s, cx.self_name)) {
        violations.push(crate::error::Violation::new(
            1,
            format!(
                "nested function `{nested_name}` references `{}`; aliasing hazard, hoist it to module scope",
                cx.self_name
            ),
        ));
    }
}

fn stmt_references_name(stmt: &Stmt, name: &str) -> bool {
    match stmt {
        Stmt::Return(s) => s.value.as_deref().is_some_and(|e| expr_references_name(e, name)),
        Stmt::Assign(s) => expr_references_name(&s.value, name),
        Stmt::AugAssign(s) => expr_references_name(&s.value, name),
        Stmt::AnnAssign(s) => s.value.as_deref().is_some_and(|e| expr_references_name(e, name)),
        Stmt::Expr(s) => expr_references_name(&s.value, name),
        Stmt::If(s) => {
            expr_references_name(&s.test, name)
                || s.body.iter().any(|x| stmt_references_name(x, name))
                || s.orelse.iter().any(|x| stmt_references_name(x, name))
        }
        Stmt::For(s) => {
            expr_references_name(&s.iter, name)
                || s.body.iter().any(|x| stmt_references_name(x, name))
        }
        Stmt::While(s) => {
            expr_references_name(&s.test, name)
                || s.body.iter().any(|x| stmt_references_name(x, name))
        }
        Stmt::FunctionDef(inner) => inner.body.iter().any(|x| stmt_references_name(x, name)),
        _ => false,
    }
}

fn expr_references_name(expr: &Expr, name: &str) -> bool {
    match expr {
        Expr::Name(e) => e.id.as_str() == name,
        Expr::Call(e) => {
            expr_references_name(&e.func, name)
                || e.args.iter().any(|a| expr_references_name(a, name))
                || e.keywords.iter().any(|k| expr_references_name(&k.value, name))
        }
        Expr::BoolOp(e) => e.values.iter().any(|v| expr_references_name(v, name)),
        Expr::BinOp(e) => expr_references_name(&e.left, name) || expr_references_name(&e.right, name),
        Expr::UnaryOp(e) => expr_references_name(&e.operand, name),
        Expr::IfExp(e) => {
            expr_references_name(&e.test, name)
                || expr_references_name(&e.body, name)
                || expr_references_name(&e.orelse, name)
        }
        Expr::Compare(e) => {
            expr_references_name(&e.left, name) || e.comparators.iter().any(|c| expr_references_name(c, name))
        }
        Expr::Attribute(e) => expr_references_name(&e.value, name),
        Expr::Subscript(e) => {
            expr_references_name(&e.value, name) || expr_references_name(&e.slice, name)
        }
        Expr::Tuple(e) => e.elts.iter().any(|v| expr_references_name(v, name)),
        Expr::List(e) => e.elts.iter().any(|v| expr_references_name(v, name)),
        Expr::Starred(e) => expr_references_name(&e.value, name),
        _ => false,
    }
}

/// Identifies whether `callee` is a direct reference to the function's own
/// name — the only shape the validator can *prove* tail-safe.
fn callee_is_direct_self(callee: &Expr, self_name: &str) -> bool {
    matches!(callee, Expr::Name(n) if n.id.as_str() == self_name)
}

/// Identifies `N.attr(...)` / `N[i](...)` call shapes: the callee is an
/// attribute or subscript expression whose base resolves to F's own name.
/// Conservatively recorded as a violation; accessor-style self-calls cannot
/// be proven safe at this level.
fn callee_is_self_accessor(callee: &Expr, self_name: &str) -> bool {
    match callee {
        Expr::Attribute(a) => matches!(&*a.value, Expr::Name(n) if n.id.as_str() == self_name),
        Expr::Subscript(s) => matches!(&*s.value, Expr::Name(n) if n.id.as_str() == self_name),
        _ => false,
    }
}

/// Appends the offending sub-expression's reconstructed source to `label`
/// when `cx.verbose` is set, so a `NotTailRecursive` payload can show the
/// user exactly what composed around their self-call rather than just a
/// category name.
fn diagnostic(cx: &Ctx, label: &str, offending: &Expr) -> String {
    if cx.verbose {
        format!("{label}: `{}`", write_expr_source(offending))
    } else {
        label.to_string()
    }
}

fn check_expr(expr: &Expr, tail: bool, cx: &Ctx, violations: &mut Vec<crate::error::Violation>) {
    match expr {
        Expr::Call(call) => {
            if callee_is_direct_self(&call.func, cx.self_name) {
                if !tail {
                    violations.push(crate::error::Violation::new(
                        cx.lines.line_number(call.range.start()),
                        diagnostic(cx, "self-call not in tail position", expr),
                    ));
                }
            } else if callee_is_self_accessor(&call.func, cx.self_name) {
                violations.push(crate::error::Violation::new(
                    cx.lines.line_number(call.range.start()),
                    diagnostic(cx, "accessor-style self-call cannot be proven safe", expr),
                ));
            } else {
                // An ordinary call: neither the callee expression nor the
                // arguments are ever in tail position, but either may still
                // contain a self-call nested inside them.
                check_expr(&call.func, false, cx, violations);
            }
            // Arguments are never in tail position, self-call or not.
            for arg in &call.args {
                check_expr(arg, false, cx, violations);
            }
            for kw in &call.keywords {
                check_expr(&kw.value, false, cx, violations);
            }
        }
        Expr::IfExp(e) => {
            // The condition is never tail; each branch inherits the
            // parent's tail-ness, since exactly one of them becomes the
            // conditional expression's value. `return <cond-expr>` where one
            // branch is a self-call later expands to a conditional statement
            // at the transformer stage, but for *validation* each branch is
            // simply treated as occupying the same position as the whole
            // expression.
            check_expr(&e.test, false, cx, violations);
            check_expr(&e.body, tail, cx, violations);
            check_expr(&e.orelse, tail, cx, violations);
        }
        Expr::BoolOp(e) => {
            // `a and f(...)` / `a or f(...)`: the logical operator composes
            // the result, so neither operand is tail even if this whole
            // expression is the return value.
            for v in &e.values {
                check_expr(v, false, cx, violations);
            }
        }
        Expr::Name(e) => {
            // A bare reference to the function's own name, not inside a
            // call: this is aliasing, not recursion, and is conservatively
            // ignored.
            let _ = e;
        }
        Expr::BinOp(e) => {
            check_expr(&e.left, false, cx, violations);
            check_expr(&e.right, false, cx, violations);
        }
        Expr::UnaryOp(e) => check_expr(&e.operand, false, cx, violations),
        Expr::Compare(e) => {
            check_expr(&e.left, false, cx, violations);
            for c in &e.comparators {
                check_expr(c, false, cx, violations);
            }
        }
        Expr::Attribute(e) => check_expr(&e.value, false, cx, violations),
        Expr::Subscript(e) => {
            check_expr(&e.value, false, cx, violations);
            check_expr(&e.slice, false, cx, violations);
        }
        Expr::Tuple(e) => {
            for v in &e.elts {
                check_expr(v, false, cx, violations);
            }
        }
        Expr::List(e) => {
            for v in &e.elts {
                check_expr(v, false, cx, violations);
            }
        }
        Expr::Dict(e) => {
            for v in e.keys.iter().flatten().chain(e.values.iter()) {
                check_expr(v, false, cx, violations);
            }
        }
        Expr::Set(e) => {
            for v in &e.elts {
                check_expr(v, false, cx, violations);
            }
        }
        Expr::Starred(e) => check_expr(&e.value, false, cx, violations),
        Expr::JoinedStr(e) => {
            for v in &e.values {
                check_expr(v, false, cx, violations);
            }
        }
        Expr::FormattedValue(e) => check_expr(&e.value, false, cx, violations),
        // Lambdas introduce a new scope; a self-call inside one is still
        // not tail with respect to *this* function (it cannot be the
        // direct value of a `return` in F), so it is scanned at `tail =
        // false` rather than skipped outright.
        Expr::Lambda(e) => check_expr(&e.body, false, cx, violations),
        Expr::Constant(_) => {}
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustpython_parser::{parse, Mode};

    fn validate_source(source: &str) -> Result<()> {
        validate_source_verbose(source, false)
    }

    fn validate_source_verbose(source: &str, verbose: bool) -> Result<()> {
        let module = parse(source, Mode::Module, "<test>").expect("valid python");
        let body = module.module().unwrap().body;
        let Stmt::FunctionDef(func) = &body[0] else {
            panic!("expected a function def");
        };
        let lines = LineIndex::new(source);
        validate_tail_positions(&func.body, func.name.as_str(), &lines, verbose)
    }

    #[test]
    fn accepts_simple_tail_call() {
        let src = "def f(n):\n    if n == 0:\n        return 0\n    return f(n - 1)\n";
        assert!(validate_source(src).is_ok());
    }

    #[test]
    fn rejects_arithmetic_composition() {
        let src = "def bad(n):\n    if n == 0:\n        return 1\n    else:\n        return n * bad(n - 1)\n";
        let err = validate_source(src).unwrap_err();
        assert_eq!(err.kind(), "NOT_TAIL_RECURSIVE");
    }

    #[test]
    fn rejects_boolop_composition() {
        let src = "def f(n):\n    return n == 0 and f(n - 1)\n";
        assert!(validate_source(src).is_err());
    }

    #[test]
    fn rejects_self_call_as_subscript() {
        let src = "def f(n):\n    return [f(n - 1)][0]\n";
        assert!(validate_source(src).is_err());
    }

    #[test]
    fn rejects_self_call_as_argument() {
        let src = "def f(n):\n    return g(f(n - 1))\n";
        assert!(validate_source(src).is_err());
    }

    #[test]
    fn accepts_conditional_expression_tail_call() {
        let src = "def f(n, acc):\n    return acc if n == 0 else f(n - 1, acc)\n";
        assert!(validate_source(src).is_ok());
    }

    #[test]
    fn ignores_bare_self_name_alias() {
        let src = "def f(n):\n    g = f\n    return 0\n";
        assert!(validate_source(src).is_ok());
    }

    #[test]
    fn rejects_accessor_style_self_call() {
        let src = "def f(n):\n    return f.__wrapped__(n - 1)\n";
        assert!(validate_source(src).is_err());
    }

    #[test]
    fn non_verbose_violation_omits_reconstructed_source() {
        let src = "def bad(n):\n    if n == 0:\n        return 1\n    else:\n        return n * bad(n - 1)\n";
        let err = validate_source_verbose(src, false).unwrap_err();
        let TcoError::NotTailRecursive { violations } = err else {
            panic!("expected NotTailRecursive");
        };
        assert_eq!(violations[0].message, "self-call not in tail position");
    }

    #[test]
    fn verbose_violation_includes_reconstructed_source() {
        let src = "def bad(n):\n    if n == 0:\n        return 1\n    else:\n        return n * bad(n - 1)\n";
        let err = validate_source_verbose(src, true).unwrap_err();
        let TcoError::NotTailRecursive { violations } = err else {
            panic!("expected NotTailRecursive");
        };
        assert!(violations[0].message.contains("bad(n - 1)") || violations[0].message.contains("bad"));
        assert!(violations[0].message.starts_with("self-call not in tail position: `"));
    }
}
