//! Stage 1 of the pipeline: reject inputs that the transformer can never
//! safely handle, before any parsing of the function's *body* is attempted
//! for tail-position analysis.
//!
//! Three checks run here: `async def`, a qualified name carrying a
//! `<locals>` marker (F was itself defined inside another function), and the
//! presence of `yield`/`yield from` anywhere in F's own body (a generator
//! function). A fourth structural rejection — nested function definitions
//! inside F's body that reference F's own name — is conservative enough
//! that it shares the validator's accumulating-violations machinery instead
//! of a hard fail here; see `validator::check_nested_aliasing`.

use rustpython_ast::{Expr, Stmt};

use crate::error::{Result, TcoError};

pub const LOCALS_MARKER: &str = "<locals>";

pub fn check_not_nested(qualname: &str) -> Result<()> {
    if qualname.contains(LOCALS_MARKER) {
        return Err(TcoError::NestedRejected {
            qualname: qualname.to_string(),
        });
    }
    Ok(())
}

/// Scans `body` for `yield`/`yield from`, stopping descent at any nested
/// `def`/`lambda` boundary — a `yield` inside a nested function makes *that*
/// function a generator, not the outer one.
pub fn check_not_generator(body: &[Stmt]) -> Result<()> {
    if body.iter().any(stmt_contains_yield) {
        return Err(TcoError::GeneratorRejected);
    }
    Ok(())
}

fn stmt_contains_yield(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::FunctionDef(_) | Stmt::AsyncFunctionDef(_) | Stmt::ClassDef(_) => false,
        Stmt::Return(s) => s.value.as_deref().is_some_and(expr_contains_yield),
        Stmt::Assign(s) => expr_contains_yield(&s.value),
        Stmt::AugAssign(s) => expr_contains_yield(&s.value),
        Stmt::AnnAssign(s) => s.value.as_deref().is_some_and(expr_contains_yield),
        Stmt::Expr(s) => expr_contains_yield(&s.value),
        Stmt::If(s) => {
            expr_contains_yield(&s.test)
                || s.body.iter().any(stmt_contains_yield)
                || s.orelse.iter().any(stmt_contains_yield)
        }
        Stmt::For(s) => {
            expr_contains_yield(&s.iter)
                || s.body.iter().any(stmt_contains_yield)
                || s.orelse.iter().any(stmt_contains_yield)
        }
        Stmt::While(s) => {
            expr_contains_yield(&s.test)
                || s.body.iter().any(stmt_contains_yield)
                || s.orelse.iter().any(stmt_contains_yield)
        }
        Stmt::With(s) => s.body.iter().any(stmt_contains_yield),
        Stmt::Try(s) => {
            s.body.iter().any(stmt_contains_yield)
                || s.orelse.iter().any(stmt_contains_yield)
                || s.finalbody.iter().any(stmt_contains_yield)
                || s.handlers.iter().any(|h| h.body.iter().any(stmt_contains_yield))
        }
        Stmt::Raise(s) => s.exc.as_deref().is_some_and(expr_contains_yield),
        Stmt::Assert(s) => expr_contains_yield(&s.test),
        _ => false,
    }
}

fn expr_contains_yield(expr: &Expr) -> bool {
    match expr {
        Expr::Yield(_) | Expr::YieldFrom(_) => true,
        Expr::Lambda(_) => false,
        Expr::BoolOp(e) => e.values.iter().any(expr_contains_yield),
        Expr::BinOp(e) => expr_contains_yield(&e.left) || expr_contains_yield(&e.right),
        Expr::UnaryOp(e) => expr_contains_yield(&e.operand),
        Expr::IfExp(e) => {
            expr_contains_yield(&e.test)
                || expr_contains_yield(&e.body)
                || expr_contains_yield(&e.orelse)
        }
        Expr::Compare(e) => {
            expr_contains_yield(&e.left) || e.comparators.iter().any(expr_contains_yield)
        }
        Expr::Call(e) => {
            expr_contains_yield(&e.func) || e.args.iter().any(expr_contains_yield)
        }
        Expr::Tuple(e) => e.elts.iter().any(expr_contains_yield),
        Expr::List(e) => e.elts.iter().any(expr_contains_yield),
        Expr::Attribute(e) => expr_contains_yield(&e.value),
        Expr::Subscript(e) => expr_contains_yield(&e.value) || expr_contains_yield(&e.slice),
        Expr::Starred(e) => expr_contains_yield(&e.value),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_locals_qualname() {
        let err = check_not_nested("outer.<locals>.inner").unwrap_err();
        assert_eq!(err.kind(), "NESTED_REJECTED");
    }

    #[test]
    fn accepts_module_level_qualname() {
        assert!(check_not_nested("my_module.my_function").is_ok());
    }
}
