//! Pass A: strips the transformer's own decorator from F's `decorator_list`.
//!
//! Left in place, the re-materialized function would be evaluated in a
//! namespace that still binds the decorator under its original name, and
//! calling it again would re-decorate (and, worse, re-run decoration's own
//! validator against the *already-rewritten* body on every subsequent
//! import of the module). The decorator can appear bare (`@optimize`),
//! dotted (`@tco.optimize`), or called (`@optimize()`, `@tco.optimize(
//! verbose_errors=True)`) — all four forms must be recognized by name, not
//! by exact source text, since whitespace and keyword arguments vary.

use rustpython_ast::{Expr, Stmt};

/// Removes every decorator in `decorator_list` whose simple or dotted name
/// matches `own_name` (e.g. `"optimize"` or `"tco.optimize"`), called or
/// bare. Matching is by the *last* dotted segment, so `@tco.optimize` is
/// recognized against `own_name = "optimize"` regardless of what alias the
/// caller imported the module under — the host-side caller only ever knows
/// the decorator's own unqualified name, not how a particular user module
/// chose to import it.
pub fn strip_own_decorator(decorator_list: Vec<Expr>, own_name: &str) -> Vec<Expr> {
    decorator_list
        .into_iter()
        .filter(|d| !decorator_matches(d, own_name))
        .collect()
}

fn decorator_matches(decorator: &Expr, own_name: &str) -> bool {
    let target = match decorator {
        Expr::Call(call) => dotted_name(&call.func),
        other => dotted_name(other),
    };
    let own_last = own_name.rsplit('.').next().unwrap_or(own_name);
    target
        .as_deref()
        .map(|name| name.rsplit('.').next() == Some(own_last))
        .unwrap_or(false)
}

/// Renders `tco.optimize` from `Attribute(Name("tco"), "optimize")`, or
/// `optimize` from a bare `Name`. Any other decorator shape (a call result,
/// a subscript, ...) can never textually equal `own_name` and yields `None`.
fn dotted_name(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Name(n) => Some(n.id.to_string()),
        Expr::Attribute(a) => {
            let base = dotted_name(&a.value)?;
            Some(format!("{base}.{}", a.attr))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustpython_parser::{parse, Mode};

    fn decorators_of(source: &str) -> Vec<Expr> {
        let module = parse(source, Mode::Module, "<test>").expect("valid python");
        let body = module.module().unwrap().body;
        let Stmt::FunctionDef(func) = body.into_iter().next().unwrap() else {
            panic!("expected function def");
        };
        func.decorator_list
    }

    #[test]
    fn strips_bare_decorator() {
        let decs = decorators_of("@optimize\ndef f():\n    pass\n");
        assert!(strip_own_decorator(decs, "optimize").is_empty());
    }

    #[test]
    fn strips_called_decorator() {
        let decs = decorators_of("@optimize(verbose_errors=True)\ndef f():\n    pass\n");
        assert!(strip_own_decorator(decs, "optimize").is_empty());
    }

    #[test]
    fn strips_dotted_decorator() {
        let decs = decorators_of("@tco.optimize\ndef f():\n    pass\n");
        assert!(strip_own_decorator(decs, "tco.optimize").is_empty());
    }

    #[test]
    fn keeps_unrelated_decorators() {
        let decs = decorators_of("@other\n@optimize\ndef f():\n    pass\n");
        let remaining = strip_own_decorator(decs, "optimize");
        assert_eq!(remaining.len(), 1);
    }
}
