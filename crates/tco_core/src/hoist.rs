//! Pass B: builds the parameter-hoist prelude and wraps the (already
//! substituted and tail-call-rewritten) body in the trampoline loop.
//!
//! The prelude's assignments read the *original* parameter names — they
//! are the one place in the rewritten function that still must, since they
//! are exactly what copies the incoming call's argument values into the
//! fresh locals that everything past this point operates on.

use rustpython_ast::Stmt;

use crate::ast_build::{assign_one, load, store, while_true};
use crate::names::ParamBindings;

/// `hᵢ = pᵢ` for each declared parameter, in parameter order.
pub fn hoist_prelude(bindings: &ParamBindings) -> Vec<Stmt> {
    bindings
        .params_in_order()
        .iter()
        .map(|p| {
            let hoisted = bindings
                .hoisted_name(p)
                .expect("every declared parameter has a hoisted binding");
            assign_one(store(hoisted), load(p))
        })
        .collect()
}

/// Prelude assignments followed by the body wrapped in `while True:`.
pub fn wrap_in_trampoline(bindings: &ParamBindings, rewritten_body: Vec<Stmt>) -> Vec<Stmt> {
    let mut out = hoist_prelude(bindings);
    out.push(while_true(rewritten_body));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::names::SourceIdentifiers;

    #[test]
    fn prelude_has_one_assign_per_parameter_in_order() {
        let existing = SourceIdentifiers::default();
        let bindings = ParamBindings::new(&["n".into(), "acc".into()], &existing);
        let prelude = hoist_prelude(&bindings);
        assert_eq!(prelude.len(), 2);
    }

    #[test]
    fn wrap_produces_prelude_plus_single_while_loop() {
        let existing = SourceIdentifiers::default();
        let bindings = ParamBindings::new(&["n".into()], &existing);
        let wrapped = wrap_in_trampoline(&bindings, Vec::new());
        assert_eq!(wrapped.len(), 2);
        assert!(matches!(wrapped[1], Stmt::While(_)));
    }
}
