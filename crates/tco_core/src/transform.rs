//! Orchestrates the four transformer passes over a single
//! accepted function definition, in the order their data dependencies
//! require: decorator-stripping first (purely cosmetic, independent of
//! everything else), then name collection (needed to mint collision-free
//! fresh names), then substitution, then the tail-call rewrite (which
//! depends on substitution having already run, since it never re-derives
//! hoisted names itself), and finally the trampoline wrap.

use rustpython_ast::StmtFunctionDef;

use crate::collect::collect_identifiers;
use crate::decorator::strip_own_decorator;
use crate::error::Result;
use crate::hoist::wrap_in_trampoline;
use crate::names::{LoopSentinels, ParamBindings};
use crate::params::extract_params;
use crate::substitute::substitute_body;
use crate::tailcall::rewrite_tail_calls;

pub fn transform_function(
    mut func: StmtFunctionDef,
    own_decorator_name: &str,
) -> Result<StmtFunctionDef> {
    func.decorator_list = strip_own_decorator(func.decorator_list, own_decorator_name);

    let params = extract_params(&func.args);
    let existing = collect_identifiers(&func.args, &func.body);
    let bindings = ParamBindings::new(&params.names(), &existing);
    let mut sentinels = LoopSentinels::new(&existing);

    let substituted = substitute_body(func.body, &bindings);
    let rewritten = rewrite_tail_calls(
        substituted,
        func.name.as_str(),
        &params,
        &bindings,
        &mut sentinels,
    )?;
    func.body = wrap_in_trampoline(&bindings, rewritten);

    Ok(func)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustpython_ast::Stmt;
    use rustpython_parser::{parse, Mode};

    fn transform_source(source: &str) -> StmtFunctionDef {
        let module = parse(source, Mode::Module, "<test>").expect("valid python");
        let body = module.module().unwrap().body;
        let Stmt::FunctionDef(func) = body.into_iter().next().unwrap() else {
            panic!("expected function def");
        };
        transform_function(func, "optimize").expect("transform should succeed")
    }

    #[test]
    fn strips_decorator_and_wraps_in_trampoline() {
        let func = transform_source(
            "@optimize\ndef f(n):\n    if n == 0:\n        return 0\n    return f(n - 1)\n",
        );
        assert!(func.decorator_list.is_empty());
        assert_eq!(func.body.len(), 2);
        assert!(matches!(func.body[1], Stmt::While(_)));
    }

    #[test]
    fn gcd_style_two_parameter_function_transforms() {
        let func = transform_source(
            "def gcd(a, b):\n    if b == 0:\n        return a\n    return gcd(b, a % b)\n",
        );
        assert_eq!(func.name.as_str(), "gcd");
        assert!(matches!(func.body[1], Stmt::While(_)));
    }
}
