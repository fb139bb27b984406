//! Pass D: rewrites every tail-position self-call into a rebind-and-jump,
//! with a sentinel-flag ladder that lifts the jump out of however many
//! loops currently enclose it.
//!
//! Runs after Pass C, so every read of a declared parameter already names
//! its hoisted local; this pass only ever has to resolve a tail call's
//! *arguments* back to parameter *positions* — the values themselves need
//! no further substitution.
//!
//! The loop stack tracked during descent holds only loops inside the
//! trampoline (the trampoline's own `while True:` is never pushed). A tail
//! call at stack depth 0 jumps straight back to the trampoline head with
//! `continue`; at depth ≥1 it sets the innermost loop's sentinel and
//! breaks, and that loop — once visited in full — gets a propagation
//! `if sentinel: ...` spliced in immediately after it whenever its sentinel
//! was ever set, forwarding the exit one level further out.

use std::cell::Cell;

use rustpython_ast::{Expr, ExprCall, Stmt, StmtFor, StmtWhile};

use crate::ast_build::{
    assign_bool, assign_one, break_stmt, continue_stmt, if_stmt, return_stmt, store, tuple_load,
    tuple_store,
};
use crate::error::{Result, TcoError};
use crate::names::{LoopSentinels, ParamBindings};
use crate::params::ParamList;

struct Frame {
    sentinel: String,
    used: Cell<bool>,
}

impl Frame {
    fn new(sentinel: String) -> Self {
        Self {
            sentinel,
            used: Cell::new(false),
        }
    }
}

pub fn rewrite_tail_calls(
    body: Vec<Stmt>,
    self_name: &str,
    params: &ParamList,
    bindings: &ParamBindings,
    sentinels: &mut LoopSentinels,
) -> Result<Vec<Stmt>> {
    let mut loop_stack: Vec<Frame> = Vec::new();
    rewrite_stmts(body, self_name, params, bindings, sentinels, &mut loop_stack)
}

fn rewrite_stmts(
    stmts: Vec<Stmt>,
    self_name: &str,
    params: &ParamList,
    bindings: &ParamBindings,
    sentinels: &mut LoopSentinels,
    loop_stack: &mut Vec<Frame>,
) -> Result<Vec<Stmt>> {
    let mut out = Vec::new();
    for stmt in stmts {
        rewrite_stmt(stmt, self_name, params, bindings, sentinels, loop_stack, &mut out)?;
    }
    Ok(out)
}

fn rewrite_stmt(
    stmt: Stmt,
    self_name: &str,
    params: &ParamList,
    bindings: &ParamBindings,
    sentinels: &mut LoopSentinels,
    loop_stack: &mut Vec<Frame>,
    out: &mut Vec<Stmt>,
) -> Result<()> {
    match stmt {
        Stmt::Return(s) => {
            let rewritten =
                rewrite_return_value(s.value.map(|v| *v), self_name, params, bindings, loop_stack)?;
            out.extend(rewritten);
        }
        Stmt::If(mut s) => {
            s.body = rewrite_stmts(s.body, self_name, params, bindings, sentinels, loop_stack)?;
            s.orelse = rewrite_stmts(s.orelse, self_name, params, bindings, sentinels, loop_stack)?;
            out.push(Stmt::If(s));
        }
        Stmt::For(s) => rewrite_for(s, self_name, params, bindings, sentinels, loop_stack, out)?,
        Stmt::While(s) => rewrite_while(s, self_name, params, bindings, sentinels, loop_stack, out)?,
        Stmt::With(mut s) => {
            s.body = rewrite_stmts(s.body, self_name, params, bindings, sentinels, loop_stack)?;
            out.push(Stmt::With(s));
        }
        Stmt::Try(mut s) => {
            s.body = rewrite_stmts(s.body, self_name, params, bindings, sentinels, loop_stack)?;
            s.orelse = rewrite_stmts(s.orelse, self_name, params, bindings, sentinels, loop_stack)?;
            s.finalbody =
                rewrite_stmts(s.finalbody, self_name, params, bindings, sentinels, loop_stack)?;
            for handler in &mut s.handlers {
                handler.body = rewrite_stmts(
                    std::mem::take(&mut handler.body),
                    self_name,
                    params,
                    bindings,
                    sentinels,
                    loop_stack,
                )?;
            }
            out.push(Stmt::Try(s));
        }
        other => out.push(other),
    }
    Ok(())
}

fn rewrite_for(
    mut s: StmtFor,
    self_name: &str,
    params: &ParamList,
    bindings: &ParamBindings,
    sentinels: &mut LoopSentinels,
    loop_stack: &mut Vec<Frame>,
    out: &mut Vec<Stmt>,
) -> Result<()> {
    let sentinel = sentinels.allocate();
    out.push(assign_bool(&sentinel, false));
    loop_stack.push(Frame::new(sentinel));

    s.body = rewrite_stmts(s.body, self_name, params, bindings, sentinels, loop_stack)?;
    let frame = loop_stack.pop().expect("frame pushed just above");
    s.orelse = rewrite_stmts(s.orelse, self_name, params, bindings, sentinels, loop_stack)?;

    out.push(Stmt::For(s));
    splice_propagation(frame, loop_stack, out);
    Ok(())
}

fn rewrite_while(
    mut s: StmtWhile,
    self_name: &str,
    params: &ParamList,
    bindings: &ParamBindings,
    sentinels: &mut LoopSentinels,
    loop_stack: &mut Vec<Frame>,
    out: &mut Vec<Stmt>,
) -> Result<()> {
    let sentinel = sentinels.allocate();
    out.push(assign_bool(&sentinel, false));
    loop_stack.push(Frame::new(sentinel));

    s.body = rewrite_stmts(s.body, self_name, params, bindings, sentinels, loop_stack)?;
    let frame = loop_stack.pop().expect("frame pushed just above");
    s.orelse = rewrite_stmts(s.orelse, self_name, params, bindings, sentinels, loop_stack)?;

    out.push(Stmt::While(s));
    splice_propagation(frame, loop_stack, out);
    Ok(())
}

/// If `frame`'s sentinel was ever set (by a direct tail call at this loop's
/// depth, or by a nested loop's own propagation), splice
/// `if sentinel: <forward-to-next-level-out>` immediately after the loop.
fn splice_propagation(frame: Frame, loop_stack: &mut [Frame], out: &mut Vec<Stmt>) {
    if !frame.used.get() {
        return;
    }
    let action = match loop_stack.last() {
        Some(outer) => {
            outer.used.set(true);
            vec![assign_bool(&outer.sentinel, true), break_stmt()]
        }
        None => vec![continue_stmt()],
    };
    out.push(if_stmt(crate::ast_build::load(&frame.sentinel), action, Vec::new()));
}

fn rewrite_return_value(
    value: Option<Expr>,
    self_name: &str,
    params: &ParamList,
    bindings: &ParamBindings,
    loop_stack: &mut Vec<Frame>,
) -> Result<Vec<Stmt>> {
    let Some(expr) = value else {
        return Ok(vec![return_stmt(None)]);
    };
    rewrite_tail_value(expr, self_name, params, bindings, loop_stack)
}

/// `expr` occupies a tail position (it is the whole value of a `return`, or
/// a branch of a conditional expression that is itself in tail position).
fn rewrite_tail_value(
    expr: Expr,
    self_name: &str,
    params: &ParamList,
    bindings: &ParamBindings,
    loop_stack: &mut Vec<Frame>,
) -> Result<Vec<Stmt>> {
    match expr {
        Expr::IfExp(e) => {
            let body = rewrite_tail_value(*e.body, self_name, params, bindings, loop_stack)?;
            let orelse = rewrite_tail_value(*e.orelse, self_name, params, bindings, loop_stack)?;
            Ok(vec![if_stmt(*e.test, body, orelse)])
        }
        Expr::Call(call) if is_direct_self_call(&call, self_name) => {
            rewrite_tail_call(call, params, bindings, loop_stack)
        }
        other => Ok(vec![return_stmt(Some(other))]),
    }
}

fn is_direct_self_call(call: &ExprCall, self_name: &str) -> bool {
    matches!(&*call.func, Expr::Name(n) if n.id.as_str() == self_name)
}

fn rewrite_tail_call(
    call: ExprCall,
    params: &ParamList,
    bindings: &ParamBindings,
    loop_stack: &mut Vec<Frame>,
) -> Result<Vec<Stmt>> {
    let resolved = resolve_arguments(&call, params)?;
    let mut stmts = Vec::new();

    match resolved.len() {
        0 => {}
        1 => {
            let name = &params.params[0].name;
            let hoisted = bindings
                .hoisted_name(name)
                .expect("every declared parameter has a hoisted binding");
            let mut values = resolved;
            stmts.push(assign_one(store(hoisted), values.remove(0)));
        }
        _ => {
            let targets = params
                .params
                .iter()
                .map(|p| {
                    store(
                        bindings
                            .hoisted_name(&p.name)
                            .expect("every declared parameter has a hoisted binding"),
                    )
                })
                .collect();
            stmts.push(assign_one(tuple_store(targets), tuple_load(resolved)));
        }
    }

    stmts.extend(control_transfer(loop_stack));
    Ok(stmts)
}

fn control_transfer(loop_stack: &[Frame]) -> Vec<Stmt> {
    match loop_stack.last() {
        Some(frame) => {
            frame.used.set(true);
            vec![assign_bool(&frame.sentinel, true), break_stmt()]
        }
        None => vec![continue_stmt()],
    }
}

/// Resolves a tail call's positional and keyword arguments to the declared
/// parameter order, applying declared defaults for positions the call
/// leaves unspecified.
fn resolve_arguments(call: &ExprCall, params: &ParamList) -> Result<Vec<Expr>> {
    if call.args.iter().any(|a| matches!(a, Expr::Starred(_))) {
        return Err(TcoError::ArgumentShape {
            reason: "variadic spread (*args) in a tail call cannot be remapped to declared \
                     parameters"
                .into(),
        });
    }
    if call.keywords.iter().any(|kw| kw.arg.is_none()) {
        return Err(TcoError::ArgumentShape {
            reason: "variadic spread (**kwargs) in a tail call cannot be remapped to declared \
                     parameters"
                .into(),
        });
    }
    if call.args.len() > params.params.len() {
        return Err(TcoError::ArgumentShape {
            reason: format!(
                "tail call passes {} positional argument(s) but only {} are declared",
                call.args.len(),
                params.params.len()
            ),
        });
    }

    let mut resolved: Vec<Option<Expr>> = vec![None; params.params.len()];
    for (i, arg) in call.args.iter().enumerate() {
        resolved[i] = Some(arg.clone());
    }
    for kw in &call.keywords {
        let name = kw.arg.as_ref().expect("filtered above").as_str();
        let Some(pos) = params.position_of(name) else {
            return Err(TcoError::ArgumentShape {
                reason: format!("tail call uses unknown keyword argument `{name}`"),
            });
        };
        if resolved[pos].is_some() {
            return Err(TcoError::ArgumentShape {
                reason: format!(
                    "tail call supplies `{name}` both positionally and by keyword"
                ),
            });
        }
        resolved[pos] = Some(kw.value.clone());
    }

    resolved
        .into_iter()
        .zip(params.params.iter())
        .map(|(value, param)| {
            value.or_else(|| param.default.clone()).ok_or_else(|| TcoError::ArgumentShape {
                reason: format!("tail call omits required parameter `{}`", param.name),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::names::SourceIdentifiers;
    use rustpython_parser::{parse, Mode};

    fn rewrite_source(source: &str) -> Vec<Stmt> {
        let module = parse(source, Mode::Module, "<test>").expect("valid python");
        let body = module.module().unwrap().body;
        let Stmt::FunctionDef(func) = body.into_iter().next().unwrap() else {
            panic!("expected function def");
        };
        let params = crate::params::extract_params(&func.args);
        let existing = SourceIdentifiers::default();
        let bindings = ParamBindings::new(&params.names(), &existing);
        let mut sentinels = LoopSentinels::new(&existing);
        let body = crate::substitute::substitute_body(func.body, &bindings);
        rewrite_tail_calls(body, func.name.as_str(), &params, &bindings, &mut sentinels)
            .expect("rewrite should succeed")
    }

    #[test]
    fn depth_zero_tail_call_continues_trampoline() {
        let out = rewrite_source("def f(n):\n    return f(n - 1)\n");
        let rendered = format!("{out:?}");
        assert!(rendered.contains("Continue"));
    }

    #[test]
    fn tail_call_inside_one_loop_uses_sentinel_and_breaks() {
        let out = rewrite_source(
            "def loop_tail(n):\n    if n <= 0:\n        return 0\n    for i in range(3):\n        return loop_tail(n - 1)\n    return 0\n",
        );
        let rendered = format!("{out:?}");
        assert!(rendered.contains("Break"));
        assert!(rendered.contains("If"));
    }

    #[test]
    fn conditional_expression_tail_call_expands_to_if_statement() {
        let out = rewrite_source("def f(n, acc):\n    return acc if n == 0 else f(n - 1, acc)\n");
        assert_eq!(out.len(), 1);
        assert!(matches!(out[0], Stmt::If(_)));
    }

    #[test]
    fn keyword_argument_remaps_to_declared_position() {
        let out = rewrite_source("def f(n, acc):\n    return f(acc=acc, n=n - 1)\n");
        let rendered = format!("{out:?}");
        assert!(rendered.contains("Continue"));
    }

    #[test]
    fn missing_required_argument_is_argument_shape_error() {
        let module = parse("def f(n, acc):\n    return f(n - 1)\n", Mode::Module, "<test>")
            .expect("valid python");
        let body = module.module().unwrap().body;
        let Stmt::FunctionDef(func) = body.into_iter().next().unwrap() else {
            panic!("expected function def");
        };
        let params = crate::params::extract_params(&func.args);
        let existing = SourceIdentifiers::default();
        let bindings = ParamBindings::new(&params.names(), &existing);
        let mut sentinels = LoopSentinels::new(&existing);
        let body = crate::substitute::substitute_body(func.body, &bindings);
        let err = rewrite_tail_calls(body, "f", &params, &bindings, &mut sentinels).unwrap_err();
        assert_eq!(err.kind(), "ARGUMENT_SHAPE");
    }
}
