//! Collects every identifier lexically present in a function, so `names.rs`
//! can prove its random prefixes don't collide with anything in the
//! original source.

use rustpython_ast::{Arguments, Expr, Stmt};
use rustc_hash::FxHashSet;

use crate::names::SourceIdentifiers;

pub fn collect_identifiers(args: &Arguments, body: &[Stmt]) -> SourceIdentifiers {
    let mut out = FxHashSet::default();
    collect_arguments(args, &mut out);
    for stmt in body {
        collect_stmt(stmt, &mut out);
    }
    out
}

fn collect_arguments(args: &Arguments, out: &mut SourceIdentifiers) {
    for a in args
        .posonlyargs
        .iter()
        .chain(args.args.iter())
        .chain(args.kwonlyargs.iter())
    {
        out.insert(a.as_arg().arg.to_string());
    }
    if let Some(vararg) = &args.vararg {
        out.insert(vararg.arg.to_string());
    }
    if let Some(kwarg) = &args.kwarg {
        out.insert(kwarg.arg.to_string());
    }
}

fn collect_stmt(stmt: &Stmt, out: &mut SourceIdentifiers) {
    match stmt {
        Stmt::FunctionDef(s) => {
            out.insert(s.name.to_string());
            collect_arguments(&s.args, out);
            for d in &s.decorator_list {
                collect_expr(d, out);
            }
            for stmt in &s.body {
                collect_stmt(stmt, out);
            }
        }
        Stmt::Return(s) => {
            if let Some(v) = &s.value {
                collect_expr(v, out);
            }
        }
        Stmt::Assign(s) => {
            for t in &s.targets {
                collect_expr(t, out);
            }
            collect_expr(&s.value, out);
        }
        Stmt::AugAssign(s) => {
            collect_expr(&s.target, out);
            collect_expr(&s.value, out);
        }
        Stmt::AnnAssign(s) => {
            collect_expr(&s.target, out);
            if let Some(v) = &s.value {
                collect_expr(v, out);
            }
        }
        Stmt::For(s) => {
            collect_expr(&s.target, out);
            collect_expr(&s.iter, out);
            for stmt in s.body.iter().chain(s.orelse.iter()) {
                collect_stmt(stmt, out);
            }
        }
        Stmt::While(s) => {
            collect_expr(&s.test, out);
            for stmt in s.body.iter().chain(s.orelse.iter()) {
                collect_stmt(stmt, out);
            }
        }
        Stmt::If(s) => {
            collect_expr(&s.test, out);
            for stmt in s.body.iter().chain(s.orelse.iter()) {
                collect_stmt(stmt, out);
            }
        }
        Stmt::With(s) => {
            for item in &s.items {
                collect_expr(&item.context_expr, out);
                if let Some(v) = &item.optional_vars {
                    collect_expr(v, out);
                }
            }
            for stmt in &s.body {
                collect_stmt(stmt, out);
            }
        }
        Stmt::Try(s) => {
            for stmt in s
                .body
                .iter()
                .chain(s.orelse.iter())
                .chain(s.finalbody.iter())
            {
                collect_stmt(stmt, out);
            }
            for h in &s.handlers {
                if let Some(name) = &h.name {
                    out.insert(name.to_string());
                }
                for stmt in &h.body {
                    collect_stmt(stmt, out);
                }
            }
        }
        Stmt::Expr(s) => collect_expr(&s.value, out),
        Stmt::Assert(s) => {
            collect_expr(&s.test, out);
            if let Some(m) = &s.msg {
                collect_expr(m, out);
            }
        }
        Stmt::Raise(s) => {
            if let Some(e) = &s.exc {
                collect_expr(e, out);
            }
        }
        Stmt::Global(s) => {
            for name in &s.names {
                out.insert(name.to_string());
            }
        }
        Stmt::Nonlocal(s) => {
            for name in &s.names {
                out.insert(name.to_string());
            }
        }
        _ => {}
    }
}

fn collect_expr(expr: &Expr, out: &mut SourceIdentifiers) {
    match expr {
        Expr::Name(e) => {
            out.insert(e.id.to_string());
        }
        Expr::Call(e) => {
            collect_expr(&e.func, out);
            for a in &e.args {
                collect_expr(a, out);
            }
            for kw in &e.keywords {
                if let Some(arg) = &kw.arg {
                    out.insert(arg.to_string());
                }
                collect_expr(&kw.value, out);
            }
        }
        Expr::Attribute(e) => {
            collect_expr(&e.value, out);
            out.insert(e.attr.to_string());
        }
        Expr::Subscript(e) => {
            collect_expr(&e.value, out);
            collect_expr(&e.slice, out);
        }
        Expr::BoolOp(e) => e.values.iter().for_each(|v| collect_expr(v, out)),
        Expr::BinOp(e) => {
            collect_expr(&e.left, out);
            collect_expr(&e.right, out);
        }
        Expr::UnaryOp(e) => collect_expr(&e.operand, out),
        Expr::IfExp(e) => {
            collect_expr(&e.test, out);
            collect_expr(&e.body, out);
            collect_expr(&e.orelse, out);
        }
        Expr::Compare(e) => {
            collect_expr(&e.left, out);
            e.comparators.iter().for_each(|c| collect_expr(c, out));
        }
        Expr::Tuple(e) => e.elts.iter().for_each(|v| collect_expr(v, out)),
        Expr::List(e) => e.elts.iter().for_each(|v| collect_expr(v, out)),
        Expr::Set(e) => e.elts.iter().for_each(|v| collect_expr(v, out)),
        Expr::Dict(e) => e
            .keys
            .iter()
            .flatten()
            .chain(e.values.iter())
            .for_each(|v| collect_expr(v, out)),
        Expr::Starred(e) => collect_expr(&e.value, out),
        Expr::Lambda(e) => {
            collect_arguments(&e.args, out);
            collect_expr(&e.body, out);
        }
        Expr::JoinedStr(e) => e.values.iter().for_each(|v| collect_expr(v, out)),
        Expr::FormattedValue(e) => collect_expr(&e.value, out),
        Expr::ListComp(e) => {
            collect_expr(&e.elt, out);
            for g in &e.generators {
                collect_expr(&g.target, out);
                collect_expr(&g.iter, out);
                g.ifs.iter().for_each(|c| collect_expr(c, out));
            }
        }
        Expr::SetComp(e) => {
            collect_expr(&e.elt, out);
            for g in &e.generators {
                collect_expr(&g.target, out);
                collect_expr(&g.iter, out);
                g.ifs.iter().for_each(|c| collect_expr(c, out));
            }
        }
        _ => {}
    }
}
