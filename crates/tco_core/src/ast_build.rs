//! Small constructors for the synthesized statements and expressions the
//! transformer splices into F's body — the parameter-hoist assigns, the
//! trampoline's `while True:`, and the sentinel-flag ladder.
//!
//! Every node gets the same empty range. Nothing here is ever shown to a
//! user directly except through the pretty-printer, which does not consult
//! ranges, and the host compiler only needs *some* valid, internally
//! consistent span to accept the tree — a single shared empty range
//! satisfies that without tracking provenance back to original source
//! positions that, for synthesized nodes, don't exist.

use rustpython_ast::text_size::TextRange;
use rustpython_ast::{
    Constant, Expr, ExprConstant, ExprContext, ExprName, ExprTuple, Identifier, Stmt, StmtAssign,
    StmtBreak, StmtContinue, StmtIf, StmtReturn, StmtWhile,
};

pub fn empty_range() -> TextRange {
    TextRange::default()
}

pub fn ident(name: &str) -> Identifier {
    Identifier::new(name.to_string(), empty_range())
}

pub fn load(name: &str) -> Expr {
    Expr::Name(ExprName {
        range: empty_range(),
        id: ident(name),
        ctx: ExprContext::Load,
    })
}

pub fn store(name: &str) -> Expr {
    Expr::Name(ExprName {
        range: empty_range(),
        id: ident(name),
        ctx: ExprContext::Store,
    })
}

pub fn bool_const(value: bool) -> Expr {
    Expr::Constant(ExprConstant {
        range: empty_range(),
        value: Constant::Bool(value),
        kind: None,
    })
}

pub fn none_const() -> Expr {
    Expr::Constant(ExprConstant {
        range: empty_range(),
        value: Constant::None,
        kind: None,
    })
}

pub fn tuple_load(elts: Vec<Expr>) -> Expr {
    Expr::Tuple(ExprTuple {
        range: empty_range(),
        elts,
        ctx: ExprContext::Load,
    })
}

pub fn tuple_store(elts: Vec<Expr>) -> Expr {
    Expr::Tuple(ExprTuple {
        range: empty_range(),
        elts,
        ctx: ExprContext::Store,
    })
}

/// `<target> = <value>`
pub fn assign_one(target: Expr, value: Expr) -> Stmt {
    Stmt::Assign(StmtAssign {
        range: empty_range(),
        targets: vec![target],
        value: Box::new(value),
        type_comment: None,
    })
}

/// `sentinel = True` / `sentinel = False`
pub fn assign_bool(name: &str, value: bool) -> Stmt {
    assign_one(store(name), bool_const(value))
}

pub fn break_stmt() -> Stmt {
    Stmt::Break(StmtBreak { range: empty_range() })
}

pub fn continue_stmt() -> Stmt {
    Stmt::Continue(StmtContinue { range: empty_range() })
}

pub fn return_stmt(value: Option<Expr>) -> Stmt {
    Stmt::Return(StmtReturn {
        range: empty_range(),
        value: value.map(Box::new),
    })
}

pub fn if_stmt(test: Expr, body: Vec<Stmt>, orelse: Vec<Stmt>) -> Stmt {
    Stmt::If(StmtIf {
        range: empty_range(),
        test: Box::new(test),
        body,
        orelse,
    })
}

/// `while True: <body>`
pub fn while_true(body: Vec<Stmt>) -> Stmt {
    Stmt::While(StmtWhile {
        range: empty_range(),
        test: Box::new(bool_const(true)),
        body,
        orelse: Vec::new(),
    })
}
