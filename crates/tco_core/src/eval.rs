//! A tiny tree-walking evaluator over the restricted subset of rewritten-AST
//! shapes the transformer itself ever produces or passes through unchanged:
//! integer/boolean arithmetic, comparisons, `if`/`while`/`for i in range(..)`,
//! tuple and plain assignment, `return`, `break`/`continue`.
//!
//! This exists purely so the end-to-end scenario tests (semantic
//! equivalence, stack boundedness, atomic parameter update) can execute a
//! rewritten function and check its result without linking a real Python
//! interpreter. It is `pub` only so the `tests/` integration binaries can
//! reach it; it is not part of the transformer's own contract and no
//! production code path calls into it.

use std::collections::HashMap;

use rustpython_ast::{Constant, Expr, Stmt, StmtFunctionDef};

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Bool(bool),
    None,
}

impl Value {
    pub fn as_int(&self) -> i64 {
        match self {
            Value::Int(i) => *i,
            Value::Bool(b) => *b as i64,
            Value::None => panic!("expected an int, found None"),
        }
    }

    fn truthy(&self) -> bool {
        match self {
            Value::Int(i) => *i != 0,
            Value::Bool(b) => *b,
            Value::None => false,
        }
    }
}

enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
}

pub struct Evaluator {
    vars: HashMap<String, Value>,
}

impl Evaluator {
    /// Calls `func` with positional argument values bound to its declared
    /// parameters in order (keyword args and defaults are not needed by any
    /// scenario this evaluator supports).
    pub fn call(func: &StmtFunctionDef, args: &[Value]) -> Value {
        let mut vars = HashMap::new();
        for (param, value) in func.args.args.iter().zip(args.iter()) {
            vars.insert(param.as_arg().arg.as_str().to_string(), value.clone());
        }
        let mut eval = Evaluator { vars };
        match eval.exec_body(&func.body) {
            Flow::Return(v) => v,
            _ => Value::None,
        }
    }

    fn exec_body(&mut self, body: &[Stmt]) -> Flow {
        for stmt in body {
            match self.exec_stmt(stmt) {
                Flow::Normal => {}
                other => return other,
            }
        }
        Flow::Normal
    }

    fn exec_stmt(&mut self, stmt: &Stmt) -> Flow {
        match stmt {
            Stmt::Return(s) => {
                let value = s
                    .value
                    .as_deref()
                    .map(|e| self.eval_expr(e))
                    .unwrap_or(Value::None);
                Flow::Return(value)
            }
            Stmt::Assign(s) => {
                self.exec_assign(&s.targets[0], &s.value);
                Flow::Normal
            }
            Stmt::If(s) => {
                let branch = if self.eval_expr(&s.test).truthy() {
                    &s.body
                } else {
                    &s.orelse
                };
                self.exec_body(branch)
            }
            Stmt::While(s) => loop {
                if !self.eval_expr(&s.test).truthy() {
                    return Flow::Normal;
                }
                match self.exec_body(&s.body) {
                    Flow::Break => return Flow::Normal,
                    Flow::Return(v) => return Flow::Return(v),
                    Flow::Normal | Flow::Continue => {}
                }
            },
            Stmt::For(s) => {
                let target = bound_name(&s.target);
                for i in self.eval_range(&s.iter) {
                    self.vars.insert(target.clone(), Value::Int(i));
                    match self.exec_body(&s.body) {
                        Flow::Break => return Flow::Normal,
                        Flow::Return(v) => return Flow::Return(v),
                        Flow::Normal | Flow::Continue => {}
                    }
                }
                Flow::Normal
            }
            Stmt::Break(_) => Flow::Break,
            Stmt::Continue(_) => Flow::Continue,
            Stmt::Pass(_) | Stmt::Expr(_) => Flow::Normal,
            other => panic!("evaluator does not support statement kind: {other:?}"),
        }
    }

    /// A tuple target (`h0, h1 = v0, v1`) evaluates every value on the
    /// right-hand side before binding any of them, so a multi-parameter
    /// trampoline update never observes a partially-updated parameter set.
    fn exec_assign(&mut self, target: &Expr, value: &Expr) {
        match target {
            Expr::Name(n) => {
                let v = self.eval_expr(value);
                self.vars.insert(n.id.as_str().to_string(), v);
            }
            Expr::Tuple(t) => {
                let Expr::Tuple(rhs) = value else {
                    panic!("evaluator only supports tuple-to-tuple assignment: {value:?}");
                };
                assert_eq!(t.elts.len(), rhs.elts.len(), "tuple assignment arity mismatch");
                let values: Vec<Value> = rhs.elts.iter().map(|e| self.eval_expr(e)).collect();
                for (elt, v) in t.elts.iter().zip(values.into_iter()) {
                    let Expr::Name(n) = elt else {
                        panic!("evaluator only supports plain names in a tuple target: {elt:?}");
                    };
                    self.vars.insert(n.id.as_str().to_string(), v);
                }
            }
            other => panic!("evaluator does not support assignment target: {other:?}"),
        }
    }

    fn eval_range(&mut self, expr: &Expr) -> Vec<i64> {
        let Expr::Call(call) = expr else {
            panic!("evaluator only supports `for x in range(...)`: {expr:?}");
        };
        let Expr::Name(func) = &*call.func else {
            panic!("evaluator only supports `for x in range(...)`: {expr:?}");
        };
        assert_eq!(func.id.as_str(), "range", "evaluator only supports range()");
        let args: Vec<i64> = call.args.iter().map(|a| self.eval_expr(a).as_int()).collect();
        match args.as_slice() {
            [stop] => (0..*stop).collect(),
            [start, stop] => (*start..*stop).collect(),
            [start, stop, step] if *step > 0 => {
                let mut out = Vec::new();
                let mut i = *start;
                while i < *stop {
                    out.push(i);
                    i += step;
                }
                out
            }
            _ => panic!("unsupported range() arity"),
        }
    }

    fn eval_expr(&mut self, expr: &Expr) -> Value {
        match expr {
            Expr::Name(n) => self
                .vars
                .get(n.id.as_str())
                .cloned()
                .unwrap_or_else(|| panic!("unbound name `{}`", n.id.as_str())),
            Expr::Constant(c) => match &c.value {
                // BigInt has no infallible i64 conversion in scope here;
                // every constant this evaluator is ever asked to evaluate
                // fits comfortably in an i64, so round-trip through its
                // decimal representation instead of pulling in num-traits.
                Constant::Int(i) => Value::Int(i.to_string().parse().unwrap_or(0)),
                Constant::Bool(b) => Value::Bool(*b),
                Constant::None => Value::None,
                other => panic!("unsupported constant: {other:?}"),
            },
            Expr::BinOp(e) => {
                let l = self.eval_expr(&e.left).as_int();
                let r = self.eval_expr(&e.right).as_int();
                use rustpython_ast::Operator::*;
                Value::Int(match e.op {
                    Add => l + r,
                    Sub => l - r,
                    Mult => l * r,
                    Mod => l.rem_euclid(r),
                    FloorDiv => l.div_euclid(r),
                    other => panic!("unsupported binary operator: {other:?}"),
                })
            }
            Expr::UnaryOp(e) => {
                let v = self.eval_expr(&e.operand);
                use rustpython_ast::UnaryOp::*;
                match e.op {
                    USub => Value::Int(-v.as_int()),
                    Not => Value::Bool(!v.truthy()),
                    other => panic!("unsupported unary operator: {other:?}"),
                }
            }
            Expr::Compare(e) => {
                let mut left = self.eval_expr(&e.left).as_int();
                use rustpython_ast::CmpOp::*;
                for (op, rhs) in e.ops.iter().zip(e.comparators.iter()) {
                    let right = self.eval_expr(rhs).as_int();
                    let result = match op {
                        Eq => left == right,
                        NotEq => left != right,
                        Lt => left < right,
                        LtE => left <= right,
                        Gt => left > right,
                        GtE => left >= right,
                        other => panic!("unsupported comparison operator: {other:?}"),
                    };
                    if !result {
                        return Value::Bool(false);
                    }
                    left = right;
                }
                Value::Bool(true)
            }
            Expr::Tuple(t) => {
                // The only tuple expressions this evaluator ever sees are
                // the RHS of a parallel parameter-update assignment, which
                // is unpacked directly by `exec_stmt` below rather than
                // through `eval_expr`; reaching here means a tuple showed
                // up somewhere else.
                panic!("unexpected bare tuple expression: {t:?}");
            }
            other => panic!("evaluator does not support expression kind: {other:?}"),
        }
    }
}

fn bound_name(target: &Expr) -> String {
    match target {
        Expr::Name(n) => n.id.as_str().to_string(),
        other => panic!("evaluator only supports a plain name as a `for` target: {other:?}"),
    }
}
