//! Extracts F's declared parameter list, in the order the parameter binding
//! table B hoists them, from a `rustpython_ast::Arguments` node.

use rustpython_ast::{Arguments, Expr};

#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub default: Option<Expr>,
    pub keyword_only: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ParamList {
    pub params: Vec<Param>,
    pub has_vararg: bool,
    pub has_kwarg: bool,
}

impl ParamList {
    pub fn names(&self) -> Vec<String> {
        self.params.iter().map(|p| p.name.clone()).collect()
    }

    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|p| p.name == name)
    }
}

pub fn extract_params(args: &Arguments) -> ParamList {
    let mut params = Vec::new();
    for a in args.posonlyargs.iter().chain(args.args.iter()) {
        params.push(Param {
            name: a.as_arg().arg.to_string(),
            default: a.default.as_deref().cloned(),
            keyword_only: false,
        });
    }
    for a in &args.kwonlyargs {
        params.push(Param {
            name: a.as_arg().arg.to_string(),
            default: a.default.as_deref().cloned(),
            keyword_only: true,
        });
    }
    ParamList {
        params,
        has_vararg: args.vararg.is_some(),
        has_kwarg: args.kwarg.is_some(),
    }
}
