//! Restricted expressions embedded in rule markup.
//!
//! Costs, exists-conditions and effects may carry small expressions such as
//! `target.morale.max - target.morale` or `count >= 2 and side.influence > 3`.
//! They are compiled once when the rule is parsed and evaluated read-only
//! against an [`ExprContext`]; nothing an expression does can mutate the
//! encounter.

pub mod ast;
pub mod eval;
pub mod lexer;
pub mod parser;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use ast::{BinaryOp, Expr, Function, Path, UnaryOp};
pub use eval::{evaluate, ExprContext, PropField, Value};

/// Compile or evaluation failure of an expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    #[error("syntax error at offset {offset}: {message}")]
    Syntax { offset: usize, message: String },

    #[error("unknown root `{name}` at offset {offset}")]
    UnknownRoot { name: String, offset: usize },

    #[error("unknown function `{0}`")]
    UnknownFunction(String),

    #[error("wrong number of arguments to `{function}`: {found}")]
    Arity { function: String, found: usize },

    #[error("type error: expected {expected}, found {found}")]
    Type {
        expected: &'static str,
        found: &'static str,
    },

    #[error("cannot resolve `{0}`")]
    Unresolved(String),

    #[error("division by zero")]
    DivisionByZero,
}

/// A compiled expression together with its source text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Script {
    source: String,
    ast: Expr,
}

impl Script {
    /// Compile `source`.
    pub fn compile(source: &str) -> Result<Self, ExprError> {
        let ast = parser::parse(source)?;
        Ok(Self {
            source: source.trim().to_string(),
            ast,
        })
    }

    /// The source text.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The syntax tree.
    #[must_use]
    pub fn ast(&self) -> &Expr {
        &self.ast
    }

    /// Evaluate against `ctx`.
    pub fn eval(&self, ctx: &dyn ExprContext) -> Result<Value, ExprError> {
        evaluate(&self.ast, ctx)
    }

    /// Evaluate and require a number.
    pub fn eval_number(&self, ctx: &dyn ExprContext) -> Result<f64, ExprError> {
        self.eval(ctx)?.as_number()
    }

    /// Evaluate and require a boolean.
    pub fn eval_bool(&self, ctx: &dyn ExprContext) -> Result<bool, ExprError> {
        self.eval(ctx)?.as_bool()
    }
}

impl std::fmt::Display for Script {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Empty;

    impl ExprContext for Empty {
        fn root(&self, name: &str) -> Option<Value> {
            (name == "value").then_some(Value::Number(2.0))
        }
        fn link(&self, _: crate::core::EntityId, _: &str) -> Option<crate::core::EntityId> {
            None
        }
        fn entity_property(&self, _: crate::core::EntityId, _: &str, _: PropField) -> Option<f64> {
            None
        }
        fn side_property(&self, _: crate::core::SideId, _: &str, _: PropField) -> Option<f64> {
            None
        }
    }

    #[test]
    fn test_compile_and_eval() {
        let script = Script::compile("  value * 3 ").unwrap();
        assert_eq!(script.source(), "value * 3");
        assert_eq!(script.eval_number(&Empty).unwrap(), 6.0);
        assert!(script.eval_bool(&Empty).is_err());
    }

    #[test]
    fn test_compile_error() {
        assert!(Script::compile("value +").is_err());
    }
}
