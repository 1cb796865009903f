//! Expression syntax tree.

use serde::{Deserialize, Serialize};

/// Names a path may start with.
pub const ROOTS: &[&str] = &[
    "self", "agent", "target", "object", "holder", "creator", "encounter", "side", "opponent",
    "count", "value",
];

/// Path segments that follow an entity link rather than read a property.
pub const LINKS: &[&str] = &["holder", "creator", "target"];

/// A parsed expression.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Numeric literal.
    Number(f64),
    /// Boolean literal.
    Bool(bool),
    /// Reference into encounter state, e.g. `target.holder.morale.max`.
    Path(Path),
    /// Prefix operator.
    Unary { op: UnaryOp, operand: Box<Expr> },
    /// Infix operator.
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// Built-in function call.
    Call { function: Function, args: Vec<Expr> },
}

/// Dotted reference: a root followed by links, a property and a field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Path {
    /// First segment; one of [`ROOTS`].
    pub root: String,
    /// Remaining segments.
    pub segments: Vec<String>,
}

impl std::fmt::Display for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.root)?;
        for segment in &self.segments {
            write!(f, ".{segment}")?;
        }
        Ok(())
    }
}

/// Prefix operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
}

/// Infix operators, lowest precedence first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinaryOp {
    /// Binding power for the Pratt parser.
    #[must_use]
    pub const fn precedence(self) -> u8 {
        match self {
            BinaryOp::Or => 1,
            BinaryOp::And => 2,
            BinaryOp::Eq | BinaryOp::Ne => 3,
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => 4,
            BinaryOp::Add | BinaryOp::Sub => 5,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => 6,
        }
    }
}

/// Built-in functions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Function {
    Min,
    Max,
    Abs,
    Floor,
    Ceil,
    Round,
    Clamp,
}

impl Function {
    /// Look up a function by name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "min" => Function::Min,
            "max" => Function::Max,
            "abs" => Function::Abs,
            "floor" => Function::Floor,
            "ceil" => Function::Ceil,
            "round" => Function::Round,
            "clamp" => Function::Clamp,
            _ => return None,
        })
    }

    /// Accepted argument counts (inclusive).
    #[must_use]
    pub const fn arity(self) -> (usize, usize) {
        match self {
            Function::Min | Function::Max => (1, usize::MAX),
            Function::Abs | Function::Floor | Function::Ceil | Function::Round => (1, 1),
            Function::Clamp => (3, 3),
        }
    }
}
