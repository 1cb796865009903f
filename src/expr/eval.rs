//! Read-only evaluation of compiled expressions.
//!
//! Paths are resolved against an [`ExprContext`]. Link segments (`holder`,
//! `creator`, `target`) are followed while the current value is an entity;
//! the next segment names a property and an optional final segment picks a
//! field (`min`, `max`, `prev`). A missing link yields `Nil`, which only an
//! equality test can consume.

use serde::{Deserialize, Serialize};

use super::ast::{BinaryOp, Expr, Function, Path, UnaryOp, LINKS};
use super::ExprError;
use crate::core::{EntityId, SideId};

/// Result of evaluating an expression.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Number(f64),
    Bool(bool),
    Entity(EntityId),
    Side(SideId),
    Nil,
}

impl Value {
    fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Bool(_) => "boolean",
            Value::Entity(_) => "entity",
            Value::Side(_) => "side",
            Value::Nil => "nil",
        }
    }

    /// The numeric payload, or a type error.
    pub fn as_number(&self) -> Result<f64, ExprError> {
        match self {
            Value::Number(n) => Ok(*n),
            other => Err(ExprError::Type {
                expected: "number",
                found: other.type_name(),
            }),
        }
    }

    /// The boolean payload, or a type error.
    pub fn as_bool(&self) -> Result<bool, ExprError> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(ExprError::Type {
                expected: "boolean",
                found: other.type_name(),
            }),
        }
    }

    /// The entity payload, or a type error.
    pub fn as_entity(&self) -> Result<EntityId, ExprError> {
        match self {
            Value::Entity(id) => Ok(*id),
            other => Err(ExprError::Type {
                expected: "entity",
                found: other.type_name(),
            }),
        }
    }
}

/// Which cached figure of a property a path reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PropField {
    Val,
    Min,
    Max,
    Prev,
}

impl PropField {
    fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "val" => Some(PropField::Val),
            "min" => Some(PropField::Min),
            "max" => Some(PropField::Max),
            "prev" => Some(PropField::Prev),
            _ => None,
        }
    }
}

/// Encounter state as seen by an expression.
pub trait ExprContext {
    /// Value bound to a root name, `None` if the root is unbound here.
    fn root(&self, name: &str) -> Option<Value>;

    /// Follow `holder`, `creator` or `target` from `entity`.
    fn link(&self, entity: EntityId, link: &str) -> Option<EntityId>;

    /// Read a property of an entity.
    fn entity_property(&self, entity: EntityId, prop: &str, field: PropField) -> Option<f64>;

    /// Read a side-level property.
    fn side_property(&self, side: SideId, prop: &str, field: PropField) -> Option<f64>;
}

/// Evaluate `expr` against `ctx`.
pub fn evaluate(expr: &Expr, ctx: &dyn ExprContext) -> Result<Value, ExprError> {
    match expr {
        Expr::Number(n) => Ok(Value::Number(*n)),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Path(path) => resolve_path(path, ctx),
        Expr::Unary { op, operand } => {
            let value = evaluate(operand, ctx)?;
            match op {
                UnaryOp::Neg => Ok(Value::Number(-value.as_number()?)),
                UnaryOp::Not => Ok(Value::Bool(!value.as_bool()?)),
            }
        }
        Expr::Binary { op, lhs, rhs } => binary(*op, lhs, rhs, ctx),
        Expr::Call { function, args } => call(*function, args, ctx),
    }
}

fn binary(op: BinaryOp, lhs: &Expr, rhs: &Expr, ctx: &dyn ExprContext) -> Result<Value, ExprError> {
    // Logical operators short-circuit.
    match op {
        BinaryOp::Or if evaluate(lhs, ctx)?.as_bool()? => return Ok(Value::Bool(true)),
        BinaryOp::And if !evaluate(lhs, ctx)?.as_bool()? => return Ok(Value::Bool(false)),
        BinaryOp::Or | BinaryOp::And => return Ok(Value::Bool(evaluate(rhs, ctx)?.as_bool()?)),
        _ => {}
    }

    let left = evaluate(lhs, ctx)?;
    let right = evaluate(rhs, ctx)?;

    let number = |l: f64, r: f64| match op {
        BinaryOp::Add => Ok(l + r),
        BinaryOp::Sub => Ok(l - r),
        BinaryOp::Mul => Ok(l * r),
        BinaryOp::Div if r == 0.0 => Err(ExprError::DivisionByZero),
        BinaryOp::Rem if r == 0.0 => Err(ExprError::DivisionByZero),
        BinaryOp::Div => Ok(l / r),
        _ => Ok(l % r),
    };

    match op {
        BinaryOp::Eq => Ok(Value::Bool(left == right)),
        BinaryOp::Ne => Ok(Value::Bool(left != right)),
        BinaryOp::Lt => Ok(Value::Bool(left.as_number()? < right.as_number()?)),
        BinaryOp::Le => Ok(Value::Bool(left.as_number()? <= right.as_number()?)),
        BinaryOp::Gt => Ok(Value::Bool(left.as_number()? > right.as_number()?)),
        BinaryOp::Ge => Ok(Value::Bool(left.as_number()? >= right.as_number()?)),
        _ => number(left.as_number()?, right.as_number()?).map(Value::Number),
    }
}

fn call(function: Function, args: &[Expr], ctx: &dyn ExprContext) -> Result<Value, ExprError> {
    let mut values = Vec::with_capacity(args.len());
    for arg in args {
        values.push(evaluate(arg, ctx)?.as_number()?);
    }

    let arity = || ExprError::Arity {
        function: format!("{function:?}").to_lowercase(),
        found: args.len(),
    };
    let first = values.first().copied().ok_or_else(arity)?;

    let result = match function {
        Function::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
        Function::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        Function::Abs => first.abs(),
        Function::Floor => first.floor(),
        Function::Ceil => first.ceil(),
        Function::Round => first.round(),
        Function::Clamp => match values[..] {
            [value, lo, hi] if lo <= hi => value.clamp(lo, hi),
            [_, _, hi] => hi,
            _ => return Err(arity()),
        },
    };
    Ok(Value::Number(result))
}

fn resolve_path(path: &Path, ctx: &dyn ExprContext) -> Result<Value, ExprError> {
    let unresolved = || ExprError::Unresolved(path.to_string());

    let mut current = ctx.root(&path.root).ok_or_else(unresolved)?;
    let mut segments = path.segments.iter().map(String::as_str).peekable();

    while let (Value::Entity(entity), Some(&segment)) = (current, segments.peek()) {
        if !LINKS.contains(&segment) {
            break;
        }
        segments.next();
        current = ctx.link(entity, segment).map_or(Value::Nil, Value::Entity);
    }

    let Some(prop) = segments.next() else {
        return Ok(current);
    };

    let field = match segments.next() {
        None => PropField::Val,
        Some(segment) => PropField::from_segment(segment).ok_or_else(unresolved)?,
    };
    if segments.next().is_some() {
        return Err(unresolved());
    }

    let value = match current {
        Value::Entity(entity) => ctx.entity_property(entity, prop, field),
        Value::Side(side) => ctx.side_property(side, prop, field),
        _ => None,
    };
    value.map(Value::Number).ok_or_else(unresolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::parser::parse;
    use rustc_hash::FxHashMap;

    #[derive(Default)]
    struct Fixture {
        roots: FxHashMap<&'static str, Value>,
        links: FxHashMap<(EntityId, &'static str), EntityId>,
        props: FxHashMap<(EntityId, &'static str), (f64, f64, f64, f64)>,
        side_props: FxHashMap<(SideId, &'static str), f64>,
    }

    impl ExprContext for Fixture {
        fn root(&self, name: &str) -> Option<Value> {
            self.roots.get(name).copied()
        }

        fn link(&self, entity: EntityId, link: &str) -> Option<EntityId> {
            self.links
                .iter()
                .find(|((e, l), _)| *e == entity && *l == link)
                .map(|(_, to)| *to)
        }

        fn entity_property(&self, entity: EntityId, prop: &str, field: PropField) -> Option<f64> {
            let (val, min, max, prev) = self
                .props
                .iter()
                .find(|((e, p), _)| *e == entity && *p == prop)
                .map(|(_, v)| *v)?;
            Some(match field {
                PropField::Val => val,
                PropField::Min => min,
                PropField::Max => max,
                PropField::Prev => prev,
            })
        }

        fn side_property(&self, side: SideId, prop: &str, _field: PropField) -> Option<f64> {
            self.side_props
                .iter()
                .find(|((s, p), _)| *s == side && *p == prop)
                .map(|(_, v)| *v)
        }
    }

    fn fixture() -> Fixture {
        let mut f = Fixture::default();
        f.roots.insert("self", Value::Entity(EntityId(1)));
        f.roots.insert("side", Value::Side(SideId::One));
        f.roots.insert("count", Value::Number(3.0));
        f.links.insert((EntityId(1), "holder"), EntityId(2));
        f.props.insert((EntityId(1), "strength"), (4.0, 0.0, 10.0, 2.0));
        f.props.insert((EntityId(2), "morale"), (7.0, 0.0, 9.0, 7.0));
        f.side_props.insert((SideId::One, "influence"), 5.0);
        f
    }

    fn eval(source: &str) -> Result<Value, ExprError> {
        evaluate(&parse(source).unwrap(), &fixture())
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval("1 + 2 * 3").unwrap(), Value::Number(7.0));
        assert_eq!(eval("-(2 + 3) % 4").unwrap(), Value::Number(-1.0));
        assert_eq!(eval("clamp(15, 0, 10)").unwrap(), Value::Number(10.0));
        assert_eq!(eval("max(1, 4, 2)").unwrap(), Value::Number(4.0));
    }

    #[test]
    fn test_paths() {
        assert_eq!(eval("self.strength").unwrap(), Value::Number(4.0));
        assert_eq!(eval("self.strength.prev").unwrap(), Value::Number(2.0));
        assert_eq!(eval("self.holder.morale.max").unwrap(), Value::Number(9.0));
        assert_eq!(eval("side.influence").unwrap(), Value::Number(5.0));
        assert_eq!(eval("self.holder").unwrap(), Value::Entity(EntityId(2)));
    }

    #[test]
    fn test_missing_link_is_nil() {
        assert_eq!(eval("self.creator").unwrap(), Value::Nil);
        assert!(matches!(eval("self.creator.morale"), Err(ExprError::Unresolved(_))));
    }

    #[test]
    fn test_comparisons_and_logic() {
        assert_eq!(eval("count >= 3 and self.strength lt 5").unwrap(), Value::Bool(true));
        assert_eq!(eval("false && self.nothing > 1").unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_type_errors() {
        assert!(matches!(eval("true + 1"), Err(ExprError::Type { .. })));
        assert!(matches!(eval("1 / 0"), Err(ExprError::DivisionByZero)));
        assert!(matches!(eval("target.morale"), Err(ExprError::Unresolved(_))));
    }
}
