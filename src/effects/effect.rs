//! Effect definitions.
//!
//! An effect changes one bound of a named property on each of its targets.
//! `set` is applied first, then `mult`, then `add`; any subset may be
//! given. An effect with no property and no modifiers is a reference to an
//! effect kind of the same id (see [`EffectResolver`](super::EffectResolver)).

use serde::{Deserialize, Serialize};

use super::targeting::TargetSpec;
use crate::conditions::ExistsCondition;
use crate::core::{Result, RulesError};
use crate::encounter::Scope;
use crate::expr::{ExprError, Script};
use crate::kinds::{ClassSet, Classified};
use crate::properties::{Bound, ChangeOp, PropChange, PropId, Stacking};

/// A modifier amount: a constant or an expression.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Amount {
    Number(f64),
    Code(Script),
}

impl Amount {
    pub fn parse(text: &str) -> std::result::Result<Self, ExprError> {
        match text.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => Ok(Amount::Number(n)),
            _ => Ok(Amount::Code(Script::compile(text)?)),
        }
    }

    pub fn eval(&self, scope: &Scope<'_>) -> Result<f64> {
        match self {
            Amount::Number(n) => Ok(*n),
            Amount::Code(code) => Ok(code.eval_number(scope)?),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EffectSpec {
    pub id: Option<String>,
    pub classes: ClassSet,
    pub name: Option<String>,
    pub property: Option<String>,
    pub bound: Bound,
    pub add: Option<Amount>,
    pub mult: Option<Amount>,
    pub set: Option<Amount>,
    pub stacking: Stacking,
    /// Empty means the order's explicit target.
    pub targets: Vec<TargetSpec>,
    /// Checked per target.
    pub conds: Vec<ExistsCondition>,
}

impl EffectSpec {
    /// An effect on `property` of its targets.
    pub fn new(property: impl Into<String>) -> Self {
        Self {
            property: Some(property.into()),
            ..Self::default()
        }
    }

    /// A reference to the effect kind `id`.
    pub fn reference(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    /// Add a constant (builder pattern).
    #[must_use]
    pub fn adding(mut self, delta: f64) -> Self {
        self.add = Some(Amount::Number(delta));
        self
    }

    /// Multiply by a constant (builder pattern).
    #[must_use]
    pub fn multiplying(mut self, factor: f64) -> Self {
        self.mult = Some(Amount::Number(factor));
        self
    }

    /// Set to a constant (builder pattern).
    #[must_use]
    pub fn setting(mut self, value: f64) -> Self {
        self.set = Some(Amount::Number(value));
        self
    }

    /// Change another bound (builder pattern).
    #[must_use]
    pub fn on_bound(mut self, bound: Bound) -> Self {
        self.bound = bound;
        self
    }

    /// Add a target specification (builder pattern).
    #[must_use]
    pub fn targeting(mut self, spec: TargetSpec) -> Self {
        self.targets.push(spec);
        self
    }

    /// Add a per-target condition (builder pattern).
    #[must_use]
    pub fn with_cond(mut self, cond: ExistsCondition) -> Self {
        self.conds.push(cond);
        self
    }

    /// Whether this names an effect kind rather than changing anything.
    #[must_use]
    pub fn is_reference(&self) -> bool {
        self.property.is_none() && self.add.is_none() && self.mult.is_none() && self.set.is_none()
    }

    /// Changes to `prop` evaluated in `scope`.
    pub fn changes(&self, scope: &Scope<'_>, prop: PropId) -> Result<Vec<PropChange>> {
        let mut changes = Vec::with_capacity(3);
        let mut push = |op: ChangeOp| {
            changes.push(PropChange {
                prop,
                bound: self.bound,
                op,
            })
        };
        if let Some(set) = &self.set {
            push(ChangeOp::Set(set.eval(scope)?));
        }
        if let Some(mult) = &self.mult {
            push(ChangeOp::Mult(mult.eval(scope)?, self.stacking));
        }
        if let Some(add) = &self.add {
            push(ChangeOp::Add(add.eval(scope)?));
        }
        if changes.is_empty() {
            return Err(RulesError::validation(
                self.id.as_deref().unwrap_or("effect"),
                "effect has no add, mult or set",
            ));
        }
        Ok(changes)
    }
}

impl Classified for EffectSpec {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
    fn classes(&self) -> &ClassSet {
        &self.classes
    }
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}
