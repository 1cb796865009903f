//! Costs paid when an action is ordered.

use serde::{Deserialize, Serialize};

use super::exists::{all_hold, ExistsCondition};
use crate::core::{Result, RulesError};
use crate::encounter::{Bindings, Scope, World};
use crate::expr::{ExprError, Script, Value};
use crate::kinds::{ClassSet, Classified};
use crate::properties::{PropChange, PropId};

/// What a cost does to its property.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum CostValue {
    /// Final value (`true` = 1, `false` = 0).
    Bool(bool),
    /// Delta.
    Number(f64),
    /// Numeric result is a delta, boolean result a final value.
    Code(Script),
}

impl Default for CostValue {
    fn default() -> Self {
        CostValue::Number(0.0)
    }
}

impl CostValue {
    pub fn parse(text: &str) -> std::result::Result<Self, ExprError> {
        let text = text.trim();
        Ok(match text {
            "true" => CostValue::Bool(true),
            "false" => CostValue::Bool(false),
            _ => match text.parse::<f64>() {
                Ok(n) if n.is_finite() => CostValue::Number(n),
                _ => CostValue::Code(Script::compile(text)?),
            },
        })
    }
}

/// Whose property pays.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum CostTarget {
    /// The ordering character.
    #[default]
    Agent,
    /// The ordering character's side.
    Side,
    /// The order's explicit target.
    Object,
    /// Expression yielding an entity or a side.
    Code(Script),
}

impl CostTarget {
    pub fn parse(text: &str) -> std::result::Result<Self, ExprError> {
        Ok(match text.trim() {
            "agent" => CostTarget::Agent,
            "side" => CostTarget::Side,
            "object" => CostTarget::Object,
            other => CostTarget::Code(Script::compile(other)?),
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Cost {
    pub id: Option<String>,
    pub classes: ClassSet,
    pub name: Option<String>,
    pub property: Option<String>,
    pub value: CostValue,
    pub target: CostTarget,
    /// Checked against putative values; empty means `value >= 0`.
    pub conds: Vec<ExistsCondition>,
}

impl Cost {
    /// A delta on a property of the agent.
    pub fn new(property: impl Into<String>, delta: f64) -> Self {
        Self {
            property: Some(property.into()),
            value: CostValue::Number(delta),
            ..Self::default()
        }
    }

    /// Set who pays (builder pattern).
    #[must_use]
    pub fn paid_by(mut self, target: CostTarget) -> Self {
        self.target = target;
        self
    }

    /// Add a payability condition (builder pattern).
    #[must_use]
    pub fn with_cond(mut self, cond: ExistsCondition) -> Self {
        self.conds.push(cond);
        self
    }

    /// Property that pays.
    pub fn payer(&self, world: &World<'_>, bindings: &Bindings) -> Result<PropId> {
        let prop = self
            .property
            .as_deref()
            .ok_or_else(|| RulesError::validation(self.id.as_deref().unwrap_or("cost"), "cost has no property"))?;
        let missing = |owner: &str| RulesError::order(format!("{owner} has no property `{prop}`"));

        let agent = bindings.agent.ok_or_else(|| RulesError::order("cost without an agent"))?;
        let found = match &self.target {
            CostTarget::Agent => world.entity_prop(agent, prop),
            CostTarget::Side => {
                let side = world.arena.require(agent)?.side;
                world.side_prop(side, prop)
            }
            CostTarget::Object => {
                let object = bindings.object.ok_or_else(|| missing("the order target"))?;
                world.entity_prop(object, prop)
            }
            CostTarget::Code(code) => match code.eval(&Scope::new(*world, *bindings))? {
                Value::Entity(entity) => world.entity_prop(entity, prop),
                Value::Side(side) => world.side_prop(side, prop),
                other => {
                    return Err(RulesError::InvalidType {
                        expected: "entity or side".to_string(),
                        found: format!("{other:?}"),
                    })
                }
            },
        };
        found.ok_or_else(|| missing(code_label(&self.target)))
    }

    /// Change this cost makes to `prop`.
    pub fn change(&self, world: &World<'_>, bindings: &Bindings, prop: PropId) -> Result<PropChange> {
        let set = |b: bool| PropChange::set(prop, if b { 1.0 } else { 0.0 });
        Ok(match &self.value {
            CostValue::Bool(b) => set(*b),
            CostValue::Number(delta) => PropChange::add(prop, *delta),
            CostValue::Code(code) => match code.eval(&Scope::new(*world, *bindings))? {
                Value::Number(delta) => PropChange::add(prop, delta),
                Value::Bool(b) => set(b),
                other => {
                    return Err(RulesError::InvalidType {
                        expected: "number or boolean".to_string(),
                        found: format!("{other:?}"),
                    })
                }
            },
        })
    }

    /// Whether the putative value of `prop` is acceptable.
    ///
    /// The default check reads the value before clamping, so an overdraw is
    /// refused even when `min` would have absorbed it.
    pub fn is_met(&self, world: &World<'_>, bindings: &Bindings, prop: PropId) -> Result<bool> {
        let Some(putative) = world.graph.putative(prop) else {
            return Ok(false);
        };
        if self.conds.is_empty() {
            return Ok(putative.raw >= 0.0);
        }
        all_hold(&self.conds, &world.putative(), &bindings.with_value(putative.val))
    }
}

fn code_label(target: &CostTarget) -> &'static str {
    match target {
        CostTarget::Agent => "the agent",
        CostTarget::Side => "the agent's side",
        CostTarget::Object => "the order target",
        CostTarget::Code(_) => "the cost target",
    }
}

impl Classified for Cost {
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
