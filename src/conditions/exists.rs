//! Counting conditions over entities in scope.
//!
//! An exists-condition picks a scope (everything, or the entities held by
//! an anchor chosen by `rel`), narrows it by exactly one of kind id, entity
//! key, kind name, entity name or classes, drops entities carrying any
//! excluded class, and compares the resulting count with its governor.

use serde::{Deserialize, Serialize};

use crate::core::{EntityId, Result, RulesError};
use crate::encounter::{Bindings, Entity, Scope, World};
use crate::expr::{Script, Value};
use crate::kinds::{ClassSet, Classified};

/// Anchor whose held entities form the scope.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rel {
    /// The condition's own entity.
    Same,
    /// The entity being targeted.
    Target,
    Holder,
    Creator,
}

impl Rel {
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "same" | "self" => Some(Rel::Same),
            "target" => Some(Rel::Target),
            "holder" => Some(Rel::Holder),
            "creator" => Some(Rel::Creator),
            _ => None,
        }
    }
}

/// How a count is turned into pass or fail.
#[derive(Clone, Debug, PartialEq)]
pub enum Governor<'a> {
    Exactly(u32),
    Range { min: u32, max: u32 },
    Code(&'a Script),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExistsCondition {
    pub id: Option<String>,
    /// Identity classes of the rule itself.
    pub classes: ClassSet,
    pub rel: Option<Rel>,
    pub kind_id: Option<String>,
    pub entity_id: Option<String>,
    pub kind_name: Option<String>,
    pub entity_name: Option<String>,
    /// Entities must carry all of these.
    pub match_classes: Option<ClassSet>,
    /// Entities must carry none of these.
    pub excluded_classes: ClassSet,
    pub number: Option<u32>,
    pub min: Option<u32>,
    pub max: Option<u32>,
    /// Evaluated with `count` bound instead of a numeric comparison.
    pub value_code: Option<Script>,
}

impl ExistsCondition {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Narrow by kind id (builder pattern).
    #[must_use]
    pub fn of_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind_id = Some(kind.into());
        self
    }

    /// Narrow by classes (builder pattern).
    #[must_use]
    pub fn with_classes(mut self, classes: &str) -> Self {
        self.match_classes = Some(ClassSet::parse(classes));
        self
    }

    /// Exclude classes (builder pattern).
    #[must_use]
    pub fn excluding(mut self, classes: &str) -> Self {
        self.excluded_classes = ClassSet::parse(classes);
        self
    }

    /// Set the scope anchor (builder pattern).
    #[must_use]
    pub fn rel(mut self, rel: Rel) -> Self {
        self.rel = Some(rel);
        self
    }

    /// Require an exact count (builder pattern).
    #[must_use]
    pub fn exactly(mut self, number: u32) -> Self {
        self.number = Some(number);
        self
    }

    /// Require a count range (builder pattern).
    #[must_use]
    pub fn between(mut self, min: Option<u32>, max: Option<u32>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    /// Decide with an expression over `count` (builder pattern).
    #[must_use]
    pub fn with_code(mut self, code: Script) -> Self {
        self.value_code = Some(code);
        self
    }

    fn narrowing_count(&self) -> usize {
        [
            self.kind_id.is_some(),
            self.entity_id.is_some(),
            self.kind_name.is_some(),
            self.entity_name.is_some(),
            self.match_classes.is_some(),
        ]
        .into_iter()
        .filter(|&set| set)
        .count()
    }

    fn label(&self) -> &str {
        self.id.as_deref().unwrap_or("existsCondition")
    }

    /// Check the parameter combination.
    pub fn validate(&self) -> Result<()> {
        if self.narrowing_count() != 1 {
            return Err(RulesError::validation(
                self.label(),
                "exactly one of kindId, entityId, kindName, entityName and classes is required",
            ));
        }
        let governors = [
            self.number.is_some(),
            self.min.is_some() || self.max.is_some(),
            self.value_code.is_some(),
        ];
        if governors.into_iter().filter(|&set| set).count() > 1 {
            return Err(RulesError::validation(
                self.label(),
                "number, min/max and valueCode are mutually exclusive",
            ));
        }
        if let (Some(min), Some(max)) = (self.min, self.max) {
            if min > max {
                return Err(RulesError::validation(self.label(), "min exceeds max"));
            }
        }
        Ok(())
    }

    /// The governor in effect. Without one the condition tests existence.
    #[must_use]
    pub fn governor(&self) -> Governor<'_> {
        if let Some(number) = self.number {
            return Governor::Exactly(number);
        }
        if let Some(code) = &self.value_code {
            return Governor::Code(code);
        }
        match (self.min, self.max) {
            (None, None) => Governor::Range { min: 1, max: u32::MAX },
            (min, max) => Governor::Range {
                min: min.unwrap_or(0),
                max: max.unwrap_or(u32::MAX),
            },
        }
    }

    /// Whether `entity` survives narrowing.
    #[must_use]
    pub fn narrows_to(&self, world: &World<'_>, entity: &Entity) -> bool {
        if !entity.classes.is_disjoint(&self.excluded_classes) {
            return false;
        }
        if let Some(kind) = &self.kind_id {
            return entity.kind == *kind;
        }
        if let Some(key) = &self.entity_id {
            return entity.key == *key;
        }
        if let Some(name) = &self.kind_name {
            return world.kind_of(entity).is_some_and(|k| k.display_name() == name);
        }
        if let Some(name) = &self.entity_name {
            return entity.name == *name;
        }
        if let Some(classes) = &self.match_classes {
            return classes.is_subset(&entity.classes);
        }
        false
    }

    fn anchor(&self, world: &World<'_>, bindings: &Bindings) -> Option<Option<EntityId>> {
        let rel = self.rel?;
        let subject = bindings.subject.and_then(|s| world.arena.get(s));
        Some(match rel {
            Rel::Same => bindings.subject,
            Rel::Target => bindings.target.or_else(|| subject.and_then(|s| s.target)),
            Rel::Holder => subject.and_then(|s| s.holder),
            Rel::Creator => subject.and_then(|s| s.creator),
        })
    }

    /// Entities in scope that survive narrowing, in arena order.
    #[must_use]
    pub fn matching(&self, world: &World<'_>, bindings: &Bindings) -> Vec<EntityId> {
        let anchor = self.anchor(world, bindings);
        world
            .arena
            .iter()
            .filter(|e| match anchor {
                None => true,
                Some(Some(anchor)) => e.holder == Some(anchor),
                Some(None) => false,
            })
            .filter(|e| self.narrows_to(world, e))
            .map(|e| e.id)
            .collect()
    }

    /// Evaluate the condition.
    pub fn check(&self, world: &World<'_>, bindings: &Bindings) -> Result<bool> {
        let count = self.matching(world, bindings).len() as u32;
        match self.governor() {
            Governor::Exactly(number) => Ok(count == number),
            Governor::Range { min, max } => Ok((min..=max).contains(&count)),
            Governor::Code(code) => {
                let scope = Scope::new(*world, bindings.with_count(f64::from(count)));
                match code.eval(&scope)? {
                    Value::Bool(pass) => Ok(pass),
                    Value::Number(n) => Ok(n != 0.0),
                    other => Err(RulesError::InvalidType {
                        expected: "boolean".to_string(),
                        found: format!("{other:?}"),
                    }),
                }
            }
        }
    }
}

impl Classified for ExistsCondition {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
    fn classes(&self) -> &ClassSet {
        &self.classes
    }
}

/// Whether every condition holds.
pub fn all_hold(conds: &[ExistsCondition], world: &World<'_>, bindings: &Bindings) -> Result<bool> {
    for cond in conds {
        if !cond.check(world, bindings)? {
            return Ok(false);
        }
    }
    Ok(true)
}
