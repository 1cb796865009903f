//! Read-only view of encounter state for rule evaluation.
//!
//! Conditions, costs, effects and targeting never touch the encounter
//! manager directly. They read a [`World`] and evaluate expressions through
//! a [`Scope`], which binds the expression roots for one evaluation.

use super::arena::Arena;
use super::entity::Entity;
use super::side::Side;
use crate::core::{EntityId, SideId, SideMap};
use crate::expr::{ExprContext, PropField, Value};
use crate::kinds::{EntityKind, Ruleset};
use crate::properties::{PropId, PropertyGraph};

/// Borrowed encounter state.
#[derive(Clone, Copy, Debug)]
pub struct World<'a> {
    pub rules: &'a Ruleset,
    pub arena: &'a Arena,
    pub graph: &'a PropertyGraph,
    pub sides: &'a SideMap<Side>,
    pub encounter: Option<EntityId>,
    /// Read `temp` snapshots instead of committed values.
    pub putative: bool,
}

impl<'a> World<'a> {
    #[must_use]
    pub fn new(rules: &'a Ruleset, arena: &'a Arena, graph: &'a PropertyGraph, sides: &'a SideMap<Side>) -> Self {
        Self {
            rules,
            arena,
            graph,
            sides,
            encounter: None,
            putative: false,
        }
    }

    /// Set the encounter entity (builder pattern).
    #[must_use]
    pub fn with_encounter(mut self, encounter: Option<EntityId>) -> Self {
        self.encounter = encounter;
        self
    }

    /// Read putative values (builder pattern).
    #[must_use]
    pub fn putative(mut self) -> Self {
        self.putative = true;
        self
    }

    fn read(&self, prop: PropId, field: PropField) -> Option<f64> {
        let property = self.graph.get(prop)?;
        let current = if self.putative {
            property.putative()
        } else {
            property.snapshot()
        };
        Some(match field {
            PropField::Val => current.val,
            PropField::Min => current.min,
            PropField::Max => current.max,
            PropField::Prev => property.prev.val,
        })
    }

    /// Property `prop` of `entity`.
    #[must_use]
    pub fn entity_prop(&self, entity: EntityId, prop: &str) -> Option<PropId> {
        self.arena.get(entity)?.prop(prop)
    }

    /// Kind of `entity`.
    #[must_use]
    pub fn kind_of(&self, entity: &Entity) -> Option<&'a EntityKind> {
        self.rules.kind(&entity.kind)
    }

    /// Side property `prop`.
    #[must_use]
    pub fn side_prop(&self, side: SideId, prop: &str) -> Option<PropId> {
        self.sides[side].prop(prop)
    }
}

/// Root bindings of one evaluation.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Bindings {
    /// The entity a rule belongs to.
    pub subject: Option<EntityId>,
    /// The character carrying out an order.
    pub agent: Option<EntityId>,
    /// The entity currently being affected.
    pub target: Option<EntityId>,
    /// The order's explicit target.
    pub object: Option<EntityId>,
    pub count: Option<f64>,
    pub value: Option<f64>,
}

impl Bindings {
    #[must_use]
    pub fn for_subject(subject: EntityId) -> Self {
        Self {
            subject: Some(subject),
            ..Self::default()
        }
    }

    /// Bind `target` (builder pattern).
    #[must_use]
    pub fn with_target(mut self, target: Option<EntityId>) -> Self {
        self.target = target;
        self
    }

    /// Bind `agent` (builder pattern).
    #[must_use]
    pub fn with_agent(mut self, agent: Option<EntityId>) -> Self {
        self.agent = agent;
        self
    }

    /// Bind `object` (builder pattern).
    #[must_use]
    pub fn with_object(mut self, object: Option<EntityId>) -> Self {
        self.object = object;
        self
    }

    /// Bind `count` (builder pattern).
    #[must_use]
    pub fn with_count(mut self, count: f64) -> Self {
        self.count = Some(count);
        self
    }

    /// Bind `value` (builder pattern).
    #[must_use]
    pub fn with_value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }
}

/// A [`World`] with bound roots, evaluable by expressions.
#[derive(Clone, Copy, Debug)]
pub struct Scope<'a> {
    pub world: World<'a>,
    pub bindings: Bindings,
}

impl<'a> Scope<'a> {
    #[must_use]
    pub fn new(world: World<'a>, bindings: Bindings) -> Self {
        Self { world, bindings }
    }

    fn subject_side(&self) -> Option<SideId> {
        let subject = self.bindings.subject?;
        Some(self.world.arena.get(subject)?.side)
    }
}

impl ExprContext for Scope<'_> {
    fn root(&self, name: &str) -> Option<Value> {
        let entity = |id: Option<EntityId>| Some(id.map_or(Value::Nil, Value::Entity));
        let link = |f: fn(&Entity) -> Option<EntityId>| {
            let subject = self.bindings.subject.and_then(|s| self.world.arena.get(s));
            Some(subject.and_then(f).map_or(Value::Nil, Value::Entity))
        };
        match name {
            "self" => entity(self.bindings.subject),
            "agent" => entity(self.bindings.agent),
            "target" => entity(self.bindings.target),
            "object" => entity(self.bindings.object),
            "holder" => link(|e| e.holder),
            "creator" => link(|e| e.creator),
            "encounter" => entity(self.world.encounter),
            "side" => Some(self.subject_side().map_or(Value::Nil, Value::Side)),
            "opponent" => Some(
                self.subject_side()
                    .and_then(SideId::opponent)
                    .map_or(Value::Nil, Value::Side),
            ),
            "count" => self.bindings.count.map(Value::Number),
            "value" => self.bindings.value.map(Value::Number),
            _ => None,
        }
    }

    fn link(&self, entity: EntityId, link: &str) -> Option<EntityId> {
        let entity = self.world.arena.get(entity)?;
        match link {
            "holder" => entity.holder,
            "creator" => entity.creator,
            "target" => entity.target,
            _ => None,
        }
    }

    fn entity_property(&self, entity: EntityId, prop: &str, field: PropField) -> Option<f64> {
        let id = self.world.entity_prop(entity, prop)?;
        self.world.read(id, field)
    }

    fn side_property(&self, side: SideId, prop: &str, field: PropField) -> Option<f64> {
        let id = self.world.side_prop(side, prop)?;
        self.world.read(id, field)
    }
}
