//! # rust-parley
//!
//! A data-driven rules engine for turn-based social encounters: two parties
//! trade actions, arguments and boosters to shift each other's properties.
//!
//! ## Design Principles
//!
//! 1. **Rules Are Data**: Every entity kind, cost, condition, effect and
//!    visibility rule comes from XML rule sets. Later rule sets patch earlier
//!    ones with replace, alter and delete semantics.
//!
//! 2. **Derived Figures Propagate**: Properties carry `val`, `min` and `max`
//!    bounds that may read other properties. One change recomputes exactly
//!    the affected properties, in dependency order.
//!
//! 3. **Transactional Turns**: Costs are simulated before they are paid, and
//!    a failed order leaves the encounter untouched.
//!
//! ## Modules
//!
//! - `core`: Ids, sides, configuration, errors, diagnostics, RNG
//! - `expr`: Restricted expressions embedded in rule markup
//! - `kinds`: Entity kinds, class tags and the ruleset
//! - `rules`: Markup loader and merge engine
//! - `properties`: Property templates and the dependency graph
//! - `visibility`: What each side may observe
//! - `effects`: Targeting and effect resolution
//! - `conditions`: Exists-conditions and costs
//! - `encounter`: Entity arena, world view and the encounter manager

pub mod conditions;
pub mod core;
pub mod effects;
pub mod encounter;
pub mod expr;
pub mod kinds;
pub mod properties;
pub mod rules;
pub mod visibility;

// Re-export commonly used types
pub use crate::core::{
    Diagnostics, EncounterConfig, EncounterRng, EntityId, LoaderOptions, ParseError, ParseErrorKind, Result,
    RulesError, SideConfig, SideId, SideMap, SidePropConfig, Warning, WarningKind,
};

pub use crate::kinds::{Category, ClassSet, EntityKind, Ruleset};

pub use crate::rules::{MergeMode, ParseReport, RuleLoader, RuleSource};

pub use crate::properties::{Bound, PropId, PropertyGraph, PropertyTemplate};

pub use crate::visibility::{Visibility, VisibilityEngine};

pub use crate::effects::{EffectResolver, EffectSpec, TargetSpec, TargetType};

pub use crate::conditions::{Cost, ExistsCondition};

pub use crate::encounter::{Arena, EncounterManager, Entity, Order, TurnEvent};
