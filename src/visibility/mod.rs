//! Fog of war: which side sees what about which entity.
//!
//! ## Key Types
//!
//! - `VisibilityRule`: flags and per-property overrides for one category
//! - `VisibilityRules`: the rule-set-wide rule lists, never empty
//! - `VisibilityEngine`: read-only resolution for an observer and a subject
//!
//! Rules nested in a kind live on the kind itself (`EntityKind::vis`) and
//! take precedence over every top-level rule.

pub mod engine;
pub mod rule;
pub mod rules;

pub use engine::{FlagState, ObserverView, Subject, Visibility, VisibilityEngine};
pub use rule::{PropVisRule, VisCategory, VisFlag, VisFlags, VisibilityRule};
pub use rules::VisibilityRules;
