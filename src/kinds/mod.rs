//! Entity kinds, class tags and classification containers.
//!
//! ## Key Types
//!
//! - `EntityKind`: template defined by rules, instantiated by encounters
//! - `Category`: which partition and entity variant a kind belongs to
//! - `ClassSet`: sorted set of class tags
//! - `ClassList` / `ClassMap`: ordered and id-indexed containers with merge
//! - `Ruleset`: every loaded kind, template, research rule and visibility rule

pub mod classes;
pub mod container;
pub mod kind;
pub mod ruleset;

pub use classes::ClassSet;
pub use container::{ClassList, ClassMap, Classified};
pub use kind::{is_numeric_id, is_valid_kind_id, BoosterScope, Category, EntityKind, TraitRef};
pub use ruleset::{ResearchRule, Ruleset};
