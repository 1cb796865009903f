//! Property resolution.
//!
//! ## Key Types
//!
//! - `PropertyTemplate`: what a kind declares (`base`, `coeff`, sources per
//!   bound)
//! - `Property`: live state with cached values and dependency edges
//! - `PropertyGraph`: arena of properties, propagation and putative passes
//!
//! ## Bound Order
//!
//! `val` is always computed last so it can be clamped into the fresh
//! `[min, max]` window. `min` comes before `max` only when `max` is based on
//! `min`; a property whose `min` and `max` are based on each other is
//! rejected as a cycle.

pub mod graph;
pub mod property;

pub use graph::{ChangeOp, PropChange, PropertyGraph};
pub use property::{
    bound_order, Base, Bound, BoundState, BoundTemplate, PropId, PropOwner, Property, PropertyTemplate, Snapshot,
    SourceAnchor, SourceRef, Stacking,
};
