//! Costs and exists-conditions.
//!
//! ## Key Types
//!
//! - `ExistsCondition`: Counts entities in a scope and compares the count
//! - `Cost`: A property change an order must be able to afford
//!
//! Both are evaluated against a read-only [`World`](crate::encounter::World).
//! Cost checks read putative values produced by
//! [`PropertyGraph::simulate`](crate::properties::PropertyGraph::simulate).

pub mod cost;
pub mod exists;

pub use cost::{Cost, CostTarget, CostValue};
pub use exists::{all_hold, ExistsCondition, Governor, Rel};
