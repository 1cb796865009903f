//! Live encounter state.
//!
//! An encounter instantiates entity kinds from a [`Ruleset`](crate::kinds::Ruleset)
//! into an [`Arena`], gives their properties handles in a shared
//! [`PropertyGraph`](crate::properties::PropertyGraph), and resolves orders
//! turn by turn.
//!
//! ## Key Types
//!
//! - [`Arena`]: Entity storage with unique keys and holder chains
//! - [`Entity`]: An instance of an entity kind
//! - [`Side`]: A party's entities, research and secrets
//! - [`World`]: Read-only view used by conditions, costs and targeting
//! - [`Scope`]: A world plus variable bindings; evaluates expressions
//! - [`EncounterManager`]: Instantiation, orders and turn resolution
//! - [`TurnEvent`]: What happened during a turn

mod arena;
mod entity;
mod event;
mod manager;
mod side;
mod world;

pub use arena::Arena;
pub use entity::{Entity, EntityVariant, HasHolder};
pub use event::TurnEvent;
pub use manager::{EncounterManager, Order};
pub use side::Side;
pub use world::{Bindings, Scope, World};
