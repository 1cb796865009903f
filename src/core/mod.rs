//! Core engine types: entity ids, sides, RNG, configuration, errors and
//! diagnostics.
//!
//! Nothing in this module knows about rules or encounters; every other module
//! builds on it.

pub mod config;
pub mod diagnostics;
pub mod entity;
pub mod error;
pub mod rng;
pub mod side;

pub use config::{EncounterConfig, LoaderOptions, SideConfig, SidePropConfig};
pub use diagnostics::{Diagnostics, Warning, WarningKind};
pub use entity::EntityId;
pub use error::{ParseError, ParseErrorKind, Result, RulesError};
pub use rng::EncounterRng;
pub use side::{SideId, SideMap};
