//! Effects and targeting.
//!
//! ## Key Types
//!
//! - `EffectSpec`: A change to one bound of a named property on each target
//! - `TargetSpec`: How an effect, action or condition selects entities
//! - `EffectResolver`: Expands effect-kind references and evaluates effects
//!
//! Resolution is read-only; the encounter manager applies the resulting
//! [`PropChange`](crate::properties::PropChange)s and propagates them.

mod effect;
mod resolver;
mod targeting;

pub use effect::{Amount, EffectSpec};
pub use resolver::{Applied, EffectResolver};
pub use targeting::{SideFilter, TargetSpec, TargetType};
