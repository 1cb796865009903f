//! Entity identification system.
//!
//! Every instantiated game object (argument, action, booster, character,
//! trait, the encounter itself) lives in an arena owned by the encounter and
//! is addressed by a stable `EntityId`. Links between entities (holder,
//! creator, target) are stored as ids and resolved through the arena.
//!
//! ## Usage
//!
//! ```
//! use rust_parley::core::EntityId;
//!
//! let first = EntityId::new(0);
//! let next = first.next();
//!
//! assert_eq!(next.raw(), 1);
//! assert_eq!(format!("{}", next), "Entity(1)");
//! ```

use serde::{Deserialize, Serialize};

/// Arena handle for any encounter entity.
///
/// Ids are allocated sequentially by the arena and never reused within an
/// encounter, so iteration in id order is creation order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl EntityId {
    /// Create an entity id from a raw value.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// The id allocated after this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Get the raw id value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Index into arena storage.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for EntityId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_is_sequential() {
        let id = EntityId::new(7);
        assert_eq!(id.next(), EntityId(8));
        assert_eq!(id.next().index(), 8);
    }

    #[test]
    fn test_ordering_follows_allocation() {
        let mut ids = vec![EntityId(3), EntityId(1), EntityId(2)];
        ids.sort();
        assert_eq!(ids, vec![EntityId(1), EntityId(2), EntityId(3)]);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", EntityId(42)), "Entity(42)");
    }

    #[test]
    fn test_serialization() {
        let id = EntityId(123);
        let json = serde_json::to_string(&id).unwrap();
        let deserialized: EntityId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, deserialized);
    }
}
