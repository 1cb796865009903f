//! Turn event feed consumed by presentation layers.

use serde::{Deserialize, Serialize};

use crate::core::{EntityId, SideId};
use crate::properties::PropOwner;

/// Something that happened during a turn.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TurnEvent {
    TurnStarted {
        turn: u32,
    },
    /// An order could not be carried out; nothing it would have changed was.
    OrderRejected {
        character: EntityId,
        action: EntityId,
        reason: String,
    },
    CostPaid {
        action: EntityId,
        property: String,
        owner: PropOwner,
        value: f64,
    },
    EffectApplied {
        source: EntityId,
        target: EntityId,
        property: String,
        value: f64,
    },
    ActionResolved {
        character: EntityId,
        action: EntityId,
        targets: Vec<EntityId>,
    },
    /// An observer gained sight of an entity, or of one of its properties.
    Revealed {
        observer: SideId,
        entity: EntityId,
        property: Option<String>,
    },
    /// An observer's recorded value of a property changed.
    KnowledgeRefreshed {
        observer: SideId,
        entity: EntityId,
        property: String,
        value: f64,
    },
    TurnEnded {
        turn: u32,
    },
}

impl TurnEvent {
    /// Whether this event opens or closes a turn.
    #[must_use]
    pub fn is_boundary(&self) -> bool {
        matches!(self, TurnEvent::TurnStarted { .. } | TurnEvent::TurnEnded { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_serialize() {
        let event = TurnEvent::EffectApplied {
            source: EntityId(1),
            target: EntityId(2),
            property: "wit".to_string(),
            value: 3.0,
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: TurnEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, back);
        assert!(!event.is_boundary());
        assert!(TurnEvent::TurnEnded { turn: 1 }.is_boundary());
    }
}
