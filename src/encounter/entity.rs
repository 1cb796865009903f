//! Live entities of an encounter.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::core::{EntityId, SideId};
use crate::kinds::{BoosterScope, Category, ClassSet, Classified, EntityKind};
use crate::properties::PropId;

/// State specific to an entity's category.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum EntityVariant {
    Action {
        /// Remaining uses; `None` for unlimited.
        uses_left: Option<u32>,
    },
    Argument,
    Booster {
        scope: BoosterScope,
    },
    Character {
        /// Action entities this character can order.
        actions: Vec<EntityId>,
    },
    Trait,
    Encounter,
    /// An instantiated effect kind.
    Item,
}

impl EntityVariant {
    /// Initial variant state for an instance of `kind`.
    #[must_use]
    pub fn for_kind(kind: &EntityKind) -> Self {
        match kind.category {
            Category::Action => EntityVariant::Action { uses_left: kind.uses },
            Category::Argument => EntityVariant::Argument,
            Category::Booster => EntityVariant::Booster { scope: kind.scope },
            Category::Character => EntityVariant::Character { actions: Vec::new() },
            Category::Trait => EntityVariant::Trait,
            Category::Encounter => EntityVariant::Encounter,
            Category::Effect => EntityVariant::Item,
        }
    }
}

/// Entities that can be held by or created by another entity.
pub trait HasHolder {
    fn holder(&self) -> Option<EntityId>;
    fn creator(&self) -> Option<EntityId>;

    /// Whether `other` is the immediate holder.
    fn is_held_by(&self, other: EntityId) -> bool {
        self.holder() == Some(other)
    }
}

/// An instance of an [`EntityKind`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    /// Kind id.
    pub kind: String,
    pub category: Category,
    pub name: String,
    pub side: SideId,
    /// Unique key within the encounter.
    pub key: String,
    /// Own classes merged with the kind's.
    pub classes: ClassSet,
    /// Property id to graph handle.
    pub props: FxHashMap<String, PropId>,
    pub holder: Option<EntityId>,
    pub creator: Option<EntityId>,
    pub target: Option<EntityId>,
    pub finished: bool,
    pub active: bool,
    pub alive: bool,
    pub variant: EntityVariant,
}

impl Entity {
    /// Instantiate `kind`. Properties are attached by the encounter.
    pub fn new(id: EntityId, kind: &EntityKind, side: SideId, key: impl Into<String>) -> Self {
        Self {
            id,
            kind: kind.id.clone(),
            category: kind.category,
            name: kind.display_name().to_string(),
            side,
            key: key.into(),
            classes: kind.classes.clone(),
            props: FxHashMap::default(),
            holder: None,
            creator: None,
            target: None,
            finished: false,
            active: true,
            alive: true,
            variant: EntityVariant::for_kind(kind),
        }
    }

    /// Add own classes on top of the kind's (builder pattern).
    #[must_use]
    pub fn with_classes(mut self, classes: &ClassSet) -> Self {
        self.classes.extend_from(classes);
        self
    }

    /// Set the holder (builder pattern).
    #[must_use]
    pub fn held_by(mut self, holder: EntityId) -> Self {
        self.holder = Some(holder);
        self
    }

    /// Set the creator (builder pattern).
    #[must_use]
    pub fn created_by(mut self, creator: EntityId) -> Self {
        self.creator = Some(creator);
        self
    }

    #[must_use]
    pub fn prop(&self, id: &str) -> Option<PropId> {
        self.props.get(id).copied()
    }

    /// Booster partition, for boosters.
    #[must_use]
    pub fn booster_scope(&self) -> Option<BoosterScope> {
        match &self.variant {
            EntityVariant::Booster { scope } => Some(*scope),
            _ => None,
        }
    }

    /// Action entities a character holds.
    #[must_use]
    pub fn actions(&self) -> &[EntityId] {
        match &self.variant {
            EntityVariant::Character { actions } => actions,
            _ => &[],
        }
    }
}

impl HasHolder for Entity {
    fn holder(&self) -> Option<EntityId> {
        self.holder
    }
    fn creator(&self) -> Option<EntityId> {
        self.creator
    }
}

impl Classified for Entity {
    fn id(&self) -> Option<&str> {
        Some(&self.key)
    }
    fn classes(&self) -> &ClassSet {
        &self.classes
    }
    fn name(&self) -> Option<&str> {
        Some(&self.name)
    }
    fn category(&self) -> Option<Category> {
        Some(self.category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_takes_kind_data() {
        let kind = EntityKind::new("bribe", Category::Action).with_classes("shady");
        let mut kind = kind.with_name("Bribe");
        kind.uses = Some(2);

        let entity = Entity::new(EntityId(3), &kind, SideId::One, "bribe-1");
        assert_eq!(entity.kind, "bribe");
        assert_eq!(entity.name, "Bribe");
        assert!(entity.classes.contains("shady"));
        assert_eq!(entity.variant, EntityVariant::Action { uses_left: Some(2) });
        assert!(entity.alive && entity.active && !entity.finished);
    }

    #[test]
    fn test_classes_are_a_superset_of_kind_classes() {
        let kind = EntityKind::new("envoy", Category::Character).with_classes("noble");
        let entity = Entity::new(EntityId(0), &kind, SideId::Two, "envoy-1").with_classes(&ClassSet::parse("tired"));

        assert!(kind.classes.is_subset(&entity.classes));
        assert!(entity.classes.contains("tired"));
    }

    #[test]
    fn test_links() {
        let kind = EntityKind::new("rumor", Category::Booster);
        let entity = Entity::new(EntityId(5), &kind, SideId::One, "rumor-1")
            .held_by(EntityId(2))
            .created_by(EntityId(1));

        assert!(entity.is_held_by(EntityId(2)));
        assert_eq!(HasHolder::creator(&entity), Some(EntityId(1)));
        assert_eq!(entity.booster_scope(), Some(BoosterScope::Global));
    }
}
