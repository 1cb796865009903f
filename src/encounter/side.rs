//! Per-side holdings and knowledge.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::core::{EntityId, SideId};
use crate::kinds::{BoosterScope, Category};
use crate::properties::PropId;
use crate::visibility::ObserverView;

/// One party of an encounter (or the neutral faction).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Side {
    pub id: SideId,
    pub actions: Vec<EntityId>,
    pub args: Vec<EntityId>,
    pub chars: Vec<EntityId>,
    /// Boosters with global scope.
    pub g_boosters: Vec<EntityId>,
    pub arg_boosters: Vec<EntityId>,
    pub friendly_boosters: Vec<EntityId>,
    pub adverse_boosters: Vec<EntityId>,
    pub props: FxHashMap<String, PropId>,
    pub researched_actions: Vec<String>,
    pub researched_args: Vec<String>,
    pub researched_boosters: Vec<String>,
    pub researched_chars: Vec<String>,
    pub researched_traits: Vec<String>,
    /// Kind ids and entity keys revealed to this side.
    pub secrets_found: Vec<String>,
}

impl Side {
    #[must_use]
    pub fn new(id: SideId) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    /// Every booster, partitions concatenated.
    pub fn boosters(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.g_boosters
            .iter()
            .chain(&self.arg_boosters)
            .chain(&self.friendly_boosters)
            .chain(&self.adverse_boosters)
            .copied()
    }

    /// File `id` under the booster partition for `scope`.
    pub fn add_booster(&mut self, id: EntityId, scope: BoosterScope) {
        match scope {
            BoosterScope::Global => self.g_boosters.push(id),
            BoosterScope::Argument => self.arg_boosters.push(id),
            BoosterScope::Friendly => self.friendly_boosters.push(id),
            BoosterScope::Adverse => self.adverse_boosters.push(id),
        }
    }

    /// Record a researched kind. Returns `false` for categories that
    /// cannot be researched.
    pub fn research(&mut self, category: Category, kind_id: &str) -> bool {
        let list = match category {
            Category::Action => &mut self.researched_actions,
            Category::Argument => &mut self.researched_args,
            Category::Booster => &mut self.researched_boosters,
            Category::Character => &mut self.researched_chars,
            Category::Trait => &mut self.researched_traits,
            Category::Effect | Category::Encounter => return false,
        };
        if !list.iter().any(|k| k == kind_id) {
            list.push(kind_id.to_string());
        }
        true
    }

    pub fn add_secret(&mut self, id: impl Into<String>) {
        let id = id.into();
        if !self.secrets_found.contains(&id) {
            self.secrets_found.push(id);
        }
    }

    #[must_use]
    pub fn prop(&self, id: &str) -> Option<PropId> {
        self.props.get(id).copied()
    }
}

impl ObserverView for Side {
    fn side(&self) -> SideId {
        self.id
    }

    fn has_researched(&self, kind_id: &str) -> bool {
        [
            &self.researched_actions,
            &self.researched_args,
            &self.researched_boosters,
            &self.researched_chars,
            &self.researched_traits,
        ]
        .iter()
        .any(|list| list.iter().any(|k| k == kind_id))
    }

    fn knows_secret(&self, id: &str) -> bool {
        self.secrets_found.iter().any(|s| s == id)
    }
}
