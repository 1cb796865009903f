//! Entity storage addressed by [`EntityId`].

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::entity::Entity;
use crate::core::{EntityId, Result, RulesError, SideId};
use crate::kinds::EntityKind;

/// Holder chains longer than this are treated as broken.
const MAX_CHAIN: usize = 64;

/// Every entity of one encounter, in creation order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Arena {
    entities: Vec<Entity>,
    keys: FxHashMap<String, EntityId>,
    /// Instances created per kind, for key generation.
    counters: FxHashMap<String, u32>,
}

impl Arena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an entity of `kind`.
    ///
    /// A missing key becomes `<kind-id>-<n>`.
    pub fn spawn(&mut self, kind: &EntityKind, side: SideId, key: Option<String>) -> Result<EntityId> {
        let key = match key.map(|k| k.trim().to_string()) {
            Some(key) if !key.is_empty() => {
                if self.keys.contains_key(&key) {
                    return Err(RulesError::DuplicateId { id: key });
                }
                key
            }
            _ => self.next_key(&kind.id),
        };
        let id = EntityId(self.entities.len() as u32);
        self.keys.insert(key.clone(), id);
        self.entities.push(Entity::new(id, kind, side, key));
        Ok(id)
    }

    fn next_key(&mut self, kind: &str) -> String {
        let counter = self.counters.entry(kind.to_string()).or_insert(0);
        loop {
            *counter += 1;
            let key = format!("{kind}-{counter}");
            if !self.keys.contains_key(&key) {
                return key;
            }
        }
    }

    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id.index())
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id.index())
    }

    /// Entity or an order error naming it.
    pub fn require(&self, id: EntityId) -> Result<&Entity> {
        self.get(id).ok_or_else(|| RulesError::order(format!("unknown entity {id}")))
    }

    #[must_use]
    pub fn by_key(&self, key: &str) -> Option<EntityId> {
        self.keys.get(key).copied()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entity> {
        self.entities.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Follow `holder` `depth` times.
    #[must_use]
    pub fn holder_of(&self, id: EntityId, depth: usize) -> Option<EntityId> {
        (0..depth).try_fold(id, |current, _| self.get(current)?.holder)
    }

    /// Root of the holder chain, `None` if `id` has no holder.
    #[must_use]
    pub fn ultimate_holder(&self, id: EntityId) -> Option<EntityId> {
        let mut current = self.get(id)?.holder?;
        for _ in 0..MAX_CHAIN {
            match self.get(current).and_then(|e| e.holder) {
                Some(next) => current = next,
                None => return Some(current),
            }
        }
        None
    }

    /// Entities whose immediate holder is `id`.
    pub fn held_by(&self, id: EntityId) -> impl Iterator<Item = &Entity> + '_ {
        self.entities.iter().filter(move |e| e.holder == Some(id))
    }
}

impl<'a> IntoIterator for &'a Arena {
    type Item = &'a Entity;
    type IntoIter = std::slice::Iter<'a, Entity>;

    fn into_iter(self) -> Self::IntoIter {
        self.entities.iter()
    }
}
