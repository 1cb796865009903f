//! Classification containers.
//!
//! - `ClassList<T>`: insertion-ordered, linear lookup. Used for every rule
//!   partition because merge order is significant.
//! - `ClassMap<T>`: id-indexed with O(1) lookup, iteration still in
//!   insertion order. Used for templates, which are only ever looked up by id.
//!
//! Both can be restricted to one [`Category`]; adding an item of another
//! category fails with `InvalidType`.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::{Category, ClassSet};
use crate::core::{Result, RulesError};
use crate::rules::merge::{merge_rule, MergeMode, MergeOutcome, RuleIdentity};

/// Anything that carries an id and class tags.
pub trait Classified {
    /// The item's id, if it has one.
    fn id(&self) -> Option<&str>;

    /// The item's class tags.
    fn classes(&self) -> &ClassSet;

    /// Display name, if distinct from the id.
    fn name(&self) -> Option<&str> {
        None
    }

    /// Category, for items that have one.
    fn category(&self) -> Option<Category> {
        None
    }
}

fn check_category<T: Classified>(restriction: Option<Category>, item: &T) -> Result<()> {
    match (restriction, item.category()) {
        (Some(expected), Some(found)) if expected != found => Err(RulesError::InvalidType {
            expected: expected.to_string(),
            found: found.to_string(),
        }),
        (Some(expected), None) => Err(RulesError::InvalidType {
            expected: expected.to_string(),
            found: "uncategorised item".to_string(),
        }),
        _ => Ok(()),
    }
}

/// Insertion-ordered collection of classified items.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassList<T> {
    items: Vec<T>,
    category: Option<Category>,
}

impl<T> Default for ClassList<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            category: None,
        }
    }
}

impl<T: Classified> ClassList<T> {
    /// Create an unrestricted list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a list that only accepts items of `category`.
    #[must_use]
    pub fn restricted(category: Category) -> Self {
        Self {
            items: Vec::new(),
            category: Some(category),
        }
    }

    /// Category restriction, if any.
    #[must_use]
    pub fn category(&self) -> Option<Category> {
        self.category
    }

    /// Append an item.
    ///
    /// Fails with `DuplicateId` if an item with the same id exists, or
    /// `InvalidType` if the item's category does not fit.
    pub fn add(&mut self, item: T) -> Result<()> {
        check_category(self.category, &item)?;
        if let Some(id) = item.id() {
            if self.get_by_id(id).is_some() {
                return Err(RulesError::DuplicateId { id: id.to_string() });
            }
        }
        self.items.push(item);
        Ok(())
    }

    /// Remove the item with `id`. Returns it if present.
    pub fn remove(&mut self, id: &str) -> Option<T> {
        let pos = self.items.iter().position(|i| i.id() == Some(id))?;
        Some(self.items.remove(pos))
    }

    #[must_use]
    pub fn get_by_id(&self, id: &str) -> Option<&T> {
        self.items.iter().find(|i| i.id() == Some(id))
    }

    pub fn get_by_id_mut(&mut self, id: &str) -> Option<&mut T> {
        self.items.iter_mut().find(|i| i.id() == Some(id))
    }

    /// All items whose name (or id, when unnamed) equals `name`.
    pub fn get_by_name<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a T> + 'a {
        self.items
            .iter()
            .filter(move |i| i.name().or_else(|| i.id()) == Some(name))
    }

    /// All items whose classes include every tag of `classes`.
    pub fn get_by_classes<'a>(&'a self, classes: &'a ClassSet) -> impl Iterator<Item = &'a T> + 'a {
        self.items.iter().filter(move |i| classes.is_subset(i.classes()))
    }

    /// Merge a rule using replace/alter/delete semantics.
    pub fn merge<F, E>(&mut self, identity: &RuleIdentity, mode: MergeMode, fresh: F, edit: E) -> Result<MergeOutcome>
    where
        F: FnOnce(&RuleIdentity) -> T,
        E: FnOnce(&mut T, bool) -> Result<()>,
    {
        let category = self.category;
        merge_rule(&mut self.items, identity, mode, fresh, |item, is_fresh| {
            edit(item, is_fresh)?;
            check_category(category, item)
        })
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.items.iter_mut()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Remove every item, keeping the restriction.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Mutable access to the backing vector for nested merging.
    pub fn items_mut(&mut self) -> &mut Vec<T> {
        &mut self.items
    }
}

impl<'a, T: Classified> IntoIterator for &'a ClassList<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Id-indexed collection; items without an id cannot be stored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassMap<T> {
    items: Vec<T>,
    index: FxHashMap<String, usize>,
    category: Option<Category>,
}

impl<T> Default for ClassMap<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            index: FxHashMap::default(),
            category: None,
        }
    }
}

impl<T: Classified> ClassMap<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a map that only accepts items of `category`.
    #[must_use]
    pub fn restricted(category: Category) -> Self {
        Self {
            category: Some(category),
            ..Self::default()
        }
    }

    fn reindex(&mut self) {
        self.index.clear();
        for (pos, item) in self.items.iter().enumerate() {
            if let Some(id) = item.id() {
                self.index.insert(id.to_string(), pos);
            }
        }
    }

    /// Insert an item.
    pub fn add(&mut self, item: T) -> Result<()> {
        check_category(self.category, &item)?;
        let Some(id) = item.id() else {
            return Err(RulesError::validation("", "mapped items need an id"));
        };
        if self.index.contains_key(id) {
            return Err(RulesError::DuplicateId { id: id.to_string() });
        }
        self.index.insert(id.to_string(), self.items.len());
        self.items.push(item);
        Ok(())
    }

    /// Remove the item with `id`. Returns it if present.
    pub fn remove(&mut self, id: &str) -> Option<T> {
        let pos = self.index.remove(id)?;
        let item = self.items.remove(pos);
        self.reindex();
        Some(item)
    }

    #[must_use]
    pub fn get_by_id(&self, id: &str) -> Option<&T> {
        self.index.get(id).and_then(|&pos| self.items.get(pos))
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// All items whose name (or id, when unnamed) equals `name`.
    pub fn get_by_name<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a T> + 'a {
        self.items
            .iter()
            .filter(move |i| i.name().or_else(|| i.id()) == Some(name))
    }

    /// All items whose classes include every tag of `classes`.
    pub fn get_by_classes<'a>(&'a self, classes: &'a ClassSet) -> impl Iterator<Item = &'a T> + 'a {
        self.items.iter().filter(move |i| classes.is_subset(i.classes()))
    }

    /// Merge a rule using replace/alter/delete semantics.
    pub fn merge<F, E>(&mut self, identity: &RuleIdentity, mode: MergeMode, fresh: F, edit: E) -> Result<MergeOutcome>
    where
        F: FnOnce(&RuleIdentity) -> T,
        E: FnOnce(&mut T, bool) -> Result<()>,
    {
        if identity.id.is_none() && mode != MergeMode::Delete {
            return Err(RulesError::validation("", "mapped items need an id"));
        }
        let category = self.category;
        let outcome = merge_rule(&mut self.items, identity, mode, fresh, |item, is_fresh| {
            edit(item, is_fresh)?;
            check_category(category, item)
        })?;
        self.reindex();
        Ok(outcome)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.index.clear();
    }
}
