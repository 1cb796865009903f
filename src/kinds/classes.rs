//! Class tags.
//!
//! A `ClassSet` is a small sorted set of tags such as `flattery, honest`.
//! Most rules carry zero to three classes, so storage is inline.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Sorted, de-duplicated set of class tags.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassSet {
    tags: SmallVec<[String; 4]>,
}

impl ClassSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a comma-separated list. Entries are trimmed and empties dropped.
    #[must_use]
    pub fn parse(list: &str) -> Self {
        list.split(',').map(str::trim).filter(|s| !s.is_empty()).collect()
    }

    /// Add a tag. Returns `false` if it was already present.
    pub fn insert(&mut self, tag: impl Into<String>) -> bool {
        let tag = tag.into();
        match self.tags.binary_search(&tag) {
            Ok(_) => false,
            Err(pos) => {
                self.tags.insert(pos, tag);
                true
            }
        }
    }

    /// Add every tag of `other`.
    pub fn extend_from(&mut self, other: &ClassSet) {
        for tag in &other.tags {
            self.insert(tag.clone());
        }
    }

    /// Union of two sets.
    #[must_use]
    pub fn union(&self, other: &ClassSet) -> ClassSet {
        let mut out = self.clone();
        out.extend_from(other);
        out
    }

    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        self.tags.binary_search_by(|t| t.as_str().cmp(tag)).is_ok()
    }

    /// Every tag of `self` is in `other`.
    #[must_use]
    pub fn is_subset(&self, other: &ClassSet) -> bool {
        self.tags.iter().all(|t| other.contains(t))
    }

    /// No tag of `self` is in `other`.
    #[must_use]
    pub fn is_disjoint(&self, other: &ClassSet) -> bool {
        !self.tags.iter().any(|t| other.contains(t))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for ClassSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = ClassSet::new();
        for tag in iter {
            set.insert(tag);
        }
        set
    }
}

impl std::fmt::Display for ClassSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.tags.join(","))
    }
}
