//! Replace / alter / delete merging of rules into collections.
//!
//! Identity matching, evaluated against the collection in order, first
//! match wins:
//!
//! 1. same non-empty `id`
//! 2. neither has an `id` and neither has classes (the default rule)
//! 3. neither has an `id` and the class sets are equal
//!
//! | mode    | match                               | no match |
//! |---------|-------------------------------------|----------|
//! | replace | remove, append fresh at the end      | append   |
//! | alter   | edit in place                        | append   |
//! | delete  | remove                               | no-op    |
//!
//! Edits are closures so nested collections are merged by the same engine
//! while the outer rule is being built or altered.

use serde::{Deserialize, Serialize};

use crate::core::{ParseErrorKind, Result};
use crate::kinds::{ClassSet, Classified};

/// How a rule combines with what is already loaded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MergeMode {
    #[default]
    Replace,
    Alter,
    Delete,
}

impl MergeMode {
    /// Parse a `mode` attribute value.
    pub fn parse(value: &str) -> std::result::Result<Self, ParseErrorKind> {
        match value.trim() {
            "replace" => Ok(MergeMode::Replace),
            "alter" => Ok(MergeMode::Alter),
            "delete" => Ok(MergeMode::Delete),
            other => Err(ParseErrorKind::InvalidMode(other.to_string())),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            MergeMode::Replace => "replace",
            MergeMode::Alter => "alter",
            MergeMode::Delete => "delete",
        }
    }
}

impl std::fmt::Display for MergeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a merge did to the collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MergeOutcome {
    /// No match; a fresh item was appended.
    Inserted,
    /// A match was removed and a fresh item appended.
    Replaced,
    /// A match was edited in place.
    Altered,
    /// A match was removed.
    Deleted,
    /// Delete without a match.
    Ignored,
}

impl MergeOutcome {
    /// The edit closure ran on a freshly built item.
    #[must_use]
    pub const fn is_fresh(self) -> bool {
        matches!(self, MergeOutcome::Inserted | MergeOutcome::Replaced)
    }
}

/// Identity of an incoming rule: its `id` and `class` attributes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct RuleIdentity {
    pub id: Option<String>,
    pub classes: ClassSet,
}

impl RuleIdentity {
    #[must_use]
    pub fn new(id: Option<String>, classes: ClassSet) -> Self {
        Self { id, classes }
    }

    /// Identity of a rule with an id and no classes.
    #[must_use]
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            classes: ClassSet::new(),
        }
    }

    /// Identity of the unclassed default rule.
    #[must_use]
    pub fn default_rule() -> Self {
        Self::default()
    }

    /// Whether this identity matches `item`.
    pub fn matches<T: Classified + ?Sized>(&self, item: &T) -> bool {
        match (self.id.as_deref(), item.id()) {
            (Some(a), Some(b)) => a == b,
            (None, None) => self.classes == *item.classes(),
            _ => false,
        }
    }

    /// Position of the first match in `items`.
    pub fn find<T: Classified>(&self, items: &[T]) -> Option<usize> {
        items.iter().position(|item| self.matches(item))
    }
}

/// Merge one rule into `items`.
///
/// `fresh` builds an empty item carrying `identity`; `edit` applies the
/// rule's attributes and children to either a fresh item or the matched
/// one. `edit` receives `true` when the item is fresh. Nothing is changed
/// if `edit` fails.
pub fn merge_rule<T, F, E>(
    items: &mut Vec<T>,
    identity: &RuleIdentity,
    mode: MergeMode,
    fresh: F,
    edit: E,
) -> Result<MergeOutcome>
where
    T: Classified,
    F: FnOnce(&RuleIdentity) -> T,
    E: FnOnce(&mut T, bool) -> Result<()>,
{
    let found = identity.find(items);

    let outcome = match (mode, found) {
        (MergeMode::Delete, Some(pos)) => {
            items.remove(pos);
            MergeOutcome::Deleted
        }
        (MergeMode::Delete, None) => MergeOutcome::Ignored,
        (MergeMode::Alter, Some(pos)) => {
            edit(&mut items[pos], false)?;
            MergeOutcome::Altered
        }
        (MergeMode::Replace, Some(pos)) => {
            let mut item = fresh(identity);
            edit(&mut item, true)?;
            items.remove(pos);
            items.push(item);
            MergeOutcome::Replaced
        }
        (_, None) => {
            let mut item = fresh(identity);
            edit(&mut item, true)?;
            items.push(item);
            MergeOutcome::Inserted
        }
    };

    log::debug!(
        "merge {} {}: {:?}",
        mode,
        identity.id.as_deref().unwrap_or("<anonymous>"),
        outcome
    );
    Ok(outcome)
}

/// Merge into an optional single slot, without identity matching.
///
/// Replace builds fresh, alter edits the current value (or builds fresh if
/// empty), delete clears.
pub fn merge_slot<T, F, E>(slot: &mut Option<T>, mode: MergeMode, fresh: F, edit: E) -> Result<MergeOutcome>
where
    F: FnOnce() -> T,
    E: FnOnce(&mut T, bool) -> Result<()>,
{
    match mode {
        MergeMode::Delete => Ok(if slot.take().is_some() {
            MergeOutcome::Deleted
        } else {
            MergeOutcome::Ignored
        }),
        MergeMode::Alter if slot.is_some() => {
            if let Some(current) = slot.as_mut() {
                edit(current, false)?;
            }
            Ok(MergeOutcome::Altered)
        }
        _ => {
            let replaced = slot.is_some();
            let mut item = fresh();
            edit(&mut item, true)?;
            *slot = Some(item);
            Ok(if replaced {
                MergeOutcome::Replaced
            } else {
                MergeOutcome::Inserted
            })
        }
    }
}
