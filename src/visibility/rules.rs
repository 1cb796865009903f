//! The rule-set-wide visibility rule tree.

use serde::{Deserialize, Serialize};

use super::rule::{VisCategory, VisibilityRule};
use crate::core::{Diagnostics, Result, WarningKind};
use crate::kinds::ClassList;
use crate::rules::merge::{MergeMode, MergeOutcome, RuleIdentity};

/// Top-level visibility rules, one ordered list per category.
///
/// Every list starts with the category's baked default and is never left
/// empty: deleting the last rule re-inserts a fresh default.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VisibilityRules {
    all_visible: Option<bool>,
    argument: ClassList<VisibilityRule>,
    booster: ClassList<VisibilityRule>,
    character: ClassList<VisibilityRule>,
    encounter: ClassList<VisibilityRule>,
    trait_: ClassList<VisibilityRule>,
}

impl Default for VisibilityRules {
    fn default() -> Self {
        Self::new()
    }
}

impl VisibilityRules {
    /// Rules holding only the baked defaults.
    #[must_use]
    pub fn new() -> Self {
        let mut rules = Self {
            all_visible: None,
            argument: ClassList::new(),
            booster: ClassList::new(),
            character: ClassList::new(),
            encounter: ClassList::new(),
            trait_: ClassList::new(),
        };
        for category in VisCategory::ALL {
            rules
                .list_mut(category)
                .items_mut()
                .push(VisibilityRule::baked_default(category));
        }
        rules
    }

    /// Whether every entity is visible to every side.
    #[must_use]
    pub fn all_visible(&self) -> bool {
        self.all_visible.unwrap_or(false)
    }

    /// The raw setting; `None` until some rule set specified it.
    #[must_use]
    pub fn all_visible_setting(&self) -> Option<bool> {
        self.all_visible
    }

    /// Update `allVisible`. `None` leaves the prior value unchanged.
    pub fn set_all_visible(&mut self, value: Option<bool>) {
        if value.is_some() {
            self.all_visible = value;
        }
    }

    fn list_mut(&mut self, category: VisCategory) -> &mut ClassList<VisibilityRule> {
        match category {
            VisCategory::Argument => &mut self.argument,
            VisCategory::Booster => &mut self.booster,
            VisCategory::Character => &mut self.character,
            VisCategory::Encounter => &mut self.encounter,
            VisCategory::Trait => &mut self.trait_,
        }
    }

    /// Rules of a category in merge order.
    #[must_use]
    pub fn rules(&self, category: VisCategory) -> &[VisibilityRule] {
        match category {
            VisCategory::Argument => self.argument.as_slice(),
            VisCategory::Booster => self.booster.as_slice(),
            VisCategory::Character => self.character.as_slice(),
            VisCategory::Encounter => self.encounter.as_slice(),
            VisCategory::Trait => self.trait_.as_slice(),
        }
    }

    /// Merge a top-level rule of `category`.
    pub fn merge<E>(
        &mut self,
        category: VisCategory,
        identity: &RuleIdentity,
        mode: MergeMode,
        edit: E,
        diag: &mut Diagnostics,
    ) -> Result<MergeOutcome>
    where
        E: FnOnce(&mut VisibilityRule, bool) -> Result<()>,
    {
        let list = self.list_mut(category);
        let outcome = list.merge(
            identity,
            mode,
            |identity| VisibilityRule {
                id: identity.id.clone(),
                classes: identity.classes.clone(),
                ..VisibilityRule::new(category)
            },
            edit,
        )?;

        if list.is_empty() {
            list.items_mut().push(VisibilityRule::baked_default(category));
            diag.warn(
                WarningKind::DefaultVisibilityRestored,
                format!("last {category} visibility rule deleted; default restored"),
            );
        }
        Ok(outcome)
    }
}
