//! Visibility rules and their per-category flag schema.

use serde::{Deserialize, Serialize};

use crate::kinds::{ClassSet, Classified};

/// Categories that carry their own visibility defaults.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VisCategory {
    Argument,
    Booster,
    Character,
    Encounter,
    Trait,
}

impl VisCategory {
    pub const ALL: [VisCategory; 5] = [
        VisCategory::Argument,
        VisCategory::Booster,
        VisCategory::Character,
        VisCategory::Encounter,
        VisCategory::Trait,
    ];

    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            VisCategory::Argument => "argument",
            VisCategory::Booster => "booster",
            VisCategory::Character => "character",
            VisCategory::Encounter => "encounter",
            VisCategory::Trait => "trait",
        }
    }

    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.tag() == tag)
    }

    /// Flags rules of this category may set.
    #[must_use]
    pub const fn flags(self) -> &'static [VisFlag] {
        match self {
            VisCategory::Argument => &[VisFlag::Name, VisFlag::Properties, VisFlag::Traits, VisFlag::Boosters],
            VisCategory::Booster => &[VisFlag::Name, VisFlag::Properties, VisFlag::Traits, VisFlag::Target],
            VisCategory::Character => &[VisFlag::Name, VisFlag::Properties, VisFlag::Traits, VisFlag::Actions],
            VisCategory::Encounter => &[VisFlag::Properties, VisFlag::Traits],
            VisCategory::Trait => &[VisFlag::Name, VisFlag::Properties],
        }
    }

    /// Whether `flag` belongs to this category.
    #[must_use]
    pub fn has_flag(self, flag: VisFlag) -> bool {
        self.flags().contains(&flag)
    }
}

impl std::fmt::Display for VisCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// One piece of information about an entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VisFlag {
    Name,
    Properties,
    Traits,
    Boosters,
    Target,
    Actions,
}

impl VisFlag {
    pub const ALL: [VisFlag; 6] = [
        VisFlag::Name,
        VisFlag::Properties,
        VisFlag::Traits,
        VisFlag::Boosters,
        VisFlag::Target,
        VisFlag::Actions,
    ];

    #[must_use]
    pub const fn attr(self) -> &'static str {
        match self {
            VisFlag::Name => "name",
            VisFlag::Properties => "properties",
            VisFlag::Traits => "traits",
            VisFlag::Boosters => "boosters",
            VisFlag::Target => "target",
            VisFlag::Actions => "actions",
        }
    }

    #[must_use]
    pub const fn refresh_attr(self) -> &'static str {
        match self {
            VisFlag::Name => "nameRefresh",
            VisFlag::Properties => "propertiesRefresh",
            VisFlag::Traits => "traitsRefresh",
            VisFlag::Boosters => "boostersRefresh",
            VisFlag::Target => "targetRefresh",
            VisFlag::Actions => "actionsRefresh",
        }
    }

    const fn slot(self) -> usize {
        match self {
            VisFlag::Name => 0,
            VisFlag::Properties => 1,
            VisFlag::Traits => 2,
            VisFlag::Boosters => 3,
            VisFlag::Target => 4,
            VisFlag::Actions => 5,
        }
    }

    /// Resolve an attribute name to `(flag, is_refresh)`.
    #[must_use]
    pub fn from_attr(attr: &str) -> Option<(Self, bool)> {
        Self::ALL.into_iter().find_map(|flag| {
            if flag.attr() == attr {
                Some((flag, false))
            } else if flag.refresh_attr() == attr {
                Some((flag, true))
            } else {
                None
            }
        })
    }
}

/// Optional value and refresh setting per flag. `None` defers to the next
/// rule in the resolution chain.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisFlags {
    values: [Option<bool>; 6],
    refresh: [Option<bool>; 6],
}

impl VisFlags {
    #[must_use]
    pub fn get(&self, flag: VisFlag) -> Option<bool> {
        self.values[flag.slot()]
    }

    #[must_use]
    pub fn get_refresh(&self, flag: VisFlag) -> Option<bool> {
        self.refresh[flag.slot()]
    }

    pub fn set(&mut self, flag: VisFlag, value: bool) {
        self.values[flag.slot()] = Some(value);
    }

    pub fn set_refresh(&mut self, flag: VisFlag, value: bool) {
        self.refresh[flag.slot()] = Some(value);
    }
}

/// Per-property override inside a visibility rule.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropVisRule {
    /// Property id this override applies to.
    pub id: Option<String>,
    /// Property classes this override applies to, when no id is given.
    pub classes: ClassSet,
    pub vis: Option<bool>,
    pub refresh: Option<bool>,
}

impl PropVisRule {
    /// Whether this override applies to a property.
    #[must_use]
    pub fn applies_to(&self, prop_id: &str, prop_classes: &ClassSet) -> bool {
        match &self.id {
            Some(id) => id == prop_id,
            None => !self.classes.is_empty() && self.classes.is_subset(prop_classes),
        }
    }
}

impl Classified for PropVisRule {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
    fn classes(&self) -> &ClassSet {
        &self.classes
    }
}

/// A visibility rule for one category.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilityRule {
    /// Kind id this rule applies to.
    pub id: Option<String>,
    /// Entity classes this rule applies to, when no id is given.
    pub classes: ClassSet,
    pub category: VisCategory,
    pub flags: VisFlags,
    pub prop_list: Vec<PropVisRule>,
}

impl VisibilityRule {
    /// A rule that sets nothing.
    #[must_use]
    pub fn new(category: VisCategory) -> Self {
        Self {
            id: None,
            classes: ClassSet::new(),
            category,
            flags: VisFlags::default(),
            prop_list: Vec::new(),
        }
    }

    /// The built-in default rule of a category, with every flag set.
    #[must_use]
    pub fn baked_default(category: VisCategory) -> Self {
        let mut rule = Self::new(category);
        for flag in category.flags() {
            let value = match category {
                VisCategory::Encounter => *flag == VisFlag::Traits,
                _ => *flag == VisFlag::Name,
            };
            let refresh = category != VisCategory::Encounter && *flag == VisFlag::Name;
            rule.flags.set(*flag, value);
            rule.flags.set_refresh(*flag, refresh);
        }
        rule
    }

    /// Set a flag (builder pattern).
    #[must_use]
    pub fn with_flag(mut self, flag: VisFlag, value: bool, refresh: bool) -> Self {
        self.flags.set(flag, value);
        self.flags.set_refresh(flag, refresh);
        self
    }

    /// Whether this is an unclassed, id-less default rule.
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.id.is_none() && self.classes.is_empty()
    }

    /// Overrides applying to a property, latest first.
    #[must_use]
    pub fn prop_rules<'a>(&'a self, prop_id: &'a str, prop_classes: &'a ClassSet) -> impl Iterator<Item = &'a PropVisRule> + 'a {
        self.prop_list
            .iter()
            .rev()
            .filter(move |r| r.applies_to(prop_id, prop_classes))
    }
}

impl Classified for VisibilityRule {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
    fn classes(&self) -> &ClassSet {
        &self.classes
    }
}
