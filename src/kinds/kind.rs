//! Entity kinds: the templates rules define and encounters instantiate.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{ClassSet, Classified};
use crate::conditions::{Cost, ExistsCondition};
use crate::core::{Result, RulesError};
use crate::effects::{EffectSpec, TargetSpec};
use crate::properties::PropertyTemplate;
use crate::visibility::{VisCategory, VisibilityRule};

/// Lowercase words joined by single hyphens.
pub const KIND_ID_PATTERN: &str = r"^[a-z0-9]+(-[a-z0-9]+)*$";

static KEBAB_CASE: Lazy<Option<Regex>> = Lazy::new(|| match Regex::new(KIND_ID_PATTERN) {
    Ok(re) => Some(re),
    Err(error) => {
        log::error!("kind id pattern does not compile: {error}");
        None
    }
});

/// Whether `id` is usable as a kind id: kebab-case and not purely numeric.
#[must_use]
pub fn is_valid_kind_id(id: &str) -> bool {
    !is_numeric_id(id) && KEBAB_CASE.as_ref().is_some_and(|re| re.is_match(id))
}

/// Whether `id` consists only of digits. Such ids are auto-generated.
#[must_use]
pub fn is_numeric_id(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit())
}

/// What an entity kind describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Action,
    Argument,
    Booster,
    Character,
    Trait,
    Effect,
    Encounter,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Action,
        Category::Argument,
        Category::Booster,
        Category::Character,
        Category::Trait,
        Category::Effect,
        Category::Encounter,
    ];

    /// Markup tag of this category.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Category::Action => "action",
            Category::Argument => "argument",
            Category::Booster => "booster",
            Category::Character => "character",
            Category::Trait => "trait",
            Category::Effect => "effect",
            Category::Encounter => "encounter",
        }
    }

    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.tag() == tag)
    }

    /// Visibility flag set that governs entities of this category.
    ///
    /// Actions are shown as part of their character. Effect kinds are never
    /// instantiated as visible entities.
    #[must_use]
    pub const fn vis_category(self) -> Option<VisCategory> {
        match self {
            Category::Argument => Some(VisCategory::Argument),
            Category::Booster => Some(VisCategory::Booster),
            Category::Character | Category::Action => Some(VisCategory::Character),
            Category::Trait => Some(VisCategory::Trait),
            Category::Encounter => Some(VisCategory::Encounter),
            Category::Effect => None,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Which side-level partition a booster belongs to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoosterScope {
    #[default]
    Global,
    Argument,
    Friendly,
    Adverse,
}

impl BoosterScope {
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "global" => Some(BoosterScope::Global),
            "argument" => Some(BoosterScope::Argument),
            "friendly" => Some(BoosterScope::Friendly),
            "adverse" => Some(BoosterScope::Adverse),
            _ => None,
        }
    }
}

/// A trait attached to a kind; instantiated alongside every entity of it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TraitRef {
    pub id: Option<String>,
    pub classes: ClassSet,
    pub name: Option<String>,
    /// Trait kind to instantiate. Defaults to `id`.
    pub kind: Option<String>,
}

impl TraitRef {
    /// Trait kind this reference instantiates.
    #[must_use]
    pub fn kind_id(&self) -> Option<&str> {
        self.kind.as_deref().or(self.id.as_deref())
    }
}

impl Classified for TraitRef {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
    fn classes(&self) -> &ClassSet {
        &self.classes
    }
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

/// Template for entities.
///
/// Kinds are only changed through rule merging; encounters read them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityKind {
    pub id: String,
    pub name: Option<String>,
    pub category: Category,
    pub classes: ClassSet,
    pub description: String,
    /// Property templates.
    pub props: Vec<PropertyTemplate>,
    /// Traits every instance receives.
    pub traits: Vec<TraitRef>,
    pub costs: Vec<Cost>,
    pub conds: Vec<ExistsCondition>,
    pub effects: Vec<EffectSpec>,
    /// Legal targets of an action.
    pub targets: Vec<TargetSpec>,
    /// Character kinds: action kinds each instance receives.
    pub actions: Vec<String>,
    /// Booster kinds: side partition.
    pub scope: BoosterScope,
    /// Action kinds: number of uses before the action is finished.
    pub uses: Option<u32>,
    /// Trait kinds: category the trait attaches to.
    pub trait_for: Option<Category>,
    /// Per-kind visibility rule.
    pub vis: Option<VisibilityRule>,
}

impl EntityKind {
    /// Create an empty kind.
    pub fn new(id: impl Into<String>, category: Category) -> Self {
        Self {
            id: id.into(),
            name: None,
            category,
            classes: ClassSet::new(),
            description: String::new(),
            props: Vec::new(),
            traits: Vec::new(),
            costs: Vec::new(),
            conds: Vec::new(),
            effects: Vec::new(),
            targets: Vec::new(),
            actions: Vec::new(),
            scope: BoosterScope::default(),
            uses: None,
            trait_for: None,
            vis: None,
        }
    }

    /// Set the display name (builder pattern).
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Add class tags from a comma-separated list (builder pattern).
    #[must_use]
    pub fn with_classes(mut self, classes: &str) -> Self {
        self.classes.extend_from(&ClassSet::parse(classes));
        self
    }

    /// Add a property template (builder pattern).
    #[must_use]
    pub fn with_prop(mut self, prop: PropertyTemplate) -> Self {
        self.props.push(prop);
        self
    }

    /// Add an effect (builder pattern).
    #[must_use]
    pub fn with_effect(mut self, effect: EffectSpec) -> Self {
        self.effects.push(effect);
        self
    }

    /// Add a target specification (builder pattern).
    #[must_use]
    pub fn with_target(mut self, target: TargetSpec) -> Self {
        self.targets.push(target);
        self
    }

    /// Add a cost (builder pattern).
    #[must_use]
    pub fn with_cost(mut self, cost: Cost) -> Self {
        self.costs.push(cost);
        self
    }

    /// Add an exists-condition (builder pattern).
    #[must_use]
    pub fn with_cond(mut self, cond: ExistsCondition) -> Self {
        self.conds.push(cond);
        self
    }

    /// Add a trait reference by kind id (builder pattern).
    #[must_use]
    pub fn with_trait(mut self, kind: impl Into<String>) -> Self {
        self.traits.push(TraitRef {
            id: Some(kind.into()),
            ..TraitRef::default()
        });
        self
    }

    /// Add an action kind id (builder pattern).
    #[must_use]
    pub fn with_action(mut self, kind: impl Into<String>) -> Self {
        self.actions.push(kind.into());
        self
    }

    /// Name shown to players; falls back to the id.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    #[must_use]
    pub fn property(&self, id: &str) -> Option<&PropertyTemplate> {
        self.props.iter().find(|p| p.id.as_deref() == Some(id))
    }

    /// Check the id and every embedded condition.
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(RulesError::validation(&self.id, "id is empty"));
        }
        if is_numeric_id(&self.id) {
            return Err(RulesError::validation(&self.id, "id is numeric"));
        }
        if !is_valid_kind_id(&self.id) {
            return Err(RulesError::validation(&self.id, "id is not kebab-case"));
        }
        for cond in self.conds.iter().chain(self.costs.iter().flat_map(|c| c.conds.iter())) {
            cond.validate()?;
        }
        for effect in &self.effects {
            for cond in &effect.conds {
                cond.validate()?;
            }
        }
        Ok(())
    }
}

impl Classified for EntityKind {
    fn id(&self) -> Option<&str> {
        Some(&self.id)
    }
    fn classes(&self) -> &ClassSet {
        &self.classes
    }
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
    fn category(&self) -> Option<Category> {
        Some(self.category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_id_pattern_compiles() {
        let re = Regex::new(KIND_ID_PATTERN).unwrap();
        assert!(re.is_match("appeal-to-reason"));
        assert!(!re.is_match("Appeal"));
        assert!(!re.is_match("double--hyphen"));
        assert!(!re.is_match("-lead"));
        assert!(KEBAB_CASE.is_some());
    }

    #[test]
    fn test_kind_ids() {
        assert!(is_valid_kind_id("flattery"));
        assert!(is_valid_kind_id("appeal-to-reason"));
        assert!(is_valid_kind_id("tier-2"));
        assert!(!is_valid_kind_id("42"));
        assert!(!is_valid_kind_id(""));
        assert!(!is_valid_kind_id("Flattery"));
        assert!(!is_valid_kind_id("double--dash"));
        assert!(!is_valid_kind_id("trailing-"));
        assert!(is_numeric_id("007"));
        assert!(!is_numeric_id("a1"));
    }

    #[test]
    fn test_validate() {
        assert!(EntityKind::new("bribe", Category::Action).validate().is_ok());

        for bad in ["", "12", "Bribe"] {
            let error = EntityKind::new(bad, Category::Action).validate().unwrap_err();
            assert!(matches!(error, RulesError::Validation { .. }), "{bad}");
        }
    }

    #[test]
    fn test_display_name_falls_back_to_id() {
        let kind = EntityKind::new("bribe", Category::Action);
        assert_eq!(kind.display_name(), "bribe");
        assert_eq!(kind.with_name("Bribe").display_name(), "Bribe");
    }

    #[test]
    fn test_category_tags() {
        for category in Category::ALL {
            assert_eq!(Category::from_tag(category.tag()), Some(category));
        }
        assert_eq!(Category::from_tag("spell"), None);
        assert_eq!(Category::Action.vis_category(), Some(VisCategory::Character));
    }

    #[test]
    fn test_trait_ref_kind_defaults_to_id() {
        let reference = TraitRef {
            id: Some("stubborn".to_string()),
            ..TraitRef::default()
        };
        assert_eq!(reference.kind_id(), Some("stubborn"));
    }
}
