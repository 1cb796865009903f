//! The aggregate of everything a sequence of rule sets defined.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Category, ClassList, ClassMap, ClassSet, Classified, EntityKind};
use crate::conditions::{Cost, ExistsCondition};
use crate::core::{Result, RulesError};
use crate::visibility::VisibilityRules;

/// One unlockable step of the research tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchRule {
    pub id: String,
    pub classes: ClassSet,
    pub name: Option<String>,
    pub tier: u32,
    /// Kind ids this research reveals.
    pub unlocks: Vec<String>,
}

impl ResearchRule {
    pub fn new(id: impl Into<String>, tier: u32) -> Self {
        Self {
            id: id.into(),
            classes: ClassSet::new(),
            name: None,
            tier,
            unlocks: Vec::new(),
        }
    }

    /// Add an unlocked kind (builder pattern).
    #[must_use]
    pub fn unlocking(mut self, kind: impl Into<String>) -> Self {
        self.unlocks.push(kind.into());
        self
    }
}

impl Classified for ResearchRule {
    fn id(&self) -> Option<&str> {
        Some(&self.id)
    }
    fn classes(&self) -> &ClassSet {
        &self.classes
    }
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

/// Every loaded rule, partitioned by category.
///
/// Built by successive loader passes; `wipe` resets it to the state of
/// `Ruleset::new()`, visibility defaults included.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ruleset {
    pub actions: ClassList<EntityKind>,
    pub args: ClassList<EntityKind>,
    pub boosters: ClassList<EntityKind>,
    pub chars: ClassList<EntityKind>,
    pub action_traits: ClassList<EntityKind>,
    pub arg_traits: ClassList<EntityKind>,
    pub booster_traits: ClassList<EntityKind>,
    pub char_traits: ClassList<EntityKind>,
    pub encounter_traits: ClassList<EntityKind>,
    pub effects: ClassList<EntityKind>,
    pub encounters: ClassList<EntityKind>,
    pub cost_templates: ClassMap<Cost>,
    pub cond_templates: ClassMap<ExistsCondition>,
    pub research: ClassList<ResearchRule>,
    pub vis: VisibilityRules,
}

impl Default for Ruleset {
    fn default() -> Self {
        Self::new()
    }
}

impl Ruleset {
    #[must_use]
    pub fn new() -> Self {
        Self {
            actions: ClassList::restricted(Category::Action),
            args: ClassList::restricted(Category::Argument),
            boosters: ClassList::restricted(Category::Booster),
            chars: ClassList::restricted(Category::Character),
            action_traits: ClassList::restricted(Category::Trait),
            arg_traits: ClassList::restricted(Category::Trait),
            booster_traits: ClassList::restricted(Category::Trait),
            char_traits: ClassList::restricted(Category::Trait),
            encounter_traits: ClassList::restricted(Category::Trait),
            effects: ClassList::restricted(Category::Effect),
            encounters: ClassList::restricted(Category::Encounter),
            cost_templates: ClassMap::new(),
            cond_templates: ClassMap::new(),
            research: ClassList::new(),
            vis: VisibilityRules::new(),
        }
    }

    /// Reset to an empty rule set.
    pub fn wipe(&mut self) {
        *self = Self::new();
    }

    /// Partition for a category. Traits are further split by what they
    /// attach to; `trait_for` defaults to characters.
    #[must_use]
    pub fn partition(&self, category: Category, trait_for: Option<Category>) -> Option<&ClassList<EntityKind>> {
        Some(match category {
            Category::Action => &self.actions,
            Category::Argument => &self.args,
            Category::Booster => &self.boosters,
            Category::Character => &self.chars,
            Category::Effect => &self.effects,
            Category::Encounter => &self.encounters,
            Category::Trait => match trait_for.unwrap_or(Category::Character) {
                Category::Action => &self.action_traits,
                Category::Argument => &self.arg_traits,
                Category::Booster => &self.booster_traits,
                Category::Character => &self.char_traits,
                Category::Encounter => &self.encounter_traits,
                Category::Trait | Category::Effect => return None,
            },
        })
    }

    pub fn partition_mut(&mut self, category: Category, trait_for: Option<Category>) -> Option<&mut ClassList<EntityKind>> {
        Some(match category {
            Category::Action => &mut self.actions,
            Category::Argument => &mut self.args,
            Category::Booster => &mut self.boosters,
            Category::Character => &mut self.chars,
            Category::Effect => &mut self.effects,
            Category::Encounter => &mut self.encounters,
            Category::Trait => match trait_for.unwrap_or(Category::Character) {
                Category::Action => &mut self.action_traits,
                Category::Argument => &mut self.arg_traits,
                Category::Booster => &mut self.booster_traits,
                Category::Character => &mut self.char_traits,
                Category::Encounter => &mut self.encounter_traits,
                Category::Trait | Category::Effect => return None,
            },
        })
    }

    /// Named partitions in a fixed order.
    pub fn partitions(&self) -> [(&'static str, &ClassList<EntityKind>); 11] {
        [
            ("actions", &self.actions),
            ("args", &self.args),
            ("boosters", &self.boosters),
            ("chars", &self.chars),
            ("action_traits", &self.action_traits),
            ("arg_traits", &self.arg_traits),
            ("booster_traits", &self.booster_traits),
            ("char_traits", &self.char_traits),
            ("encounter_traits", &self.encounter_traits),
            ("effects", &self.effects),
            ("encounters", &self.encounters),
        ]
    }

    /// Every kind of every partition.
    pub fn all(&self) -> impl Iterator<Item = &EntityKind> + '_ {
        self.partitions().into_iter().flat_map(|(_, list)| list.iter())
    }

    /// First kind with `id` in any partition.
    #[must_use]
    pub fn kind(&self, id: &str) -> Option<&EntityKind> {
        self.all().find(|k| k.id == id)
    }

    /// Trait kind with `id`, whatever it attaches to.
    #[must_use]
    pub fn trait_kind(&self, id: &str) -> Option<&EntityKind> {
        [
            &self.action_traits,
            &self.arg_traits,
            &self.booster_traits,
            &self.char_traits,
            &self.encounter_traits,
        ]
        .into_iter()
        .find_map(|list| list.get_by_id(id))
    }

    /// Add a kind to its partition. Fails on any id already in use.
    pub fn add_kind(&mut self, kind: EntityKind) -> Result<()> {
        if self.kind(&kind.id).is_some() {
            return Err(RulesError::DuplicateId { id: kind.id });
        }
        let category = kind.category;
        let list = self
            .partition_mut(category, kind.trait_for)
            .ok_or_else(|| RulesError::validation(&kind.id, "traits cannot attach to this category"))?;
        list.add(kind)
    }

    /// Number of kinds across all partitions.
    #[must_use]
    pub fn kind_count(&self) -> usize {
        self.partitions().iter().map(|(_, list)| list.len()).sum()
    }

    /// Validate every kind and template, then scan for duplicate ids.
    pub fn validate(&self) -> Result<()> {
        let kinds: Vec<&EntityKind> = self.all().collect();
        for kind in &kinds {
            kind.validate()?;
        }
        for (i, a) in kinds.iter().enumerate() {
            if kinds[i + 1..].iter().any(|b| b.id == a.id) {
                return Err(RulesError::DuplicateId { id: a.id.clone() });
            }
        }
        for cond in self.cond_templates.iter() {
            cond.validate()?;
        }
        for cost in self.cost_templates.iter() {
            for cond in &cost.conds {
                cond.validate()?;
            }
        }
        Ok(())
    }

    /// Research rules grouped by tier, tiers ascending.
    #[must_use]
    pub fn research_tiers(&self) -> BTreeMap<u32, Vec<&ResearchRule>> {
        let mut tiers: BTreeMap<u32, Vec<&ResearchRule>> = BTreeMap::new();
        for rule in &self.research {
            tiers.entry(rule.tier).or_default().push(rule);
        }
        tiers
    }

    /// Encode for caching.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| RulesError::Snapshot(e.to_string()))
    }

    /// Decode a cached rule set.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| RulesError::Snapshot(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::properties::PropertyTemplate;

    fn sample() -> Ruleset {
        let mut rules = Ruleset::new();
        rules
            .add_kind(EntityKind::new("flatter", Category::Action).with_prop(PropertyTemplate::new("power", 2.0)))
            .unwrap();
        rules.add_kind(EntityKind::new("envoy", Category::Character)).unwrap();
        let mut stubborn = EntityKind::new("stubborn", Category::Trait);
        stubborn.trait_for = Some(Category::Argument);
        rules.add_kind(stubborn).unwrap();
        rules
    }

    #[test]
    fn test_partitions_and_lookup() {
        let rules = sample();
        assert_eq!(rules.actions.len(), 1);
        assert_eq!(rules.arg_traits.len(), 1);
        assert_eq!(rules.kind_count(), 3);
        assert_eq!(rules.kind("envoy").unwrap().category, Category::Character);
        assert!(rules.trait_kind("stubborn").is_some());
        assert!(rules.kind("nobody").is_none());
    }

    #[test]
    fn test_add_rejects_duplicates_across_partitions() {
        let mut rules = sample();
        let error = rules.add_kind(EntityKind::new("envoy", Category::Argument)).unwrap_err();
        assert_eq!(error, RulesError::DuplicateId { id: "envoy".to_string() });
    }

    #[test]
    fn test_partition_restriction() {
        let mut rules = Ruleset::new();
        let error = rules.actions.add(EntityKind::new("envoy", Category::Character)).unwrap_err();
        assert!(matches!(error, RulesError::InvalidType { .. }));
    }

    #[test]
    fn test_validate_finds_cross_partition_duplicates() {
        let mut rules = sample();
        assert!(rules.validate().is_ok());

        rules.args.add(EntityKind::new("flatter", Category::Argument)).unwrap();
        assert_eq!(
            rules.validate().unwrap_err(),
            RulesError::DuplicateId { id: "flatter".to_string() }
        );
    }

    #[test]
    fn test_wipe() {
        let mut rules = sample();
        rules.vis.set_all_visible(Some(true));
        rules.wipe();
        assert_eq!(rules, Ruleset::new());
    }

    #[test]
    fn test_research_tiers() {
        let mut rules = Ruleset::new();
        rules.research.add(ResearchRule::new("gossip", 2)).unwrap();
        rules.research.add(ResearchRule::new("manners", 1)).unwrap();
        rules.research.add(ResearchRule::new("poise", 1)).unwrap();

        let tiers = rules.research_tiers();
        assert_eq!(tiers.keys().copied().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(tiers[&1].len(), 2);
    }

    #[test]
    fn test_bytes_round_trip() {
        let rules = sample();
        let bytes = rules.to_bytes().unwrap();
        assert_eq!(Ruleset::from_bytes(&bytes).unwrap(), rules);
        assert!(matches!(Ruleset::from_bytes(&[1, 2, 3]), Err(RulesError::Snapshot(_))));
    }
}
