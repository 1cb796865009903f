//! Effect targeting system.
//!
//! A `TargetSpec` names a strategy (`TargetType`) relative to the entity
//! doing the targeting, then narrows by side, kind, classes and flags.
//! `get_targets` filters the arena in creation order through the same
//! predicate `is_target` uses, so the two always agree.
//!
//! Strategies that follow a link the targeter does not have (a booster
//! with no holder asked for `holder`) match nothing and record a warning.

use serde::{Deserialize, Serialize};

use crate::core::{Diagnostics, EntityId, Result, RulesError, SideId, WarningKind};
use crate::encounter::{Arena, Entity};
use crate::kinds::{BoosterScope, Category, ClassSet, Classified};

/// Target selection strategy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetType {
    /// The targeter itself.
    #[default]
    SelfTarget,
    /// The targeter's current target.
    Target,
    Holder,
    /// Holder of the holder.
    Holder2,
    Holder3,
    /// Root of the holder chain.
    UltimateHolder,
    Creator,
    /// Actions made by the targeter's creator, other than the targeter.
    KindredActions,
    KindredArguments,
    KindredBoosters,
    /// Actions sharing the targeter's holder, other than the targeter.
    SameHolderActions,
    SameHolderArguments,
    SameHolderBoosters,
    SameHolderTraits,
    /// Boosters the targeter holds.
    HeldBoosters,
    HeldTraits,
    AllActions,
    AllArguments,
    AllBoosters,
    AllCharacters,
    AllTraits,
    GlobalBoosters,
    FriendlyBoosters,
    AdverseBoosters,
    ArgumentBoosters,
    /// The encounter entity.
    Encounter,
}

impl TargetType {
    pub const ALL: [TargetType; 26] = [
        TargetType::SelfTarget,
        TargetType::Target,
        TargetType::Holder,
        TargetType::Holder2,
        TargetType::Holder3,
        TargetType::UltimateHolder,
        TargetType::Creator,
        TargetType::KindredActions,
        TargetType::KindredArguments,
        TargetType::KindredBoosters,
        TargetType::SameHolderActions,
        TargetType::SameHolderArguments,
        TargetType::SameHolderBoosters,
        TargetType::SameHolderTraits,
        TargetType::HeldBoosters,
        TargetType::HeldTraits,
        TargetType::AllActions,
        TargetType::AllArguments,
        TargetType::AllBoosters,
        TargetType::AllCharacters,
        TargetType::AllTraits,
        TargetType::GlobalBoosters,
        TargetType::FriendlyBoosters,
        TargetType::AdverseBoosters,
        TargetType::ArgumentBoosters,
        TargetType::Encounter,
    ];

    /// Markup name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            TargetType::SelfTarget => "self",
            TargetType::Target => "target",
            TargetType::Holder => "holder",
            TargetType::Holder2 => "holder2",
            TargetType::Holder3 => "holder3",
            TargetType::UltimateHolder => "ultimateHolder",
            TargetType::Creator => "creator",
            TargetType::KindredActions => "kindredActions",
            TargetType::KindredArguments => "kindredArguments",
            TargetType::KindredBoosters => "kindredBoosters",
            TargetType::SameHolderActions => "sameHolderActions",
            TargetType::SameHolderArguments => "sameHolderArguments",
            TargetType::SameHolderBoosters => "sameHolderBoosters",
            TargetType::SameHolderTraits => "sameHolderTraits",
            TargetType::HeldBoosters => "heldBoosters",
            TargetType::HeldTraits => "heldTraits",
            TargetType::AllActions => "allActions",
            TargetType::AllArguments => "allArguments",
            TargetType::AllBoosters => "allBoosters",
            TargetType::AllCharacters => "allCharacters",
            TargetType::AllTraits => "allTraits",
            TargetType::GlobalBoosters => "globalBoosters",
            TargetType::FriendlyBoosters => "friendlyBoosters",
            TargetType::AdverseBoosters => "adverseBoosters",
            TargetType::ArgumentBoosters => "argumentBoosters",
            TargetType::Encounter => "encounter",
        }
    }

    pub fn parse(name: &str) -> Result<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.name() == name)
            .ok_or_else(|| RulesError::InvalidTargetSpec {
                spec: format!("type={name}"),
            })
    }

    /// Category every match must have, if the strategy fixes one.
    #[must_use]
    pub const fn category(self) -> Option<Category> {
        match self {
            TargetType::KindredActions | TargetType::SameHolderActions | TargetType::AllActions => {
                Some(Category::Action)
            }
            TargetType::KindredArguments | TargetType::SameHolderArguments | TargetType::AllArguments => {
                Some(Category::Argument)
            }
            TargetType::KindredBoosters
            | TargetType::SameHolderBoosters
            | TargetType::HeldBoosters
            | TargetType::AllBoosters
            | TargetType::GlobalBoosters
            | TargetType::FriendlyBoosters
            | TargetType::AdverseBoosters
            | TargetType::ArgumentBoosters => Some(Category::Booster),
            TargetType::SameHolderTraits | TargetType::HeldTraits | TargetType::AllTraits => Some(Category::Trait),
            TargetType::AllCharacters => Some(Category::Character),
            TargetType::Encounter => Some(Category::Encounter),
            _ => None,
        }
    }

    /// Entity the strategy is anchored on, or the warning raised when the
    /// targeter lacks it. `Ok(None)` for strategies without an anchor.
    fn anchor(self, arena: &Arena, targeter: &Entity) -> std::result::Result<Option<EntityId>, WarningKind> {
        let required = |link: Option<EntityId>, missing: WarningKind| link.map(Some).ok_or(missing);
        match self {
            TargetType::Target => required(targeter.target, WarningKind::MissingTarget),
            TargetType::Holder
            | TargetType::SameHolderActions
            | TargetType::SameHolderArguments
            | TargetType::SameHolderBoosters
            | TargetType::SameHolderTraits => required(targeter.holder, WarningKind::MissingHolder),
            TargetType::Holder2 => required(arena.holder_of(targeter.id, 2), WarningKind::MissingHolder),
            TargetType::Holder3 => required(arena.holder_of(targeter.id, 3), WarningKind::MissingHolder),
            TargetType::UltimateHolder => required(arena.ultimate_holder(targeter.id), WarningKind::MissingHolder),
            TargetType::Creator
            | TargetType::KindredActions
            | TargetType::KindredArguments
            | TargetType::KindredBoosters => required(targeter.creator, WarningKind::MissingCreator),
            _ => Ok(None),
        }
    }

    fn selects(self, candidate: &Entity, targeter: &Entity, anchor: Option<EntityId>) -> bool {
        if let Some(category) = self.category() {
            if candidate.category != category {
                return false;
            }
        }
        let not_self = candidate.id != targeter.id;
        match self {
            TargetType::SelfTarget => candidate.id == targeter.id,
            TargetType::Target
            | TargetType::Holder
            | TargetType::Holder2
            | TargetType::Holder3
            | TargetType::UltimateHolder
            | TargetType::Creator => anchor == Some(candidate.id),
            TargetType::KindredActions | TargetType::KindredArguments | TargetType::KindredBoosters => {
                not_self && anchor.is_some() && candidate.creator == anchor
            }
            TargetType::SameHolderActions
            | TargetType::SameHolderArguments
            | TargetType::SameHolderBoosters
            | TargetType::SameHolderTraits => not_self && anchor.is_some() && candidate.holder == anchor,
            TargetType::HeldBoosters | TargetType::HeldTraits => candidate.holder == Some(targeter.id),
            TargetType::GlobalBoosters => candidate.booster_scope() == Some(BoosterScope::Global),
            TargetType::FriendlyBoosters => candidate.booster_scope() == Some(BoosterScope::Friendly),
            TargetType::AdverseBoosters => candidate.booster_scope() == Some(BoosterScope::Adverse),
            TargetType::ArgumentBoosters => candidate.booster_scope() == Some(BoosterScope::Argument),
            TargetType::AllActions
            | TargetType::AllArguments
            | TargetType::AllBoosters
            | TargetType::AllCharacters
            | TargetType::AllTraits
            | TargetType::Encounter => true,
        }
    }
}

impl std::fmt::Display for TargetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Side restriction relative to the targeter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SideFilter {
    Friendly,
    Opposing,
    Neutral,
    Side(SideId),
    #[default]
    All,
}

impl SideFilter {
    pub fn parse(value: &str) -> Result<Self> {
        Ok(match value.trim() {
            "friendly" => SideFilter::Friendly,
            "opposing" => SideFilter::Opposing,
            "neutral" => SideFilter::Neutral,
            "all" => SideFilter::All,
            "0" => SideFilter::Side(SideId::Neutral),
            "1" => SideFilter::Side(SideId::One),
            "2" => SideFilter::Side(SideId::Two),
            other => {
                return Err(RulesError::InvalidTargetSpec {
                    spec: format!("side={other}"),
                })
            }
        })
    }

    #[must_use]
    pub fn admits(self, candidate: SideId, targeter: SideId) -> bool {
        match self {
            SideFilter::Friendly => candidate == targeter,
            SideFilter::Opposing => targeter.opponent() == Some(candidate),
            SideFilter::Neutral => candidate.is_neutral(),
            SideFilter::Side(side) => candidate == side,
            SideFilter::All => true,
        }
    }
}

/// Specification for effect targeting.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSpec {
    pub id: Option<String>,
    /// Identity classes of the rule itself.
    pub classes: ClassSet,
    pub kind: TargetType,
    pub side: SideFilter,
    pub kind_id: Option<String>,
    /// Matches must carry all of these.
    pub match_classes: ClassSet,
    /// Matches must carry none of these.
    pub not_classes: ClassSet,
    pub finished: Option<bool>,
    pub active: Option<bool>,
    pub alive: Option<bool>,
}

impl TargetSpec {
    #[must_use]
    pub fn new(kind: TargetType) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    /// Spec from markup names.
    pub fn parse(kind: &str, side: Option<&str>) -> Result<Self> {
        let mut spec = Self::new(TargetType::parse(kind)?);
        if let Some(side) = side {
            spec.side = SideFilter::parse(side)?;
        }
        Ok(spec)
    }

    /// Restrict sides (builder pattern).
    #[must_use]
    pub fn on_side(mut self, side: SideFilter) -> Self {
        self.side = side;
        self
    }

    /// Restrict to one kind (builder pattern).
    #[must_use]
    pub fn of_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind_id = Some(kind.into());
        self
    }

    /// Require classes (builder pattern).
    #[must_use]
    pub fn with_classes(mut self, classes: &str) -> Self {
        self.match_classes = ClassSet::parse(classes);
        self
    }

    /// Forbid classes (builder pattern).
    #[must_use]
    pub fn without_classes(mut self, classes: &str) -> Self {
        self.not_classes = ClassSet::parse(classes);
        self
    }

    fn filters(&self, candidate: &Entity, targeter: &Entity) -> bool {
        let flag = |want: Option<bool>, have: bool| want.map_or(true, |w| w == have);
        self.side.admits(candidate.side, targeter.side)
            && self.kind_id.as_deref().map_or(true, |k| candidate.kind == k)
            && self.match_classes.is_subset(&candidate.classes)
            && self.not_classes.is_disjoint(&candidate.classes)
            && flag(self.finished, candidate.finished)
            && flag(self.active, candidate.active)
            && flag(self.alive, candidate.alive)
    }

    fn anchor(&self, arena: &Arena, targeter: &Entity, diag: &mut Diagnostics) -> Option<Option<EntityId>> {
        match self.kind.anchor(arena, targeter) {
            Ok(anchor) => Some(anchor),
            Err(kind) => {
                diag.warn(
                    kind,
                    format!("{} has no link for target type `{}`", targeter.key, self.kind),
                );
                None
            }
        }
    }

    fn admits(&self, candidate: &Entity, targeter: &Entity, anchor: Option<EntityId>) -> bool {
        self.kind.selects(candidate, targeter, anchor) && self.filters(candidate, targeter)
    }

    /// Whether `candidate` is a target of `targeter`.
    pub fn is_target(&self, arena: &Arena, candidate: EntityId, targeter: EntityId, diag: &mut Diagnostics) -> bool {
        let (Some(candidate), Some(targeter)) = (arena.get(candidate), arena.get(targeter)) else {
            return false;
        };
        match self.anchor(arena, targeter, diag) {
            Some(anchor) => self.admits(candidate, targeter, anchor),
            None => false,
        }
    }

    /// Every target of `targeter`, in arena order.
    pub fn get_targets(&self, arena: &Arena, targeter: EntityId, diag: &mut Diagnostics) -> Vec<EntityId> {
        let Some(targeter) = arena.get(targeter) else {
            return Vec::new();
        };
        let Some(anchor) = self.anchor(arena, targeter, diag) else {
            return Vec::new();
        };
        arena
            .iter()
            .filter(|candidate| self.admits(candidate, targeter, anchor))
            .map(|candidate| candidate.id)
            .collect()
    }
}

impl Classified for TargetSpec {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
    fn classes(&self) -> &ClassSet {
        &self.classes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinds::EntityKind;

    // envoy(0, side 1) holds plea(1) and boast(2); plea holds rumor(3) and
    // gossip(4), both created by envoy; rival(5, side 2); ball(6, neutral).
    fn arena() -> Arena {
        let mut arena = Arena::new();
        let mut spawn = |id: &str, category: Category, side: SideId, holder: Option<u32>, creator: Option<u32>| {
            let kind = EntityKind::new(id, category);
            let entity = arena.spawn(&kind, side, None).unwrap();
            let entity = arena.get_mut(entity).unwrap();
            entity.holder = holder.map(EntityId);
            entity.creator = creator.map(EntityId);
        };
        spawn("envoy", Category::Character, SideId::One, None, None);
        spawn("plea", Category::Argument, SideId::One, Some(0), None);
        spawn("boast", Category::Argument, SideId::One, Some(0), None);
        spawn("rumor", Category::Booster, SideId::One, Some(1), Some(0));
        spawn("gossip", Category::Booster, SideId::One, Some(1), Some(0));
        spawn("rival", Category::Character, SideId::Two, None, None);
        spawn("ball", Category::Encounter, SideId::Neutral, None, None);
        arena.get_mut(EntityId(4)).unwrap().variant = crate::encounter::EntityVariant::Booster {
            scope: BoosterScope::Adverse,
        };
        arena
    }

    fn targets(arena: &Arena, spec: &TargetSpec, targeter: u32) -> Vec<u32> {
        let mut diag = Diagnostics::quiet();
        spec.get_targets(arena, EntityId(targeter), &mut diag)
            .into_iter()
            .map(|id| id.raw())
            .collect()
    }

    #[test]
    fn test_parse() {
        assert_eq!(TargetType::parse("ultimateHolder").unwrap(), TargetType::UltimateHolder);
        for t in TargetType::ALL {
            assert_eq!(TargetType::parse(t.name()).unwrap(), t);
        }
        assert!(matches!(
            TargetType::parse("everyone"),
            Err(RulesError::InvalidTargetSpec { .. })
        ));
        assert!(matches!(
            TargetSpec::parse("self", Some("3")),
            Err(RulesError::InvalidTargetSpec { .. })
        ));
        assert_eq!(SideFilter::parse("2").unwrap(), SideFilter::Side(SideId::Two));
    }

    #[test]
    fn test_holder_strategies() {
        let arena = arena();
        assert_eq!(targets(&arena, &TargetSpec::new(TargetType::Holder), 3), vec![1]);
        assert_eq!(targets(&arena, &TargetSpec::new(TargetType::Holder2), 3), vec![0]);
        assert_eq!(targets(&arena, &TargetSpec::new(TargetType::UltimateHolder), 3), vec![0]);
        assert_eq!(targets(&arena, &TargetSpec::new(TargetType::SelfTarget), 3), vec![3]);
    }

    #[test]
    fn test_missing_holder_warns() {
        let arena = arena();
        let mut diag = Diagnostics::quiet();
        let spec = TargetSpec::new(TargetType::Holder3);

        assert!(spec.get_targets(&arena, EntityId(3), &mut diag).is_empty());
        assert!(diag.has(WarningKind::MissingHolder));

        let creator = TargetSpec::new(TargetType::KindredArguments);
        assert!(creator.get_targets(&arena, EntityId(1), &mut diag).is_empty());
        assert!(diag.has(WarningKind::MissingCreator));
    }

    #[test]
    fn test_sibling_strategies() {
        let arena = arena();
        assert_eq!(targets(&arena, &TargetSpec::new(TargetType::KindredBoosters), 3), vec![4]);
        assert_eq!(targets(&arena, &TargetSpec::new(TargetType::SameHolderArguments), 1), vec![2]);
        assert_eq!(targets(&arena, &TargetSpec::new(TargetType::HeldBoosters), 1), vec![3, 4]);
    }

    #[test]
    fn test_partitions_and_sides() {
        let arena = arena();
        assert_eq!(targets(&arena, &TargetSpec::new(TargetType::AdverseBoosters), 0), vec![4]);
        assert_eq!(targets(&arena, &TargetSpec::new(TargetType::GlobalBoosters), 0), vec![3]);
        assert_eq!(targets(&arena, &TargetSpec::new(TargetType::Encounter), 0), vec![6]);

        let all = TargetSpec::new(TargetType::AllCharacters);
        assert_eq!(targets(&arena, &all, 0), vec![0, 5]);
        assert_eq!(targets(&arena, &all.clone().on_side(SideFilter::Opposing), 0), vec![5]);
        assert_eq!(targets(&arena, &all.clone().on_side(SideFilter::Friendly), 0), vec![0]);
        assert!(targets(&arena, &all.on_side(SideFilter::Neutral), 0).is_empty());
    }

    #[test]
    fn test_tri_state_flags() {
        let mut arena = arena();
        arena.get_mut(EntityId(2)).unwrap().finished = true;
        let mut spec = TargetSpec::new(TargetType::AllArguments);

        assert_eq!(targets(&arena, &spec, 0), vec![1, 2]);
        spec.finished = Some(false);
        assert_eq!(targets(&arena, &spec, 0), vec![1]);
        spec.finished = Some(true);
        assert_eq!(targets(&arena, &spec, 0), vec![2]);
    }

    #[test]
    fn test_is_target_agrees() {
        let arena = arena();
        let mut diag = Diagnostics::quiet();
        for kind in TargetType::ALL {
            let spec = TargetSpec::new(kind);
            for targeter in 0..arena.len() as u32 {
                let found = spec.get_targets(&arena, EntityId(targeter), &mut diag);
                for candidate in 0..arena.len() as u32 {
                    let expected = spec.is_target(&arena, EntityId(candidate), EntityId(targeter), &mut diag);
                    assert_eq!(found.contains(&EntityId(candidate)), expected, "{kind} {targeter} {candidate}");
                }
            }
        }
    }
}
