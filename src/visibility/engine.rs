//! Visibility resolution for one observer and one entity.
//!
//! Full visibility (value and refresh) is granted when the observer owns the
//! entity, `allVisible` is set, the entity's kind has been researched or the
//! kind or entity key is a known secret. Otherwise each flag is taken from
//! the first rule that sets it:
//!
//! 1. the kind's own `vis`
//! 2. category rules whose id is the kind id
//! 3. classed category rules whose classes are all on the entity, latest first
//! 4. default category rules
//! 5. the baked default

use serde::{Deserialize, Serialize};

use super::rule::{VisCategory, VisFlag, VisibilityRule};
use super::rules::VisibilityRules;
use crate::core::SideId;
use crate::kinds::{ClassSet, EntityKind};

/// What an observing side knows beyond ownership.
pub trait ObserverView {
    fn side(&self) -> SideId;

    /// Whether the observer has researched this kind.
    fn has_researched(&self, kind_id: &str) -> bool;

    /// Whether a kind id or entity key is among the observer's secrets.
    fn knows_secret(&self, id: &str) -> bool;
}

/// The entity being looked at.
#[derive(Clone, Copy, Debug)]
pub struct Subject<'a> {
    pub kind_id: &'a str,
    pub kind: Option<&'a EntityKind>,
    pub key: &'a str,
    pub side: SideId,
    pub classes: &'a ClassSet,
    pub category: VisCategory,
}

/// Resolved visibility of one flag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlagState {
    pub visible: bool,
    pub refresh: bool,
}

impl FlagState {
    pub const FULL: FlagState = FlagState {
        visible: true,
        refresh: true,
    };
    pub const HIDDEN: FlagState = FlagState {
        visible: false,
        refresh: false,
    };
}

/// Resolved visibility of every flag of an entity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visibility {
    pub category: VisCategory,
    /// Owned, researched, secret or `allVisible`.
    pub full: bool,
    flags: Vec<(VisFlag, FlagState)>,
}

impl Visibility {
    /// State of a flag; flags outside the category are hidden unless full.
    #[must_use]
    pub fn get(&self, flag: VisFlag) -> FlagState {
        if self.full {
            return FlagState::FULL;
        }
        self.flags
            .iter()
            .find(|(f, _)| *f == flag)
            .map_or(FlagState::HIDDEN, |(_, state)| *state)
    }
}

/// Read-only resolver over a rule set's visibility rules.
#[derive(Clone, Copy, Debug)]
pub struct VisibilityEngine<'a> {
    rules: &'a VisibilityRules,
}

impl<'a> VisibilityEngine<'a> {
    #[must_use]
    pub fn new(rules: &'a VisibilityRules) -> Self {
        Self { rules }
    }

    /// Whether the observer sees everything about the subject.
    pub fn is_full(&self, observer: &dyn ObserverView, subject: &Subject<'_>) -> bool {
        observer.side() == subject.side
            || self.rules.all_visible()
            || observer.has_researched(subject.kind_id)
            || observer.knows_secret(subject.kind_id)
            || observer.knows_secret(subject.key)
    }

    /// Rules consulted for `subject`, highest precedence first.
    pub fn chain<'s>(&self, subject: &Subject<'s>) -> Vec<&'s VisibilityRule>
    where
        'a: 's,
    {
        let rules = self.rules.rules(subject.category);
        let mut chain: Vec<&VisibilityRule> = Vec::new();

        if let Some(own) = subject.kind.and_then(|k| k.vis.as_ref()) {
            chain.push(own);
        }
        chain.extend(
            rules
                .iter()
                .rev()
                .filter(|r| r.id.as_deref() == Some(subject.kind_id)),
        );
        chain.extend(
            rules
                .iter()
                .rev()
                .filter(|r| r.id.is_none() && !r.classes.is_empty() && r.classes.is_subset(subject.classes)),
        );
        chain.extend(rules.iter().rev().filter(|r| r.is_default()));
        chain
    }

    /// Resolve every flag.
    pub fn resolve(&self, observer: &dyn ObserverView, subject: &Subject<'_>) -> Visibility {
        let full = self.is_full(observer, subject);
        let chain = self.chain(subject);
        let baked = VisibilityRule::baked_default(subject.category);

        let flags = subject
            .category
            .flags()
            .iter()
            .map(|&flag| {
                let visible = chain
                    .iter()
                    .copied()
                    .chain(std::iter::once(&baked))
                    .find_map(|r| r.flags.get(flag))
                    .unwrap_or(false);
                let refresh = chain
                    .iter()
                    .copied()
                    .chain(std::iter::once(&baked))
                    .find_map(|r| r.flags.get_refresh(flag))
                    .unwrap_or(false);
                (flag, FlagState { visible, refresh })
            })
            .collect();

        Visibility {
            category: subject.category,
            full,
            flags,
        }
    }

    /// Resolve one property of the subject.
    ///
    /// The first `propList` override along the chain wins for each of `vis`
    /// and `refresh`; otherwise the `properties` flag applies.
    pub fn property(
        &self,
        observer: &dyn ObserverView,
        subject: &Subject<'_>,
        prop_id: &str,
        prop_classes: &ClassSet,
    ) -> FlagState {
        if self.is_full(observer, subject) {
            return FlagState::FULL;
        }
        let chain = self.chain(subject);
        let overrides = || chain.iter().flat_map(move |r| r.prop_rules(prop_id, prop_classes));
        let fallback = self.resolve(observer, subject).get(VisFlag::Properties);

        FlagState {
            visible: overrides().find_map(|r| r.vis).unwrap_or(fallback.visible),
            refresh: overrides().find_map(|r| r.refresh).unwrap_or(fallback.refresh),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Diagnostics;
    use crate::kinds::Category;
    use crate::rules::merge::{MergeMode, RuleIdentity};
    use crate::visibility::PropVisRule;

    struct Watcher {
        side: SideId,
        researched: Vec<&'static str>,
        secrets: Vec<&'static str>,
    }

    impl Watcher {
        fn new(side: SideId) -> Self {
            Self {
                side,
                researched: Vec::new(),
                secrets: Vec::new(),
            }
        }
    }

    impl ObserverView for Watcher {
        fn side(&self) -> SideId {
            self.side
        }
        fn has_researched(&self, kind_id: &str) -> bool {
            self.researched.contains(&kind_id)
        }
        fn knows_secret(&self, id: &str) -> bool {
            self.secrets.contains(&id)
        }
    }

    fn subject<'a>(kind: &'a EntityKind, classes: &'a ClassSet) -> Subject<'a> {
        Subject {
            kind_id: &kind.id,
            kind: Some(kind),
            key: "flattery-1",
            side: SideId::Two,
            classes,
            category: VisCategory::Argument,
        }
    }

    #[test]
    fn test_owner_sees_everything() {
        let rules = VisibilityRules::new();
        let engine = VisibilityEngine::new(&rules);
        let kind = EntityKind::new("flattery", Category::Argument);
        let classes = ClassSet::new();
        let vis = engine.resolve(&Watcher::new(SideId::Two), &subject(&kind, &classes));
        assert!(vis.full);
        assert_eq!(vis.get(VisFlag::Properties), FlagState::FULL);
    }

    #[test]
    fn test_baked_default_for_opponent() {
        let rules = VisibilityRules::new();
        let engine = VisibilityEngine::new(&rules);
        let kind = EntityKind::new("flattery", Category::Argument);
        let classes = ClassSet::new();
        let vis = engine.resolve(&Watcher::new(SideId::One), &subject(&kind, &classes));

        assert!(!vis.full);
        assert_eq!(vis.get(VisFlag::Name), FlagState::FULL);
        assert_eq!(vis.get(VisFlag::Properties), FlagState::HIDDEN);
    }

    #[test]
    fn test_research_and_secrets() {
        let rules = VisibilityRules::new();
        let engine = VisibilityEngine::new(&rules);
        let kind = EntityKind::new("flattery", Category::Argument);
        let classes = ClassSet::new();

        let mut scholar = Watcher::new(SideId::One);
        scholar.researched.push("flattery");
        assert!(engine.resolve(&scholar, &subject(&kind, &classes)).full);

        let mut spy = Watcher::new(SideId::One);
        spy.secrets.push("flattery-1");
        assert!(engine.resolve(&spy, &subject(&kind, &classes)).full);
    }

    #[test]
    fn test_precedence_chain() {
        let mut rules = VisibilityRules::new();
        let mut diag = Diagnostics::quiet();
        rules
            .merge(
                VisCategory::Argument,
                &RuleIdentity::new(None, ClassSet::parse("loud")),
                MergeMode::Replace,
                |r, _| {
                    r.flags.set(VisFlag::Properties, true);
                    r.flags.set(VisFlag::Traits, true);
                    Ok(())
                },
                &mut diag,
            )
            .unwrap();
        rules
            .merge(
                VisCategory::Argument,
                &RuleIdentity::with_id("flattery"),
                MergeMode::Replace,
                |r, _| {
                    r.flags.set(VisFlag::Traits, false);
                    Ok(())
                },
                &mut diag,
            )
            .unwrap();

        let mut kind = EntityKind::new("flattery", Category::Argument);
        kind.vis = Some(VisibilityRule::new(VisCategory::Argument).with_flag(VisFlag::Name, false, false));
        let engine = VisibilityEngine::new(&rules);
        let classes = ClassSet::parse("loud,short");
        let vis = engine.resolve(&Watcher::new(SideId::One), &subject(&kind, &classes));

        assert!(!vis.get(VisFlag::Name).visible);
        assert!(!vis.get(VisFlag::Traits).visible);
        assert!(vis.get(VisFlag::Properties).visible);
        assert!(!vis.get(VisFlag::Boosters).visible);

        let quiet = ClassSet::new();
        let vis = engine.resolve(&Watcher::new(SideId::One), &subject(&kind, &quiet));
        assert!(!vis.get(VisFlag::Properties).visible);
    }

    #[test]
    fn test_property_overrides() {
        let mut kind = EntityKind::new("flattery", Category::Argument);
        let mut own = VisibilityRule::new(VisCategory::Argument);
        own.prop_list.push(PropVisRule {
            id: Some("sway".to_string()),
            vis: Some(true),
            ..PropVisRule::default()
        });
        kind.vis = Some(own);

        let rules = VisibilityRules::new();
        let engine = VisibilityEngine::new(&rules);
        let classes = ClassSet::new();
        let watcher = Watcher::new(SideId::One);
        let subject = subject(&kind, &classes);

        let sway = engine.property(&watcher, &subject, "sway", &ClassSet::new());
        assert!(sway.visible);
        assert!(!sway.refresh);

        let other = engine.property(&watcher, &subject, "heat", &ClassSet::new());
        assert_eq!(other, FlagState::HIDDEN);
    }
}
