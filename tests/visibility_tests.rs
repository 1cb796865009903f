//! Visibility rule integration tests.
//!
//! These tests load visibility rules from markup and resolve them for
//! observers with and without research, secrets or ownership.

use rust_parley::core::{LoaderOptions, SideId, WarningKind};
use rust_parley::encounter::Side;
use rust_parley::kinds::{Category, ClassSet, Ruleset};
use rust_parley::rules::{RuleLoader, RuleSource};
use rust_parley::visibility::{FlagState, Subject, VisCategory, VisFlag, VisibilityEngine};

fn load(rules: &mut Ruleset, text: &str) -> rust_parley::ParseReport {
    RuleLoader::new(LoaderOptions::silent())
        .parse(rules, RuleSource::Text(text), None)
        .unwrap()
}

fn subject<'a>(rules: &'a Ruleset, kind_id: &'a str, classes: &'a ClassSet) -> Subject<'a> {
    Subject {
        kind_id,
        kind: rules.kind(kind_id),
        key: "plea-1",
        side: SideId::Two,
        classes,
        category: VisCategory::Argument,
    }
}

/// Test that a propList entry collapses across replace and alter.
#[test]
fn test_prop_list_collapse() {
    let mut rules = Ruleset::new();
    load(
        &mut rules,
        r#"<ruleset><visibility><argument id="plea"><property id="heat" vis="false" refresh="false"/></argument></visibility></ruleset>"#,
    );
    load(
        &mut rules,
        r#"<ruleset><visibility><argument id="plea"><property id="heat" vis="true" refresh="true"/></argument></visibility></ruleset>"#,
    );
    load(
        &mut rules,
        r#"<ruleset><visibility><argument id="plea" mode="alter"><property id="heat" refresh="false"/></argument></visibility></ruleset>"#,
    );

    let plea: Vec<_> = rules
        .vis
        .rules(VisCategory::Argument)
        .iter()
        .filter(|r| r.id.as_deref() == Some("plea"))
        .collect();
    assert_eq!(plea.len(), 1);
    assert_eq!(plea[0].prop_list.len(), 1);
    let heat = &plea[0].prop_list[0];
    assert_eq!(heat.id.as_deref(), Some("heat"));
    assert_eq!(heat.vis, Some(true));
    assert_eq!(heat.refresh, Some(false));
}

/// Test that deleting the sole rule of a category regenerates the default.
#[test]
fn test_delete_sole_rule_restores_default() {
    let mut rules = Ruleset::new();
    let report = load(&mut rules, r#"<ruleset><visibility><booster mode="delete"/></visibility></ruleset>"#);

    let boosters = rules.vis.rules(VisCategory::Booster);
    assert_eq!(boosters.len(), 1);
    assert_eq!(boosters[0].flags.get(VisFlag::Name), Some(true));
    assert!(report.warnings.iter().any(|w| w.kind == WarningKind::DefaultVisibilityRestored));
}

/// Test that a missing allVisible attribute leaves the prior value.
#[test]
fn test_all_visible_sequence() {
    let mut rules = Ruleset::new();
    assert_eq!(rules.vis.all_visible_setting(), None);

    load(&mut rules, r#"<ruleset><visibility allVisible="true"/></ruleset>"#);
    assert!(rules.vis.all_visible());
    load(&mut rules, r#"<ruleset><visibility allVisible="false"/></ruleset>"#);
    assert!(!rules.vis.all_visible());
    load(&mut rules, r#"<ruleset><visibility/></ruleset>"#);
    assert_eq!(rules.vis.all_visible_setting(), Some(false));
}

/// Test that a classed encounter rule altered later stays one rule.
#[test]
fn test_classed_encounter_rule_merges() {
    let mut rules = Ruleset::new();
    load(
        &mut rules,
        r#"<ruleset><visibility><encounter class="a,b,c" properties="true" propertiesRefresh="false"/></visibility></ruleset>"#,
    );
    load(
        &mut rules,
        r#"<ruleset><visibility><encounter class="c, b,a" mode="alter" properties="false" propertiesRefresh="true"/></visibility></ruleset>"#,
    );

    let classed: Vec<_> = rules
        .vis
        .rules(VisCategory::Encounter)
        .iter()
        .filter(|r| !r.classes.is_empty())
        .collect();
    assert_eq!(classed.len(), 1);
    assert_eq!(classed[0].classes, ClassSet::parse("a,b,c"));
    assert_eq!(classed[0].flags.get(VisFlag::Properties), Some(false));
    assert_eq!(classed[0].flags.get_refresh(VisFlag::Properties), Some(true));
    assert_eq!(rules.vis.rules(VisCategory::Encounter).len(), 2);
}

/// Test the resolution chain: own rule, id rule, classed rule, default.
#[test]
fn test_resolution_precedence() {
    let mut rules = Ruleset::new();
    load(
        &mut rules,
        r#"<ruleset>
             <argument id="plea" class="fiery">
               <property id="heat" base="1"/>
               <visibility traits="true"/>
             </argument>
             <visibility>
               <argument class="fiery" properties="true" traits="false"/>
               <argument id="plea" boosters="true"/>
               <argument name="false"/>
             </visibility>
           </ruleset>"#,
    );

    let classes = ClassSet::parse("fiery");
    let observer = Side::new(SideId::One);
    let engine = VisibilityEngine::new(&rules.vis);
    let vis = engine.resolve(&observer, &subject(&rules, "plea", &classes));

    assert!(!vis.full);
    assert!(vis.get(VisFlag::Traits).visible);
    assert!(vis.get(VisFlag::Boosters).visible);
    assert!(vis.get(VisFlag::Properties).visible);
    assert!(!vis.get(VisFlag::Name).visible);
    // Refresh settings no rule mentions come from the baked default.
    assert!(vis.get(VisFlag::Name).refresh);
}

/// Test that ownership, research and secrets grant full visibility.
#[test]
fn test_full_visibility_sources() {
    let mut rules = Ruleset::new();
    load(&mut rules, r#"<ruleset><argument id="plea"/></ruleset>"#);
    let classes = ClassSet::new();
    let engine = VisibilityEngine::new(&rules.vis);
    let plea = subject(&rules, "plea", &classes);

    let stranger = Side::new(SideId::One);
    assert!(!engine.is_full(&stranger, &plea));
    assert!(engine.is_full(&Side::new(SideId::Two), &plea));

    let mut scholar = Side::new(SideId::One);
    scholar.research(Category::Argument, "plea");
    assert!(engine.is_full(&scholar, &plea));

    let mut spy = Side::new(SideId::One);
    spy.add_secret("plea-1");
    assert_eq!(engine.property(&spy, &plea, "heat", &classes), FlagState::FULL);
}

/// Test that property overrides beat the properties flag.
#[test]
fn test_property_override() {
    let mut rules = Ruleset::new();
    load(
        &mut rules,
        r#"<ruleset>
             <visibility>
               <argument properties="true" propertiesRefresh="true">
                 <property id="heat" vis="false"/>
                 <property class="public" refresh="false"/>
               </argument>
             </visibility>
           </ruleset>"#,
    );
    let classes = ClassSet::new();
    let observer = Side::new(SideId::One);
    let engine = VisibilityEngine::new(&rules.vis);
    let plea = subject(&rules, "plea", &classes);

    assert_eq!(
        engine.property(&observer, &plea, "heat", &ClassSet::new()),
        FlagState {
            visible: false,
            refresh: true
        }
    );
    assert_eq!(
        engine.property(&observer, &plea, "charm", &ClassSet::parse("public")),
        FlagState {
            visible: true,
            refresh: false
        }
    );
    assert_eq!(engine.property(&observer, &plea, "wit", &ClassSet::new()), FlagState::FULL);
}
