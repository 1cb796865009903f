//! Encounter integration tests.
//!
//! These tests load rules from markup, build encounters from JSON
//! configuration and play turns through the manager.

use rust_parley::core::{EncounterConfig, EntityId, LoaderOptions, RulesError, SideId};
use rust_parley::encounter::{EncounterManager, TurnEvent};
use rust_parley::kinds::Ruleset;
use rust_parley::properties::PropOwner;
use rust_parley::rules::RuleLoader;
use rust_parley::visibility::FlagState;

const RULES: &str = r#"
<ruleset>
  <character id="envoy" name="Envoy" actions="flatter, boast, mingle">
    <property id="poise" base="5" min="-5" max="5"/>
    <property id="favor" base="0"/>
  </character>
  <action id="flatter" name="Flatter" uses="2">
    <cost property="poise" value="-2"/>
    <effect property="favor" add="1"/>
    <target type="allCharacters" side="opposing"/>
  </action>
  <action id="boast" name="Boast">
    <cost property="poise" value="-9"/>
    <effect property="favor" add="3"/>
  </action>
  <action id="mingle" name="Mingle">
    <effect property="favor" add="1"/>
    <effect property="poise"/>
  </action>
  <research id="rhetoric" tier="1" unlocks="envoy"/>
  <visibility>
    <character id="envoy">
      <property id="favor" vis="true" refresh="true"/>
      <property id="poise" vis="true" refresh="false"/>
    </character>
  </visibility>
</ruleset>
"#;

const CONFIG: &str = r#"{"seed": 11, "side1": {"chars": ["envoy"]}, "side2": {"chars": ["envoy"]}}"#;

fn rules() -> Ruleset {
    RuleLoader::new(LoaderOptions::silent())
        .load_str(RULES, Some("parley.xml"))
        .unwrap()
}

fn manager(config: &str) -> EncounterManager {
    let config: EncounterConfig = serde_json::from_str(config).unwrap();
    EncounterManager::new(rules(), config).unwrap()
}

/// The two envoys, side one first.
fn envoys(manager: &EncounterManager) -> (EntityId, EntityId) {
    let one = manager.get_character_by_id("envoy-1").unwrap().id;
    let two = manager.get_character_by_id("envoy-2").unwrap().id;
    (one, two)
}

fn action(manager: &EncounterManager, character: EntityId, kind: &str) -> EntityId {
    *manager
        .entity(character)
        .unwrap()
        .actions()
        .iter()
        .find(|&&a| manager.entity(a).unwrap().kind == kind)
        .unwrap()
}

/// Test that a turn pays costs, applies effects and refreshes what the
/// opposing side knows.
#[test]
fn test_turn_from_markup() {
    let mut manager = manager(CONFIG);
    let (envoy, other) = envoys(&manager);
    let flatter = action(&manager, envoy, "flatter");

    manager.order_with_target(envoy, flatter, Some(other)).unwrap();
    let events = manager.run_turn().unwrap();

    assert_eq!(manager.property_value(envoy, "poise"), Some(3.0));
    assert_eq!(manager.property_value(other, "favor"), Some(1.0));
    assert!(events.contains(&TurnEvent::CostPaid {
        action: flatter,
        property: "poise".to_string(),
        owner: PropOwner::Entity(envoy),
        value: 3.0,
    }));
    assert!(events.contains(&TurnEvent::EffectApplied {
        source: flatter,
        target: other,
        property: "favor".to_string(),
        value: 1.0,
    }));
    assert!(events.contains(&TurnEvent::KnowledgeRefreshed {
        observer: SideId::One,
        entity: other,
        property: "favor".to_string(),
        value: 1.0,
    }));
    assert!(events.first().is_some_and(TurnEvent::is_boundary));
    assert!(events.last().is_some_and(TurnEvent::is_boundary));

    // Side two saw poise once and never refreshes it.
    assert_eq!(manager.observed_property(SideId::Two, envoy, "poise"), Some(5.0));
    assert_eq!(manager.observed_property(SideId::One, envoy, "poise"), Some(3.0));
    assert_eq!(manager.observed_property(SideId::One, other, "favor"), Some(1.0));
}

/// Test that an action with limited uses finishes.
#[test]
fn test_uses_run_out() {
    let mut manager = manager(CONFIG);
    let (envoy, other) = envoys(&manager);
    let flatter = action(&manager, envoy, "flatter");

    for _ in 0..2 {
        manager.order_with_target(envoy, flatter, Some(other)).unwrap();
        manager.run_turn().unwrap();
    }

    assert_eq!(manager.property_value(envoy, "poise"), Some(1.0));
    assert_eq!(manager.property_value(other, "favor"), Some(2.0));
    assert!(manager.entity(flatter).unwrap().finished);
    assert!(matches!(
        manager.order_with_target(envoy, flatter, Some(other)),
        Err(RulesError::Order { .. })
    ));
}

/// Test that an unpayable order is rejected and changes nothing.
#[test]
fn test_unpayable_order_rejected() {
    let mut manager = manager(CONFIG);
    let (envoy, other) = envoys(&manager);
    let boast = action(&manager, envoy, "boast");

    manager.order_with_target(envoy, boast, Some(other)).unwrap();
    let events = manager.run_turn().unwrap();

    assert!(events.iter().any(|e| matches!(
        e,
        TurnEvent::OrderRejected { character, action, .. } if *character == envoy && *action == boast
    )));
    assert!(!events.iter().any(|e| matches!(e, TurnEvent::CostPaid { .. })));
    assert_eq!(manager.property_value(envoy, "poise"), Some(5.0));
    assert_eq!(manager.property_value(other, "favor"), Some(0.0));
    assert!(manager.history().iter().any(|e| matches!(e, TurnEvent::OrderRejected { .. })));
}

/// Test that a cost the payer's floor would absorb is still refused.
#[test]
fn test_overdraw_refused_at_floor() {
    let markup = RULES.replace(r#"base="5" min="-5""#, r#"base="1" min="0""#);
    let rules = RuleLoader::new(LoaderOptions::silent()).load_str(&markup, None).unwrap();
    let config: EncounterConfig = serde_json::from_str(CONFIG).unwrap();
    let mut manager = EncounterManager::new(rules, config).unwrap();
    let (envoy, other) = envoys(&manager);
    let flatter = action(&manager, envoy, "flatter");

    manager.order_with_target(envoy, flatter, Some(other)).unwrap();
    let events = manager.run_turn().unwrap();

    assert!(events.iter().any(|e| matches!(e, TurnEvent::OrderRejected { .. })));
    assert_eq!(manager.property_value(envoy, "poise"), Some(1.0));
    assert_eq!(manager.property_value(other, "favor"), Some(0.0));
}

/// Test that an order failing midway keeps neither its changes nor its target.
#[test]
fn test_failed_effect_rolls_back() {
    let mut manager = manager(CONFIG);
    let (envoy, other) = envoys(&manager);
    let mingle = action(&manager, envoy, "mingle");

    manager.order_with_target(envoy, mingle, Some(other)).unwrap();
    let events = manager.run_turn().unwrap();

    assert!(events.iter().any(|e| matches!(e, TurnEvent::OrderRejected { .. })));
    assert!(!events.iter().any(|e| matches!(e, TurnEvent::EffectApplied { .. })));
    assert_eq!(manager.property_value(other, "favor"), Some(0.0));
    assert_eq!(manager.entity(mingle).unwrap().target, None);
}

/// Test that orders aimed outside the action's targets are refused.
#[test]
fn test_illegal_target_refused() {
    let mut manager = manager(CONFIG);
    let (envoy, _) = envoys(&manager);
    let flatter = action(&manager, envoy, "flatter");

    assert!(manager.order_with_target(envoy, flatter, Some(envoy)).is_err());
    assert!(manager.pending_orders().is_empty());
}

/// Test that research grants full and refreshing sight of a kind.
#[test]
fn test_research_refreshes_everything() {
    let mut manager =
        manager(r#"{"seed": 11, "side1": {"chars": ["envoy"], "research": ["rhetoric"]}, "side2": {"chars": ["envoy"]}}"#);
    let (envoy, other) = envoys(&manager);
    let flatter = action(&manager, other, "flatter");

    assert!(manager.visibility_of(SideId::One, other).unwrap().full);
    assert!(!manager.visibility_of(SideId::Two, envoy).unwrap().full);

    manager.order_with_target(other, flatter, Some(envoy)).unwrap();
    manager.run_turn().unwrap();

    assert_eq!(manager.observed_property(SideId::One, other, "poise"), Some(3.0));
}

/// Test that a secret naming one entity reveals that entity only.
#[test]
fn test_secret_reveals_entity() {
    let manager = manager(r#"{"side1": {"chars": ["envoy"], "secrets": ["envoy-2"]}, "side2": {"chars": ["envoy"]}}"#);
    let (envoy, other) = envoys(&manager);

    assert_eq!(
        manager.property_visibility(SideId::One, other, "poise"),
        Some(FlagState::FULL)
    );
    assert_eq!(
        manager.property_visibility(SideId::Two, envoy, "poise"),
        Some(FlagState {
            visible: true,
            refresh: false
        })
    );
}

/// Test that unknown kinds in the configuration are configuration errors.
#[test]
fn test_bad_config() {
    for json in [
        r#"{"side1": {"chars": ["ghost"]}, "side2": {"chars": ["envoy"]}}"#,
        r#"{"side1": {"chars": ["envoy"], "research": ["alchemy"]}, "side2": {"chars": ["envoy"]}}"#,
        r#"{"side1": {"chars": ["envoy"], "args": ["plea"]}, "side2": {"chars": ["envoy"]}}"#,
        r#"{"side1": {"chars": ["envoy"]}}"#,
    ] {
        let config: EncounterConfig = serde_json::from_str(json).unwrap();
        assert!(
            matches!(EncounterManager::new(rules(), config), Err(RulesError::Config { .. })),
            "{json}"
        );
    }
}

/// Test that the same seed replays the same turns.
#[test]
fn test_seeded_replay() {
    let play = || {
        let mut manager = manager(CONFIG);
        let (envoy, other) = envoys(&manager);
        for (agent, aim) in [(envoy, other), (other, envoy)] {
            let flatter = action(&manager, agent, "flatter");
            manager.order_with_target(agent, flatter, Some(aim)).unwrap();
        }
        manager.run_turn().unwrap()
    };

    assert_eq!(play(), play());
}
