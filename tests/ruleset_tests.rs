//! Rule loading integration tests.
//!
//! These tests load rule markup end to end and check merge semantics,
//! validation and error reporting across successive rule sets.

use rust_parley::core::{LoaderOptions, ParseErrorKind, RulesError};
use rust_parley::kinds::{Category, EntityKind, Ruleset};
use rust_parley::rules::{RuleLoader, RuleSource};

const BASE: &str = r#"
<rulesets>
  <ruleset>
    <character id="envoy" name="Envoy" class="diplomat" actions="flatter">
      <property id="poise" base="3" min="0" max="6"/>
      <property id="favor" base="0"/>
    </character>
    <action id="flatter" name="Flatter" uses="3">
      <cost id="poise-cost" property="poise" value="-1"/>
      <effect id="warm" property="favor" add="1"/>
      <target type="allCharacters" side="opposing"/>
    </action>
    <argument id="plea" name="Plea">
      <property id="heat" base="2"/>
    </argument>
  </ruleset>
</rulesets>
"#;

fn loader() -> RuleLoader {
    RuleLoader::new(LoaderOptions::silent())
}

fn base() -> Ruleset {
    loader().load_str(BASE, Some("base.xml")).unwrap()
}

fn patch(rules: &mut Ruleset, text: &str) {
    loader().parse(rules, RuleSource::Text(text), Some("patch.xml")).unwrap();
}

/// Test that parsing the same replace rule twice equals parsing it once.
#[test]
fn test_replace_is_idempotent() {
    let once = base();
    let mut twice = base();
    patch(&mut twice, BASE);

    assert_eq!(once, twice);
}

/// Test that alter keeps attributes and children it does not mention.
#[test]
fn test_alter_overlays() {
    let mut rules = base();
    patch(
        &mut rules,
        r#"<ruleset mode="alter">
             <action id="flatter" uses="5">
               <cost id="poise-cost" value="-2"/>
             </action>
           </ruleset>"#,
    );

    let flatter = rules.actions.get_by_id("flatter").unwrap();
    assert_eq!(flatter.uses, Some(5));
    assert_eq!(flatter.display_name(), "Flatter");
    assert_eq!(flatter.costs.len(), 1);
    assert_eq!(flatter.costs[0].property.as_deref(), Some("poise"));
    assert_eq!(flatter.effects.len(), 1);
    assert_eq!(flatter.targets.len(), 1);
}

/// Test that replace discards everything the new rule does not restate.
#[test]
fn test_replace_discards() {
    let mut rules = base();
    patch(&mut rules, r#"<ruleset><action id="flatter" uses="1"/></ruleset>"#);

    let flatter = rules.actions.get_by_id("flatter").unwrap();
    assert_eq!(flatter.uses, Some(1));
    assert!(flatter.name.is_none());
    assert!(flatter.costs.is_empty());
    assert!(flatter.effects.is_empty());
}

/// Test that a replaced rule moves to the end of its partition.
#[test]
fn test_replace_moves_to_end() {
    let mut rules = base();
    patch(&mut rules, r#"<ruleset><argument id="retort"/></ruleset>"#);
    patch(&mut rules, r#"<ruleset><argument id="plea"/></ruleset>"#);

    let ids: Vec<&str> = rules.args.iter().map(|k| k.id.as_str()).collect();
    assert_eq!(ids, vec!["retort", "plea"]);
}

/// Test delete of top-level and nested rules, and delete of a missing rule.
#[test]
fn test_delete() {
    let mut rules = base();
    let report = loader()
        .parse(
            &mut rules,
            RuleSource::Text(
                r#"<ruleset>
                     <argument id="plea" mode="delete"/>
                     <argument id="never-existed" mode="delete"/>
                     <character id="envoy" mode="alter">
                       <property id="favor" mode="delete"/>
                     </character>
                   </ruleset>"#,
            ),
            None,
        )
        .unwrap();

    assert!(rules.args.get_by_id("plea").is_none());
    assert_eq!(rules.chars.get_by_id("envoy").unwrap().props.len(), 1);
    assert_eq!(report.deleted, 2);
    assert_eq!(report.ignored, 1);
    assert_eq!(report.altered, 1);
}

/// Test that nested rules inherit the mode of their enclosing rule.
#[test]
fn test_mode_inherited_by_children() {
    let mut rules = base();
    patch(
        &mut rules,
        r#"<ruleset>
             <character id="envoy" mode="alter">
               <property id="poise" max="9"/>
             </character>
           </ruleset>"#,
    );

    let envoy = rules.chars.get_by_id("envoy").unwrap();
    let poise = &envoy.props[0];
    assert_eq!(envoy.props.len(), 2);
    assert!(poise.val.base.is_some());
    assert!(poise.min.base.is_some());
    assert_eq!(envoy.classes.len(), 1);
}

/// Test that a failing rule set leaves the previous rules in place.
#[test]
fn test_parse_is_atomic() {
    let mut rules = base();
    let before = rules.clone();

    let result = loader().parse(
        &mut rules,
        RuleSource::Text(
            r#"<ruleset mode="alter">
                 <action id="flatter" uses="9"/>
                 <argument id="plea"><property id="heat" tethered="maybe"/></argument>
               </ruleset>"#,
        ),
        None,
    );

    assert!(matches!(result, Err(RulesError::Parse(_))));
    assert_eq!(rules, before);
}

/// Test that parse errors name the file, element path and line.
#[test]
fn test_error_location() {
    let text = "<ruleset>\n<action id=\"flatter\">\n<cost property=\"poise\" value=\"-\"/>\n</action>\n</ruleset>";
    let Err(RulesError::Parse(error)) = loader().load_str(text, Some("broken.xml")) else {
        panic!("expected a parse error");
    };

    assert!(matches!(error.kind, ParseErrorKind::InvalidValue { .. }));
    assert_eq!(error.file.as_deref(), Some("broken.xml"));
    assert_eq!(error.line, Some(3));
    assert_eq!(error.path, "ruleset[1]/action#flatter/cost[1]");
    assert!(error.to_string().contains("broken.xml"));
}

/// Test that `validate` rejects empty, numeric and duplicated ids.
#[test]
fn test_validate() {
    assert!(base().validate().is_ok());

    let mut numeric = Ruleset::new();
    numeric.args.add(EntityKind::new("12", Category::Argument)).unwrap();
    assert!(matches!(numeric.validate(), Err(RulesError::Validation { .. })));

    let mut empty = Ruleset::new();
    empty.args.add(EntityKind::new("", Category::Argument)).unwrap();
    assert!(empty.validate().is_err());

    let mut duplicated = base();
    duplicated.boosters.add(EntityKind::new("plea", Category::Booster)).unwrap();
    assert!(matches!(duplicated.validate(), Err(RulesError::DuplicateId { .. })));
}

/// Test that a compiled rule set survives a bincode round trip.
#[test]
fn test_byte_cache() {
    let rules = base();
    let bytes = rules.to_bytes().unwrap();
    assert_eq!(Ruleset::from_bytes(&bytes).unwrap(), rules);
}
