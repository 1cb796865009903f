//! Effect resolution - turning effect specs into property changes.
//!
//! The resolver never mutates the encounter. It expands effect-kind
//! references, resolves each effect's targets, checks its per-target
//! conditions and evaluates its amounts; the caller applies the returned
//! changes to the property graph.

use crate::conditions::all_hold;
use crate::core::{Diagnostics, EntityId, Result, WarningKind};
use crate::encounter::{Bindings, Scope, World};
use crate::kinds::Ruleset;
use crate::properties::{PropChange, PropId};

use super::EffectSpec;

/// Effect-kind references nested deeper than this are ignored.
const MAX_DEPTH: usize = 8;

/// Changes one effect makes to one target.
#[derive(Clone, Debug, PartialEq)]
pub struct Applied {
    pub source: EntityId,
    pub target: EntityId,
    pub property: String,
    pub prop: PropId,
    pub changes: Vec<PropChange>,
}

/// Resolves effects against a rule set's effect kinds.
#[derive(Clone, Copy, Debug)]
pub struct EffectResolver<'a> {
    rules: &'a Ruleset,
}

impl<'a> EffectResolver<'a> {
    #[must_use]
    pub fn new(rules: &'a Ruleset) -> Self {
        Self { rules }
    }

    /// Replace references by the effects of the kinds they name.
    pub fn expand<'s>(&self, effects: &'s [EffectSpec], diag: &mut Diagnostics) -> Vec<&'s EffectSpec>
    where
        'a: 's,
    {
        let mut out = Vec::with_capacity(effects.len());
        self.expand_into(effects, 0, &mut out, diag);
        out
    }

    fn expand_into<'s>(&self, effects: &'s [EffectSpec], depth: usize, out: &mut Vec<&'s EffectSpec>, diag: &mut Diagnostics)
    where
        'a: 's,
    {
        for effect in effects {
            if !effect.is_reference() {
                out.push(effect);
                continue;
            }
            let id = effect.id.as_deref().unwrap_or_default();
            match self.rules.effects.get_by_id(id) {
                Some(kind) if depth < MAX_DEPTH => self.expand_into(&kind.effects, depth + 1, out, diag),
                Some(_) => diag.warn(WarningKind::IgnoredRule, format!("effect `{id}` nests too deeply")),
                None => diag.warn(WarningKind::IgnoredRule, format!("unknown effect `{id}`")),
            }
        }
    }

    /// Targets of `effect` when used by `source`.
    ///
    /// Without target specifications the effect hits `fallback`.
    pub fn targets(
        &self,
        effect: &EffectSpec,
        world: &World<'_>,
        source: EntityId,
        fallback: Option<EntityId>,
        diag: &mut Diagnostics,
    ) -> Vec<EntityId> {
        if effect.targets.is_empty() {
            return match fallback {
                Some(target) => vec![target],
                None => {
                    diag.warn(
                        WarningKind::MissingTarget,
                        format!("effect `{}` has no target", effect.id.as_deref().unwrap_or("?")),
                    );
                    Vec::new()
                }
            };
        }
        let mut found: Vec<EntityId> = Vec::new();
        for spec in &effect.targets {
            for target in spec.get_targets(world.arena, source, diag) {
                if !found.contains(&target) {
                    found.push(target);
                }
            }
        }
        found
    }

    /// Changes `effect` makes, one entry per affected target.
    pub fn resolve(
        &self,
        effect: &EffectSpec,
        world: &World<'_>,
        bindings: &Bindings,
        fallback: Option<EntityId>,
        diag: &mut Diagnostics,
    ) -> Result<Vec<Applied>> {
        let (Some(source), Some(property)) = (bindings.subject, effect.property.as_deref()) else {
            return Ok(Vec::new());
        };
        let mut applied = Vec::new();
        for target in self.targets(effect, world, source, fallback, diag) {
            let bound = bindings.with_target(Some(target));
            if !all_hold(&effect.conds, world, &bound)? {
                continue;
            }
            let Some(prop) = world.entity_prop(target, property) else {
                diag.warn(
                    WarningKind::MissingProperty,
                    format!("target {target} has no property `{property}`"),
                );
                continue;
            };
            let changes = effect.changes(&Scope::new(*world, bound), prop)?;
            applied.push(Applied {
                source,
                target,
                property: property.to_string(),
                prop,
                changes,
            });
        }
        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditions::ExistsCondition;
    use crate::core::{SideId, SideMap};
    use crate::effects::{TargetSpec, TargetType};
    use crate::encounter::{Arena, Side};
    use crate::kinds::{Category, EntityKind};
    use crate::properties::{ChangeOp, PropOwner, Property, PropertyGraph};

    struct Fixture {
        rules: Ruleset,
        arena: Arena,
        graph: PropertyGraph,
        sides: SideMap<Side>,
    }

    impl Fixture {
        fn world(&self) -> World<'_> {
            World::new(&self.rules, &self.arena, &self.graph, &self.sides)
        }
    }

    // A character holding two arguments; only the first has `wit`.
    fn fixture() -> Fixture {
        let mut rules = Ruleset::new();
        rules
            .add_kind(
                EntityKind::new("flattered", Category::Effect)
                    .with_effect(EffectSpec::new("wit").adding(2.0).targeting(TargetSpec::new(TargetType::HeldTraits))),
            )
            .unwrap();
        let mut arena = Arena::new();
        let mut graph = PropertyGraph::new();
        let envoy = arena
            .spawn(&EntityKind::new("envoy", Category::Character), SideId::One, None)
            .unwrap();
        for kind in ["plea", "boast"] {
            let id = arena
                .spawn(&EntityKind::new(kind, Category::Argument), SideId::One, None)
                .unwrap();
            arena.get_mut(id).unwrap().holder = Some(envoy);
        }
        let wit = graph.insert(Property::fixed("wit", PropOwner::Entity(EntityId(1)), 1.0, None, None).unwrap());
        arena.get_mut(EntityId(1)).unwrap().props.insert("wit".to_string(), wit);
        Fixture {
            rules,
            arena,
            graph,
            sides: SideMap::new(Side::new),
        }
    }

    #[test]
    fn test_expand_references() {
        let f = fixture();
        let resolver = EffectResolver::new(&f.rules);
        let mut diag = Diagnostics::quiet();
        let effects = vec![EffectSpec::reference("flattered"), EffectSpec::reference("nothing")];

        let expanded = resolver.expand(&effects, &mut diag);
        assert_eq!(expanded.len(), 1);
        assert_eq!(expanded[0].property.as_deref(), Some("wit"));
        assert!(diag.has(WarningKind::IgnoredRule));
    }

    #[test]
    fn test_missing_property_is_skipped() {
        let f = fixture();
        let resolver = EffectResolver::new(&f.rules);
        let mut diag = Diagnostics::quiet();
        let effect = EffectSpec::new("wit")
            .adding(1.0)
            .targeting(TargetSpec::new(TargetType::AllArguments));

        let applied = resolver
            .resolve(&effect, &f.world(), &Bindings::for_subject(EntityId(0)), None, &mut diag)
            .unwrap();
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].target, EntityId(1));
        assert_eq!(applied[0].changes[0].op, ChangeOp::Add(1.0));
        assert!(diag.has(WarningKind::MissingProperty));
    }

    #[test]
    fn test_fallback_target() {
        let f = fixture();
        let resolver = EffectResolver::new(&f.rules);
        let mut diag = Diagnostics::quiet();
        let effect = EffectSpec::new("wit").setting(5.0);
        let bindings = Bindings::for_subject(EntityId(0));

        let applied = resolver
            .resolve(&effect, &f.world(), &bindings, Some(EntityId(1)), &mut diag)
            .unwrap();
        assert_eq!(applied[0].target, EntityId(1));

        let none = resolver.resolve(&effect, &f.world(), &bindings, None, &mut diag).unwrap();
        assert!(none.is_empty());
        assert!(diag.has(WarningKind::MissingTarget));
    }

    #[test]
    fn test_conditions_filter_targets() {
        let f = fixture();
        let resolver = EffectResolver::new(&f.rules);
        let mut diag = Diagnostics::quiet();
        let effect = EffectSpec::new("wit")
            .adding(1.0)
            .targeting(TargetSpec::new(TargetType::AllArguments))
            .with_cond(ExistsCondition::new().of_kind("boast").exactly(2));

        let applied = resolver
            .resolve(&effect, &f.world(), &Bindings::for_subject(EntityId(0)), None, &mut diag)
            .unwrap();
        assert!(applied.is_empty());
    }
}
