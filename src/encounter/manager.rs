//! The encounter manager: instantiation, orders and turn resolution.
//!
//! A turn resolves every queued order. The seeded RNG decides which party
//! goes first; within a party orders resolve in queue order. Each order
//! checks its action's conditions, pays its costs transactionally (all
//! costs are simulated together and committed only if every one is
//! payable), then applies its effects. An order that fails at any step
//! leaves the property graph exactly as it found it.
//!
//! After the orders, each party's knowledge of the other entities is
//! refreshed according to the visibility rules.

use std::sync::Arc;

use im::Vector;
use rustc_hash::{FxHashMap, FxHashSet};

use super::arena::Arena;
use super::entity::{Entity, EntityVariant};
use super::event::TurnEvent;
use super::side::Side;
use super::world::{Bindings, World};
use crate::conditions::all_hold;
use crate::core::{
    Diagnostics, EncounterConfig, EncounterRng, EntityId, Result, RulesError, SideConfig, SideId, SideMap,
    WarningKind,
};
use crate::effects::{EffectResolver, EffectSpec};
use crate::kinds::{Category, ClassList, EntityKind, Ruleset};
use crate::properties::{Bound, PropChange, PropId, PropOwner, Property, PropertyGraph, SourceAnchor, SourceRef};
use crate::visibility::{FlagState, Subject, Visibility, VisibilityEngine};

/// Trait chains deeper than this are rejected.
const MAX_TRAIT_DEPTH: usize = 8;

/// A queued command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Order {
    pub character: EntityId,
    pub action: EntityId,
    pub target: Option<EntityId>,
}

/// A property source waiting for every entity to exist.
#[derive(Clone, Debug)]
struct PendingLink {
    prop: PropId,
    bound: Bound,
    owner: EntityId,
    source: SourceRef,
}

/// Runs one encounter over a loaded rule set.
#[derive(Clone, Debug)]
pub struct EncounterManager {
    rules: Arc<Ruleset>,
    arena: Arena,
    graph: PropertyGraph,
    sides: SideMap<Side>,
    encounter: EntityId,
    rng: EncounterRng,
    orders: Vec<Order>,
    turn: u32,
    /// Last value of each property recorded by each observer.
    knowledge: FxHashMap<(SideId, PropId), f64>,
    revealed: FxHashSet<(SideId, EntityId)>,
    history: Vector<TurnEvent>,
    diag: Diagnostics,
}

impl EncounterManager {
    /// Instantiate the encounter described by `config`.
    pub fn new(rules: impl Into<Arc<Ruleset>>, config: EncounterConfig) -> Result<Self> {
        for (name, side) in [("side1", &config.side1), ("side2", &config.side2)] {
            if side.chars.is_empty() {
                return Err(RulesError::config(format!("{name} needs at least one character")));
            }
        }
        let rules: Arc<Ruleset> = rules.into();

        let mut arena = Arena::new();
        let encounter = match config.encounter.as_deref() {
            Some(id) => {
                let kind = rules
                    .encounters
                    .get_by_id(id)
                    .ok_or_else(|| RulesError::config(format!("unknown encounter `{id}`")))?;
                arena.spawn(kind, SideId::Neutral, Some("encounter".to_string()))?
            }
            None => {
                let kind = EntityKind::new("encounter", Category::Encounter);
                arena.spawn(&kind, SideId::Neutral, Some("encounter".to_string()))?
            }
        };

        let mut manager = Self {
            rules: Arc::clone(&rules),
            arena,
            graph: PropertyGraph::new(),
            sides: SideMap::new(Side::new),
            encounter,
            rng: EncounterRng::new(config.seed),
            orders: Vec::new(),
            turn: 0,
            knowledge: FxHashMap::default(),
            revealed: FxHashSet::default(),
            history: Vector::new(),
            diag: Diagnostics::new(),
        };

        let mut links = Vec::new();
        if let Some(kind) = config.encounter.as_deref().and_then(|id| rules.encounters.get_by_id(id)) {
            manager.attach(&rules, kind, encounter, &mut links, 0)?;
        }
        for (side, side_config) in [
            (SideId::Neutral, &config.neutral),
            (SideId::One, &config.side1),
            (SideId::Two, &config.side2),
        ] {
            manager.populate(&rules, side, side_config, &mut links)?;
        }
        manager.link_sources(links)?;
        manager.graph.recompute_all(&mut manager.diag)?;

        let passive: Vec<EntityId> = manager
            .arena
            .iter()
            .filter(|e| is_passive(e.category))
            .map(|e| e.id)
            .collect();
        for id in passive {
            manager.apply_passive(&rules, id)?;
        }

        let mut events = Vec::new();
        manager.refresh_knowledge(&mut events);
        manager.history.extend(events);

        log::info!(
            "encounter ready: {} entities, {} properties",
            manager.arena.len(),
            manager.graph.len()
        );
        Ok(manager)
    }

    fn populate(&mut self, rules: &Ruleset, side: SideId, config: &SideConfig, links: &mut Vec<PendingLink>) -> Result<()> {
        for prop in &config.props {
            let property = Property::fixed(prop.id.clone(), PropOwner::Side(side), prop.base, prop.min, prop.max)?;
            let id = self.graph.insert(property);
            self.sides[side].props.insert(prop.id.clone(), id);
        }
        for research in &config.research {
            self.research(side, research)?;
        }
        for secret in &config.secrets {
            self.sides[side].add_secret(secret.clone());
        }

        for id in &config.chars {
            let kind = lookup(&rules.chars, id, "character")?;
            let character = self.instantiate(rules, kind, side, None, None, links)?;
            for action in kind.actions.iter().chain(&config.actions) {
                let action_kind = lookup(&rules.actions, action, "action")?;
                let action = self.instantiate(rules, action_kind, side, Some(character), None, links)?;
                self.give_action(character, action);
            }
        }
        for id in &config.args {
            let kind = lookup(&rules.args, id, "argument")?;
            self.instantiate(rules, kind, side, None, None, links)?;
        }
        for id in &config.boosters {
            let kind = lookup(&rules.boosters, id, "booster")?;
            self.instantiate(rules, kind, side, None, None, links)?;
        }
        Ok(())
    }

    fn give_action(&mut self, character: EntityId, action: EntityId) {
        if let Some(EntityVariant::Character { actions }) = self.arena.get_mut(character).map(|e| &mut e.variant) {
            actions.push(action);
        }
    }

    /// Create an entity of `kind` with its properties and traits and file
    /// it with its side.
    fn instantiate(
        &mut self,
        rules: &Ruleset,
        kind: &EntityKind,
        side: SideId,
        holder: Option<EntityId>,
        creator: Option<EntityId>,
        links: &mut Vec<PendingLink>,
    ) -> Result<EntityId> {
        let id = self.arena.spawn(kind, side, None)?;
        if let Some(entity) = self.arena.get_mut(id) {
            entity.holder = holder;
            entity.creator = creator;
        }
        self.attach(rules, kind, id, links, 0)?;

        let side = &mut self.sides[side];
        match kind.category {
            Category::Action => side.actions.push(id),
            Category::Argument => side.args.push(id),
            Category::Character => side.chars.push(id),
            Category::Booster => side.add_booster(id, kind.scope),
            Category::Trait | Category::Effect | Category::Encounter => {}
        }
        Ok(id)
    }

    /// Give `id` the properties and traits of `kind`.
    fn attach(
        &mut self,
        rules: &Ruleset,
        kind: &EntityKind,
        id: EntityId,
        links: &mut Vec<PendingLink>,
        depth: usize,
    ) -> Result<()> {
        for template in &kind.props {
            let Some(prop_id) = template.id.as_deref() else {
                continue;
            };
            if self.arena.get(id).is_some_and(|e| e.props.contains_key(prop_id)) {
                continue;
            }
            let prop = self.graph.insert(Property::from_template(template, PropOwner::Entity(id))?);
            if let Some(entity) = self.arena.get_mut(id) {
                entity.props.insert(prop_id.to_string(), prop);
            }
            for bound in Bound::ALL {
                for source in &template.bound(bound).sources {
                    links.push(PendingLink {
                        prop,
                        bound,
                        owner: id,
                        source: source.clone(),
                    });
                }
            }
        }

        if kind.traits.is_empty() {
            return Ok(());
        }
        if depth >= MAX_TRAIT_DEPTH {
            return Err(RulesError::validation(&kind.id, "traits nest too deeply"));
        }
        let side = self.arena.require(id)?.side;
        for reference in &kind.traits {
            let trait_id = reference.kind_id().unwrap_or_default();
            let trait_kind = rules
                .trait_kind(trait_id)
                .ok_or_else(|| RulesError::validation(&kind.id, format!("unknown trait `{trait_id}`")))?;
            let entity = self.arena.spawn(trait_kind, side, None)?;
            if let Some(entity) = self.arena.get_mut(entity) {
                entity.holder = Some(id);
                entity.classes.extend_from(&reference.classes);
            }
            self.attach(rules, trait_kind, entity, links, depth + 1)?;
        }
        Ok(())
    }

    fn resolve_source(&self, owner: EntityId, source: &SourceRef) -> Option<PropId> {
        let entity = self.arena.get(owner)?;
        let anchor = match source.anchor {
            SourceAnchor::Own => Some(owner),
            SourceAnchor::Holder => entity.holder,
            SourceAnchor::Creator => entity.creator,
            SourceAnchor::Target => entity.target,
            SourceAnchor::Encounter => Some(self.encounter),
            SourceAnchor::Side => return self.sides[entity.side].prop(&source.prop),
        };
        self.arena.get(anchor?)?.prop(&source.prop)
    }

    fn link_sources(&mut self, links: Vec<PendingLink>) -> Result<()> {
        for link in links {
            match self.resolve_source(link.owner, &link.source) {
                Some(source) => self.graph.link(link.prop, link.bound, source)?,
                None => self.diag.warn(
                    WarningKind::UnresolvedSource,
                    format!("{} cannot read source `{}`", link.owner, link.source),
                ),
            }
        }
        Ok(())
    }

    /// Grant the unlocks of research rule `id` to `side`.
    pub fn research(&mut self, side: SideId, id: &str) -> Result<()> {
        let rule = self
            .rules
            .research
            .get_by_id(id)
            .ok_or_else(|| RulesError::config(format!("unknown research `{id}`")))?;
        for unlock in &rule.unlocks {
            let kind = self
                .rules
                .kind(unlock)
                .ok_or_else(|| RulesError::config(format!("research `{id}` unlocks unknown kind `{unlock}`")))?;
            if !self.sides[side].research(kind.category, unlock) {
                self.diag.warn(
                    WarningKind::IgnoredRule,
                    format!("{} kinds cannot be researched (`{unlock}`)", kind.category),
                );
            }
        }
        Ok(())
    }

    /// Create an entity of kind `kind_id` mid-encounter.
    ///
    /// Effect kinds become items. Passive effects of the new entity and its
    /// traits apply immediately.
    pub fn spawn(
        &mut self,
        kind_id: &str,
        side: SideId,
        holder: Option<EntityId>,
        creator: Option<EntityId>,
    ) -> Result<EntityId> {
        let rules = Arc::clone(&self.rules);
        let kind = rules
            .kind(kind_id)
            .ok_or_else(|| RulesError::config(format!("unknown kind `{kind_id}`")))?;
        let first = self.arena.len();
        let mut links = Vec::new();
        let id = self.instantiate(&rules, kind, side, holder, creator, &mut links)?;
        if let (Category::Action, Some(holder)) = (kind.category, holder) {
            self.give_action(holder, id);
        }
        self.link_sources(links)?;
        self.graph.recompute_all(&mut self.diag)?;

        let created: Vec<EntityId> = self.arena.iter().skip(first).map(|e| e.id).collect();
        for entity in created {
            if self.arena.get(entity).is_some_and(|e| is_passive(e.category)) {
                self.apply_passive(&rules, entity)?;
            }
        }
        Ok(id)
    }

    fn world(&self) -> World<'_> {
        World::new(&self.rules, &self.arena, &self.graph, &self.sides).with_encounter(Some(self.encounter))
    }

    fn apply_passive(&mut self, rules: &Ruleset, id: EntityId) -> Result<()> {
        let entity = self.arena.require(id)?;
        let Some(kind) = rules.kind(&entity.kind) else {
            return Ok(());
        };
        let fallback = entity.holder.or(Some(id));
        let bindings = Bindings::for_subject(id);
        self.apply_effects(rules, &kind.effects, &bindings, fallback)?;
        Ok(())
    }

    /// Resolve and apply `effects`, one at a time.
    fn apply_effects(
        &mut self,
        rules: &Ruleset,
        effects: &[EffectSpec],
        bindings: &Bindings,
        fallback: Option<EntityId>,
    ) -> Result<Vec<TurnEvent>> {
        let resolver = EffectResolver::new(rules);
        let mut events = Vec::new();
        for effect in resolver.expand(effects, &mut self.diag) {
            let world = World::new(rules, &self.arena, &self.graph, &self.sides).with_encounter(Some(self.encounter));
            let applied = resolver.resolve(effect, &world, bindings, fallback, &mut self.diag)?;
            for change in applied {
                self.graph.apply(&change.changes, &mut self.diag)?;
                events.push(TurnEvent::EffectApplied {
                    source: change.source,
                    target: change.target,
                    property: change.property,
                    value: self.graph.value(change.prop).unwrap_or_default(),
                });
            }
        }
        Ok(events)
    }

    /// Queue `character` to use `action` without an explicit target.
    pub fn order(&mut self, character: EntityId, action: EntityId) -> Result<()> {
        self.order_with_target(character, action, None)
    }

    /// Queue `character` to use `action` on `target`.
    pub fn order_with_target(&mut self, character: EntityId, action: EntityId, target: Option<EntityId>) -> Result<()> {
        self.check_order(character, action, target)?;
        self.orders.push(Order {
            character,
            action,
            target,
        });
        Ok(())
    }

    fn check_order(&self, character: EntityId, action: EntityId, target: Option<EntityId>) -> Result<()> {
        let agent = self.arena.require(character)?;
        if agent.category != Category::Character {
            return Err(RulesError::order(format!("{} is not a character", agent.key)));
        }
        if !agent.alive {
            return Err(RulesError::order(format!("{} is not alive", agent.key)));
        }
        let used = self.arena.require(action)?;
        if !agent.actions().contains(&action) {
            return Err(RulesError::order(format!("{} does not hold {}", agent.key, used.key)));
        }
        if used.finished {
            return Err(RulesError::order(format!("{} is finished", used.key)));
        }
        if let Some(target) = target {
            let aimed = self.arena.require(target)?;
            let legal = self.rules.kind(&used.kind).map_or(true, |kind| {
                let mut quiet = Diagnostics::quiet();
                kind.targets.is_empty()
                    || kind
                        .targets
                        .iter()
                        .any(|spec| spec.is_target(&self.arena, target, action, &mut quiet))
            });
            if !legal {
                return Err(RulesError::order(format!("{} cannot target {}", used.key, aimed.key)));
            }
        }
        Ok(())
    }

    /// Resolve every queued order and refresh knowledge.
    pub fn run_turn(&mut self) -> Result<Vec<TurnEvent>> {
        self.turn += 1;
        let mut events = vec![TurnEvent::TurnStarted { turn: self.turn }];

        let parties = self.rng.party_order();
        let rank = |side: SideId| parties.iter().position(|&p| p == side).unwrap_or(parties.len());
        let mut orders = std::mem::take(&mut self.orders);
        orders.sort_by_key(|order| self.arena.get(order.character).map_or(parties.len(), |e| rank(e.side)));
        log::debug!("turn {}: {} orders, {} first", self.turn, orders.len(), parties[0]);

        for order in orders {
            let checkpoint = self.graph.clone();
            let aimed_at = self.arena.get(order.action).and_then(|a| a.target);
            match self.resolve_order(order) {
                Ok(resolved) => events.extend(resolved),
                Err(error) => {
                    self.graph = checkpoint;
                    if let Some(action) = self.arena.get_mut(order.action) {
                        action.target = aimed_at;
                    }
                    log::debug!("order {:?} rejected: {error}", order);
                    events.push(TurnEvent::OrderRejected {
                        character: order.character,
                        action: order.action,
                        reason: error.to_string(),
                    });
                }
            }
        }

        self.refresh_knowledge(&mut events);
        events.push(TurnEvent::TurnEnded { turn: self.turn });
        self.history.extend(events.iter().cloned());
        Ok(events)
    }

    fn resolve_order(&mut self, order: Order) -> Result<Vec<TurnEvent>> {
        self.check_order(order.character, order.action, order.target)?;
        let rules = Arc::clone(&self.rules);
        let kind_id = self.arena.require(order.action)?.kind.clone();
        let kind = rules
            .kind(&kind_id)
            .ok_or_else(|| RulesError::order(format!("unknown action kind `{kind_id}`")))?;
        let bindings = Bindings::for_subject(order.action)
            .with_agent(Some(order.character))
            .with_object(order.target)
            .with_target(order.target);

        if !all_hold(&kind.conds, &self.world(), &bindings)? {
            return Err(RulesError::order(format!("conditions of `{kind_id}` are not met")));
        }

        let mut events = self.pay_costs(kind, order, &bindings)?;

        if let Some(action) = self.arena.get_mut(order.action) {
            action.target = order.target;
        }
        let applied = self.apply_effects(&rules, &kind.effects, &bindings, order.target)?;
        let mut targets: Vec<EntityId> = Vec::new();
        for event in &applied {
            if let TurnEvent::EffectApplied { target, .. } = event {
                if !targets.contains(target) {
                    targets.push(*target);
                }
            }
        }
        events.extend(applied);

        if let Some(action) = self.arena.get_mut(order.action) {
            if let EntityVariant::Action { uses_left: Some(left) } = &mut action.variant {
                *left = left.saturating_sub(1);
                if *left == 0 {
                    action.finished = true;
                }
            }
        }
        events.push(TurnEvent::ActionResolved {
            character: order.character,
            action: order.action,
            targets,
        });
        Ok(events)
    }

    fn pay_costs(&mut self, kind: &EntityKind, order: Order, bindings: &Bindings) -> Result<Vec<TurnEvent>> {
        if kind.costs.is_empty() {
            return Ok(Vec::new());
        }
        let mut planned = Vec::with_capacity(kind.costs.len());
        {
            let world = self.world();
            for cost in &kind.costs {
                let prop = cost.payer(&world, bindings)?;
                planned.push((cost, prop, cost.change(&world, bindings, prop)?));
            }
        }
        let changes: Vec<PropChange> = planned.iter().map(|(_, _, change)| *change).collect();
        self.graph.simulate(&changes, &mut self.diag)?;

        let mut payable = true;
        {
            let world = self.world();
            for (cost, prop, _) in &planned {
                if !cost.is_met(&world, bindings, *prop)? {
                    payable = false;
                    break;
                }
            }
        }
        if !payable {
            self.graph.discard();
            return Err(RulesError::order(format!("costs of `{}` cannot be paid", kind.id)));
        }
        self.graph.commit();

        Ok(planned
            .into_iter()
            .filter_map(|(cost, prop, _)| {
                let property = self.graph.get(prop)?;
                Some(TurnEvent::CostPaid {
                    action: order.action,
                    property: cost.property.clone().unwrap_or_default(),
                    owner: property.owner,
                    value: property.value(),
                })
            })
            .collect())
    }

    fn refresh_knowledge(&mut self, events: &mut Vec<TurnEvent>) {
        let engine = VisibilityEngine::new(&self.rules.vis);
        for observer in SideId::PARTIES {
            let view = &self.sides[observer];
            for entity in &self.arena {
                if entity.side == observer {
                    continue;
                }
                let Some(subject) = subject_of(&self.rules, entity) else {
                    continue;
                };
                let visibility = engine.resolve(view, &subject);
                let seen = visibility.full
                    || subject
                        .category
                        .flags()
                        .iter()
                        .any(|&flag| visibility.get(flag).visible);
                if seen && self.revealed.insert((observer, entity.id)) {
                    events.push(TurnEvent::Revealed {
                        observer,
                        entity: entity.id,
                        property: None,
                    });
                }

                let mut props: Vec<(&String, &PropId)> = entity.props.iter().collect();
                props.sort_by_key(|(_, id)| **id);
                for (name, &prop) in props {
                    let Some(property) = self.graph.get(prop) else {
                        continue;
                    };
                    let state = engine.property(view, &subject, name, &property.classes);
                    if !state.visible {
                        continue;
                    }
                    let value = property.value();
                    match self.knowledge.get(&(observer, prop)).copied() {
                        None => {
                            self.knowledge.insert((observer, prop), value);
                            events.push(TurnEvent::Revealed {
                                observer,
                                entity: entity.id,
                                property: Some(name.clone()),
                            });
                        }
                        Some(known) if state.refresh && known != value => {
                            self.knowledge.insert((observer, prop), value);
                            events.push(TurnEvent::KnowledgeRefreshed {
                                observer,
                                entity: entity.id,
                                property: name.clone(),
                                value,
                            });
                        }
                        Some(_) => {}
                    }
                }
            }
        }
    }

    #[must_use]
    pub fn ruleset(&self) -> &Ruleset {
        &self.rules
    }

    #[must_use]
    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    #[must_use]
    pub fn graph(&self) -> &PropertyGraph {
        &self.graph
    }

    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.arena.get(id)
    }

    #[must_use]
    pub fn side(&self, id: SideId) -> &Side {
        &self.sides[id]
    }

    /// The encounter entity.
    #[must_use]
    pub fn encounter(&self) -> EntityId {
        self.encounter
    }

    /// Turns resolved so far.
    #[must_use]
    pub fn turn(&self) -> u32 {
        self.turn
    }

    #[must_use]
    pub fn pending_orders(&self) -> &[Order] {
        &self.orders
    }

    /// Every event since the encounter started.
    #[must_use]
    pub fn history(&self) -> &Vector<TurnEvent> {
        &self.history
    }

    #[must_use]
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diag
    }

    /// Take the accumulated warnings.
    pub fn take_warnings(&mut self) -> Vec<crate::core::Warning> {
        self.diag.take()
    }

    fn find(&self, category: Category, matches: impl Fn(&Entity) -> bool) -> Vec<&Entity> {
        self.arena
            .iter()
            .filter(|e| e.category == category && matches(e))
            .collect()
    }

    /// Argument with entity key `key`.
    #[must_use]
    pub fn get_argument_by_id(&self, key: &str) -> Option<&Entity> {
        self.find(Category::Argument, |e| e.key == key).into_iter().next()
    }

    /// Arguments named `name`.
    #[must_use]
    pub fn get_argument_by_name(&self, name: &str) -> Vec<&Entity> {
        self.find(Category::Argument, |e| e.name == name)
    }

    /// Character with entity key `key`.
    #[must_use]
    pub fn get_character_by_id(&self, key: &str) -> Option<&Entity> {
        self.find(Category::Character, |e| e.key == key).into_iter().next()
    }

    /// Characters named `name`.
    #[must_use]
    pub fn get_character_by_name(&self, name: &str) -> Vec<&Entity> {
        self.find(Category::Character, |e| e.name == name)
    }

    /// Current value of property `prop` of `entity`.
    #[must_use]
    pub fn property_value(&self, entity: EntityId, prop: &str) -> Option<f64> {
        self.graph.value(self.arena.get(entity)?.prop(prop)?)
    }

    /// Current value of side property `prop`.
    #[must_use]
    pub fn side_property_value(&self, side: SideId, prop: &str) -> Option<f64> {
        self.graph.value(self.sides[side].prop(prop)?)
    }

    /// What `observer` believes property `prop` of `entity` is.
    #[must_use]
    pub fn observed_property(&self, observer: SideId, entity: EntityId, prop: &str) -> Option<f64> {
        let target = self.arena.get(entity)?;
        let id = target.prop(prop)?;
        if target.side == observer {
            return self.graph.value(id);
        }
        self.knowledge.get(&(observer, id)).copied()
    }

    /// How `observer` sees `entity`.
    #[must_use]
    pub fn visibility_of(&self, observer: SideId, entity: EntityId) -> Option<Visibility> {
        let entity = self.arena.get(entity)?;
        let subject = subject_of(&self.rules, entity)?;
        Some(VisibilityEngine::new(&self.rules.vis).resolve(&self.sides[observer], &subject))
    }

    /// How `observer` sees property `prop` of `entity`.
    #[must_use]
    pub fn property_visibility(&self, observer: SideId, entity: EntityId, prop: &str) -> Option<FlagState> {
        let entity = self.arena.get(entity)?;
        let subject = subject_of(&self.rules, entity)?;
        let property = self.graph.get(entity.prop(prop)?)?;
        Some(VisibilityEngine::new(&self.rules.vis).property(&self.sides[observer], &subject, prop, &property.classes))
    }
}

fn lookup<'r>(list: &'r ClassList<EntityKind>, id: &str, what: &str) -> Result<&'r EntityKind> {
    list.get_by_id(id)
        .ok_or_else(|| RulesError::config(format!("unknown {what} `{id}`")))
}

fn subject_of<'s>(rules: &'s Ruleset, entity: &'s Entity) -> Option<Subject<'s>> {
    Some(Subject {
        kind_id: &entity.kind,
        kind: rules.kind(&entity.kind),
        key: &entity.key,
        side: entity.side,
        classes: &entity.classes,
        category: entity.category.vis_category()?,
    })
}

fn is_passive(category: Category) -> bool {
    matches!(
        category,
        Category::Argument | Category::Booster | Category::Trait | Category::Effect | Category::Encounter
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditions::Cost;
    use crate::core::SidePropConfig;
    use crate::effects::{TargetSpec, TargetType};
    use crate::properties::PropertyTemplate;

    fn rules() -> Ruleset {
        let mut rules = Ruleset::new();
        rules
            .add_kind(
                EntityKind::new("flatter", Category::Action)
                    .with_cost(Cost::new("poise", -2.0))
                    .with_effect(EffectSpec::new("favor").adding(1.0)),
            )
            .unwrap();
        rules
            .add_kind(
                EntityKind::new("envoy", Category::Character)
                    .with_prop(PropertyTemplate::new("poise", 3.0).bounded(-5.0, 5.0))
                    .with_prop(PropertyTemplate::new("favor", 0.0))
                    .with_action("flatter"),
            )
            .unwrap();
        rules
    }

    fn config() -> EncounterConfig {
        EncounterConfig::new(
            SideConfig::new().with_char("envoy"),
            SideConfig::new()
                .with_char("envoy")
                .with_prop(SidePropConfig::new("resolve", 4.0)),
        )
        .with_seed(11)
    }

    #[test]
    fn test_new_requires_characters() {
        let error = EncounterManager::new(rules(), EncounterConfig::default()).unwrap_err();
        assert!(matches!(error, RulesError::Config { .. }));

        let bad = EncounterConfig::new(SideConfig::new().with_char("ghost"), SideConfig::new().with_char("envoy"));
        assert!(matches!(EncounterManager::new(rules(), bad), Err(RulesError::Config { .. })));
    }

    #[test]
    fn test_instantiation() {
        let manager = EncounterManager::new(rules(), config()).unwrap();
        let envoys = manager.get_character_by_name("envoy");
        assert_eq!(envoys.len(), 2);
        assert_eq!(envoys[0].actions().len(), 1);
        assert_eq!(manager.entity(manager.encounter()).unwrap().key, "encounter");
        assert_eq!(manager.side_property_value(SideId::Two, "resolve"), Some(4.0));
        assert_eq!(manager.property_value(envoys[0].id, "poise"), Some(3.0));
    }

    #[test]
    fn test_order_pays_and_applies() {
        let mut manager = EncounterManager::new(rules(), config()).unwrap();
        let envoy = manager.get_character_by_id("envoy-1").unwrap().id;
        let other = manager.get_character_by_id("envoy-2").unwrap().id;
        let action = manager.entity(envoy).unwrap().actions()[0];

        manager.order_with_target(envoy, action, Some(other)).unwrap();
        let events = manager.run_turn().unwrap();

        assert_eq!(manager.property_value(envoy, "poise"), Some(1.0));
        assert_eq!(manager.property_value(other, "favor"), Some(1.0));
        assert!(events
            .iter()
            .any(|e| matches!(e, TurnEvent::ActionResolved { targets, .. } if targets == &vec![other])));
        assert!(matches!(events.first(), Some(TurnEvent::TurnStarted { turn: 1 })));
        assert!(matches!(events.last(), Some(TurnEvent::TurnEnded { turn: 1 })));
    }

    #[test]
    fn test_unpayable_order_is_rejected_untouched() {
        let mut manager = EncounterManager::new(rules(), config()).unwrap();
        let envoy = manager.get_character_by_id("envoy-1").unwrap().id;
        let other = manager.get_character_by_id("envoy-2").unwrap().id;
        let action = manager.entity(envoy).unwrap().actions()[0];

        manager.order_with_target(envoy, action, Some(other)).unwrap();
        manager.run_turn().unwrap();
        manager.order_with_target(envoy, action, Some(other)).unwrap();
        let events = manager.run_turn().unwrap();

        assert!(events.iter().any(|e| matches!(e, TurnEvent::OrderRejected { .. })));
        assert_eq!(manager.property_value(envoy, "poise"), Some(1.0));
        assert_eq!(manager.property_value(other, "favor"), Some(1.0));
    }

    #[test]
    fn test_order_validation() {
        let mut manager = EncounterManager::new(rules(), config()).unwrap();
        let envoy = manager.get_character_by_id("envoy-1").unwrap().id;
        let other = manager.get_character_by_id("envoy-2").unwrap().id;
        let foreign = manager.entity(other).unwrap().actions()[0];

        assert!(matches!(manager.order(envoy, foreign), Err(RulesError::Order { .. })));
        assert!(matches!(manager.order(EntityId(999), foreign), Err(RulesError::Order { .. })));
        manager.arena.get_mut(envoy).unwrap().alive = false;
        let own = manager.entity(envoy).unwrap().actions()[0];
        assert!(manager.order(envoy, own).is_err());
    }

    #[test]
    fn test_illegal_target() {
        let mut rules = rules();
        rules.actions.items_mut()[0]
            .targets
            .push(TargetSpec::new(TargetType::AllArguments));
        let mut manager = EncounterManager::new(rules, config()).unwrap();
        let envoy = manager.get_character_by_id("envoy-1").unwrap().id;
        let other = manager.get_character_by_id("envoy-2").unwrap().id;
        let action = manager.entity(envoy).unwrap().actions()[0];

        assert!(manager.order_with_target(envoy, action, Some(other)).is_err());
    }

    #[test]
    fn test_history_accumulates() {
        let mut manager = EncounterManager::new(rules(), config()).unwrap();
        let before = manager.history().len();
        manager.run_turn().unwrap();
        manager.run_turn().unwrap();
        assert_eq!(manager.turn(), 2);
        assert!(manager.history().len() >= before + 4);
    }
}
