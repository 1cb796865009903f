//! Dependency-ordered property recomputation.
//!
//! Properties live in one arena per encounter. Sources are forward-mirrored
//! into `dependents*` lists so a change can be pushed through every
//! transitive dependent. A pass collects the affected set, orders it with
//! Kahn's algorithm and recomputes each property exactly once.
//!
//! Cost checks run the same pass on a staged copy (`simulate`), expose the
//! results as `temp` snapshots and then either `commit` or `discard`.

use std::collections::VecDeque;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use super::property::{Base, Bound, PropId, Property, Snapshot, Stacking};
use crate::core::{Diagnostics, Result, RulesError, WarningKind};

/// A modification of one bound.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum ChangeOp {
    Add(f64),
    Mult(f64, Stacking),
    Set(f64),
}

/// A pending modification of a property.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PropChange {
    pub prop: PropId,
    pub bound: Bound,
    pub op: ChangeOp,
}

impl PropChange {
    #[must_use]
    pub fn add(prop: PropId, delta: f64) -> Self {
        Self {
            prop,
            bound: Bound::Val,
            op: ChangeOp::Add(delta),
        }
    }

    #[must_use]
    pub fn set(prop: PropId, value: f64) -> Self {
        Self {
            prop,
            bound: Bound::Val,
            op: ChangeOp::Set(value),
        }
    }
}

/// Arena of properties with their dependency edges.
#[derive(Clone, Debug, Default)]
pub struct PropertyGraph {
    props: Vec<Property>,
    pending: Option<Box<PropertyGraph>>,
}

impl PropertyGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a property. It is not computed until the next pass touching it.
    pub fn insert(&mut self, prop: Property) -> PropId {
        let id = PropId(self.props.len() as u32);
        self.props.push(prop);
        id
    }

    #[must_use]
    pub fn get(&self, id: PropId) -> Option<&Property> {
        self.props.get(id.index())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.props.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.props.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PropId, &Property)> {
        self.props.iter().enumerate().map(|(i, p)| (PropId(i as u32), p))
    }

    /// Committed value.
    #[must_use]
    pub fn value(&self, id: PropId) -> Option<f64> {
        self.get(id).map(Property::value)
    }

    /// Putative values if a simulation is pending, committed otherwise.
    #[must_use]
    pub fn putative(&self, id: PropId) -> Option<Snapshot> {
        self.get(id).map(Property::putative)
    }

    fn require(&self, id: PropId) -> Result<&Property> {
        self.get(id)
            .ok_or_else(|| RulesError::validation(format!("{id:?}"), "unknown property"))
    }

    /// Whether `to` is reachable from `from` through dependent edges.
    #[must_use]
    pub fn reaches(&self, from: PropId, to: PropId) -> bool {
        let mut seen = FxHashSet::default();
        let mut stack = vec![from];
        while let Some(current) = stack.pop() {
            if current == to {
                return true;
            }
            if !seen.insert(current) {
                continue;
            }
            if let Some(prop) = self.get(current) {
                stack.extend(prop.all_dependents());
            }
        }
        false
    }

    /// Make `bound` of `target` read `source`.
    ///
    /// Fails with `CyclicDependency` if `source` already depends on
    /// `target`, including `source == target`.
    pub fn link(&mut self, target: PropId, bound: Bound, source: PropId) -> Result<()> {
        let target_label = self.require(target)?.label();
        let source_label = self.require(source)?.label();
        if self.reaches(target, source) {
            return Err(RulesError::CyclicDependency {
                properties: vec![target_label, source_label],
            });
        }
        self.props[target.index()].bound_mut(bound).sources.push(source);
        self.props[source.index()].dependents_for_mut(bound).push(target);
        Ok(())
    }

    /// Recompute every property.
    pub fn recompute_all(&mut self, diag: &mut Diagnostics) -> Result<Vec<PropId>> {
        let roots: Vec<PropId> = (0..self.props.len() as u32).map(PropId).collect();
        self.recompute(&roots, diag)
    }

    /// Recompute `roots` and everything downstream of them, once each.
    ///
    /// Returns the properties in the order they were computed.
    pub fn recompute(&mut self, roots: &[PropId], diag: &mut Diagnostics) -> Result<Vec<PropId>> {
        let order = self.schedule(roots)?;
        for &id in &order {
            let (values, inverted) = self.compute(id);
            if inverted {
                let label = self.props[id.index()].label();
                diag.warn(WarningKind::BoundsInverted, format!("{label}: min exceeded max, lowered"));
            }
            let prop = &mut self.props[id.index()];
            prop.prev = prop.snapshot();
            for (bound, (unmod, value)) in Bound::ALL.into_iter().zip(values) {
                let state = prop.bound_mut(bound);
                state.unmod = unmod;
                state.value = value;
            }
        }
        log::debug!("recomputed {} properties from {} roots", order.len(), roots.len());
        Ok(order)
    }

    /// Topological order of `roots` and their transitive dependents.
    fn schedule(&self, roots: &[PropId]) -> Result<Vec<PropId>> {
        let mut affected: Vec<PropId> = Vec::new();
        let mut seen = FxHashSet::default();
        let mut stack: Vec<PropId> = roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            let prop = self.require(id)?;
            affected.push(id);
            stack.extend(prop.all_dependents());
        }
        affected.sort_unstable();

        let mut in_degree: FxHashMap<PropId, usize> = affected.iter().map(|&id| (id, 0)).collect();
        for &id in &affected {
            for dependent in self.props[id.index()].all_dependents() {
                if let Some(count) = in_degree.get_mut(&dependent) {
                    *count += 1;
                }
            }
        }

        let mut ready: VecDeque<PropId> = affected.iter().copied().filter(|id| in_degree[id] == 0).collect();
        let mut order = Vec::with_capacity(affected.len());
        while let Some(id) = ready.pop_front() {
            order.push(id);
            for dependent in self.props[id.index()].all_dependents() {
                if let Some(count) = in_degree.get_mut(&dependent) {
                    *count -= 1;
                    if *count == 0 {
                        ready.push_back(dependent);
                    }
                }
            }
        }

        if order.len() < affected.len() {
            let done: FxHashSet<PropId> = order.iter().copied().collect();
            let properties = affected
                .iter()
                .filter(|id| !done.contains(id))
                .map(|id| self.props[id.index()].label())
                .collect();
            return Err(RulesError::CyclicDependency { properties });
        }
        Ok(order)
    }

    /// New `(unmod, value)` for val, min, max, and whether min was lowered.
    fn compute(&self, id: PropId) -> ([(f64, f64); 3], bool) {
        let prop = &self.props[id.index()];
        let mut unmod = [0.0_f64; 3];
        let mut value = [0.0_f64; 3];
        let slot = |bound: Bound| match bound {
            Bound::Val => 0,
            Bound::Min => 1,
            Bound::Max => 2,
        };

        for bound in prop.order() {
            let state = prop.bound(bound);
            let sum: f64 = state
                .sources
                .iter()
                .filter_map(|s| self.props.get(s.index()))
                .map(Property::value)
                .sum();
            let raw = match state.base {
                Some(Base::Number(base)) => base + state.coeff * sum,
                Some(Base::Min) => unmod[slot(Bound::Min)],
                Some(Base::Max) => unmod[slot(Bound::Max)],
                None if state.sources.is_empty() => match bound {
                    Bound::Val => 0.0,
                    Bound::Min => f64::NEG_INFINITY,
                    Bound::Max => f64::INFINITY,
                },
                None => state.coeff * sum,
            };
            unmod[slot(bound)] = raw;
            value[slot(bound)] = if raw.is_finite() {
                raw * state.mult + state.add
            } else {
                raw
            };
        }

        let mut inverted = false;
        if value[1] > value[2] {
            value[1] = value[2];
            inverted = true;
        }
        value[0] = value[0].max(value[1]).min(value[2]);

        (
            [(unmod[0], value[0]), (unmod[1], value[1]), (unmod[2], value[2])],
            inverted,
        )
    }

    fn modify(&mut self, change: &PropChange) -> Result<()> {
        self.require(change.prop)?;
        let prop = &mut self.props[change.prop.index()];
        let tethered = prop.tethered;
        let state = prop.bound_mut(change.bound);

        if tethered {
            match change.op {
                ChangeOp::Add(delta) => state.add += delta,
                ChangeOp::Mult(factor, Stacking::Product) => state.mult *= factor,
                ChangeOp::Mult(factor, Stacking::Additive) => state.mult += factor - 1.0,
                ChangeOp::Set(target) if state.value.is_finite() => state.add += target - state.value,
                ChangeOp::Set(target) => state.base = Some(Base::Number(target)),
            }
            return Ok(());
        }

        // Deltas and factors act on the value the bound shows.
        let current = match state.base {
            Some(Base::Number(base)) => Some(state.settle_base(base)),
            Some(Base::Min | Base::Max) => {
                let unmod = state.unmod;
                Some(state.settle_base(unmod))
            }
            None => None,
        };
        let next = match (change.op, current) {
            (ChangeOp::Set(target), _) => Some(target),
            (ChangeOp::Add(delta), Some(base)) => Some(base + delta),
            (ChangeOp::Mult(factor, _), Some(base)) => Some(base * factor),
            (_, None) => None,
        };
        if let Some(next) = next.filter(|n| n.is_finite()) {
            state.base = Some(Base::Number(next));
        }
        Ok(())
    }

    /// Apply changes and propagate. Returns the recomputed properties.
    pub fn apply(&mut self, changes: &[PropChange], diag: &mut Diagnostics) -> Result<Vec<PropId>> {
        for change in changes {
            self.modify(change)?;
        }
        let mut roots: Vec<PropId> = changes.iter().map(|c| c.prop).collect();
        roots.dedup();
        self.recompute(&roots, diag)
    }

    /// Run `changes` on a staged copy and expose the outcome as `temp`.
    pub fn simulate(&mut self, changes: &[PropChange], diag: &mut Diagnostics) -> Result<()> {
        self.discard();
        let mut staged = self.clone();
        let touched = staged.apply(changes, diag)?;
        for id in touched {
            let snapshot = staged.props[id.index()].snapshot();
            self.props[id.index()].temp = Some(snapshot);
        }
        self.pending = Some(Box::new(staged));
        Ok(())
    }

    /// Whether a simulation is waiting to be committed.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Promote the pending simulation. Returns `false` if there was none.
    pub fn commit(&mut self) -> bool {
        match self.pending.take() {
            Some(staged) => {
                *self = *staged;
                true
            }
            None => false,
        }
    }

    /// Drop the pending simulation and its `temp` snapshots.
    pub fn discard(&mut self) {
        self.pending = None;
        for prop in &mut self.props {
            prop.temp = None;
        }
    }
}
