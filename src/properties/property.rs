//! Property templates and live property state.
//!
//! A property has three bounds, `val`, `min` and `max`. Each bound is
//! computed as
//!
//! ```text
//! unmod = base + coeff * sum(source values)
//! value = unmod * mult + add
//! ```
//!
//! where `base` may instead be `min` or `max`, meaning "start from my own
//! unmodified min/max". Unset `min`/`max` bounds are infinite. After all
//! three bounds are computed `min <= max` is enforced and `val` is clamped.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::core::{EntityId, Result, RulesError, SideId};
use crate::kinds::{ClassSet, Classified};

/// One of the three computed figures of a property.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Bound {
    #[default]
    Val,
    Min,
    Max,
}

impl Bound {
    pub const ALL: [Bound; 3] = [Bound::Val, Bound::Min, Bound::Max];

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "val" | "value" => Some(Bound::Val),
            "min" => Some(Bound::Min),
            "max" => Some(Bound::Max),
            _ => None,
        }
    }
}

/// Starting point of a bound.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Base {
    Number(f64),
    /// Copy the property's unmodified `min`.
    Min,
    /// Copy the property's unmodified `max`.
    Max,
}

impl Base {
    /// Parse `min`, `max` or a number.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "min" => Some(Base::Min),
            "max" => Some(Base::Max),
            other => other.parse::<f64>().ok().filter(|n| n.is_finite()).map(Base::Number),
        }
    }
}

/// How repeated multiplicative effects combine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stacking {
    /// `mult *= m`
    #[default]
    Product,
    /// `mult += m - 1`
    Additive,
}

impl Stacking {
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "product" | "multiplicative" => Some(Stacking::Product),
            "additive" | "sum" => Some(Stacking::Additive),
            _ => None,
        }
    }
}

/// Entity a source reference is resolved from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceAnchor {
    /// The property's own entity.
    Own,
    Holder,
    Creator,
    Target,
    /// The owning entity's side.
    Side,
    /// The encounter entity.
    Encounter,
}

/// A reference to another property, e.g. `holder.charisma`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRef {
    pub anchor: SourceAnchor,
    pub prop: String,
}

impl SourceRef {
    /// Parse one reference.
    pub fn parse(text: &str) -> std::result::Result<Self, String> {
        let text = text.trim();
        let (anchor, prop) = match text.split_once('.') {
            None => (SourceAnchor::Own, text),
            Some((anchor, prop)) => {
                let anchor = match anchor {
                    "self" => SourceAnchor::Own,
                    "holder" => SourceAnchor::Holder,
                    "creator" => SourceAnchor::Creator,
                    "target" => SourceAnchor::Target,
                    "side" => SourceAnchor::Side,
                    "encounter" => SourceAnchor::Encounter,
                    other => return Err(format!("unknown source anchor `{other}`")),
                };
                (anchor, prop)
            }
        };
        if prop.is_empty() || prop.contains('.') {
            return Err(format!("malformed property reference `{text}`"));
        }
        Ok(Self {
            anchor,
            prop: prop.to_string(),
        })
    }

    /// Parse a comma-separated list of references.
    pub fn parse_list(list: &str) -> std::result::Result<Vec<Self>, String> {
        list.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Self::parse)
            .collect()
    }
}

impl std::fmt::Display for SourceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let anchor = match self.anchor {
            SourceAnchor::Own => return f.write_str(&self.prop),
            SourceAnchor::Holder => "holder",
            SourceAnchor::Creator => "creator",
            SourceAnchor::Target => "target",
            SourceAnchor::Side => "side",
            SourceAnchor::Encounter => "encounter",
        };
        write!(f, "{anchor}.{}", self.prop)
    }
}

/// Rule-level description of one bound.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundTemplate {
    pub base: Option<Base>,
    pub coeff: f64,
    pub sources: Vec<SourceRef>,
}

impl BoundTemplate {
    /// An unset bound.
    #[must_use]
    pub fn unset() -> Self {
        Self {
            base: None,
            coeff: 1.0,
            sources: Vec::new(),
        }
    }

    #[must_use]
    pub fn fixed(value: f64) -> Self {
        Self {
            base: Some(Base::Number(value)),
            ..Self::unset()
        }
    }
}

/// Property template declared by a kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PropertyTemplate {
    pub id: Option<String>,
    pub classes: ClassSet,
    pub name: Option<String>,
    /// Explicit tethering; when absent a property is tethered iff its value
    /// has sources.
    pub tethered: Option<bool>,
    pub val: BoundTemplate,
    pub min: BoundTemplate,
    pub max: BoundTemplate,
}

impl Default for PropertyTemplate {
    fn default() -> Self {
        Self {
            id: None,
            classes: ClassSet::new(),
            name: None,
            tethered: None,
            val: BoundTemplate::fixed(0.0),
            min: BoundTemplate::unset(),
            max: BoundTemplate::unset(),
        }
    }
}

impl PropertyTemplate {
    /// A fixed, unbounded property.
    pub fn new(id: impl Into<String>, base: f64) -> Self {
        Self {
            id: Some(id.into()),
            val: BoundTemplate::fixed(base),
            ..Self::default()
        }
    }

    /// Set fixed bounds (builder pattern).
    #[must_use]
    pub fn bounded(mut self, min: f64, max: f64) -> Self {
        self.min = BoundTemplate::fixed(min);
        self.max = BoundTemplate::fixed(max);
        self
    }

    /// Set the value base (builder pattern).
    #[must_use]
    pub fn with_base(mut self, base: Base) -> Self {
        self.val.base = Some(base);
        self
    }

    /// Add value sources (builder pattern).
    pub fn with_sources(mut self, sources: &str) -> std::result::Result<Self, String> {
        self.val.sources.extend(SourceRef::parse_list(sources)?);
        Ok(self)
    }

    /// Mark tethered (builder pattern).
    #[must_use]
    pub fn tethered(mut self, tethered: bool) -> Self {
        self.tethered = Some(tethered);
        self
    }

    #[must_use]
    pub fn bound(&self, bound: Bound) -> &BoundTemplate {
        match bound {
            Bound::Val => &self.val,
            Bound::Min => &self.min,
            Bound::Max => &self.max,
        }
    }

    pub fn bound_mut(&mut self, bound: Bound) -> &mut BoundTemplate {
        match bound {
            Bound::Val => &mut self.val,
            Bound::Min => &mut self.min,
            Bound::Max => &mut self.max,
        }
    }

    #[must_use]
    pub fn is_tethered(&self) -> bool {
        self.tethered.unwrap_or(!self.val.sources.is_empty())
    }
}

impl Classified for PropertyTemplate {
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

/// Index of a property in a [`PropertyGraph`](super::PropertyGraph).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PropId(pub u32);

impl PropId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// What a property belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropOwner {
    Entity(EntityId),
    Side(SideId),
}

impl std::fmt::Display for PropOwner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PropOwner::Entity(id) => write!(f, "{id}"),
            PropOwner::Side(side) => write!(f, "{side}"),
        }
    }
}

/// `val`, `min` and `max` at one point in time.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub val: f64,
    pub min: f64,
    pub max: f64,
    /// `val` before clamping into `[min, max]`.
    pub raw: f64,
}

impl Snapshot {
    #[must_use]
    pub fn get(&self, bound: Bound) -> f64 {
        match bound {
            Bound::Val => self.val,
            Bound::Min => self.min,
            Bound::Max => self.max,
        }
    }
}

/// Live state of one bound.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundState {
    pub base: Option<Base>,
    pub coeff: f64,
    /// Most bounds read at most a few sources.
    pub sources: SmallVec<[PropId; 4]>,
    pub add: f64,
    pub mult: f64,
    pub unmod: f64,
    pub value: f64,
}

impl BoundState {
    /// `unmod * mult + add`, the value before any clamping.
    #[must_use]
    pub fn unclamped(&self) -> f64 {
        if self.unmod.is_finite() {
            self.unmod * self.mult + self.add
        } else {
            self.value
        }
    }

    /// Drop the part of `base` that clamping hid in the last computation.
    ///
    /// Returns the base that reproduces the shown value and moves `unmod`
    /// to match it.
    pub fn settle_base(&mut self, base: f64) -> f64 {
        let excess = self.unclamped() - self.value;
        if !excess.is_finite() || excess == 0.0 || self.mult == 0.0 {
            return base;
        }
        let shift = excess / self.mult;
        self.unmod -= shift;
        base - shift
    }

    fn from_template(template: &BoundTemplate, unset: f64) -> Self {
        Self {
            base: template.base,
            coeff: template.coeff,
            sources: SmallVec::new(),
            add: 0.0,
            mult: 1.0,
            unmod: unset,
            value: unset,
        }
    }
}

/// A property instance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: String,
    pub owner: PropOwner,
    pub classes: ClassSet,
    pub tethered: bool,
    pub val: BoundState,
    pub min: BoundState,
    pub max: BoundState,
    /// Properties whose `val` reads this one.
    pub dependents: Vec<PropId>,
    /// Properties whose `min` reads this one.
    pub dependents_min: Vec<PropId>,
    /// Properties whose `max` reads this one.
    pub dependents_max: Vec<PropId>,
    order: [Bound; 3],
    pub prev: Snapshot,
    pub temp: Option<Snapshot>,
}

/// Bound evaluation order given the `min`/`max` bases.
pub fn bound_order(min_base: Option<Base>, max_base: Option<Base>) -> std::result::Result<[Bound; 3], String> {
    match (min_base, max_base) {
        (Some(Base::Min), _) => Err("min is based on itself".to_string()),
        (_, Some(Base::Max)) => Err("max is based on itself".to_string()),
        (Some(Base::Max), Some(Base::Min)) => Err("min and max are based on each other".to_string()),
        (_, Some(Base::Min)) => Ok([Bound::Min, Bound::Max, Bound::Val]),
        _ => Ok([Bound::Max, Bound::Min, Bound::Val]),
    }
}

impl Property {
    /// Instantiate a template. Sources are linked separately by the graph.
    pub fn from_template(template: &PropertyTemplate, owner: PropOwner) -> Result<Self> {
        let id = template.id.clone().unwrap_or_default();
        let order = bound_order(template.min.base, template.max.base).map_err(|_| {
            RulesError::CyclicDependency {
                properties: vec![format!("{owner}.{id}")],
            }
        })?;
        let val = BoundState::from_template(&template.val, 0.0);
        let snapshot = Snapshot {
            val: 0.0,
            min: f64::NEG_INFINITY,
            max: f64::INFINITY,
            raw: 0.0,
        };
        Ok(Self {
            classes: template.classes.clone(),
            tethered: template.is_tethered(),
            val,
            min: BoundState::from_template(&template.min, f64::NEG_INFINITY),
            max: BoundState::from_template(&template.max, f64::INFINITY),
            dependents: Vec::new(),
            dependents_min: Vec::new(),
            dependents_max: Vec::new(),
            order,
            prev: snapshot,
            temp: None,
            id,
            owner,
        })
    }

    /// A side-level property with fixed base and optional bounds.
    pub fn fixed(id: impl Into<String>, owner: PropOwner, base: f64, min: Option<f64>, max: Option<f64>) -> Result<Self> {
        let mut template = PropertyTemplate::new(id, base);
        if let Some(min) = min {
            template.min = BoundTemplate::fixed(min);
        }
        if let Some(max) = max {
            template.max = BoundTemplate::fixed(max);
        }
        Self::from_template(&template, owner)
    }

    #[must_use]
    pub fn bound(&self, bound: Bound) -> &BoundState {
        match bound {
            Bound::Val => &self.val,
            Bound::Min => &self.min,
            Bound::Max => &self.max,
        }
    }

    pub fn bound_mut(&mut self, bound: Bound) -> &mut BoundState {
        match bound {
            Bound::Val => &mut self.val,
            Bound::Min => &mut self.min,
            Bound::Max => &mut self.max,
        }
    }

    #[must_use]
    pub fn dependents_for(&self, bound: Bound) -> &[PropId] {
        match bound {
            Bound::Val => &self.dependents,
            Bound::Min => &self.dependents_min,
            Bound::Max => &self.dependents_max,
        }
    }

    pub(crate) fn dependents_for_mut(&mut self, bound: Bound) -> &mut Vec<PropId> {
        match bound {
            Bound::Val => &mut self.dependents,
            Bound::Min => &mut self.dependents_min,
            Bound::Max => &mut self.dependents_max,
        }
    }

    /// All forward edges, with repeats when a dependent reads several bounds.
    pub fn all_dependents(&self) -> impl Iterator<Item = PropId> + '_ {
        self.dependents
            .iter()
            .chain(&self.dependents_min)
            .chain(&self.dependents_max)
            .copied()
    }

    #[must_use]
    pub fn order(&self) -> [Bound; 3] {
        self.order
    }

    #[must_use]
    pub fn value(&self) -> f64 {
        self.val.value
    }

    #[must_use]
    pub fn min(&self) -> f64 {
        self.min.value
    }

    #[must_use]
    pub fn max(&self) -> f64 {
        self.max.value
    }

    /// Accumulated additive modifier of `val`.
    #[must_use]
    pub fn add(&self) -> f64 {
        self.val.add
    }

    /// Accumulated multiplier of `val`.
    #[must_use]
    pub fn mult(&self) -> f64 {
        self.val.mult
    }

    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            val: self.val.value,
            min: self.min.value,
            max: self.max.value,
            raw: self.val.unclamped(),
        }
    }

    /// Putative values when a simulation is pending, committed otherwise.
    #[must_use]
    pub fn putative(&self) -> Snapshot {
        self.temp.unwrap_or_else(|| self.snapshot())
    }

    /// `owner.id`, used in error messages.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}.{}", self.owner, self.id)
    }
}
