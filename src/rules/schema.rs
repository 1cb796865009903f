//! Which elements and attributes the rule markup accepts where.

use crate::kinds::Category;
use crate::visibility::{VisCategory, VisFlag};

/// Attributes every rule element accepts.
const IDENTITY: &[&str] = &["mode", "id", "class"];

const KIND: &[&str] = &["name", "description"];
const ACTION: &[&str] = &["name", "description", "uses"];
const BOOSTER: &[&str] = &["name", "description", "scope"];
const CHARACTER: &[&str] = &["name", "description", "actions"];
const TOP_TRAIT: &[&str] = &["name", "description", "for"];
const NESTED_TRAIT: &[&str] = &["name", "kind"];
const EFFECT: &[&str] = &["name", "property", "bound", "add", "mult", "set", "stacking"];
const COST: &[&str] = &["property", "value", "target", "template"];
const COND: &[&str] = &[
    "rel",
    "kindId",
    "entityId",
    "kindName",
    "entityName",
    "classes",
    "excludedClasses",
    "number",
    "min",
    "max",
    "valueCode",
    "template",
];
const TARGET: &[&str] = &["type", "side", "kindId", "classes", "notClasses", "finished", "active", "alive"];
const PROPERTY: &[&str] = &[
    "name",
    "tethered",
    "base",
    "coeff",
    "sources",
    "min",
    "minCoeff",
    "minSources",
    "max",
    "maxCoeff",
    "maxSources",
];
const RESEARCH: &[&str] = &["name", "tier", "unlocks"];
const VIS_PROPERTY: &[&str] = &["vis", "refresh"];

/// Position-dependent element type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Element {
    RuleSet,
    /// A top-level action, argument, booster, character or encounter.
    Kind(Category),
    TopTrait,
    /// A trait attached to a kind.
    NestedTrait,
    /// A top-level effect kind.
    TopEffect,
    NestedEffect,
    Cost,
    Cond,
    Target,
    /// A property template of a kind.
    Property,
    Research,
    /// `<visibility>` directly under a rule set.
    TopVisibility,
    /// `<visibility>` inside a kind.
    KindVisibility(VisCategory),
    /// A category rule inside the top-level `<visibility>`.
    CategoryVisibility(VisCategory),
    /// A `propList` entry inside a visibility rule.
    VisProperty,
}

impl Element {
    /// Element type of a direct child of a rule-set.
    #[must_use]
    pub fn top_level(tag: &str) -> Option<Self> {
        Element::RuleSet.child(tag)
    }

    /// Whether the element carries `id` and `class` identity attributes.
    #[must_use]
    pub const fn has_identity(self) -> bool {
        !matches!(self, Element::RuleSet | Element::TopVisibility)
    }

    /// Attributes allowed besides `mode`, `id` and `class`.
    #[must_use]
    pub const fn attributes(self) -> &'static [&'static str] {
        match self {
            Element::RuleSet => &["wipe"],
            Element::Kind(Category::Action) => ACTION,
            Element::Kind(Category::Booster) => BOOSTER,
            Element::Kind(Category::Character) => CHARACTER,
            Element::Kind(_) => KIND,
            Element::TopTrait => TOP_TRAIT,
            Element::NestedTrait => NESTED_TRAIT,
            Element::TopEffect | Element::NestedEffect => EFFECT,
            Element::Cost => COST,
            Element::Cond => COND,
            Element::Target => TARGET,
            Element::Property => PROPERTY,
            Element::Research => RESEARCH,
            Element::TopVisibility => &["allVisible"],
            Element::KindVisibility(_) | Element::CategoryVisibility(_) => &[],
            Element::VisProperty => VIS_PROPERTY,
        }
    }

    /// Whether `name` is allowed on this element.
    #[must_use]
    pub fn allows_attribute(self, name: &str) -> bool {
        if name == "mode" || (self.has_identity() && IDENTITY.contains(&name)) {
            return true;
        }
        if self.attributes().contains(&name) {
            return true;
        }
        match self {
            Element::KindVisibility(category) | Element::CategoryVisibility(category) => {
                VisFlag::from_attr(name).is_some_and(|(flag, _)| category.has_flag(flag))
            }
            _ => false,
        }
    }

    /// Element type of a child tagged `tag`, if allowed.
    #[must_use]
    pub fn child(self, tag: &str) -> Option<Self> {
        let kind_child = |allowed: &[&str], vis: Option<VisCategory>, effect: Element| -> Option<Element> {
            if !allowed.contains(&tag) {
                return None;
            }
            match tag {
                "property" => Some(Element::Property),
                "cost" => Some(Element::Cost),
                "existsCondition" => Some(Element::Cond),
                "effect" => Some(effect),
                "target" => Some(Element::Target),
                "trait" => Some(Element::NestedTrait),
                "visibility" => vis.map(Element::KindVisibility),
                _ => None,
            }
        };

        match self {
            Element::RuleSet => match tag {
                "trait" => Some(Element::TopTrait),
                "effect" => Some(Element::TopEffect),
                "cost" => Some(Element::Cost),
                "existsCondition" => Some(Element::Cond),
                "research" => Some(Element::Research),
                "visibility" => Some(Element::TopVisibility),
                other => Category::from_tag(other)
                    .filter(|c| !matches!(c, Category::Trait | Category::Effect))
                    .map(Element::Kind),
            },
            Element::Kind(category) => {
                let allowed: &[&str] = match category {
                    Category::Action => &[
                        "property",
                        "cost",
                        "existsCondition",
                        "effect",
                        "target",
                        "trait",
                        "visibility",
                    ],
                    Category::Argument => &["property", "trait", "effect", "visibility"],
                    Category::Booster => &["property", "effect", "target", "trait", "visibility"],
                    _ => &["property", "trait", "visibility"],
                };
                kind_child(allowed, category.vis_category(), Element::NestedEffect)
            }
            Element::TopTrait => kind_child(
                &["property", "effect", "visibility"],
                Some(VisCategory::Trait),
                Element::NestedEffect,
            ),
            Element::TopEffect => match tag {
                "target" => Some(Element::Target),
                "existsCondition" => Some(Element::Cond),
                "property" => Some(Element::Property),
                _ => None,
            },
            Element::NestedEffect => match tag {
                "target" => Some(Element::Target),
                "existsCondition" => Some(Element::Cond),
                _ => None,
            },
            Element::Cost => (tag == "existsCondition").then_some(Element::Cond),
            Element::TopVisibility => VisCategory::from_tag(tag).map(Element::CategoryVisibility),
            Element::KindVisibility(_) | Element::CategoryVisibility(_) => {
                (tag == "property").then_some(Element::VisProperty)
            }
            Element::NestedTrait
            | Element::Cond
            | Element::Target
            | Element::Property
            | Element::Research
            | Element::VisProperty => None,
        }
    }
}
