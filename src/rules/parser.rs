//! Rule markup loader.
//!
//! ```text
//! <rulesets>
//!   <ruleset mode="alter">
//!     <action id="flatter" uses="2">
//!       <cost property="poise" value="-2"/>
//!       <effect property="favor" add="1"/>
//!     </action>
//!   </ruleset>
//! </rulesets>
//! ```
//!
//! Each `parse` call works on a staged copy of the rule set and only
//! replaces the caller's copy when the whole document loaded. Every rule
//! element merges into its collection by the replace / alter / delete
//! semantics of [`merge`](super::merge); the mode is inherited from the
//! nearest enclosing element that sets one.

use roxmltree::{Document, Node};

use super::markup::{elements, invalid, line_of, parse_bool, parse_count, parse_list, parse_number, segment, snippet};
use super::merge::{merge_rule, merge_slot, MergeMode, MergeOutcome, RuleIdentity};
use super::schema::Element;
use crate::conditions::{Cost, CostTarget, CostValue, ExistsCondition, Rel};
use crate::core::{Diagnostics, LoaderOptions, ParseError, ParseErrorKind, Result, RulesError, Warning};
use crate::effects::{Amount, EffectSpec, SideFilter, TargetSpec, TargetType};
use crate::expr::Script;
use crate::kinds::{is_numeric_id, BoosterScope, Category, ClassMap, ClassSet, EntityKind, ResearchRule, Ruleset, TraitRef};
use crate::properties::{bound_order, Base, Bound, PropertyTemplate, SourceRef, Stacking};
use crate::visibility::{PropVisRule, VisCategory, VisFlag, VisibilityRule};

/// Markup to load: raw text or an already-parsed document.
#[derive(Clone, Copy, Debug)]
pub enum RuleSource<'a, 'input> {
    Text(&'a str),
    Document(&'a Document<'input>),
}

impl<'a> From<&'a str> for RuleSource<'a, 'a> {
    fn from(text: &'a str) -> Self {
        RuleSource::Text(text)
    }
}

impl<'a, 'input> From<&'a Document<'input>> for RuleSource<'a, 'input> {
    fn from(document: &'a Document<'input>) -> Self {
        RuleSource::Document(document)
    }
}

/// Summary of one successful `parse` call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParseReport {
    /// Rule-set elements loaded.
    pub rulesets: usize,
    pub inserted: usize,
    pub replaced: usize,
    pub altered: usize,
    pub deleted: usize,
    /// Deletes that matched nothing.
    pub ignored: usize,
    pub warnings: Vec<Warning>,
}

impl ParseReport {
    fn record(&mut self, outcome: MergeOutcome) {
        match outcome {
            MergeOutcome::Inserted => self.inserted += 1,
            MergeOutcome::Replaced => self.replaced += 1,
            MergeOutcome::Altered => self.altered += 1,
            MergeOutcome::Deleted => self.deleted += 1,
            MergeOutcome::Ignored => self.ignored += 1,
        }
    }

    /// Rule elements merged, at any depth.
    #[must_use]
    pub fn rules(&self) -> usize {
        self.inserted + self.replaced + self.altered + self.deleted + self.ignored
    }
}

/// Loads rule markup into a [`Ruleset`].
#[derive(Clone, Debug, Default)]
pub struct RuleLoader {
    options: LoaderOptions,
}

impl RuleLoader {
    #[must_use]
    pub fn new(options: LoaderOptions) -> Self {
        Self { options }
    }

    #[must_use]
    pub fn options(&self) -> &LoaderOptions {
        &self.options
    }

    /// Merge `source` into `rules`. On error `rules` is left untouched.
    ///
    /// `file` only labels errors.
    pub fn parse(&self, rules: &mut Ruleset, source: RuleSource<'_, '_>, file: Option<&str>) -> Result<ParseReport> {
        let result = match source {
            RuleSource::Text(text) => match Document::parse(text) {
                Ok(document) => self.load(rules, &document, file),
                Err(error) => {
                    let mut located = ParseError::new(ParseErrorKind::Malformed(error.to_string()));
                    located.file = file.map(str::to_string);
                    located.line = Some(error.pos().row as usize);
                    Err(RulesError::Parse(located))
                }
            },
            RuleSource::Document(document) => self.load(rules, document, file),
        };
        if let Err(error) = &result {
            log::log!(self.options.error_level(), "{error}");
        }
        result
    }

    /// Parse `text` into a fresh rule set.
    pub fn load_str(&self, text: &str, file: Option<&str>) -> Result<Ruleset> {
        let mut rules = Ruleset::new();
        self.parse(&mut rules, RuleSource::Text(text), file)?;
        Ok(rules)
    }

    fn load(&self, rules: &mut Ruleset, document: &Document<'_>, file: Option<&str>) -> Result<ParseReport> {
        let mut staged = rules.clone();
        let mut session = Session::new(&self.options, document.input_text(), file);
        session.document(&mut staged, document.root_element())?;

        *rules = staged;
        let mut report = session.report;
        report.warnings = session.diag.take();
        log::info!(
            "loaded {} rule set(s) from {}: {} inserted, {} replaced, {} altered, {} deleted, {} warnings",
            report.rulesets,
            file.unwrap_or("<rules>"),
            report.inserted,
            report.replaced,
            report.altered,
            report.deleted,
            report.warnings.len()
        );
        Ok(report)
    }
}

/// Condition and cost templates visible to nested rules.
#[derive(Clone, Copy)]
struct Templates<'r> {
    costs: &'r ClassMap<Cost>,
    conds: &'r ClassMap<ExistsCondition>,
}

/// State of one `parse` call.
struct Session<'o> {
    options: &'o LoaderOptions,
    text: &'o str,
    file: Option<&'o str>,
    /// Element path segments of the open elements.
    path: Vec<String>,
    /// Effective mode of each open element.
    modes: Vec<MergeMode>,
    diag: Diagnostics,
    report: ParseReport,
}

impl<'o> Session<'o> {
    fn new(options: &'o LoaderOptions, text: &'o str, file: Option<&'o str>) -> Self {
        Self {
            options,
            text,
            file,
            path: Vec::new(),
            modes: Vec::new(),
            diag: Diagnostics::new().with_level(options.warning_level()),
            report: ParseReport::default(),
        }
    }

    fn error(&self, node: Node<'_, '_>, kind: ParseErrorKind) -> RulesError {
        let offset = node.range().start;
        let mut error = ParseError::new(kind);
        error.file = self.file.map(str::to_string);
        error.path = self.path.join("/");
        error.line = Some(line_of(self.text, offset));
        if self.options.display_context_on_errors {
            error.context = Some(snippet(
                self.text,
                offset,
                self.options.context_pre,
                self.options.context_post,
                self.options.display_context_padded,
            ));
        }
        if self.options.display_dom_on_errors {
            error.dom = self.text.get(node.range()).map(str::to_string);
        }
        RulesError::Parse(error)
    }

    fn invalid(&self, node: Node<'_, '_>, attribute: &str, value: &str, reason: impl std::fmt::Display) -> RulesError {
        self.error(node, invalid(attribute, value, reason.to_string()))
    }

    /// Open `node`: check it against the schema and push its mode.
    fn enter(&mut self, node: Node<'_, '_>, element: Element) -> Result<MergeMode> {
        self.path.push(segment(node));
        let tag = node.tag_name().name();
        for attr in node.attributes() {
            if !element.allows_attribute(attr.name()) {
                return Err(self.error(
                    node,
                    ParseErrorKind::UnknownAttribute {
                        tag: tag.to_string(),
                        attribute: attr.name().to_string(),
                    },
                ));
            }
        }
        for child in elements(node) {
            self.child_element(element, child)?;
        }
        let mode = match node.attribute("mode") {
            Some(value) => MergeMode::parse(value).map_err(|kind| self.error(node, kind))?,
            None => self.modes.last().copied().unwrap_or_default(),
        };
        self.modes.push(mode);
        Ok(mode)
    }

    fn leave(&mut self, outcome: Option<MergeOutcome>) {
        if let Some(outcome) = outcome {
            self.report.record(outcome);
        }
        self.path.pop();
        self.modes.pop();
    }

    fn child_element(&self, parent: Element, child: Node<'_, '_>) -> Result<Element> {
        let tag = child.tag_name().name();
        parent.child(tag).ok_or_else(|| {
            let mut located = self.error(child, ParseErrorKind::UnknownElement { tag: tag.to_string() });
            if let RulesError::Parse(error) = &mut located {
                error.path = format!("{}/{}", error.path, segment(child));
            }
            located
        })
    }

    /// Identity of a nested rule. Numeric ids become `<parent>-<tag>-<n>`.
    fn identity(&self, node: Node<'_, '_>, parent: Option<&str>) -> RuleIdentity {
        let id = node
            .attribute("id")
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| match parent {
                Some(parent) if is_numeric_id(id) => format!("{parent}-{}-{id}", node.tag_name().name()),
                _ => id.to_string(),
            });
        let classes = node.attribute("class").map_or_else(ClassSet::new, ClassSet::parse);
        RuleIdentity::new(id, classes)
    }

    /// Identity of a top-level rule, which needs a non-numeric id.
    fn top_identity(&self, node: Node<'_, '_>) -> Result<RuleIdentity> {
        let identity = self.identity(node, None);
        match identity.id.as_deref() {
            Some(id) if !is_numeric_id(id) => Ok(identity),
            id => Err(self.error(
                node,
                ParseErrorKind::TopLevelId {
                    id: id.map(str::to_string),
                },
            )),
        }
    }

    fn document(&mut self, rules: &mut Ruleset, root: Node<'_, '_>) -> Result<()> {
        match root.tag_name().name() {
            "ruleset" => self.ruleset(rules, root),
            "rulesets" => {
                self.path.push("rulesets".to_string());
                let mut found = false;
                for child in elements(root) {
                    if child.tag_name().name() != "ruleset" {
                        self.path.push(segment(child));
                        return Err(self.error(
                            child,
                            ParseErrorKind::UnknownElement {
                                tag: child.tag_name().name().to_string(),
                            },
                        ));
                    }
                    found = true;
                    self.ruleset(rules, child)?;
                }
                if !found {
                    return Err(self.error(root, ParseErrorKind::NoRuleset));
                }
                self.path.pop();
                Ok(())
            }
            _ => Err(self.error(root, ParseErrorKind::NoRuleset)),
        }
    }

    fn ruleset(&mut self, rules: &mut Ruleset, node: Node<'_, '_>) -> Result<()> {
        self.enter(node, Element::RuleSet)?;
        if let Some(wipe) = node.attribute("wipe") {
            match wipe.trim() {
                "all" => rules.wipe(),
                "" | "none" => {}
                other => return Err(self.invalid(node, "wipe", other, "expected `all` or `none`")),
            }
        }
        if elements(node).next().is_none() {
            return Err(self.error(node, ParseErrorKind::EmptyRuleset));
        }
        for child in elements(node) {
            let element = self.child_element(Element::RuleSet, child)?;
            self.top_rule(rules, child, element)?;
        }
        self.leave(None);
        self.report.rulesets += 1;
        Ok(())
    }

    fn top_rule(&mut self, rules: &mut Ruleset, node: Node<'_, '_>, element: Element) -> Result<()> {
        let mode = self.enter(node, element)?;
        if element == Element::TopVisibility {
            self.top_visibility(rules, node)?;
            self.leave(None);
            return Ok(());
        }

        let identity = self.top_identity(node)?;
        let outcome = match element {
            Element::Kind(category) => self.kind(rules, node, element, category, None, &identity, mode)?,
            Element::TopEffect => self.kind(rules, node, element, Category::Effect, None, &identity, mode)?,
            Element::TopTrait => {
                let trait_for = match node.attribute("for") {
                    Some(value) => Some(
                        Category::from_tag(value.trim())
                            .filter(|c| !matches!(c, Category::Trait | Category::Effect))
                            .ok_or_else(|| self.invalid(node, "for", value, "traits attach to actions, arguments, boosters, characters or encounters"))?,
                    ),
                    None => identity
                        .id
                        .as_deref()
                        .and_then(|id| rules.trait_kind(id))
                        .and_then(|kind| kind.trait_for),
                };
                self.kind(rules, node, element, Category::Trait, trait_for, &identity, mode)?
            }
            Element::Cost => {
                let base = self.cost_template(&rules.cost_templates, node)?;
                let conds = &rules.cond_templates;
                rules.cost_templates.merge(
                    &identity,
                    mode,
                    |identity| fresh_cost(base, identity),
                    |cost, _| self.cost_body(conds, node, cost),
                )?
            }
            Element::Cond => {
                let base = self.cond_template(&rules.cond_templates, node)?;
                rules.cond_templates.merge(
                    &identity,
                    mode,
                    |identity| fresh_cond(base, identity),
                    |cond, _| self.cond_body(node, cond),
                )?
            }
            Element::Research => rules.research.merge(
                &identity,
                mode,
                |identity| ResearchRule {
                    classes: identity.classes.clone(),
                    ..ResearchRule::new(identity.id.clone().unwrap_or_default(), 0)
                },
                |research, _| self.research_body(node, research),
            )?,
            _ => return Err(self.error(node, ParseErrorKind::UnknownElement { tag: node.tag_name().name().to_string() })),
        };
        self.leave(Some(outcome));
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn kind(
        &mut self,
        rules: &mut Ruleset,
        node: Node<'_, '_>,
        element: Element,
        category: Category,
        trait_for: Option<Category>,
        identity: &RuleIdentity,
        mode: MergeMode,
    ) -> Result<MergeOutcome> {
        let Some(slot) = rules.partition_mut(category, trait_for) else {
            return Err(self.invalid(node, "for", "", "traits cannot attach to this category"));
        };
        let mut list = std::mem::take(slot);

        let templates = Templates {
            costs: &rules.cost_templates,
            conds: &rules.cond_templates,
        };
        let result = list.merge(
            identity,
            mode,
            |identity| {
                let mut kind = EntityKind::new(identity.id.clone().unwrap_or_default(), category);
                kind.classes = identity.classes.clone();
                kind.trait_for = trait_for;
                kind
            },
            |kind, _| self.kind_body(templates, node, element, kind),
        );

        if let Some(slot) = rules.partition_mut(category, trait_for) {
            *slot = list;
        }
        result
    }

    fn kind_body(&mut self, templates: Templates<'_>, node: Node<'_, '_>, element: Element, kind: &mut EntityKind) -> Result<()> {
        for attr in node.attributes() {
            let value = attr.value();
            match attr.name() {
                "name" => kind.name = Some(value.to_string()),
                "description" => kind.description = value.to_string(),
                "uses" => kind.uses = Some(parse_count("uses", value).map_err(|k| self.error(node, k))?),
                "scope" => {
                    kind.scope = BoosterScope::parse(value)
                        .ok_or_else(|| self.invalid(node, "scope", value, "expected global, argument, friendly or adverse"))?;
                }
                "actions" => kind.actions = parse_list(value),
                "for" => kind.trait_for = Category::from_tag(value.trim()),
                _ => {}
            }
        }

        let own_id = kind.id.clone();
        if element == Element::TopEffect {
            if kind.effects.is_empty() {
                kind.effects.push(EffectSpec::default());
            }
            if let Some(spec) = kind.effects.first_mut() {
                self.effect_attrs(node, spec)?;
            }
        }

        for child in elements(node) {
            let child_element = self.child_element(element, child)?;
            match (element, child_element) {
                (_, Element::Property) => self.property_into(child, &mut kind.props, &own_id)?,
                (Element::TopEffect, _) => {
                    if let Some(spec) = kind.effects.first_mut() {
                        self.effect_child(templates.conds, child, child_element, spec, &own_id)?;
                    }
                }
                (_, Element::Cost) => self.cost_into(templates, child, &mut kind.costs, &own_id)?,
                (_, Element::Cond) => self.cond_into(templates.conds, child, &mut kind.conds, &own_id)?,
                (_, Element::NestedEffect) => self.effect_into(templates.conds, child, &mut kind.effects, &own_id)?,
                (_, Element::Target) => self.target_into(child, &mut kind.targets, &own_id)?,
                (_, Element::NestedTrait) => self.trait_into(child, &mut kind.traits, &own_id)?,
                (_, Element::KindVisibility(category)) => {
                    let mode = self.enter(child, child_element)?;
                    let outcome = merge_slot(
                        &mut kind.vis,
                        mode,
                        || VisibilityRule::new(category),
                        |rule, _| self.vis_body(child, child_element, category, rule),
                    )?;
                    self.leave(Some(outcome));
                }
                _ => {
                    return Err(self.error(
                        child,
                        ParseErrorKind::UnknownElement {
                            tag: child.tag_name().name().to_string(),
                        },
                    ))
                }
            }
        }
        Ok(())
    }

    fn property_into(&mut self, node: Node<'_, '_>, props: &mut Vec<PropertyTemplate>, parent: &str) -> Result<()> {
        let mode = self.enter(node, Element::Property)?;
        let identity = self.identity(node, Some(parent));
        let outcome = merge_rule(
            props,
            &identity,
            mode,
            |identity| PropertyTemplate {
                id: identity.id.clone(),
                classes: identity.classes.clone(),
                ..PropertyTemplate::default()
            },
            |prop, _| self.property_body(node, prop),
        )?;
        self.leave(Some(outcome));
        Ok(())
    }

    fn property_body(&mut self, node: Node<'_, '_>, prop: &mut PropertyTemplate) -> Result<()> {
        for attr in node.attributes() {
            let (name, value) = (attr.name(), attr.value());
            let bound = match name {
                "name" => {
                    prop.name = Some(value.to_string());
                    continue;
                }
                "tethered" => {
                    prop.tethered = Some(parse_bool(name, value).map_err(|k| self.error(node, k))?);
                    continue;
                }
                "base" | "coeff" | "sources" => Bound::Val,
                "min" | "minCoeff" | "minSources" => Bound::Min,
                "max" | "maxCoeff" | "maxSources" => Bound::Max,
                _ => continue,
            };
            let template = prop.bound_mut(bound);
            if name.ends_with("oeff") {
                template.coeff = parse_number(name, value).map_err(|k| self.error(node, k))?;
            } else if name.ends_with("ources") {
                template.sources = SourceRef::parse_list(value).map_err(|reason| self.invalid(node, name, value, reason))?;
            } else {
                template.base = Some(Base::parse(value).ok_or_else(|| self.invalid(node, name, value, "expected a number, min or max"))?);
            }
        }
        bound_order(prop.min.base, prop.max.base).map_err(|reason| self.invalid(node, "base", "", reason))?;
        Ok(())
    }

    fn cost_template(&self, costs: &ClassMap<Cost>, node: Node<'_, '_>) -> Result<Option<Cost>> {
        let Some(id) = node.attribute("template").map(str::trim) else {
            return Ok(None);
        };
        costs.get_by_id(id).cloned().map(Some).ok_or_else(|| {
            self.error(
                node,
                ParseErrorKind::UnknownTemplate {
                    category: "cost",
                    id: id.to_string(),
                },
            )
        })
    }

    fn cond_template(&self, conds: &ClassMap<ExistsCondition>, node: Node<'_, '_>) -> Result<Option<ExistsCondition>> {
        let Some(id) = node.attribute("template").map(str::trim) else {
            return Ok(None);
        };
        conds.get_by_id(id).cloned().map(Some).ok_or_else(|| {
            self.error(
                node,
                ParseErrorKind::UnknownTemplate {
                    category: "existsCondition",
                    id: id.to_string(),
                },
            )
        })
    }

    fn cost_into(&mut self, templates: Templates<'_>, node: Node<'_, '_>, costs: &mut Vec<Cost>, parent: &str) -> Result<()> {
        let mode = self.enter(node, Element::Cost)?;
        let identity = self.identity(node, Some(parent));
        let base = self.cost_template(templates.costs, node)?;
        let outcome = merge_rule(
            costs,
            &identity,
            mode,
            |identity| fresh_cost(base, identity),
            |cost, _| self.cost_body(templates.conds, node, cost),
        )?;
        self.leave(Some(outcome));
        Ok(())
    }

    fn cost_body(&mut self, conds: &ClassMap<ExistsCondition>, node: Node<'_, '_>, cost: &mut Cost) -> Result<()> {
        for attr in node.attributes() {
            let (name, value) = (attr.name(), attr.value());
            match name {
                "property" => cost.property = Some(value.trim().to_string()),
                "value" => cost.value = CostValue::parse(value).map_err(|e| self.invalid(node, name, value, e))?,
                "target" => cost.target = CostTarget::parse(value).map_err(|e| self.invalid(node, name, value, e))?,
                _ => {}
            }
        }
        let parent = cost.id.clone().unwrap_or_else(|| "cost".to_string());
        for child in elements(node) {
            self.child_element(Element::Cost, child)?;
            self.cond_into(conds, child, &mut cost.conds, &parent)?;
        }
        Ok(())
    }

    fn cond_into(
        &mut self,
        templates: &ClassMap<ExistsCondition>,
        node: Node<'_, '_>,
        conds: &mut Vec<ExistsCondition>,
        parent: &str,
    ) -> Result<()> {
        let mode = self.enter(node, Element::Cond)?;
        let identity = self.identity(node, Some(parent));
        let base = self.cond_template(templates, node)?;
        let outcome = merge_rule(
            conds,
            &identity,
            mode,
            |identity| fresh_cond(base, identity),
            |cond, _| self.cond_body(node, cond),
        )?;
        self.leave(Some(outcome));
        Ok(())
    }

    fn cond_body(&mut self, node: Node<'_, '_>, cond: &mut ExistsCondition) -> Result<()> {
        for attr in node.attributes() {
            let (name, value) = (attr.name(), attr.value());
            let text = || Some(value.trim().to_string());
            let count = || parse_count(name, value).map(Some).map_err(|k| self.error(node, k));
            match name {
                "rel" => {
                    cond.rel = Some(Rel::parse(value).ok_or_else(|| self.invalid(node, name, value, "expected same, target, holder or creator"))?);
                }
                "kindId" => cond.kind_id = text(),
                "entityId" => cond.entity_id = text(),
                "kindName" => cond.kind_name = text(),
                "entityName" => cond.entity_name = text(),
                "classes" => cond.match_classes = Some(ClassSet::parse(value)),
                "excludedClasses" => cond.excluded_classes = ClassSet::parse(value),
                "number" => cond.number = count()?,
                "min" => cond.min = count()?,
                "max" => cond.max = count()?,
                "valueCode" => cond.value_code = Some(Script::compile(value).map_err(|e| self.invalid(node, name, value, e))?),
                _ => {}
            }
        }
        Ok(())
    }

    fn effect_into(
        &mut self,
        conds: &ClassMap<ExistsCondition>,
        node: Node<'_, '_>,
        effects: &mut Vec<EffectSpec>,
        parent: &str,
    ) -> Result<()> {
        let mode = self.enter(node, Element::NestedEffect)?;
        let identity = self.identity(node, Some(parent));
        let outcome = merge_rule(
            effects,
            &identity,
            mode,
            |identity| EffectSpec {
                id: identity.id.clone(),
                classes: identity.classes.clone(),
                ..EffectSpec::default()
            },
            |effect, _| {
                self.effect_attrs(node, effect)?;
                let own = effect.id.clone().unwrap_or_else(|| parent.to_string());
                for child in elements(node) {
                    let element = self.child_element(Element::NestedEffect, child)?;
                    self.effect_child(conds, child, element, effect, &own)?;
                }
                Ok(())
            },
        )?;
        self.leave(Some(outcome));
        Ok(())
    }

    fn effect_attrs(&self, node: Node<'_, '_>, effect: &mut EffectSpec) -> Result<()> {
        for attr in node.attributes() {
            let (name, value) = (attr.name(), attr.value());
            let amount = || Amount::parse(value).map(Some).map_err(|e| self.invalid(node, name, value, e));
            match name {
                "name" => effect.name = Some(value.to_string()),
                "property" => effect.property = Some(value.trim().to_string()),
                "bound" => effect.bound = Bound::parse(value).ok_or_else(|| self.invalid(node, name, value, "expected val, min or max"))?,
                "add" => effect.add = amount()?,
                "mult" => effect.mult = amount()?,
                "set" => effect.set = amount()?,
                "stacking" => {
                    effect.stacking = Stacking::parse(value).ok_or_else(|| self.invalid(node, name, value, "expected product or additive"))?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn effect_child(
        &mut self,
        conds: &ClassMap<ExistsCondition>,
        node: Node<'_, '_>,
        element: Element,
        effect: &mut EffectSpec,
        parent: &str,
    ) -> Result<()> {
        match element {
            Element::Target => self.target_into(node, &mut effect.targets, parent),
            Element::Cond => self.cond_into(conds, node, &mut effect.conds, parent),
            _ => Err(self.error(
                node,
                ParseErrorKind::UnknownElement {
                    tag: node.tag_name().name().to_string(),
                },
            )),
        }
    }

    fn target_into(&mut self, node: Node<'_, '_>, targets: &mut Vec<TargetSpec>, parent: &str) -> Result<()> {
        let mode = self.enter(node, Element::Target)?;
        let identity = self.identity(node, Some(parent));
        let outcome = merge_rule(
            targets,
            &identity,
            mode,
            |identity| TargetSpec {
                id: identity.id.clone(),
                classes: identity.classes.clone(),
                ..TargetSpec::default()
            },
            |spec, _| self.target_body(node, spec),
        )?;
        self.leave(Some(outcome));
        Ok(())
    }

    fn target_body(&mut self, node: Node<'_, '_>, spec: &mut TargetSpec) -> Result<()> {
        for attr in node.attributes() {
            let (name, value) = (attr.name(), attr.value());
            let flag = || parse_bool(name, value).map(Some).map_err(|k| self.error(node, k));
            match name {
                "type" => spec.kind = TargetType::parse(value).map_err(|e| self.invalid(node, name, value, e))?,
                "side" => spec.side = SideFilter::parse(value).map_err(|e| self.invalid(node, name, value, e))?,
                "kindId" => spec.kind_id = Some(value.trim().to_string()),
                "classes" => spec.match_classes = ClassSet::parse(value),
                "notClasses" => spec.not_classes = ClassSet::parse(value),
                "finished" => spec.finished = flag()?,
                "active" => spec.active = flag()?,
                "alive" => spec.alive = flag()?,
                _ => {}
            }
        }
        Ok(())
    }

    fn trait_into(&mut self, node: Node<'_, '_>, traits: &mut Vec<TraitRef>, parent: &str) -> Result<()> {
        let mode = self.enter(node, Element::NestedTrait)?;
        let identity = self.identity(node, Some(parent));
        let outcome = merge_rule(
            traits,
            &identity,
            mode,
            |identity| TraitRef {
                id: identity.id.clone(),
                classes: identity.classes.clone(),
                ..TraitRef::default()
            },
            |reference, _| {
                if let Some(name) = node.attribute("name") {
                    reference.name = Some(name.to_string());
                }
                if let Some(kind) = node.attribute("kind") {
                    reference.kind = Some(kind.trim().to_string());
                }
                Ok(())
            },
        )?;
        self.leave(Some(outcome));
        Ok(())
    }

    fn research_body(&mut self, node: Node<'_, '_>, research: &mut ResearchRule) -> Result<()> {
        for attr in node.attributes() {
            let (name, value) = (attr.name(), attr.value());
            match name {
                "name" => research.name = Some(value.to_string()),
                "tier" => research.tier = parse_count(name, value).map_err(|k| self.error(node, k))?,
                "unlocks" => research.unlocks = parse_list(value),
                _ => {}
            }
        }
        Ok(())
    }

    fn top_visibility(&mut self, rules: &mut Ruleset, node: Node<'_, '_>) -> Result<()> {
        if let Some(value) = node.attribute("allVisible") {
            let all = parse_bool("allVisible", value).map_err(|k| self.error(node, k))?;
            rules.vis.set_all_visible(Some(all));
        }
        for child in elements(node) {
            let element = self.child_element(Element::TopVisibility, child)?;
            let Element::CategoryVisibility(category) = element else {
                continue;
            };
            let mode = self.enter(child, element)?;
            let identity = self.identity(child, None);

            let mut diag = std::mem::replace(&mut self.diag, Diagnostics::quiet());
            let outcome = rules.vis.merge(
                category,
                &identity,
                mode,
                |rule, _| self.vis_body(child, element, category, rule),
                &mut diag,
            );
            self.diag = diag;

            self.leave(Some(outcome?));
        }
        Ok(())
    }

    fn vis_body(&mut self, node: Node<'_, '_>, element: Element, category: VisCategory, rule: &mut VisibilityRule) -> Result<()> {
        for attr in node.attributes() {
            let (name, value) = (attr.name(), attr.value());
            let Some((flag, refresh)) = VisFlag::from_attr(name).filter(|(flag, _)| category.has_flag(*flag)) else {
                continue;
            };
            let value = parse_bool(name, value).map_err(|k| self.error(node, k))?;
            if refresh {
                rule.flags.set_refresh(flag, value);
            } else {
                rule.flags.set(flag, value);
            }
        }

        for child in elements(node) {
            let child_element = self.child_element(element, child)?;
            let mode = self.enter(child, child_element)?;
            let identity = self.identity(child, None);
            let outcome = merge_rule(
                &mut rule.prop_list,
                &identity,
                mode,
                |identity| PropVisRule {
                    id: identity.id.clone(),
                    classes: identity.classes.clone(),
                    ..PropVisRule::default()
                },
                |prop, _| {
                    for (attr, slot) in [("vis", &mut prop.vis), ("refresh", &mut prop.refresh)] {
                        if let Some(value) = child.attribute(attr) {
                            *slot = Some(parse_bool(attr, value).map_err(|k| self.error(child, k))?);
                        }
                    }
                    Ok(())
                },
            )?;
            self.leave(Some(outcome));
        }
        Ok(())
    }
}

fn fresh_cost(base: Option<Cost>, identity: &RuleIdentity) -> Cost {
    Cost {
        id: identity.id.clone(),
        classes: identity.classes.clone(),
        ..base.unwrap_or_default()
    }
}

fn fresh_cond(base: Option<ExistsCondition>, identity: &RuleIdentity) -> ExistsCondition {
    ExistsCondition {
        id: identity.id.clone(),
        classes: identity.classes.clone(),
        ..base.unwrap_or_default()
    }
}
