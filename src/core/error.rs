//! Error taxonomy for the rules engine.
//!
//! - `ParseError`: malformed rule markup. Always fatal for the current
//!   `parse` call, which never partially commits.
//! - `Validation` / `DuplicateId`: raised by explicit `validate()` passes.
//! - `InvalidTargetSpec`, `CyclicDependency`: content errors in rules.
//! - `Config`, `Order`: misuse of the encounter manager API.
//!
//! Non-fatal conditions are reported through [`Diagnostics`](super::Diagnostics)
//! instead.

use thiserror::Error;

use crate::expr::ExprError;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RulesError>;

/// Every fatal error the engine can raise.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RulesError {
    /// The rule markup could not be parsed.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// An entity kind or condition failed validation.
    #[error("validation failed for `{id}`: {reason}")]
    Validation { id: String, reason: String },

    /// Two items share an id where ids must be unique.
    #[error("duplicate id `{id}`")]
    DuplicateId { id: String },

    /// An item of the wrong category was added to a restricted container.
    #[error("invalid type: expected {expected}, found {found}")]
    InvalidType { expected: String, found: String },

    /// A target specification names an unknown strategy or side.
    #[error("invalid target specification `{spec}`")]
    InvalidTargetSpec { spec: String },

    /// Property sources form a cycle.
    #[error("cyclic property dependency between {}", .properties.join(", "))]
    CyclicDependency { properties: Vec<String> },

    /// A rule-embedded expression failed to compile or evaluate.
    #[error(transparent)]
    Expression(#[from] ExprError),

    /// The encounter configuration is unusable.
    #[error("invalid encounter configuration: {reason}")]
    Config { reason: String },

    /// An order could not be queued.
    #[error("invalid order: {reason}")]
    Order { reason: String },

    /// A ruleset snapshot could not be encoded or decoded.
    #[error("ruleset snapshot failed: {0}")]
    Snapshot(String),
}

impl RulesError {
    /// Shorthand for a validation error.
    pub fn validation(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for a configuration error.
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// Shorthand for an order error.
    pub fn order(reason: impl Into<String>) -> Self {
        Self::Order {
            reason: reason.into(),
        }
    }
}

/// What went wrong while parsing rule markup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    /// The text is not well-formed markup.
    #[error("malformed markup: {0}")]
    Malformed(String),

    /// The document has no rule-set root.
    #[error("no <ruleset> root found")]
    NoRuleset,

    /// A rule-set contains no rules.
    #[error("rule set contains no rules")]
    EmptyRuleset,

    /// An element tag is not allowed at this position.
    #[error("unrecognized element <{tag}>")]
    UnknownElement { tag: String },

    /// An attribute is not allowed on this element.
    #[error("unrecognized attribute `{attribute}` on <{tag}>")]
    UnknownAttribute { tag: String, attribute: String },

    /// The `mode` attribute is not replace/alter/delete.
    #[error("invalid mode `{0}` (expected replace, alter or delete)")]
    InvalidMode(String),

    /// An attribute value cannot be interpreted.
    #[error("invalid value `{value}` for `{attribute}`: {reason}")]
    InvalidValue {
        attribute: String,
        value: String,
        reason: String,
    },

    /// A required attribute is absent.
    #[error("missing required attribute `{0}`")]
    MissingAttribute(String),

    /// Top-level rules need a non-numeric id.
    #[error("top-level rule needs a non-numeric id (got {})", .id.as_deref().unwrap_or("none"))]
    TopLevelId { id: Option<String> },

    /// A `template` attribute names a template that does not exist.
    #[error("unknown {category} template `{id}`")]
    UnknownTemplate { category: &'static str, id: String },
}

/// A located parse failure.
///
/// `path` is the element path from the document root, e.g.
/// `rulesets/ruleset[1]/action#persuade/cost[2]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// What went wrong.
    pub kind: ParseErrorKind,
    /// Source file name, if the caller supplied one.
    pub file: Option<String>,
    /// Element path of the offending element.
    pub path: String,
    /// 1-based line of the offending element.
    pub line: Option<usize>,
    /// Text surrounding the offending element.
    pub context: Option<String>,
    /// Markup of the offending element.
    pub dom: Option<String>,
}

impl ParseError {
    /// Create an unlocated parse error.
    #[must_use]
    pub fn new(kind: ParseErrorKind) -> Self {
        Self {
            kind,
            file: None,
            path: String::new(),
            line: None,
            context: None,
            dom: None,
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let file = self.file.as_deref().unwrap_or("<rules>");
        match self.line {
            Some(line) => write!(f, "{file}:{line}: {}", self.kind)?,
            None => write!(f, "{file}: {}", self.kind)?,
        }
        if !self.path.is_empty() {
            write!(f, " (at {})", self.path)?;
        }
        if let Some(context) = &self.context {
            write!(f, "\n  context: {context}")?;
        }
        if let Some(dom) = &self.dom {
            write!(f, "\n  element: {dom}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display_with_location() {
        let mut error = ParseError::new(ParseErrorKind::UnknownElement {
            tag: "spell".to_string(),
        });
        error.file = Some("base.xml".to_string());
        error.line = Some(4);
        error.path = "ruleset[1]/spell".to_string();

        let text = error.to_string();
        assert_eq!(text, "base.xml:4: unrecognized element <spell> (at ruleset[1]/spell)");
    }

    #[test]
    fn test_parse_error_display_without_location() {
        let error = ParseError::new(ParseErrorKind::NoRuleset);
        assert_eq!(error.to_string(), "<rules>: no <ruleset> root found");
    }

    #[test]
    fn test_cyclic_dependency_message() {
        let error = RulesError::CyclicDependency {
            properties: vec!["a.x".to_string(), "b.y".to_string()],
        };
        assert_eq!(error.to_string(), "cyclic property dependency between a.x, b.y");
    }

    #[test]
    fn test_parse_error_converts() {
        let error: RulesError = ParseError::new(ParseErrorKind::EmptyRuleset).into();
        assert!(matches!(error, RulesError::Parse(_)));
    }
}
