//! Configuration types.
//!
//! - `LoaderOptions`: diagnostic verbosity of the rule loader. These never
//!   change what a rule set means, only how failures are reported.
//! - `EncounterConfig` / `SideConfig`: what each side starts an encounter
//!   with. Deserializable so hosts can keep encounter setups as data.

use serde::{Deserialize, Serialize};

/// Diagnostic options for the rule loader.
///
/// "Alerts" are `log::error!` / `log::warn!` records. Without them, errors
/// are logged at `debug` and warnings at `info`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoaderOptions {
    /// Attach the offending element's markup to parse errors.
    pub display_dom_on_errors: bool,
    /// Attach a text window around the offending element to parse errors.
    pub display_context_on_errors: bool,
    /// Mark truncated context windows with `…`.
    pub display_context_padded: bool,
    /// Log loader warnings at all.
    pub display_warnings: bool,
    /// Log parse errors at `error` level.
    pub raise_alert_on_errors: bool,
    /// Log loader warnings at `warn` level.
    pub raise_alert_on_warnings: bool,
    /// Characters of context before the offending element.
    pub context_pre: usize,
    /// Characters of context after the offending element.
    pub context_post: usize,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            display_dom_on_errors: false,
            display_context_on_errors: true,
            display_context_padded: true,
            display_warnings: true,
            raise_alert_on_errors: false,
            raise_alert_on_warnings: true,
            context_pre: 40,
            context_post: 40,
        }
    }
}

impl LoaderOptions {
    /// Options that attach nothing and log nothing above `debug`.
    #[must_use]
    pub fn silent() -> Self {
        Self {
            display_dom_on_errors: false,
            display_context_on_errors: false,
            display_context_padded: false,
            display_warnings: false,
            raise_alert_on_errors: false,
            raise_alert_on_warnings: false,
            ..Self::default()
        }
    }

    /// Attach element markup to errors.
    #[must_use]
    pub fn with_dom(mut self) -> Self {
        self.display_dom_on_errors = true;
        self
    }

    /// Set the context window around offending elements.
    #[must_use]
    pub fn with_context(mut self, pre: usize, post: usize) -> Self {
        self.display_context_on_errors = true;
        self.context_pre = pre;
        self.context_post = post;
        self
    }

    /// Level that loader warnings are logged at.
    #[must_use]
    pub fn warning_level(&self) -> Option<log::Level> {
        match (self.display_warnings, self.raise_alert_on_warnings) {
            (false, _) => None,
            (true, true) => Some(log::Level::Warn),
            (true, false) => Some(log::Level::Info),
        }
    }

    /// Level that parse errors are logged at.
    #[must_use]
    pub fn error_level(&self) -> log::Level {
        if self.raise_alert_on_errors {
            log::Level::Error
        } else {
            log::Level::Debug
        }
    }
}

/// A side-level property seeded at encounter start.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SidePropConfig {
    /// Property id, e.g. `morale`.
    pub id: String,
    /// Starting value.
    #[serde(default)]
    pub base: f64,
    /// Optional lower bound.
    #[serde(default)]
    pub min: Option<f64>,
    /// Optional upper bound.
    #[serde(default)]
    pub max: Option<f64>,
}

impl SidePropConfig {
    /// Create an unbounded side property.
    pub fn new(id: impl Into<String>, base: f64) -> Self {
        Self {
            id: id.into(),
            base,
            min: None,
            max: None,
        }
    }

    /// Set the bounds (builder pattern).
    #[must_use]
    pub fn bounded(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }
}

/// What one side starts an encounter with. All entries are kind ids except
/// `research` (research rule ids) and `secrets` (kind ids or entity keys).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SideConfig {
    /// Character kinds; the two parties need at least one.
    pub chars: Vec<String>,
    /// Argument kinds.
    pub args: Vec<String>,
    /// Booster kinds.
    pub boosters: Vec<String>,
    /// Action kinds given to every character of this side.
    pub actions: Vec<String>,
    /// Research rules already completed.
    pub research: Vec<String>,
    /// Secrets already discovered about the other sides.
    pub secrets: Vec<String>,
    /// Side-level properties.
    pub props: Vec<SidePropConfig>,
}

impl SideConfig {
    /// Create an empty side.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a character kind (builder pattern).
    #[must_use]
    pub fn with_char(mut self, kind: impl Into<String>) -> Self {
        self.chars.push(kind.into());
        self
    }

    /// Add an argument kind (builder pattern).
    #[must_use]
    pub fn with_arg(mut self, kind: impl Into<String>) -> Self {
        self.args.push(kind.into());
        self
    }

    /// Add a booster kind (builder pattern).
    #[must_use]
    pub fn with_booster(mut self, kind: impl Into<String>) -> Self {
        self.boosters.push(kind.into());
        self
    }

    /// Add an action kind for every character (builder pattern).
    #[must_use]
    pub fn with_action(mut self, kind: impl Into<String>) -> Self {
        self.actions.push(kind.into());
        self
    }

    /// Mark a research rule as completed (builder pattern).
    #[must_use]
    pub fn with_research(mut self, id: impl Into<String>) -> Self {
        self.research.push(id.into());
        self
    }

    /// Add a discovered secret (builder pattern).
    #[must_use]
    pub fn with_secret(mut self, id: impl Into<String>) -> Self {
        self.secrets.push(id.into());
        self
    }

    /// Add a side property (builder pattern).
    #[must_use]
    pub fn with_prop(mut self, prop: SidePropConfig) -> Self {
        self.props.push(prop);
        self
    }
}

/// Complete setup of an encounter.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncounterConfig {
    /// Seed for the turn-order generator.
    pub seed: u64,
    /// Encounter kind supplying encounter-global properties and traits.
    pub encounter: Option<String>,
    /// The first party.
    pub side1: SideConfig,
    /// The second party.
    pub side2: SideConfig,
    /// The neutral faction.
    pub neutral: SideConfig,
}

impl EncounterConfig {
    /// Create a configuration for two parties.
    #[must_use]
    pub fn new(side1: SideConfig, side2: SideConfig) -> Self {
        Self {
            side1,
            side2,
            ..Self::default()
        }
    }

    /// Set the seed (builder pattern).
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the encounter kind (builder pattern).
    #[must_use]
    pub fn with_encounter(mut self, kind: impl Into<String>) -> Self {
        self.encounter = Some(kind.into());
        self
    }

    /// Set the neutral faction (builder pattern).
    #[must_use]
    pub fn with_neutral(mut self, neutral: SideConfig) -> Self {
        self.neutral = neutral;
        self
    }
}
