//! Structured diagnostics channel.
//!
//! Non-fatal problems (a holder chain that does not exist, a default
//! visibility rule that had to be restored, bounds that were inverted) are
//! collected here and mirrored to the `log` facade. The engine never alerts
//! users directly; presenting warnings is the host's concern.

use serde::{Deserialize, Serialize};

/// Category of a non-fatal problem.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WarningKind {
    /// A targeting query needed a holder the entity does not have.
    MissingHolder,
    /// A targeting query needed a creator the entity does not have.
    MissingCreator,
    /// A targeting query needed a target the entity does not have.
    MissingTarget,
    /// A visibility category lost its last rule and got a fresh default.
    DefaultVisibilityRestored,
    /// A property's minimum exceeded its maximum and was lowered.
    BoundsInverted,
    /// A property source could not be resolved when linking.
    UnresolvedSource,
    /// An effect or cost referenced a property the target does not have.
    MissingProperty,
    /// A rule was ignored because it could not apply.
    IgnoredRule,
}

/// A single non-fatal problem.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    /// What kind of problem this is.
    pub kind: WarningKind,
    /// Human-readable description.
    pub message: String,
}

/// Collector for warnings raised during one engine operation.
///
/// ```
/// use rust_parley::core::{Diagnostics, WarningKind};
///
/// let mut diagnostics = Diagnostics::new();
/// diagnostics.warn(WarningKind::MissingHolder, "booster-1 has no holder");
///
/// assert_eq!(diagnostics.len(), 1);
/// assert_eq!(diagnostics.warnings()[0].kind, WarningKind::MissingHolder);
/// ```
#[derive(Clone, Debug)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
    level: Option<log::Level>,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new()
    }
}

impl Diagnostics {
    /// Collector that mirrors warnings at `warn` level.
    #[must_use]
    pub fn new() -> Self {
        Self {
            warnings: Vec::new(),
            level: Some(log::Level::Warn),
        }
    }

    /// Collector that records warnings without logging them.
    #[must_use]
    pub fn quiet() -> Self {
        Self {
            warnings: Vec::new(),
            level: None,
        }
    }

    /// Set the level warnings are mirrored at (`None` disables logging).
    #[must_use]
    pub fn with_level(mut self, level: Option<log::Level>) -> Self {
        self.level = level;
        self
    }

    /// Record a warning.
    pub fn warn(&mut self, kind: WarningKind, message: impl Into<String>) {
        let message = message.into();
        if let Some(level) = self.level {
            log::log!(level, "{kind:?}: {message}");
        }
        self.warnings.push(Warning { kind, message });
    }

    /// All warnings recorded so far.
    #[must_use]
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Number of recorded warnings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    /// Were no warnings recorded?
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Does any recorded warning have this kind?
    #[must_use]
    pub fn has(&self, kind: WarningKind) -> bool {
        self.warnings.iter().any(|w| w.kind == kind)
    }

    /// Take all recorded warnings, leaving the collector empty.
    pub fn take(&mut self) -> Vec<Warning> {
        std::mem::take(&mut self.warnings)
    }
}
