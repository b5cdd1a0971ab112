//! Validation results produced by the rule engine.
//!
//! One [`ValidationResult`] is emitted per (plugin, rule) pair evaluated, or
//! per (plugin, rule, file) for file-scoped rules. Results are immutable once
//! built and carry a stable rule id so output stays diff-friendly.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Severity of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// A failure that marks the plugin as failed.
    Error,
    /// An advisory failure; reported but does not fail the plugin.
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// Classification of a failed result.
///
/// Lets CI consumers tell "the plugin is broken" apart from "the
/// filesystem could not be read".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    /// The plugin source directory does not exist.
    PluginNotFound,
    /// A required file is absent.
    FileMissing,
    /// Structured data is malformed or lacks required fields.
    SchemaViolation,
    /// A name breaks the naming convention or does not match.
    NamingViolation,
    /// A file could not be read.
    InternalIo,
}

impl FailureKind {
    /// Stable kebab-case identifier.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::PluginNotFound => "plugin-not-found",
            FailureKind::FileMissing => "file-missing",
            FailureKind::SchemaViolation => "schema-violation",
            FailureKind::NamingViolation => "naming-violation",
            FailureKind::InternalIo => "internal-io",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one rule evaluated against one plugin (or one of its files).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    /// Plugin the rule ran against.
    pub plugin: String,
    /// Stable rule id (e.g., `"P003"`).
    pub rule_id: &'static str,
    /// Effective severity of the rule.
    pub severity: Severity,
    /// Whether the check passed.
    pub passed: bool,
    /// Failure classification; `None` for passing results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<FailureKind>,
    /// Plugin-relative file the result refers to (file-scoped rules).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Human-readable message.
    pub message: String,
}

impl ValidationResult {
    /// A passing result.
    #[must_use]
    pub fn pass(
        plugin: impl Into<String>,
        rule_id: &'static str,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            plugin: plugin.into(),
            rule_id,
            severity,
            passed: true,
            kind: None,
            file: None,
            message: message.into(),
        }
    }

    /// A failing result.
    #[must_use]
    pub fn fail(
        plugin: impl Into<String>,
        rule_id: &'static str,
        severity: Severity,
        kind: FailureKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            plugin: plugin.into(),
            rule_id,
            severity,
            passed: false,
            kind: Some(kind),
            file: None,
            message: message.into(),
        }
    }

    /// Attach the plugin-relative file this result refers to.
    #[must_use]
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Returns `true` for a failed result with `Error` severity.
    #[must_use]
    pub fn is_error(&self) -> bool {
        !self.passed && self.severity == Severity::Error
    }

    /// Returns `true` for a failed result with `Warning` severity.
    #[must_use]
    pub fn is_warning(&self) -> bool {
        !self.passed && self.severity == Severity::Warning
    }

    /// Sort key: plugin name, then rule id, then file.
    pub(crate) fn sort_key(&self) -> (&str, &str, &str) {
        (
            self.plugin.as_str(),
            self.rule_id,
            self.file.as_deref().unwrap_or(""),
        )
    }
}

/// `plugin [RULE] file: message`
impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.plugin, self.rule_id)?;
        if let Some(file) = &self.file {
            write!(f, " {file}")?;
        }
        write!(f, ": {}", self.message)
    }
}
