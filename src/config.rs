//! Validator configuration loaded from an optional TOML file.

use std::collections::BTreeMap;
use std::path::Path;

use regex::Regex;
use serde::Deserialize;

use crate::diagnostics::Severity;
use crate::errors::{Result, ValidatorError};

/// Default naming convention for plugin names.
pub const DEFAULT_NAME_PATTERN: &str = "^[a-z0-9][a-z0-9-]*$";

/// Default locations of the per-plugin descriptor, in lookup order.
pub const DEFAULT_DESCRIPTOR_PATHS: &[&str] = &[".claude-plugin/plugin.json", "plugin.json"];

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Worker pool size; `None` means one worker per available CPU.
    pub workers: Option<usize>,
    /// Candidate descriptor paths relative to the plugin root.
    pub descriptor_paths: Vec<String>,
    /// Regex every plugin name must match.
    pub name_pattern: String,
    /// Treat warning failures as plugin failures.
    pub strict: bool,
    /// Rule registry adjustments.
    pub rules: RuleConfig,
    /// Required metadata fields per resource kind.
    pub required_fields: RequiredFields,
}

/// Rule registry adjustments.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuleConfig {
    /// Rule ids removed from the registry.
    pub disabled: Vec<String>,
    /// Per-rule severity overrides.
    pub severity: BTreeMap<String, Severity>,
}

/// Required metadata fields for each resource kind.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RequiredFields {
    /// Fields required in the plugin descriptor.
    pub plugin: Vec<String>,
    /// Frontmatter fields required in command files.
    pub command: Vec<String>,
    /// Frontmatter fields required in `SKILL.md`.
    pub skill: Vec<String>,
    /// Frontmatter fields required in agent files.
    pub agent: Vec<String>,
}

impl Default for RequiredFields {
    fn default() -> Self {
        Self {
            plugin: strings(&["name", "description"]),
            command: strings(&["description"]),
            skill: strings(&["description"]),
            agent: strings(&["name", "description"]),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workers: None,
            descriptor_paths: strings(DEFAULT_DESCRIPTOR_PATHS),
            name_pattern: DEFAULT_NAME_PATTERN.to_string(),
            strict: false,
            rules: RuleConfig::default(),
            required_fields: RequiredFields::default(),
        }
    }
}

impl Config {
    /// Read and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ValidatorError::Config {
            message: format!("cannot read {}: {e}", path.display()),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(|e| ValidatorError::Config {
            message: e.to_string(),
        })?;
        config.check()?;
        Ok(config)
    }

    /// Number of workers to run, never zero.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }

    /// Compile [`Config::name_pattern`].
    pub fn name_regex(&self) -> Result<Regex> {
        Regex::new(&self.name_pattern).map_err(|e| ValidatorError::Config {
            message: format!("invalid name_pattern: {e}"),
        })
    }

    fn check(&self) -> Result<()> {
        if self.workers == Some(0) {
            return Err(ValidatorError::Config {
                message: "workers must be at least 1".into(),
            });
        }
        if self.descriptor_paths.is_empty() {
            return Err(ValidatorError::Config {
                message: "descriptor_paths must not be empty".into(),
            });
        }
        self.name_regex()?;
        Ok(())
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}
