//! Validates a plugin marketplace: the manifest, every plugin it lists, and
//! the commands, skills, agents and hooks each plugin ships.

pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod errors;
pub mod frontmatter;
pub mod manifest;
pub mod report;
pub mod resolver;
pub mod rules;
pub mod scheduler;

mod fs_util;

// Re-export key types at crate root for convenience.
pub use config::Config;
pub use diagnostics::{FailureKind, Severity, ValidationResult};
pub use engine::RuleEngine;
pub use errors::{Result, ValidatorError};
pub use manifest::{ManifestEntry, MarketplaceManifest, PluginSource, RemoteSource};
pub use report::{render, Format, Report};
pub use resolver::{resolve, resolve_dir, PluginDescriptor};
pub use rules::{Rule, RuleContext, RuleSet, Scope};
pub use scheduler::{validate_marketplace, RunOutcome};
