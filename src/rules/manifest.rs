//! Manifest-entry rules (M-series).

use super::{Check, Outcome, Rule, RuleContext};
use crate::diagnostics::{FailureKind, Severity};
use crate::manifest::{ManifestEntry, PluginSource};

pub(super) const RULES: &[Rule] = &[
    Rule {
        id: "M001",
        title: "plugin name follows the naming convention",
        severity: Severity::Error,
        check: Check::Manifest(name_format),
    },
    Rule {
        id: "M002",
        title: "source path is explicitly relative (`./`)",
        severity: Severity::Warning,
        check: Check::Manifest(explicit_relative_source),
    },
    Rule {
        id: "M003",
        title: "plugin name has no stray hyphens",
        severity: Severity::Warning,
        check: Check::Manifest(hyphen_hygiene),
    },
    Rule {
        id: "M004",
        title: "plugin source is a local directory",
        severity: Severity::Warning,
        check: Check::Manifest(local_source),
    },
];

fn name_format(entry: &ManifestEntry, ctx: &RuleContext) -> Outcome {
    if ctx.name_pattern.is_match(&entry.name) {
        Outcome::Pass
    } else {
        Outcome::fail(
            FailureKind::NamingViolation,
            format!(
                "plugin name \"{}\" does not match `{}`",
                entry.name,
                ctx.name_pattern.as_str()
            ),
        )
    }
}

fn explicit_relative_source(entry: &ManifestEntry, _ctx: &RuleContext) -> Outcome {
    match entry.local_path() {
        None => Outcome::NotApplicable,
        Some(path) if path.starts_with("./") => Outcome::Pass,
        Some(path) => Outcome::fail(
            FailureKind::SchemaViolation,
            format!("source path \"{path}\" should start with `./`"),
        ),
    }
}

/// Remote sources are accepted but their files are never checked.
fn local_source(entry: &ManifestEntry, _ctx: &RuleContext) -> Outcome {
    match &entry.source {
        PluginSource::Local(_) => Outcome::Pass,
        PluginSource::Remote(remote) => Outcome::fail(
            FailureKind::FileMissing,
            format!("{remote} is not local; plugin files were not checked"),
        ),
    }
}

fn hyphen_hygiene(entry: &ManifestEntry, _ctx: &RuleContext) -> Outcome {
    let name = entry.name.as_str();
    let mut problems = Vec::new();
    if name.contains("--") {
        problems.push(format!("plugin name \"{name}\" contains consecutive hyphens"));
    }
    if name.starts_with('-') || name.ends_with('-') {
        problems.push(format!("plugin name \"{name}\" starts or ends with a hyphen"));
    }
    Outcome::from_problems(FailureKind::NamingViolation, problems)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, source: &str) -> ManifestEntry {
        ManifestEntry {
            name: name.into(),
            source: PluginSource::Local(source.into()),
            description: None,
            version: None,
            category: None,
            tags: Vec::new(),
            strict: None,
        }
    }

    #[test]
    fn kebab_name_passes() {
        let ctx = RuleContext::default();
        assert_eq!(name_format(&entry("bash-scripting", "./p"), &ctx), Outcome::Pass);
        assert_eq!(name_format(&entry("go2", "./p"), &ctx), Outcome::Pass);
    }

    #[test]
    fn uppercase_name_is_naming_violation() {
        let ctx = RuleContext::default();
        match name_format(&entry("BashScripting", "./p"), &ctx) {
            Outcome::Fail { kind, message } => {
                assert_eq!(kind, FailureKind::NamingViolation);
                assert!(message.contains("BashScripting"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn leading_hyphen_fails_default_pattern() {
        let ctx = RuleContext::default();
        assert!(matches!(
            name_format(&entry("-x", "./p"), &ctx),
            Outcome::Fail { .. }
        ));
    }

    #[test]
    fn dot_slash_source_passes() {
        let ctx = RuleContext::default();
        assert_eq!(
            explicit_relative_source(&entry("a", "./plugins/a"), &ctx),
            Outcome::Pass
        );
        assert!(matches!(
            explicit_relative_source(&entry("a", "plugins/a"), &ctx),
            Outcome::Fail { .. }
        ));
    }

    #[test]
    fn hyphen_hygiene_flags_double_and_trailing() {
        let ctx = RuleContext::default();
        assert_eq!(hyphen_hygiene(&entry("a-b", "./p"), &ctx), Outcome::Pass);
        match hyphen_hygiene(&entry("a--b-", "./p"), &ctx) {
            Outcome::Fail { message, .. } => {
                assert!(message.contains("consecutive"));
                assert!(message.contains("ends with a hyphen"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn remote_source_is_a_warning_and_skips_prefix_check() {
        let ctx = RuleContext::default();
        let mut remote = entry("remote", "./unused");
        remote.source = PluginSource::Remote(crate::manifest::RemoteSource {
            kind: "url".into(),
            location: Some("https://example.com/p.git".into()),
        });
        assert_eq!(explicit_relative_source(&remote, &ctx), Outcome::NotApplicable);
        match local_source(&remote, &ctx) {
            Outcome::Fail { kind, message } => {
                assert_eq!(kind, FailureKind::FileMissing);
                assert!(message.contains("https://example.com/p.git"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(local_source(&entry("a", "./a"), &ctx), Outcome::Pass);
    }
}
