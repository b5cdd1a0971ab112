//! Rule evaluation for a single plugin.
//!
//! The engine owns an immutable [`RuleSet`] and [`RuleContext`] and is
//! shared across workers behind an `Arc`. Evaluating a plugin never touches
//! another plugin's state.

use std::path::Path;

use tracing::{debug, trace};

use crate::diagnostics::{FailureKind, Severity, ValidationResult};
use crate::errors::ValidatorError;
use crate::manifest::{ManifestEntry, MarketplaceManifest, PluginSource};
use crate::resolver::{self, PluginDescriptor};
use crate::rules::{
    Check, DescriptorState, FileKind, FileTarget, Outcome, PluginTarget, ReadError, Rule,
    RuleContext, RuleSet, RESOLVE_RULE_ID,
};

/// Applies a rule set to resolved plugins.
#[derive(Debug, Clone)]
pub struct RuleEngine {
    rules: RuleSet,
    context: RuleContext,
}

impl RuleEngine {
    #[must_use]
    pub fn new(rules: RuleSet, context: RuleContext) -> Self {
        Self { rules, context }
    }

    #[must_use]
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    #[must_use]
    pub fn context(&self) -> &RuleContext {
        &self.context
    }

    /// Load the first descriptor found at one of the configured paths.
    #[must_use]
    pub fn load_descriptor(&self, plugin: &PluginDescriptor) -> DescriptorState {
        let Some(rel) = self
            .context
            .descriptor_paths
            .iter()
            .find(|p| plugin.has_file(p))
        else {
            return DescriptorState::Missing;
        };

        let path = rel.clone();
        let content = match std::fs::read_to_string(plugin.root.join(rel)) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                return DescriptorState::Malformed {
                    path,
                    message: "file is not valid UTF-8".into(),
                }
            }
            Err(e) => {
                return DescriptorState::Unreadable {
                    path,
                    message: e.to_string(),
                }
            }
        };
        match serde_json::from_str::<serde_json::Value>(&content) {
            Ok(serde_json::Value::Object(value)) => DescriptorState::Loaded { path, value },
            Ok(_) => DescriptorState::Malformed {
                path,
                message: "top level must be a JSON object".into(),
            },
            Err(e) => DescriptorState::Malformed {
                path,
                message: e.to_string(),
            },
        }
    }

    /// Evaluate every applicable rule against one resolved plugin.
    ///
    /// Manifest rules run only when `entry` is given. File rules run once per
    /// matching file; each file is read at most once.
    #[must_use]
    pub fn validate_plugin(
        &self,
        entry: Option<&ManifestEntry>,
        plugin: &PluginDescriptor,
    ) -> Vec<ValidationResult> {
        let mut results = Vec::new();
        if let Some(entry) = entry {
            results.extend(self.manifest_results(entry));
        }

        let descriptor = self.load_descriptor(plugin);
        let target = PluginTarget {
            plugin,
            entry,
            descriptor: &descriptor,
        };
        for rule in self.rules.iter() {
            if let Check::Plugin(check) = rule.check {
                let outcome = check(&target, &self.context);
                push_outcome(&mut results, &plugin.name, rule, None, outcome);
            }
        }

        for kind in FileKind::ALL {
            let file_rules: Vec<&Rule> = self
                .rules
                .iter()
                .filter(|r| matches!(r.check, Check::File(k, _) if k == kind))
                .collect();
            if file_rules.is_empty() {
                continue;
            }
            for path in plugin.files_under(kind.dir()).filter(|f| kind.matches(f)) {
                let content = std::fs::read_to_string(plugin.root.join(path))
                    .map_err(|e| ReadError::from_io(&e, &format!("{kind} file")));
                let target = FileTarget {
                    plugin,
                    path,
                    content: &content,
                };
                for rule in &file_rules {
                    if let Check::File(_, check) = rule.check {
                        let outcome = check(&target, &self.context);
                        push_outcome(&mut results, &plugin.name, rule, Some(path), outcome);
                    }
                }
            }
        }

        debug!(
            plugin = %plugin.name,
            results = results.len(),
            failures = results.iter().filter(|r| !r.passed).count(),
            "validated plugin"
        );
        results
    }

    /// Results for an entry whose source could not be resolved: one `R001`
    /// failure plus the manifest rules, which need no files.
    #[must_use]
    pub fn resolution_failure(
        &self,
        entry: &ManifestEntry,
        error: &ValidatorError,
    ) -> Vec<ValidationResult> {
        let kind = match error {
            ValidatorError::PluginNotFound { .. } => FailureKind::PluginNotFound,
            _ => FailureKind::InternalIo,
        };
        let mut results = vec![ValidationResult::fail(
            entry.name.clone(),
            RESOLVE_RULE_ID,
            Severity::Error,
            kind,
            error.to_string(),
        )];
        results.extend(self.manifest_results(entry));
        results
    }

    /// Resolve an entry against `base_dir` and validate it. Remote entries
    /// get the manifest rules only.
    #[must_use]
    pub fn validate_entry(&self, entry: &ManifestEntry, base_dir: &Path) -> Vec<ValidationResult> {
        if let PluginSource::Remote(remote) = &entry.source {
            debug!(plugin = %entry.name, source = %remote, "remote source; not resolved");
            return self.manifest_results(entry);
        }
        match resolver::resolve(entry, base_dir) {
            Ok(plugin) => self.validate_plugin(Some(entry), &plugin),
            Err(e) => {
                debug!(plugin = %entry.name, error = %e, "cannot resolve plugin");
                self.resolution_failure(entry, &e)
            }
        }
    }

    /// Validate every manifest entry in order, on the calling thread.
    #[must_use]
    pub fn run(&self, manifest: &MarketplaceManifest, base_dir: &Path) -> Vec<ValidationResult> {
        manifest
            .entries()
            .iter()
            .flat_map(|entry| self.validate_entry(entry, base_dir))
            .collect()
    }

    fn manifest_results(&self, entry: &ManifestEntry) -> Vec<ValidationResult> {
        let mut results = Vec::new();
        for rule in self.rules.iter() {
            if let Check::Manifest(check) = rule.check {
                let outcome = check(entry, &self.context);
                push_outcome(&mut results, &entry.name, rule, None, outcome);
            }
        }
        results
    }
}

fn push_outcome(
    results: &mut Vec<ValidationResult>,
    plugin: &str,
    rule: &Rule,
    file: Option<&str>,
    outcome: Outcome,
) {
    let result = match outcome {
        Outcome::NotApplicable => {
            trace!(plugin, rule = rule.id, file = file.unwrap_or(""), "not applicable");
            return;
        }
        Outcome::Pass => ValidationResult::pass(plugin, rule.id, rule.severity, rule.title),
        Outcome::Fail { kind, message } => {
            ValidationResult::fail(plugin, rule.id, rule.severity, kind, message)
        }
    };
    results.push(match file {
        Some(f) => result.with_file(f),
        None => result,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn engine() -> RuleEngine {
        RuleEngine::new(RuleSet::builtin(), RuleContext::default())
    }

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

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn bash_scripting(root: &Path) {
        write(
            root,
            ".claude-plugin/plugin.json",
            r#"{ "name": "bash-scripting", "description": "Bash tooling", "version": "1.0.0" }"#,
        );
        write(root, "README.md", "# bash-scripting\n");
        write(
            root,
            "skills/bats-tester/SKILL.md",
            "---\nname: bats-tester\ndescription: Generate bats tests\n---\n# Bats\n",
        );
        write(
            root,
            "commands/lint.md",
            "---\ndescription: Lint shell scripts\n---\nRun shellcheck.\n",
        );
    }

    fn failures(results: &[ValidationResult]) -> Vec<&ValidationResult> {
        results.iter().filter(|r| !r.passed).collect()
    }

    #[test]
    fn clean_plugin_has_no_failures() {
        let base = tempdir().unwrap();
        bash_scripting(&base.path().join("plugins/bash-scripting"));
        let results = engine().validate_entry(
            &entry("bash-scripting", "./plugins/bash-scripting"),
            base.path(),
        );
        assert!(failures(&results).is_empty(), "{:?}", failures(&results));
        assert!(results.iter().any(|r| r.rule_id == "S001"
            && r.file.as_deref() == Some("skills/bats-tester/SKILL.md")));
        assert!(results.iter().any(|r| r.rule_id == "C002"));
    }

    #[test]
    fn missing_description_yields_one_schema_violation() {
        let base = tempdir().unwrap();
        let root = base.path().join("plugins/bash-scripting");
        bash_scripting(&root);
        write(
            &root,
            ".claude-plugin/plugin.json",
            r#"{ "name": "bash-scripting" }"#,
        );
        let results = engine().validate_entry(
            &entry("bash-scripting", "./plugins/bash-scripting"),
            base.path(),
        );
        let failed = failures(&results);
        assert_eq!(failed.len(), 1, "{failed:?}");
        assert_eq!(failed[0].rule_id, "P003");
        assert_eq!(failed[0].kind, Some(FailureKind::SchemaViolation));
        assert!(failed[0].message.contains("description"));
    }

    #[test]
    fn unresolvable_entry_reports_plugin_not_found() {
        let base = tempdir().unwrap();
        let results = engine().validate_entry(&entry("ghost", "./plugins/ghost"), base.path());
        let failed = failures(&results);
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].rule_id, RESOLVE_RULE_ID);
        assert_eq!(failed[0].kind, Some(FailureKind::PluginNotFound));
        assert!(results.iter().any(|r| r.rule_id == "M001" && r.passed));
        assert!(!results.iter().any(|r| r.rule_id.starts_with('P')));
    }

    #[test]
    fn file_rules_report_the_offending_file() {
        let base = tempdir().unwrap();
        let root = base.path().join("p");
        bash_scripting(&root);
        write(&root, "agents/reviewer.md", "no frontmatter\n");
        let plugin = resolver::resolve_dir(&root).unwrap();
        let results = engine().validate_plugin(None, &plugin);
        let failed = failures(&results);
        assert_eq!(failed.len(), 1, "{failed:?}");
        assert_eq!(failed[0].rule_id, "A001");
        assert_eq!(failed[0].file.as_deref(), Some("agents/reviewer.md"));
    }

    #[test]
    fn latin1_files_are_schema_violations() {
        let base = tempdir().unwrap();
        let root = base.path().join("p");
        bash_scripting(&root);
        fs::write(root.join("commands/caf.md"), b"---\ndescription: caf\xe9\n---\n").unwrap();
        let plugin = resolver::resolve_dir(&root).unwrap();
        let results = engine().validate_plugin(None, &plugin);
        let failed = failures(&results);
        assert_eq!(failed.len(), 1, "{failed:?}");
        assert_eq!(failed[0].rule_id, "C001");
        assert_eq!(failed[0].kind, Some(FailureKind::SchemaViolation));
        assert_eq!(failed[0].message, "command file is not valid UTF-8");

        fs::write(root.join(".claude-plugin/plugin.json"), b"{ \"name\": \"p\xe9\" }").unwrap();
        let results = engine().validate_plugin(None, &plugin);
        let p002 = results.iter().find(|r| r.rule_id == "P002").unwrap();
        assert!(!p002.passed);
        assert_eq!(p002.kind, Some(FailureKind::SchemaViolation));
    }

    #[test]
    fn remote_entry_gets_manifest_rules_only() {
        let base = tempdir().unwrap();
        let manifest = crate::manifest::parse(
            r#"{ "plugins": [
                { "name": "remote", "source": { "source": "github", "repo": "o/r" } }
            ] }"#,
            crate::manifest::DocumentFormat::Json,
            &base.path().join("marketplace.json"),
        )
        .unwrap();
        let results = engine().run(&manifest, base.path());
        assert!(results.iter().all(|r| r.rule_id.starts_with('M')), "{results:?}");
        let failed = failures(&results);
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].rule_id, "M004");
        assert_eq!(failed[0].severity, Severity::Warning);
    }

    #[test]
    fn single_plugin_mode_skips_manifest_rules() {
        let base = tempdir().unwrap();
        let root = base.path().join("bash-scripting");
        bash_scripting(&root);
        let plugin = resolver::resolve_dir(&root).unwrap();
        let results = engine().validate_plugin(None, &plugin);
        assert!(!results.iter().any(|r| r.rule_id.starts_with('M')));
        assert!(!results.iter().any(|r| r.rule_id == "P004"));
    }

    #[test]
    fn malformed_descriptor_is_reported_once() {
        let base = tempdir().unwrap();
        let root = base.path().join("p");
        bash_scripting(&root);
        write(&root, ".claude-plugin/plugin.json", "[1, 2]");
        let plugin = resolver::resolve_dir(&root).unwrap();
        let results = engine().validate_plugin(None, &plugin);
        let failed = failures(&results);
        assert_eq!(failed.len(), 1, "{failed:?}");
        assert_eq!(failed[0].rule_id, "P002");
    }

    #[test]
    fn fallback_descriptor_path_is_used() {
        let base = tempdir().unwrap();
        let root = base.path().join("p");
        write(&root, "plugin.json", r#"{ "name": "p", "description": "d" }"#);
        let plugin = resolver::resolve_dir(&root).unwrap();
        match engine().load_descriptor(&plugin) {
            DescriptorState::Loaded { path, .. } => assert_eq!(path, "plugin.json"),
            other => panic!("expected loaded descriptor, got {other:?}"),
        }
    }

    #[test]
    fn disabled_rules_are_not_evaluated() {
        let base = tempdir().unwrap();
        let root = base.path().join("p");
        write(&root, "plugin.json", r#"{ "name": "p", "description": "d" }"#);
        let config =
            crate::config::Config::from_toml_str("[rules]\ndisabled = [\"P007\", \"P008\"]\n")
                .unwrap();
        let engine = RuleEngine::new(
            RuleSet::from_config(&config).unwrap(),
            RuleContext::from_config(&config).unwrap(),
        );
        let plugin = resolver::resolve_dir(&root).unwrap();
        let results = engine.validate_plugin(None, &plugin);
        assert!(failures(&results).is_empty(), "{:?}", failures(&results));
    }

    #[test]
    fn run_preserves_manifest_order() {
        let base = tempdir().unwrap();
        bash_scripting(&base.path().join("b"));
        bash_scripting(&base.path().join("a"));
        let manifest = crate::manifest::parse(
            r#"{ "plugins": [
                { "name": "b", "source": "./b" },
                { "name": "a", "source": "./a" }
            ] }"#,
            crate::manifest::DocumentFormat::Json,
            &base.path().join("marketplace.json"),
        )
        .unwrap();
        let results = engine().run(&manifest, base.path());
        assert_eq!(results.first().unwrap().plugin, "b");
        assert_eq!(results.last().unwrap().plugin, "a");
    }
}
