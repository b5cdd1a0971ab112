//! Rule model and the built-in rule catalog.
//!
//! A rule is a stateless function tagged with the kind of target it
//! inspects. The engine dispatches on that tag; rules never see targets of
//! another kind and never share state.

mod agent;
mod command;
mod descriptor;
mod hooks;
mod manifest;
mod skill;
mod structure;

use std::fmt;

use regex::Regex;
use serde::Serialize;

use crate::config::{Config, RequiredFields};
use crate::diagnostics::{FailureKind, Severity};
use crate::errors::{Result, ValidatorError};
use crate::manifest::ManifestEntry;
use crate::resolver::PluginDescriptor;

/// Rule id reported when a plugin source cannot be resolved.
pub const RESOLVE_RULE_ID: &str = "R001";

/// Rule id reported when a validation task dies without producing results.
pub const TASK_RULE_ID: &str = "R002";

/// Kind of sub-resource file a file rule targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    /// `commands/**/*.md`
    Command,
    /// `skills/**/SKILL.md`
    Skill,
    /// `agents/**/*.md`
    Agent,
    /// `hooks/**/*.json`
    Hook,
}

/// Documentation files that live alongside components but are not components.
const NON_COMPONENT_FILES: &[&str] = &["README.md", "readme.md"];

impl FileKind {
    /// All kinds, in evaluation order.
    pub const ALL: [FileKind; 4] = [
        FileKind::Command,
        FileKind::Skill,
        FileKind::Agent,
        FileKind::Hook,
    ];

    /// Capability directory that holds files of this kind.
    #[must_use]
    pub fn dir(self) -> &'static str {
        match self {
            FileKind::Command => "commands",
            FileKind::Skill => "skills",
            FileKind::Agent => "agents",
            FileKind::Hook => "hooks",
        }
    }

    /// Returns `true` if a plugin-relative path is a file of this kind.
    #[must_use]
    pub fn matches(self, relative: &str) -> bool {
        let Some(rest) = relative
            .strip_prefix(self.dir())
            .and_then(|r| r.strip_prefix('/'))
        else {
            return false;
        };
        let file_name = rest.rsplit('/').next().unwrap_or(rest);
        match self {
            FileKind::Command | FileKind::Agent => {
                file_name.ends_with(".md") && !NON_COMPONENT_FILES.contains(&file_name)
            }
            FileKind::Skill => file_name == "SKILL.md",
            FileKind::Hook => file_name.ends_with(".json"),
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileKind::Command => write!(f, "command"),
            FileKind::Skill => write!(f, "skill"),
            FileKind::Agent => write!(f, "agent"),
            FileKind::Hook => write!(f, "hook"),
        }
    }
}

/// What a rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Manifest,
    Plugin,
    File(FileKind),
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Manifest => write!(f, "manifest"),
            Scope::Plugin => write!(f, "plugin"),
            Scope::File(kind) => write!(f, "file:{kind}"),
        }
    }
}

/// The state of a plugin's descriptor file, loaded once per plugin.
#[derive(Debug, Clone)]
pub enum DescriptorState {
    /// None of the configured descriptor paths exist.
    Missing,
    /// The file exists but could not be read.
    Unreadable { path: String, message: String },
    /// The file is not a JSON object.
    Malformed { path: String, message: String },
    /// Parsed descriptor object.
    Loaded {
        path: String,
        value: serde_json::Map<String, serde_json::Value>,
    },
}

/// Target of a plugin-scoped rule.
#[derive(Debug)]
pub struct PluginTarget<'a> {
    pub plugin: &'a PluginDescriptor,
    /// Manifest entry; `None` in single-plugin mode.
    pub entry: Option<&'a ManifestEntry>,
    pub descriptor: &'a DescriptorState,
}

/// Target of a file-scoped rule.
#[derive(Debug)]
pub struct FileTarget<'a> {
    pub plugin: &'a PluginDescriptor,
    /// Plugin-relative, `/`-separated path.
    pub path: &'a str,
    /// File text, or why it is unavailable.
    pub content: &'a std::result::Result<String, ReadError>,
}

/// A file whose text could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadError {
    pub kind: FailureKind,
    pub message: String,
}

impl ReadError {
    /// Content that is not UTF-8 is a defect in the plugin; any other I/O
    /// error is not.
    #[must_use]
    pub fn from_io(err: &std::io::Error, what: &str) -> Self {
        if err.kind() == std::io::ErrorKind::InvalidData {
            Self {
                kind: FailureKind::SchemaViolation,
                message: format!("{what} is not valid UTF-8"),
            }
        } else {
            Self {
                kind: FailureKind::InternalIo,
                message: format!("cannot read {what}: {err}"),
            }
        }
    }

    /// Failure reported by the first rule of each file kind.
    #[must_use]
    pub fn outcome(&self) -> Outcome {
        Outcome::fail(self.kind, self.message.clone())
    }
}

/// Result of a single check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Pass,
    Fail { kind: FailureKind, message: String },
    /// The rule has nothing to check for this target; no result is emitted.
    NotApplicable,
}

impl Outcome {
    /// Shorthand for [`Outcome::Fail`].
    #[must_use]
    pub fn fail(kind: FailureKind, message: impl Into<String>) -> Self {
        Outcome::Fail {
            kind,
            message: message.into(),
        }
    }

    /// `Pass` when there are no problems, otherwise a failure joining them.
    #[must_use]
    pub fn from_problems(kind: FailureKind, problems: Vec<String>) -> Self {
        if problems.is_empty() {
            Outcome::Pass
        } else {
            Outcome::fail(kind, problems.join("; "))
        }
    }
}

pub type ManifestCheck = fn(&ManifestEntry, &RuleContext) -> Outcome;
pub type PluginCheck = fn(&PluginTarget<'_>, &RuleContext) -> Outcome;
pub type FileCheck = fn(&FileTarget<'_>, &RuleContext) -> Outcome;

/// A rule's check, tagged with the target kind it accepts.
#[derive(Clone, Copy)]
pub enum Check {
    Manifest(ManifestCheck),
    Plugin(PluginCheck),
    File(FileKind, FileCheck),
}

/// A single registered validation rule.
#[derive(Clone, Copy)]
pub struct Rule {
    /// Stable id (e.g., `"P003"`).
    pub id: &'static str,
    /// One-line description; used as the message of passing results.
    pub title: &'static str,
    pub severity: Severity,
    pub check: Check,
}

impl Rule {
    /// Target kind this rule applies to.
    #[must_use]
    pub fn scope(&self) -> Scope {
        match self.check {
            Check::Manifest(_) => Scope::Manifest,
            Check::Plugin(_) => Scope::Plugin,
            Check::File(kind, _) => Scope::File(kind),
        }
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("id", &self.id)
            .field("severity", &self.severity)
            .field("scope", &self.scope())
            .finish()
    }
}

/// Settings shared read-only by every rule invocation.
#[derive(Debug, Clone)]
pub struct RuleContext {
    pub name_pattern: Regex,
    pub descriptor_paths: Vec<String>,
    pub required: RequiredFields,
}

impl RuleContext {
    /// Build the context from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            name_pattern: config.name_regex()?,
            descriptor_paths: config.descriptor_paths.clone(),
            required: config.required_fields.clone(),
        })
    }
}

impl Default for RuleContext {
    fn default() -> Self {
        let config = Config::default();
        Self {
            name_pattern: Regex::new(crate::config::DEFAULT_NAME_PATTERN)
                .expect("default name pattern"),
            descriptor_paths: config.descriptor_paths,
            required: config.required_fields,
        }
    }
}

/// An immutable, ordered rule registry.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// A registry holding exactly `rules`.
    #[must_use]
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Every built-in rule with its default severity.
    #[must_use]
    pub fn builtin() -> Self {
        let rules = [
            manifest::RULES,
            descriptor::RULES,
            structure::RULES,
            command::RULES,
            skill::RULES,
            agent::RULES,
            hooks::RULES,
        ]
        .concat();
        Self { rules }
    }

    /// The built-in registry adjusted by `config.rules`.
    ///
    /// Unknown rule ids in the configuration are rejected.
    pub fn from_config(config: &Config) -> Result<Self> {
        let builtin = Self::builtin();
        let unknown = config
            .rules
            .disabled
            .iter()
            .chain(config.rules.severity.keys())
            .find(|id| builtin.get(id).is_none());
        if let Some(id) = unknown {
            return Err(ValidatorError::Config {
                message: format!("unknown rule id `{id}`"),
            });
        }

        let rules = builtin
            .rules
            .into_iter()
            .filter(|r| !config.rules.disabled.iter().any(|d| d == r.id))
            .map(|mut r| {
                if let Some(severity) = config.rules.severity.get(r.id) {
                    r.severity = *severity;
                }
                r
            })
            .collect();
        Ok(Self { rules })
    }

    /// Look up a rule by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// A JSON or YAML field value as seen by required-field checks.
pub(crate) enum FieldValue<'v> {
    Str(&'v str),
    Other,
}

impl<'v> From<&'v serde_json::Value> for FieldValue<'v> {
    fn from(v: &'v serde_json::Value) -> Self {
        v.as_str().map_or(FieldValue::Other, FieldValue::Str)
    }
}

impl<'v> From<&'v serde_yaml_ng::Value> for FieldValue<'v> {
    fn from(v: &'v serde_yaml_ng::Value) -> Self {
        v.as_str().map_or(FieldValue::Other, FieldValue::Str)
    }
}

/// Built-in tool names accepted in `tools` and `allowed-tools`.
const KNOWN_TOOLS: &[&str] = &[
    "Read",
    "Write",
    "Edit",
    "MultiEdit",
    "Bash",
    "LS",
    "Glob",
    "Grep",
    "WebSearch",
    "WebFetch",
    "Task",
    "SlashCommand",
    "NotebookEdit",
    "TodoWrite",
];

/// Frontmatter keys that list tool names.
const TOOL_FIELDS: &[&str] = &["tools", "allowed-tools"];

/// Checks every tool list in a frontmatter block. A list is a
/// comma-separated string or a sequence of strings; `Bash(git:*)` counts as
/// `Bash` and `mcp__*` names are always accepted.
pub(crate) fn tools_outcome(metadata: &crate::frontmatter::Frontmatter) -> Outcome {
    let present: Vec<(&str, &serde_yaml_ng::Value)> = TOOL_FIELDS
        .iter()
        .filter_map(|f| metadata.get(*f).map(|v| (*f, v)))
        .collect();
    if present.is_empty() {
        return Outcome::NotApplicable;
    }

    let mut problems = Vec::new();
    for (field, value) in present {
        let names: Vec<&str> = match value {
            serde_yaml_ng::Value::String(s) => s.split(',').collect(),
            serde_yaml_ng::Value::Sequence(items) => {
                if items.iter().any(|i| !i.is_string()) {
                    problems.push(format!("items in `{field}` must be strings"));
                }
                items.iter().filter_map(serde_yaml_ng::Value::as_str).collect()
            }
            _ => {
                problems.push(format!("`{field}` must be a string or a list of tool names"));
                continue;
            }
        };
        for name in names.into_iter().map(str::trim).filter(|n| !n.is_empty()) {
            let base = name.split('(').next().unwrap_or(name).trim();
            if !base.starts_with("mcp__") && !KNOWN_TOOLS.contains(&base) {
                problems.push(format!("unknown tool in `{field}`: \"{name}\""));
            }
        }
    }
    Outcome::from_problems(FailureKind::SchemaViolation, problems)
}

/// Problems with required string fields: absent, not a string, or blank.
pub(crate) fn field_problems<'v>(
    required: &[String],
    get: impl Fn(&str) -> Option<FieldValue<'v>>,
) -> Vec<String> {
    required
        .iter()
        .filter_map(|field| match get(field) {
            None => Some(format!("missing required field `{field}`")),
            Some(FieldValue::Other) => Some(format!("`{field}` must be a string")),
            Some(FieldValue::Str(s)) if s.trim().is_empty() => {
                Some(format!("`{field}` must not be empty"))
            }
            Some(FieldValue::Str(_)) => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn invalid_utf8_is_schema_violation() {
        let err = std::io::Error::new(std::io::ErrorKind::InvalidData, "invalid utf-8");
        let read = ReadError::from_io(&err, "command file");
        assert_eq!(read.kind, FailureKind::SchemaViolation);
        assert_eq!(read.message, "command file is not valid UTF-8");

        let err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "permission denied");
        let read = ReadError::from_io(&err, "command file");
        assert_eq!(read.kind, FailureKind::InternalIo);
        assert_eq!(
            read.outcome(),
            Outcome::fail(FailureKind::InternalIo, "cannot read command file: permission denied")
        );
    }

    fn frontmatter(yaml: &str) -> crate::frontmatter::Frontmatter {
        serde_yaml_ng::from_str(yaml).unwrap()
    }

    #[test]
    fn tool_lists_accept_known_and_scoped_names() {
        let metadata = frontmatter("tools: Read, Bash(git:*), mcp__github__search\n");
        assert_eq!(tools_outcome(&metadata), Outcome::Pass);
        let metadata = frontmatter("allowed-tools:\n  - Grep\n  - Glob\n");
        assert_eq!(tools_outcome(&metadata), Outcome::Pass);
        assert_eq!(tools_outcome(&frontmatter("name: x\n")), Outcome::NotApplicable);
    }

    #[test]
    fn tool_lists_flag_unknown_names_and_bad_types() {
        match tools_outcome(&frontmatter("tools: Read, Teleport\nallowed-tools: 42\n")) {
            Outcome::Fail { kind, message } => {
                assert_eq!(kind, FailureKind::SchemaViolation);
                assert!(message.contains("unknown tool in `tools`: \"Teleport\""));
                assert!(message.contains("`allowed-tools` must be a string or a list"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
        match tools_outcome(&frontmatter("allowed-tools:\n  - Read\n  - 3\n")) {
            Outcome::Fail { message, .. } => assert!(message.contains("must be strings")),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn builtin_ids_are_unique() {
        let set = RuleSet::builtin();
        let mut seen = HashSet::new();
        for rule in set.iter() {
            assert!(seen.insert(rule.id), "duplicate rule id: {}", rule.id);
        }
        assert!(set.get(RESOLVE_RULE_ID).is_none());
        assert!(set.get(TASK_RULE_ID).is_none());
    }

    #[test]
    fn builtin_covers_every_scope() {
        let set = RuleSet::builtin();
        let scopes: Vec<_> = set.iter().map(Rule::scope).collect();
        assert!(scopes.contains(&Scope::Manifest));
        assert!(scopes.contains(&Scope::Plugin));
        for kind in FileKind::ALL {
            assert!(scopes.contains(&Scope::File(kind)), "no rule for {kind}");
        }
    }

    #[test]
    fn from_config_disables_and_overrides() {
        let config = Config::from_toml_str(
            "[rules]\ndisabled = [\"P008\"]\n[rules.severity]\nP006 = \"error\"\n",
        )
        .unwrap();
        let set = RuleSet::from_config(&config).unwrap();
        assert!(set.get("P008").is_none());
        assert_eq!(set.get("P006").unwrap().severity, Severity::Error);
        assert_eq!(set.len(), RuleSet::builtin().len() - 1);
    }

    #[test]
    fn from_config_rejects_unknown_ids() {
        let config = Config::from_toml_str("[rules]\ndisabled = [\"Z999\"]\n").unwrap();
        let err = RuleSet::from_config(&config).unwrap_err();
        assert!(err.to_string().contains("Z999"));
    }

    #[test]
    fn file_kind_matching() {
        assert!(FileKind::Command.matches("commands/lint.md"));
        assert!(FileKind::Command.matches("commands/git/commit.md"));
        assert!(!FileKind::Command.matches("commands/README.md"));
        assert!(!FileKind::Command.matches("commands/notes.txt"));
        assert!(!FileKind::Command.matches("commandsx/lint.md"));
        assert!(FileKind::Skill.matches("skills/bats-tester/SKILL.md"));
        assert!(!FileKind::Skill.matches("skills/bats-tester/reference.md"));
        assert!(FileKind::Agent.matches("agents/reviewer.md"));
        assert!(FileKind::Hook.matches("hooks/hooks.json"));
        assert!(!FileKind::Hook.matches("hooks/scripts/update.py"));
    }

    #[test]
    fn field_problems_reports_each_kind_of_problem() {
        let value = serde_json::json!({ "name": "", "description": 3, "version": "1.0.0" });
        let obj = value.as_object().unwrap();
        let required: Vec<String> = ["name", "description", "license", "version"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let problems = field_problems(&required, |f| obj.get(f).map(FieldValue::from));
        assert_eq!(
            problems,
            vec![
                "`name` must not be empty",
                "`description` must be a string",
                "missing required field `license`",
            ]
        );
    }

    #[test]
    fn outcome_from_problems() {
        assert_eq!(
            Outcome::from_problems(FailureKind::SchemaViolation, vec![]),
            Outcome::Pass
        );
        assert_eq!(
            Outcome::from_problems(
                FailureKind::SchemaViolation,
                vec!["a".into(), "b".into()]
            ),
            Outcome::fail(FailureKind::SchemaViolation, "a; b")
        );
    }
}
