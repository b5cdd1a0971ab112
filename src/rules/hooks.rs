//! Hook configuration (`hooks/*.json`) rules.

use serde::Deserialize;
use serde_json::{Map, Value};

use super::{Check, FileKind, FileTarget, Outcome, Rule, RuleContext};
use crate::diagnostics::{FailureKind, Severity};

/// Valid hook event names.
const VALID_EVENTS: &[&str] = &[
    "PreToolUse",
    "PostToolUse",
    "Stop",
    "SubagentStop",
    "SessionStart",
    "SessionEnd",
    "UserPromptSubmit",
    "PreCompact",
    "Notification",
];

/// Valid hook types.
const VALID_HOOK_TYPES: &[&str] = &["command", "prompt"];

/// Events whose `matcher` selects from a fixed set of values.
const FIXED_MATCHERS: &[(&str, &[&str])] = &[
    ("SessionStart", &["startup", "resume", "clear", "compact"]),
    ("PreCompact", &["manual", "auto"]),
];

pub(super) const RULES: &[Rule] = &[
    Rule {
        id: "H001",
        title: "hook file is a JSON object of event arrays",
        severity: Severity::Error,
        check: Check::File(FileKind::Hook, structure),
    },
    Rule {
        id: "H002",
        title: "hook events are known event names",
        severity: Severity::Error,
        check: Check::File(FileKind::Hook, known_events),
    },
    Rule {
        id: "H003",
        title: "hook definitions are well formed",
        severity: Severity::Error,
        check: Check::File(FileKind::Hook, definitions),
    },
    Rule {
        id: "H004",
        title: "SessionStart and PreCompact matchers use known values",
        severity: Severity::Warning,
        check: Check::File(FileKind::Hook, known_matchers),
    },
];

/// A single hook definition within an event entry.
#[derive(Debug, Deserialize)]
struct HookDefinition {
    #[serde(rename = "type")]
    hook_type: Option<String>,
    command: Option<String>,
    prompt: Option<String>,
    /// Seconds.
    timeout: Option<f64>,
}

/// The event map, with the optional `{"hooks": {...}}` wrapper removed.
fn event_map(root: &Value) -> Result<&Map<String, Value>, String> {
    let obj = root
        .as_object()
        .ok_or_else(|| "top level must be a JSON object".to_string())?;
    let events = match obj.get("hooks") {
        Some(Value::Object(inner)) => inner,
        _ => obj,
    };
    let not_arrays: Vec<&str> = events
        .iter()
        .filter(|(_, v)| !v.is_array())
        .map(|(k, _)| k.as_str())
        .collect();
    if not_arrays.is_empty() {
        Ok(events)
    } else {
        Err(format!(
            "event values must be arrays: {}",
            not_arrays.join(", ")
        ))
    }
}

/// Parsed hook document, when the file is readable JSON.
fn document(target: &FileTarget<'_>) -> Option<Value> {
    let content = target.content.as_ref().ok()?;
    serde_json::from_str(content).ok()
}

fn structure(target: &FileTarget<'_>, _ctx: &RuleContext) -> Outcome {
    let content = match target.content {
        Ok(c) => c,
        Err(e) => return e.outcome(),
    };
    let root: Value = match serde_json::from_str(content) {
        Ok(v) => v,
        Err(e) => {
            return Outcome::fail(
                FailureKind::SchemaViolation,
                format!("invalid JSON syntax: {e}"),
            )
        }
    };
    match event_map(&root) {
        Ok(_) => Outcome::Pass,
        Err(message) => Outcome::fail(FailureKind::SchemaViolation, message),
    }
}

fn known_events(target: &FileTarget<'_>, _ctx: &RuleContext) -> Outcome {
    let Some(root) = document(target) else {
        return Outcome::NotApplicable;
    };
    let Ok(events) = event_map(&root) else {
        return Outcome::NotApplicable;
    };
    let problems = events
        .keys()
        .filter(|name| !VALID_EVENTS.contains(&name.as_str()))
        .map(|name| format!("unknown event name \"{name}\""))
        .collect();
    Outcome::from_problems(FailureKind::SchemaViolation, problems)
}

fn definitions(target: &FileTarget<'_>, _ctx: &RuleContext) -> Outcome {
    let Some(root) = document(target) else {
        return Outcome::NotApplicable;
    };
    let Ok(events) = event_map(&root) else {
        return Outcome::NotApplicable;
    };

    let mut problems = Vec::new();
    for (event, entries) in events {
        let entries = entries.as_array().map(Vec::as_slice).unwrap_or_default();
        for (i, entry) in entries.iter().enumerate() {
            let at = format!("{event}[{i}]");
            let Some(hooks) = entry.get("hooks").and_then(Value::as_array) else {
                problems.push(format!("{at}: entry must be an object with a `hooks` array"));
                continue;
            };
            if entry.get("matcher").is_some_and(|m| !m.is_string()) {
                problems.push(format!("{at}: `matcher` must be a string"));
            }
            for (j, hook) in hooks.iter().enumerate() {
                if let Some(problem) = definition_problem(hook) {
                    problems.push(format!("{at}.hooks[{j}]: {problem}"));
                }
            }
        }
    }
    Outcome::from_problems(FailureKind::SchemaViolation, problems)
}

fn known_matchers(target: &FileTarget<'_>, _ctx: &RuleContext) -> Outcome {
    let Some(root) = document(target) else {
        return Outcome::NotApplicable;
    };
    let Ok(events) = event_map(&root) else {
        return Outcome::NotApplicable;
    };

    let mut problems = Vec::new();
    for (event, allowed) in FIXED_MATCHERS {
        let Some(entries) = events.get(*event).and_then(Value::as_array) else {
            continue;
        };
        for (i, entry) in entries.iter().enumerate() {
            let Some(matcher) = entry.get("matcher").and_then(Value::as_str) else {
                continue;
            };
            for value in matcher.split('|').map(str::trim) {
                if !allowed.contains(&value) {
                    problems.push(format!(
                        "{event}[{i}]: unknown matcher \"{value}\" (expected one of {})",
                        allowed.join(", ")
                    ));
                }
            }
        }
    }
    if problems.is_empty() && !FIXED_MATCHERS.iter().any(|(e, _)| events.contains_key(*e)) {
        return Outcome::NotApplicable;
    }
    Outcome::from_problems(FailureKind::SchemaViolation, problems)
}

fn definition_problem(hook: &Value) -> Option<String> {
    let def: HookDefinition = match serde_json::from_value(hook.clone()) {
        Ok(d) => d,
        Err(e) => return Some(format!("invalid hook definition: {e}")),
    };
    let Some(hook_type) = def.hook_type.as_deref() else {
        return Some("missing `type` field".into());
    };
    if !VALID_HOOK_TYPES.contains(&hook_type) {
        return Some(format!(
            "unknown hook type \"{hook_type}\" (expected {})",
            VALID_HOOK_TYPES.join(" or ")
        ));
    }
    let body = if hook_type == "command" {
        def.command.as_deref()
    } else {
        def.prompt.as_deref()
    };
    if body.map_or(true, |b| b.trim().is_empty()) {
        return Some(format!("`{hook_type}` hook needs a non-empty `{hook_type}` field"));
    }
    match def.timeout {
        Some(t) if t <= 0.0 => Some(format!("`timeout` must be positive, got {t}")),
        _ => None,
    }
}
