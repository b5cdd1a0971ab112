//! Plugin descriptor (`plugin.json`) rules (P001–P006).

use std::sync::LazyLock;

use regex::Regex;

use super::{
    field_problems, Check, DescriptorState, FieldValue, Outcome, PluginTarget, Rule, RuleContext,
};
use crate::diagnostics::{FailureKind, Severity};

/// Regex for semver: x.y.z with optional pre-release/build suffix.
static SEMVER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]+\.[0-9]+\.[0-9]+(-[0-9A-Za-z.-]+)?(\+[0-9A-Za-z.-]+)?$")
        .expect("semver regex")
});

pub(super) const RULES: &[Rule] = &[
    Rule {
        id: "P001",
        title: "plugin descriptor exists",
        severity: Severity::Error,
        check: Check::Plugin(descriptor_exists),
    },
    Rule {
        id: "P002",
        title: "plugin descriptor is a valid JSON object",
        severity: Severity::Error,
        check: Check::Plugin(descriptor_parses),
    },
    Rule {
        id: "P003",
        title: "plugin descriptor has the required metadata",
        severity: Severity::Error,
        check: Check::Plugin(required_metadata),
    },
    Rule {
        id: "P004",
        title: "descriptor name matches the marketplace entry",
        severity: Severity::Error,
        check: Check::Plugin(name_matches_entry),
    },
    Rule {
        id: "P005",
        title: "descriptor name follows the naming convention",
        severity: Severity::Error,
        check: Check::Plugin(name_format),
    },
    Rule {
        id: "P006",
        title: "descriptor version is semver",
        severity: Severity::Warning,
        check: Check::Plugin(version_semver),
    },
];

/// Parsed descriptor object, if any.
fn loaded<'a>(
    target: &'a PluginTarget<'_>,
) -> Option<&'a serde_json::Map<String, serde_json::Value>> {
    match target.descriptor {
        DescriptorState::Loaded { value, .. } => Some(value),
        _ => None,
    }
}

/// The descriptor's `name`, when it is a non-empty string.
fn declared_name<'a>(target: &'a PluginTarget<'_>) -> Option<&'a str> {
    loaded(target)?
        .get("name")?
        .as_str()
        .filter(|n| !n.trim().is_empty())
}

fn descriptor_exists(target: &PluginTarget<'_>, ctx: &RuleContext) -> Outcome {
    match target.descriptor {
        DescriptorState::Missing if target.entry.and_then(|e| e.strict) == Some(false) => {
            Outcome::NotApplicable
        }
        DescriptorState::Missing => Outcome::fail(
            FailureKind::FileMissing,
            format!(
                "no plugin descriptor found (looked for {})",
                ctx.descriptor_paths.join(", ")
            ),
        ),
        _ => Outcome::Pass,
    }
}

fn descriptor_parses(target: &PluginTarget<'_>, _ctx: &RuleContext) -> Outcome {
    match target.descriptor {
        DescriptorState::Missing => Outcome::NotApplicable,
        DescriptorState::Unreadable { path, message } => Outcome::fail(
            FailureKind::InternalIo,
            format!("cannot read {path}: {message}"),
        ),
        DescriptorState::Malformed { path, message } => Outcome::fail(
            FailureKind::SchemaViolation,
            format!("{path} is not a valid JSON object: {message}"),
        ),
        DescriptorState::Loaded { .. } => Outcome::Pass,
    }
}

fn required_metadata(target: &PluginTarget<'_>, ctx: &RuleContext) -> Outcome {
    let Some(obj) = loaded(target) else {
        return Outcome::NotApplicable;
    };
    let problems = field_problems(&ctx.required.plugin, |f| obj.get(f).map(FieldValue::from));
    Outcome::from_problems(FailureKind::SchemaViolation, problems)
}

fn name_matches_entry(target: &PluginTarget<'_>, _ctx: &RuleContext) -> Outcome {
    let (Some(entry), Some(name)) = (target.entry, declared_name(target)) else {
        return Outcome::NotApplicable;
    };
    if name == entry.name {
        Outcome::Pass
    } else {
        Outcome::fail(
            FailureKind::NamingViolation,
            format!(
                "descriptor name \"{name}\" does not match marketplace entry \"{}\"",
                entry.name
            ),
        )
    }
}

fn name_format(target: &PluginTarget<'_>, ctx: &RuleContext) -> Outcome {
    let Some(name) = declared_name(target) else {
        return Outcome::NotApplicable;
    };
    if ctx.name_pattern.is_match(name) {
        Outcome::Pass
    } else {
        Outcome::fail(
            FailureKind::NamingViolation,
            format!(
                "descriptor name \"{name}\" does not match `{}`",
                ctx.name_pattern.as_str()
            ),
        )
    }
}

fn version_semver(target: &PluginTarget<'_>, _ctx: &RuleContext) -> Outcome {
    let Some(version) = loaded(target).and_then(|obj| obj.get("version")) else {
        return Outcome::NotApplicable;
    };
    match version.as_str() {
        Some(v) if SEMVER_RE.is_match(v) => Outcome::Pass,
        Some(v) => Outcome::fail(
            FailureKind::SchemaViolation,
            format!("`version` is not valid semver: \"{v}\""),
        ),
        None => Outcome::fail(FailureKind::SchemaViolation, "`version` must be a string"),
    }
}
