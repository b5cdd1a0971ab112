//! Command file (`commands/**/*.md`) rules.

use super::{
    field_problems, tools_outcome, Check, FieldValue, FileKind, FileTarget, Outcome, Rule,
    RuleContext,
};
use crate::diagnostics::{FailureKind, Severity};
use crate::frontmatter::parse_optional_frontmatter;

pub(super) const RULES: &[Rule] = &[
    Rule {
        id: "C001",
        title: "command frontmatter is valid YAML",
        severity: Severity::Error,
        check: Check::File(FileKind::Command, frontmatter_valid),
    },
    Rule {
        id: "C002",
        title: "command declares the required frontmatter fields",
        severity: Severity::Error,
        check: Check::File(FileKind::Command, required_fields),
    },
    Rule {
        id: "C003",
        title: "command allowed-tools are known tool names",
        severity: Severity::Warning,
        check: Check::File(FileKind::Command, known_tools),
    },
];

fn frontmatter_valid(target: &FileTarget<'_>, _ctx: &RuleContext) -> Outcome {
    let content = match target.content {
        Ok(c) => c,
        Err(e) => return e.outcome(),
    };
    match parse_optional_frontmatter(content) {
        Ok(_) => Outcome::Pass,
        Err(e) => Outcome::fail(FailureKind::SchemaViolation, e.to_string()),
    }
}

fn required_fields(target: &FileTarget<'_>, ctx: &RuleContext) -> Outcome {
    let Ok(content) = target.content else {
        return Outcome::NotApplicable;
    };
    let Ok((metadata, _)) = parse_optional_frontmatter(content) else {
        return Outcome::NotApplicable;
    };
    let problems = field_problems(&ctx.required.command, |f| {
        metadata.get(f).map(FieldValue::from)
    });
    Outcome::from_problems(FailureKind::SchemaViolation, problems)
}

fn known_tools(target: &FileTarget<'_>, _ctx: &RuleContext) -> Outcome {
    let Ok(content) = target.content else {
        return Outcome::NotApplicable;
    };
    match parse_optional_frontmatter(content) {
        Ok((metadata, _)) => tools_outcome(&metadata),
        Err(_) => Outcome::NotApplicable,
    }
}
