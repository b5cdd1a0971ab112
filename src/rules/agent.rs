//! Agent file (`agents/**/*.md`) rules.

use super::{
    field_problems, tools_outcome, Check, FieldValue, FileKind, FileTarget, Outcome, Rule,
    RuleContext,
};
use crate::diagnostics::{FailureKind, Severity};
use crate::frontmatter::{parse_frontmatter, Frontmatter};

/// Valid `model` values.
const VALID_MODELS: &[&str] = &["inherit", "sonnet", "opus", "haiku"];

pub(super) const RULES: &[Rule] = &[
    Rule {
        id: "A001",
        title: "agent opens with valid YAML frontmatter",
        severity: Severity::Error,
        check: Check::File(FileKind::Agent, frontmatter_valid),
    },
    Rule {
        id: "A002",
        title: "agent declares the required frontmatter fields",
        severity: Severity::Error,
        check: Check::File(FileKind::Agent, required_fields),
    },
    Rule {
        id: "A003",
        title: "agent model is a known model alias",
        severity: Severity::Error,
        check: Check::File(FileKind::Agent, known_model),
    },
    Rule {
        id: "A004",
        title: "agent tools are known tool names",
        severity: Severity::Warning,
        check: Check::File(FileKind::Agent, known_tools),
    },
    Rule {
        id: "A005",
        title: "agent has a system prompt after its frontmatter",
        severity: Severity::Error,
        check: Check::File(FileKind::Agent, has_prompt),
    },
];

fn parsed<'c>(target: &FileTarget<'c>) -> Option<(Frontmatter, &'c str)> {
    let content = target.content.as_ref().ok()?;
    parse_frontmatter(content).ok()
}

fn frontmatter_valid(target: &FileTarget<'_>, _ctx: &RuleContext) -> Outcome {
    let content = match target.content {
        Ok(c) => c,
        Err(e) => return e.outcome(),
    };
    match parse_frontmatter(content) {
        Ok(_) => Outcome::Pass,
        Err(e) => Outcome::fail(FailureKind::SchemaViolation, e.to_string()),
    }
}

fn required_fields(target: &FileTarget<'_>, ctx: &RuleContext) -> Outcome {
    let Some((metadata, _)) = parsed(target) else {
        return Outcome::NotApplicable;
    };
    let problems = field_problems(&ctx.required.agent, |f| {
        metadata.get(f).map(FieldValue::from)
    });
    Outcome::from_problems(FailureKind::SchemaViolation, problems)
}

fn known_model(target: &FileTarget<'_>, _ctx: &RuleContext) -> Outcome {
    let Some((metadata, _)) = parsed(target) else {
        return Outcome::NotApplicable;
    };
    match metadata.get("model").map(|m| m.as_str()) {
        None => Outcome::NotApplicable,
        Some(Some(model)) if VALID_MODELS.contains(&model) => Outcome::Pass,
        Some(Some(model)) => Outcome::fail(
            FailureKind::SchemaViolation,
            format!(
                "`model` is not valid: \"{model}\" (expected one of {})",
                VALID_MODELS.join(", ")
            ),
        ),
        Some(None) => Outcome::fail(FailureKind::SchemaViolation, "`model` must be a string"),
    }
}

fn known_tools(target: &FileTarget<'_>, _ctx: &RuleContext) -> Outcome {
    match parsed(target) {
        Some((metadata, _)) => tools_outcome(&metadata),
        None => Outcome::NotApplicable,
    }
}

fn has_prompt(target: &FileTarget<'_>, _ctx: &RuleContext) -> Outcome {
    match parsed(target) {
        Some((_, body)) if body.trim().is_empty() => Outcome::fail(
            FailureKind::SchemaViolation,
            "agent body is empty; add a system prompt after the frontmatter",
        ),
        Some(_) => Outcome::Pass,
        None => Outcome::NotApplicable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::PluginDescriptor;
    use std::collections::BTreeSet;
    use std::path::PathBuf;

    fn run(check: crate::rules::FileCheck, content: &str) -> Outcome {
        let plugin = PluginDescriptor {
            name: "p".into(),
            root: PathBuf::from("p"),
            has_commands: false,
            has_skills: false,
            has_hooks: false,
            has_agents: true,
            declared_files: BTreeSet::new(),
            unreadable: Vec::new(),
        };
        let content = Ok(content.to_string());
        let target = FileTarget {
            plugin: &plugin,
            path: "agents/reviewer.md",
            content: &content,
        };
        check(&target, &RuleContext::default())
    }

    #[test]
    fn complete_agent_passes() {
        let content = "---\nname: reviewer\ndescription: Reviews shell scripts\nmodel: sonnet\n---\nYou review.\n";
        assert_eq!(run(frontmatter_valid, content), Outcome::Pass);
        assert_eq!(run(required_fields, content), Outcome::Pass);
        assert_eq!(run(known_model, content), Outcome::Pass);
        assert_eq!(run(known_tools, content), Outcome::NotApplicable);
        assert_eq!(run(has_prompt, content), Outcome::Pass);
    }

    #[test]
    fn unknown_model_fails() {
        let content = "---\nname: reviewer\ndescription: d\nmodel: gpt-4\n---\nYou review.\n";
        match run(known_model, content) {
            Outcome::Fail { kind, message } => {
                assert_eq!(kind, FailureKind::SchemaViolation);
                assert!(message.contains("\"gpt-4\""));
            }
            other => panic!("expected failure, got {other:?}"),
        }
        for model in VALID_MODELS {
            let content = format!("---\nname: r\ndescription: d\nmodel: {model}\n---\nBody\n");
            assert_eq!(run(known_model, &content), Outcome::Pass, "{model}");
        }
    }

    #[test]
    fn model_is_optional() {
        let content = "---\nname: reviewer\ndescription: d\n---\nYou review.\n";
        assert_eq!(run(known_model, content), Outcome::NotApplicable);
    }

    #[test]
    fn unknown_tool_warns() {
        let content = "---\nname: r\ndescription: d\ntools: Read, Grep, Telepathy\n---\nBody\n";
        assert_eq!(
            run(known_tools, content),
            Outcome::fail(
                FailureKind::SchemaViolation,
                "unknown tool in `tools`: \"Telepathy\""
            )
        );
    }

    #[test]
    fn empty_body_fails() {
        let content = "---\nname: r\ndescription: d\n---\n  \n";
        assert!(matches!(
            run(has_prompt, content),
            Outcome::Fail { kind: FailureKind::SchemaViolation, .. }
        ));
        assert_eq!(run(has_prompt, "no frontmatter"), Outcome::NotApplicable);
    }

    #[test]
    fn agent_needs_frontmatter() {
        assert!(matches!(
            run(frontmatter_valid, "You review.\n"),
            Outcome::Fail { kind: FailureKind::SchemaViolation, .. }
        ));
        assert_eq!(run(required_fields, "You review.\n"), Outcome::NotApplicable);
    }

    #[test]
    fn missing_name_and_description_listed_together() {
        let content = "---\nmodel: sonnet\n---\n";
        assert_eq!(
            run(required_fields, content),
            Outcome::fail(
                FailureKind::SchemaViolation,
                "missing required field `name`; missing required field `description`"
            )
        );
    }

    #[test]
    fn unclosed_frontmatter_fails() {
        match run(frontmatter_valid, "---\nname: reviewer\n") {
            Outcome::Fail { message, .. } => assert!(message.contains("not closed")),
            other => panic!("expected failure, got {other:?}"),
        }
    }
}
