//! Skill (`skills/<name>/SKILL.md`) rules.
//!
//! Unlike commands, a skill must open with a frontmatter block.

use super::{
    field_problems, tools_outcome, Check, FieldValue, FileKind, FileTarget, Outcome, Rule,
    RuleContext,
};
use crate::diagnostics::{FailureKind, Severity};
use crate::frontmatter::{parse_frontmatter, Frontmatter};

pub(super) const RULES: &[Rule] = &[
    Rule {
        id: "S001",
        title: "SKILL.md opens with valid YAML frontmatter",
        severity: Severity::Error,
        check: Check::File(FileKind::Skill, frontmatter_valid),
    },
    Rule {
        id: "S002",
        title: "skill declares the required frontmatter fields",
        severity: Severity::Error,
        check: Check::File(FileKind::Skill, required_fields),
    },
    Rule {
        id: "S003",
        title: "skill name matches its directory",
        severity: Severity::Warning,
        check: Check::File(FileKind::Skill, name_matches_dir),
    },
    Rule {
        id: "S004",
        title: "SKILL.md has content after its frontmatter",
        severity: Severity::Error,
        check: Check::File(FileKind::Skill, has_body),
    },
    Rule {
        id: "S005",
        title: "skill allowed-tools are known tool names",
        severity: Severity::Warning,
        check: Check::File(FileKind::Skill, known_tools),
    },
];

fn metadata(target: &FileTarget<'_>) -> Option<Frontmatter> {
    let content = target.content.as_ref().ok()?;
    parse_frontmatter(content).ok().map(|(m, _)| m)
}

fn frontmatter_valid(target: &FileTarget<'_>, _ctx: &RuleContext) -> Outcome {
    match target.content {
        Ok(content) => match parse_frontmatter(content) {
            Ok(_) => Outcome::Pass,
            Err(e) => Outcome::fail(FailureKind::SchemaViolation, e.to_string()),
        },
        Err(e) => e.outcome(),
    }
}

fn required_fields(target: &FileTarget<'_>, ctx: &RuleContext) -> Outcome {
    let Some(metadata) = metadata(target) else {
        return Outcome::NotApplicable;
    };
    let problems = field_problems(&ctx.required.skill, |f| {
        metadata.get(f).map(FieldValue::from)
    });
    Outcome::from_problems(FailureKind::SchemaViolation, problems)
}

fn name_matches_dir(target: &FileTarget<'_>, _ctx: &RuleContext) -> Outcome {
    let Some(metadata) = metadata(target) else {
        return Outcome::NotApplicable;
    };
    let Some(name) = metadata.get("name").and_then(|v| v.as_str()) else {
        return Outcome::NotApplicable;
    };
    let dir = target
        .path
        .rsplit('/')
        .nth(1)
        .unwrap_or_default();
    if name == dir {
        Outcome::Pass
    } else {
        Outcome::fail(
            FailureKind::NamingViolation,
            format!("skill name \"{name}\" does not match directory \"{dir}\""),
        )
    }
}

fn has_body(target: &FileTarget<'_>, _ctx: &RuleContext) -> Outcome {
    let Ok(content) = target.content else {
        return Outcome::NotApplicable;
    };
    match parse_frontmatter(content) {
        Ok((_, body)) if body.trim().is_empty() => Outcome::fail(
            FailureKind::SchemaViolation,
            "SKILL.md is empty after its frontmatter",
        ),
        Ok(_) => Outcome::Pass,
        Err(_) => Outcome::NotApplicable,
    }
}

fn known_tools(target: &FileTarget<'_>, _ctx: &RuleContext) -> Outcome {
    metadata(target).map_or(Outcome::NotApplicable, |m| tools_outcome(&m))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::PluginDescriptor;
    use crate::rules::ReadError;
    use std::collections::BTreeSet;
    use std::path::PathBuf;

    fn run(check: crate::rules::FileCheck, content: &str) -> Outcome {
        run_raw(check, Ok(content.to_string()))
    }

    fn run_raw(check: crate::rules::FileCheck, content: Result<String, ReadError>) -> Outcome {
        let plugin = PluginDescriptor {
            name: "bash-scripting".into(),
            root: PathBuf::from("bash-scripting"),
            has_commands: false,
            has_skills: true,
            has_hooks: false,
            has_agents: false,
            declared_files: BTreeSet::new(),
            unreadable: Vec::new(),
        };
        let target = FileTarget {
            plugin: &plugin,
            path: "skills/bats-tester/SKILL.md",
            content: &content,
        };
        check(&target, &RuleContext::default())
    }

    const GOOD: &str = "---\nname: bats-tester\ndescription: Generate bats tests\n---\n# Bats\n";

    #[test]
    fn well_formed_skill_passes() {
        assert_eq!(run(frontmatter_valid, GOOD), Outcome::Pass);
        assert_eq!(run(required_fields, GOOD), Outcome::Pass);
        assert_eq!(run(name_matches_dir, GOOD), Outcome::Pass);
        assert_eq!(run(has_body, GOOD), Outcome::Pass);
        assert_eq!(run(known_tools, GOOD), Outcome::NotApplicable);
    }

    #[test]
    fn frontmatter_only_skill_fails_body_check() {
        let content = "---\nname: bats-tester\ndescription: Generate bats tests\n---\n\n";
        assert_eq!(
            run(has_body, content),
            Outcome::fail(FailureKind::SchemaViolation, "SKILL.md is empty after its frontmatter")
        );
        assert_eq!(run(has_body, "# no frontmatter\n"), Outcome::NotApplicable);
    }

    #[test]
    fn allowed_tools_are_checked() {
        let ok = "---\nname: bats-tester\ndescription: d\nallowed-tools: Bash(bats:*), Read\n---\nBody\n";
        assert_eq!(run(known_tools, ok), Outcome::Pass);
        let bad = "---\nname: bats-tester\ndescription: d\nallowed-tools: Shell\n---\nBody\n";
        assert!(matches!(run(known_tools, bad), Outcome::Fail { .. }));
    }

    #[test]
    fn skill_without_frontmatter_fails_once() {
        let body = "# Bats tester\n";
        assert!(matches!(
            run(frontmatter_valid, body),
            Outcome::Fail { kind: FailureKind::SchemaViolation, .. }
        ));
        assert_eq!(run(required_fields, body), Outcome::NotApplicable);
        assert_eq!(run(name_matches_dir, body), Outcome::NotApplicable);
    }

    #[test]
    fn missing_description_is_reported() {
        let content = "---\nname: bats-tester\n---\n";
        assert_eq!(
            run(required_fields, content),
            Outcome::fail(
                FailureKind::SchemaViolation,
                "missing required field `description`"
            )
        );
    }

    #[test]
    fn name_is_optional() {
        let content = "---\ndescription: Generate bats tests\n---\n";
        assert_eq!(run(required_fields, content), Outcome::Pass);
        assert_eq!(run(name_matches_dir, content), Outcome::NotApplicable);
    }

    #[test]
    fn name_directory_mismatch_warns() {
        let content = "---\nname: bats\ndescription: d\n---\n";
        assert!(matches!(
            run(name_matches_dir, content),
            Outcome::Fail { kind: FailureKind::NamingViolation, .. }
        ));
    }

    #[test]
    fn unreadable_skill_is_internal_io() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "permission denied");
        let err = Err(ReadError::from_io(&io, "skill file"));
        assert!(matches!(
            run_raw(frontmatter_valid, err.clone()),
            Outcome::Fail { kind: FailureKind::InternalIo, .. }
        ));
        assert_eq!(run_raw(required_fields, err), Outcome::NotApplicable);
    }
}
