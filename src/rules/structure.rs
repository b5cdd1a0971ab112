//! Plugin layout rules (P007–P010). These only look at the resolved file
//! set; they never read file contents.

use std::collections::BTreeSet;

use super::{Check, Outcome, PluginTarget, Rule, RuleContext};
use crate::diagnostics::{FailureKind, Severity};

pub(super) const RULES: &[Rule] = &[
    Rule {
        id: "P007",
        title: "plugin declares at least one capability",
        severity: Severity::Warning,
        check: Check::Plugin(declares_capabilities),
    },
    Rule {
        id: "P008",
        title: "plugin ships a README.md",
        severity: Severity::Warning,
        check: Check::Plugin(has_readme),
    },
    Rule {
        id: "P009",
        title: "every file in the plugin tree is readable",
        severity: Severity::Error,
        check: Check::Plugin(tree_readable),
    },
    Rule {
        id: "P010",
        title: "every skill directory contains SKILL.md",
        severity: Severity::Error,
        check: Check::Plugin(skill_dirs_have_skill_md),
    },
];

fn declares_capabilities(target: &PluginTarget<'_>, _ctx: &RuleContext) -> Outcome {
    if target.plugin.has_capabilities() {
        Outcome::Pass
    } else {
        Outcome::fail(
            FailureKind::FileMissing,
            "plugin declares no capabilities (no commands/, skills/, hooks/ or agents/ directory)",
        )
    }
}

fn has_readme(target: &PluginTarget<'_>, _ctx: &RuleContext) -> Outcome {
    if target.plugin.has_file("README.md") {
        Outcome::Pass
    } else {
        Outcome::fail(
            FailureKind::FileMissing,
            "README.md is recommended for plugin discovery",
        )
    }
}

fn tree_readable(target: &PluginTarget<'_>, _ctx: &RuleContext) -> Outcome {
    let problems = target
        .plugin
        .unreadable
        .iter()
        .map(|u| {
            if u.path.is_empty() {
                format!("cannot read plugin root: {}", u.message)
            } else {
                format!("cannot read {}: {}", u.path, u.message)
            }
        })
        .collect();
    Outcome::from_problems(FailureKind::InternalIo, problems)
}

fn skill_dirs_have_skill_md(target: &PluginTarget<'_>, _ctx: &RuleContext) -> Outcome {
    let plugin = target.plugin;
    if !plugin.has_skills {
        return Outcome::NotApplicable;
    }
    let skill_dirs: BTreeSet<&str> = plugin
        .files_under("skills")
        .filter_map(|f| {
            let rest = &f["skills/".len()..];
            rest.split_once('/').map(|(dir, _)| dir)
        })
        .collect();
    let problems = skill_dirs
        .into_iter()
        .filter(|dir| !plugin.has_file(&format!("skills/{dir}/SKILL.md")))
        .map(|dir| format!("skill directory `skills/{dir}` has no SKILL.md"))
        .collect();
    Outcome::from_problems(FailureKind::FileMissing, problems)
}
