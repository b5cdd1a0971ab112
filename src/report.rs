//! Run summary and rendering.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use serde_json::json;

use crate::diagnostics::ValidationResult;

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Rendering format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Failure list plus a summary line.
    #[default]
    Text,
    /// Summary and every result as a JSON document.
    Json,
}

/// Aggregated outcome of a run.
#[derive(Debug, Clone)]
pub struct Report {
    pub total_plugins: usize,
    pub passed_plugins: usize,
    pub failed_plugins: usize,
    /// Failed warning-severity results.
    pub warnings: usize,
    /// Sorted by plugin name, then rule id, then file.
    pub results: Vec<ValidationResult>,
    pub interrupted: bool,
    /// Plugins never validated because the run was interrupted.
    pub skipped: Vec<String>,
    strict: bool,
}

impl Report {
    /// Aggregate the results for `plugins`.
    ///
    /// A plugin fails when it has at least one failed error-severity result;
    /// with `strict`, failed warnings count too.
    #[must_use]
    pub fn summarize(plugins: &[String], mut results: Vec<ValidationResult>, strict: bool) -> Self {
        results.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

        let failed: BTreeSet<&str> = results
            .iter()
            .filter(|r| r.is_error() || (strict && r.is_warning()))
            .map(|r| r.plugin.as_str())
            .collect();
        let failed_plugins = plugins
            .iter()
            .filter(|p| failed.contains(p.as_str()))
            .count();
        let warnings = results.iter().filter(|r| r.is_warning()).count();

        Self {
            total_plugins: plugins.len(),
            passed_plugins: plugins.len() - failed_plugins,
            failed_plugins,
            warnings,
            results,
            interrupted: false,
            skipped: Vec::new(),
            strict,
        }
    }

    /// Mark the run as interrupted; `skipped` plugins no longer count as
    /// passed.
    #[must_use]
    pub fn with_interruption(mut self, mut skipped: Vec<String>) -> Self {
        skipped.sort();
        self.passed_plugins = self.passed_plugins.saturating_sub(skipped.len());
        self.interrupted = true;
        self.skipped = skipped;
        self
    }

    /// `true` when no plugin failed and the run completed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed_plugins == 0 && !self.interrupted
    }

    /// Process exit code: 0 on success, 1 otherwise.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        u8::from(!self.is_success())
    }

    fn counts_as_failure(&self, r: &ValidationResult) -> bool {
        r.is_error() || (self.strict && r.is_warning())
    }
}

/// Render `report` in the requested format. `color` only affects text.
#[must_use]
pub fn render(report: &Report, format: Format, color: bool) -> String {
    match format {
        Format::Text => render_text(report, color),
        Format::Json => render_json(report),
    }
}

fn render_text(report: &Report, color: bool) -> String {
    let paint = |code: &'static str| if color { code } else { "" };
    let reset = paint(RESET);
    let mut out = String::new();

    for r in report.results.iter().filter(|r| !r.passed) {
        let (mark, code) = if report.counts_as_failure(r) {
            ("\u{2717}", RED)
        } else {
            ("\u{26a0}", YELLOW)
        };
        let _ = writeln!(out, "{}{mark}{reset} {r}", paint(code));
    }

    if report.interrupted && report.skipped.is_empty() {
        let _ = writeln!(
            out,
            "{}interrupted:{reset} every scheduled plugin finished",
            paint(YELLOW)
        );
    } else if report.interrupted {
        let _ = writeln!(
            out,
            "{}interrupted:{reset} {} plugins not validated: {}",
            paint(YELLOW),
            report.skipped.len(),
            report.skipped.join(", ")
        );
    }

    if !out.is_empty() {
        out.push('\n');
    }
    let status = if report.is_success() { GREEN } else { RED };
    let _ = writeln!(
        out,
        "{}{}{} plugins: {} passed, {} failed, {} warnings{reset}",
        paint(BOLD),
        paint(status),
        report.total_plugins,
        report.passed_plugins,
        report.failed_plugins,
        report.warnings,
    );
    out
}

fn render_json(report: &Report) -> String {
    let value = json!({
        "summary": {
            "total": report.total_plugins,
            "passed": report.passed_plugins,
            "failed": report.failed_plugins,
            "warnings": report.warnings,
            "interrupted": report.interrupted,
            "skipped": report.skipped,
            "success": report.is_success(),
        },
        "results": report.results,
    });
    format!("{value:#}\n")
}
