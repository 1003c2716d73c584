//! Human-facing output for the publisher CLI.
//!
//! Log records go through the `log` facade; this module renders the
//! end-of-run summary that a release engineer reads to triage a run.

use crate::report::RunSummary;
use std::io::Write;

/// Write one line, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort output; a closed stderr must not abort the run.
    }
}

fn plural(count: usize, one: &str, many: &str) -> String {
    if count == 1 {
        format!("{count} {one}")
    } else {
        format!("{count} {many}")
    }
}

/// Render `summary` as the lines printed at the end of a run.
///
/// # Examples
///
/// ```
/// use gallery_publisher::output::summary_lines;
/// use gallery_publisher::report::RunSummary;
///
/// let summary = RunSummary {
///     built: vec!["alpha 1.0.0".to_owned()],
///     ..RunSummary::default()
/// };
/// let lines = summary_lines(&summary);
/// assert_eq!(lines[0], "Built 1 package, skipped 0 packages, extracted 0 packages.");
/// ```
#[must_use]
pub fn summary_lines(summary: &RunSummary) -> Vec<String> {
    let mut lines = vec![format!(
        "Built {}, skipped {}, extracted {}.",
        plural(summary.built.len(), "package", "packages"),
        plural(summary.skipped.len(), "package", "packages"),
        plural(summary.extracted.len(), "package", "packages"),
    )];

    for skipped in &summary.skipped {
        lines.push(format!("  skipped {skipped} (already published)"));
    }

    for manifest in &summary.manifests {
        lines.push(format!(
            "Wrote {} ({}, total hash {}).",
            manifest.path,
            plural(manifest.packages, "package", "packages"),
            manifest.total_hash
        ));
    }

    if !summary.environments_staged.is_empty() || !summary.environments_present.is_empty() {
        lines.push(format!(
            "Staged {} for upload; {} already published.",
            plural(summary.environments_staged.len(), "environment", "environments"),
            summary.environments_present.len()
        ));
        for archive in &summary.environments_staged {
            lines.push(format!("  {archive}"));
        }
    }

    if summary.has_failures() {
        lines.push(format!(
            "{}:",
            plural(summary.failures.len(), "failure", "failures")
        ));
        for failure in &summary.failures {
            lines.push(format!("  {failure}"));
        }
    }
    lines
}

/// Write the end-of-run summary.
pub fn write_summary(stderr: &mut dyn Write, summary: &RunSummary) {
    for line in summary_lines(summary) {
        write_stderr_line(stderr, line);
    }
}
