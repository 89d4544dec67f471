//! Presenting a run to the user.

use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::Path;

use tracing::info;

use crate::pipeline::Stage;
use crate::state::RunState;

const RULE_WIDTH: usize = 60;

/// Banner-framed final report, or `None` while no report is recorded.
pub fn render_report(state: &RunState) -> Option<String> {
    let report = state.report()?;
    let rule = "=".repeat(RULE_WIDTH);
    Some(format!(
        "{rule}\nSEO REPORT: {}\n{rule}\n\n{}\n\n{rule}",
        state.website(),
        report
    ))
}

/// One line per stage saying whether it completed.
pub fn render_progress(state: &RunState) -> String {
    Stage::ORDER
        .iter()
        .map(|stage| {
            let mark = if state.is_recorded(*stage) { "done" } else { "pending" };
            format!("  [{mark:^7}] {stage}")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Write the report to `path`.
pub fn write_report(path: &Path, state: &RunState) -> Result<()> {
    let report = state
        .report()
        .context("No report has been written for this run")?;
    fs::write(path, report)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;
    Ok(())
}

/// Print the finished run to `out` (state as JSON, or the framed report),
/// then save the report to `path` when one is given.
///
/// `out` is written and flushed before the file, so a bad `--output` path
/// never swallows the run's result.
pub fn present(
    state: &RunState,
    json: bool,
    path: Option<&Path>,
    out: &mut impl Write,
) -> Result<()> {
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(state)?)?;
    } else if let Some(rendered) = render_report(state) {
        writeln!(out, "\n{}", rendered)?;
    }
    out.flush()?;

    if let Some(path) = path {
        write_report(path, state)?;
        info!(path = %path.display(), "Report written");
    }
    Ok(())
}
