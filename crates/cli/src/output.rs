//! Output helpers for the CLI

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use casesync_reporter::RunSummary;

/// Print error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message);
}

/// Print a one-line outcome of the sync on stderr.
pub fn print_outcome(summary: &RunSummary) {
    match summary.run_id {
        Some(_) if summary.uploaded => eprintln!("{} {}", "✓".green(), outcome_message(summary)),
        _ => eprintln!("{} {}", "⚠".yellow(), outcome_message(summary)),
    }
}

fn outcome_message(summary: &RunSummary) -> String {
    match summary.run_id {
        Some(run_id) if summary.uploaded => {
            format!("Reported {} result(s) to run {}", summary.total, run_id)
        }
        Some(run_id) if summary.total > 0 => {
            format!("Run {} completed, results upload failed", run_id)
        }
        Some(run_id) => format!("Run {} completed without results", run_id),
        None => "No remote run was created".to_string(),
    }
}

/// Write the run summary as pretty JSON.
pub fn write_summary(path: &Path, summary: &RunSummary) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }

    let json = serde_json::to_string_pretty(summary)?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;

    tracing::info!("Summary written to: {}", path.display());
    Ok(())
}
