//! Compare command implementation.
//!
//! Reads two report documents and prints how their canonical edges
//! differ. Only call counts are compared for the verdict; wall-time
//! changes are shown for the edges present in both.

use crate::output::read_report;
use crate::report::{diff_reports, ReportDiff};
use anyhow::{Context, Result};
use log::info;
use std::path::Path;

/// Execute the compare command
///
/// # Returns
/// The diff, so callers can decide on an exit status
pub fn execute_compare(baseline: &Path, target: &Path, json: bool) -> Result<ReportDiff> {
    let baseline_doc = read_report(baseline)
        .with_context(|| format!("Failed to read baseline {}", baseline.display()))?;
    let target_doc = read_report(target)
        .with_context(|| format!("Failed to read target {}", target.display()))?;

    info!(
        "Comparing {} ({} edges) against {} ({} edges)",
        baseline_doc.label,
        baseline_doc.report.len(),
        target_doc.label,
        target_doc.report.len()
    );

    let diff = diff_reports(&baseline_doc.report, &target_doc.report);
    if diff.same_shape() {
        info!("Call graphs match");
    } else {
        info!(
            "Call graphs differ: {} edges removed, {} added",
            diff.baseline_only.len(),
            diff.target_only.len()
        );
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&diff)?);
    } else {
        println!("Baseline: {}", baseline_doc.label);
        println!("Target:   {}", target_doc.label);
        println!("{}", "-".repeat(51));
        print!("{}", diff.render());

        let mut regressions: Vec<_> = diff
            .common
            .iter()
            .filter(|delta| delta.wall_change != 0)
            .collect();
        regressions.sort_by(|a, b| b.wall_change.abs().cmp(&a.wall_change.abs()));
        if !regressions.is_empty() {
            println!("\nTop wall-time changes:");
            for delta in regressions.iter().take(5) {
                println!(
                    "  {}: {} -> {} ({:+.2}%)",
                    delta.key, delta.baseline_wall, delta.target_wall, delta.wall_percent_change
                );
            }
        }
    }

    Ok(diff)
}
