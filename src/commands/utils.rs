use crate::output::read_report;
use crate::report::canonicalize;
use crate::scenarios::SCENARIOS;
use crate::utils::config::SCHEMA_VERSION;
use anyhow::Result;
use std::path::Path;

/// List the built-in scenarios
pub fn list_scenarios() {
    println!("Built-in scenarios:");
    for scenario in SCENARIOS {
        println!("  {:<20} {}", scenario.name, scenario.description);
    }
}

/// Validate a report document
pub fn validate_report_file(file_path: &Path) -> Result<()> {
    println!("Validating report: {}", file_path.display());

    let document = read_report(file_path)?;
    let report = &document.report;

    println!("✓ Valid report JSON");
    println!("  Version: {}", document.version);
    println!("  Label: {}", document.label);
    println!("  Flags: {:#x}", report.flags().bits());
    println!("  Edges: {}", report.len());
    println!("  Canonical edges: {}", canonicalize(report).len());
    match report.root() {
        Some(root) => println!("  Root wall time: {}us", root.wall),
        None => println!("  Root entry: missing"),
    }
    if report.degraded_samples() > 0 {
        println!("  Degraded samples: {}", report.degraded_samples());
    }

    Ok(())
}

/// Display version information
pub fn display_version() {
    println!("hierprof v{}", env!("CARGO_PKG_VERSION"));
    println!("Report Schema: v{}", SCHEMA_VERSION);
    println!();
    println!("A hierarchical call-graph profiler.");
}
