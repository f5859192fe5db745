//! Run command implementation.
//!
//! The run command:
//! 1. Resolves the scenario and the profiler options
//! 2. Profiles the scenario on the current thread
//! 3. Prints the canonical report (or its JSON)
//! 4. Prints hot edges and function summaries
//! 5. Writes the report document, if requested

use crate::aggregator::{calculate_function_summaries, calculate_hot_edges};
use crate::metrics::MetricFlags;
use crate::output::{report_to_string, write_report, ReportDocument};
use crate::report::{render_canonical, Report};
use crate::scenarios::{self, Scenario};
use crate::session::{self, ProfilerOptions};
use anyhow::{Context, Result};
use log::{debug, info};
use std::path::PathBuf;
use std::time::Instant;

/// Arguments for the run command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct RunArgs {
    /// Scenario name, see `hierprof list`
    pub scenario: String,

    /// Collect CPU time
    pub cpu: bool,

    /// Collect memory usage
    pub memory: bool,

    /// Elide runtime-provided functions
    pub no_builtins: bool,

    /// Profiler options as JSON, replacing the scenario's own
    pub options_json: Option<String>,

    /// Output path for the JSON report document (optional)
    pub output: Option<PathBuf>,

    /// Print the report as JSON instead of canonical text
    pub json: bool,

    /// Number of hot edges and functions to print (0 to skip)
    pub top: usize,
}

impl Default for RunArgs {
    fn default() -> Self {
        Self {
            scenario: String::new(),
            cpu: false,
            memory: false,
            no_builtins: false,
            options_json: None,
            output: None,
            json: false,
            top: crate::utils::config::DEFAULT_TOP_EDGES,
        }
    }
}

impl RunArgs {
    /// Metric flags selected by the arguments
    pub fn flags(&self) -> MetricFlags {
        let mut flags = MetricFlags::NONE;
        if self.cpu {
            flags |= MetricFlags::CPU;
        }
        if self.memory {
            flags |= MetricFlags::MEMORY;
        }
        if self.no_builtins {
            flags |= MetricFlags::NO_BUILTINS;
        }
        flags
    }
}

/// Execute the run command
///
/// **Public** - main entry point called from main.rs
///
/// # Errors
/// * Unknown scenario or malformed options
/// * Profiler usage errors
/// * File write errors
pub fn execute_run(args: RunArgs) -> Result<()> {
    let start_time = Instant::now();

    let scenario = resolve_scenario(&args.scenario)?;
    let options = match &args.options_json {
        Some(text) => ProfilerOptions::from_json_str(text).context("Invalid --options")?,
        None => scenario.options(),
    };
    let flags = args.flags();

    info!("Profiling scenario {} (flags {:#x})", scenario.name, flags.bits());
    debug!("Options: {:?}", options);

    session::enable(flags, &options).context("Failed to enable profiler")?;
    scenario.run();
    let report = session::disable().context("Failed to collect report")?;

    let document = ReportDocument::new(scenario.name, report);

    if args.json {
        println!("{}", report_to_string(&document)?);
    } else {
        print!("{}", render_canonical(&document.report));
    }

    if args.top > 0 && !args.json {
        print_summary(&document.report, args.top);
    }

    if let Some(path) = &args.output {
        write_report(&document, path).context("Failed to write report JSON")?;
        info!("✓ Report written to: {}", path.display());
    }

    let elapsed = start_time.elapsed();
    info!("Run completed in {:.2}s", elapsed.as_secs_f64());

    Ok(())
}

/// Validate run arguments
///
/// **Public** - can be called before execute_run for early validation
pub fn validate_args(args: &RunArgs) -> Result<()> {
    if args.scenario.is_empty() {
        anyhow::bail!("Scenario name cannot be empty");
    }

    resolve_scenario(&args.scenario)?;

    if args.top > 1000 {
        anyhow::bail!("top is too large (max 1000)");
    }

    if let Some(text) = &args.options_json {
        ProfilerOptions::from_json_str(text).context("Invalid --options")?;
    }

    Ok(())
}

fn resolve_scenario(name: &str) -> Result<&'static Scenario> {
    scenarios::find(name).with_context(|| {
        let known: Vec<&str> = scenarios::SCENARIOS.iter().map(|s| s.name).collect();
        format!("Unknown scenario '{}' (known: {})", name, known.join(", "))
    })
}

fn print_summary(report: &Report, top: usize) {
    println!("\n{}", "=".repeat(80));
    println!("HOT EDGES");
    println!("{}", "=".repeat(80));
    for (i, edge) in calculate_hot_edges(report, top).iter().enumerate() {
        println!(
            "{:>3}. {:<40} ct={:<6} wt={:<10} {:>6.2}%",
            i + 1,
            edge.key,
            edge.count,
            edge.wall,
            edge.percentage
        );
    }

    println!("\n{}", "=".repeat(80));
    println!("FUNCTIONS (by exclusive wall time)");
    println!("{}", "=".repeat(80));
    for summary in calculate_function_summaries(report).iter().take(top) {
        println!(
            "{:<40} ct={:<6} excl={:<10} incl={:<10}",
            summary.function, summary.count, summary.exclusive.wall, summary.inclusive.wall
        );
    }

    if report.degraded_samples() > 0 {
        println!(
            "\n{} metric readings were unavailable and recorded as zero",
            report.degraded_samples()
        );
    }
    println!("{}", "=".repeat(80));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_args_valid() {
        let args = RunArgs {
            scenario: "bar-loop".to_string(),
            ..Default::default()
        };

        assert!(validate_args(&args).is_ok());
    }

    #[test]
    fn test_validate_args_empty_scenario() {
        assert!(validate_args(&RunArgs::default()).is_err());
    }

    #[test]
    fn test_validate_args_unknown_scenario() {
        let args = RunArgs {
            scenario: "fibonacci".to_string(),
            ..Default::default()
        };

        let err = validate_args(&args).unwrap_err();
        assert!(err.to_string().contains("bar-loop"));
    }

    #[test]
    fn test_validate_args_top_too_large() {
        let args = RunArgs {
            scenario: "bar-loop".to_string(),
            top: 2000,
            ..Default::default()
        };

        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_validate_args_malformed_options() {
        let args = RunArgs {
            scenario: "bar-loop".to_string(),
            options_json: Some(r#"{"ignored_functions": 7}"#.to_string()),
            ..Default::default()
        };

        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_flags() {
        let args = RunArgs {
            cpu: true,
            no_builtins: true,
            ..Default::default()
        };
        assert_eq!(args.flags(), MetricFlags::CPU | MetricFlags::NO_BUILTINS);
    }

    #[test]
    fn test_execute_run_writes_document() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("report.json");
        let args = RunArgs {
            scenario: "recursion-direct".to_string(),
            output: Some(path.clone()),
            top: 0,
            ..Default::default()
        };

        execute_run(args).unwrap();

        let document = crate::output::read_report(&path).unwrap();
        assert_eq!(document.label, "recursion-direct");
        assert_eq!(document.report.activations("foo"), 5);
    }
}
