//! hierprof CLI
//!
//! Runs built-in instrumented workloads under the hierarchical profiler
//! and inspects or compares the resulting reports.

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;
use hierprof::commands::{
    display_version, execute_compare, execute_run, list_scenarios, validate_args,
    validate_report_file, RunArgs,
};
use hierprof::metrics::TrackingAllocator;
use hierprof::utils::config::DEFAULT_TOP_EDGES;
use std::path::PathBuf;

#[global_allocator]
static GLOBAL: TrackingAllocator = TrackingAllocator;

/// hierprof - hierarchical call-graph profiler
#[derive(Parser, Debug)]
#[command(name = "hierprof")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Profile a built-in scenario
    Run {
        /// Scenario name (see `hierprof list`)
        scenario: String,

        /// Collect CPU time
        #[arg(long)]
        cpu: bool,

        /// Collect memory usage
        #[arg(long)]
        memory: bool,

        /// Elide runtime-provided functions
        #[arg(long)]
        no_builtins: bool,

        /// Profiler options as JSON, e.g. '{"ignored_functions": ["bar"]}'
        #[arg(long, env = "HIERPROF_OPTIONS")]
        options: Option<String>,

        /// Output path for the JSON report document
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the report as JSON instead of canonical text
        #[arg(long)]
        json: bool,

        /// Number of hot edges and functions to print (0 to skip)
        #[arg(long, default_value_t = DEFAULT_TOP_EDGES)]
        top: usize,
    },

    /// List built-in scenarios
    List,

    /// Compare two report documents
    Compare {
        /// Baseline report JSON
        baseline: PathBuf,

        /// Target report JSON
        target: PathBuf,

        /// Print the diff as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate a report JSON file
    Validate {
        /// Path to report JSON file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Display version information
    Version,
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    match cli.command {
        Commands::Run {
            scenario,
            cpu,
            memory,
            no_builtins,
            options,
            output,
            json,
            top,
        } => {
            let args = RunArgs {
                scenario,
                cpu,
                memory,
                no_builtins,
                options_json: options,
                output,
                json,
                top,
            };

            validate_args(&args)?;
            execute_run(args)?;
        }

        Commands::List => {
            list_scenarios();
        }

        Commands::Compare {
            baseline,
            target,
            json,
        } => {
            execute_compare(&baseline, &target, json)?;
        }

        Commands::Validate { file } => {
            validate_report_file(&file)?;
        }

        Commands::Version => {
            display_version();
        }
    }

    Ok(())
}
