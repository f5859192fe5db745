//! CLI command implementations.
//!
//! Each command is implemented in its own module.
//! Commands orchestrate the various library components to perform user tasks.

pub mod compare;
pub mod run;
pub mod utils;

// Re-export main command functions
pub use compare::execute_compare;
pub use run::{execute_run, validate_args, RunArgs};
pub use utils::{display_version, list_scenarios, validate_report_file};
