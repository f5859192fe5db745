//! Output writers for report documents.
//!
//! This module handles writing reports to disk:
//! - JSON documents (pretty, versioned, timestamp-free)

pub mod json;

// Re-export main functions
pub use json::{read_report, report_to_string, write_report, ReportDocument};
