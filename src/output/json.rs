//! JSON report document writer and reader.
//!
//! Writes `ReportDocument`s to JSON files with pretty formatting.

use crate::report::Report;
use crate::utils::config::SCHEMA_VERSION;
use crate::utils::error::OutputError;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Versioned envelope around a report
///
/// Carries no timestamps, so the same session always serializes to the
/// same bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportDocument {
    /// Schema version for compatibility checking
    pub version: String,

    /// Free-form label, e.g. the scenario name
    pub label: String,

    pub report: Report,
}

impl ReportDocument {
    /// Wrap a report under the current schema version
    pub fn new(label: impl Into<String>, report: Report) -> Self {
        Self {
            version: SCHEMA_VERSION.to_string(),
            label: label.into(),
            report,
        }
    }
}

/// Write a report document to a JSON file
///
/// **Public** - main entry point for JSON output
///
/// # Arguments
/// * `document` - Document to write
/// * `output_path` - Path to output JSON file
///
/// # Errors
/// * `OutputError::WriteFailed` - I/O error during write
/// * `OutputError::SerializationFailed` - JSON serialization error
/// * `OutputError::InvalidPath` - Path cannot be created or is invalid
pub fn write_report(
    document: &ReportDocument,
    output_path: impl AsRef<Path>,
) -> Result<(), OutputError> {
    let output_path = output_path.as_ref();

    info!("Writing report to: {}", output_path.display());

    validate_output_path(output_path)?;

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            debug!("Creating parent directories: {}", parent.display());
            std::fs::create_dir_all(parent).map_err(|e| {
                OutputError::InvalidPath(format!(
                    "Cannot create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }

    let file = File::create(output_path)?;
    let mut writer = BufWriter::new(file);

    serde_json::to_writer_pretty(&mut writer, document)?;
    writer.write_all(b"\n")?;
    writer.flush()?;

    info!(
        "Report written successfully ({} bytes)",
        calculate_file_size(output_path)
    );

    Ok(())
}

/// Serialize a report document to a pretty JSON string
pub fn report_to_string(document: &ReportDocument) -> Result<String, OutputError> {
    Ok(serde_json::to_string_pretty(document)?)
}

/// Read a report document from a JSON file
///
/// # Errors
/// * `OutputError::WriteFailed` - File read error (I/O errors share one variant)
/// * `OutputError::SerializationFailed` - JSON parse error, including bad edge keys
/// * `OutputError::IncompatibleVersion` - Major schema version differs
pub fn read_report(input_path: impl AsRef<Path>) -> Result<ReportDocument, OutputError> {
    let input_path = input_path.as_ref();

    debug!("Reading report from: {}", input_path.display());

    let file = File::open(input_path)?;
    let document: ReportDocument = serde_json::from_reader(BufReader::new(file))?;

    check_version(&document.version)?;

    debug!(
        "Report loaded: version {}, label {}, {} edges",
        document.version,
        document.label,
        document.report.len()
    );

    Ok(document)
}

fn major(version: &str) -> &str {
    version.split('.').next().unwrap_or(version)
}

fn check_version(found: &str) -> Result<(), OutputError> {
    if major(found) != major(SCHEMA_VERSION) {
        return Err(OutputError::IncompatibleVersion {
            expected: SCHEMA_VERSION.to_string(),
            found: found.to_string(),
        });
    }
    Ok(())
}

/// Validate that output path is writable
///
/// **Private** - internal validation
fn validate_output_path(path: &Path) -> Result<(), OutputError> {
    if path.as_os_str().is_empty() {
        return Err(OutputError::InvalidPath("Path is empty".to_string()));
    }

    if path.is_dir() {
        return Err(OutputError::InvalidPath(format!(
            "Path is a directory: {}",
            path.display()
        )));
    }

    Ok(())
}

fn calculate_file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}
