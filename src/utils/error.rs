//! Error types for the entire crate.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and commands.

use thiserror::Error;

/// Misuse of the session control surface
///
/// Fatal to the call, recoverable by the caller. The session is left
/// exactly as it was before the failing call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UsageError {
    #[error("profiler is already enabled")]
    AlreadyEnabled,

    #[error("profiler is not enabled")]
    NotEnabled,

    #[error("malformed option `{option}`: {reason}")]
    MalformedOptions { option: String, reason: String },

    #[error("edge aggregator is frozen; no further records accepted")]
    AggregatorFrozen,
}

/// Errors surfaced by the profiler engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProfilerError {
    #[error("usage error: {0}")]
    Usage(#[from] UsageError),

    /// The call-dispatch collaborator skipped or misordered an exit.
    #[error("call stack corrupted: exit for frame #{found} while frame #{expected} ({function}) is on top")]
    StackCorruption {
        expected: u64,
        found: u64,
        function: String,
    },
}

/// A metric reading that could not be taken
///
/// Never interrupts a session: the engine substitutes zero for the sample.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetricError {
    #[error("{0} reading is not available on this platform")]
    Unavailable(&'static str),

    #[error("{metric} reading failed: {reason}")]
    Os { metric: &'static str, reason: String },
}

/// Errors of the textual edge key codec
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReportError {
    #[error("invalid edge key `{key}`: {reason}")]
    InvalidEdgeKey { key: String, reason: String },

    #[error("function name `{name}` cannot appear in an edge key: {reason}")]
    InvalidFunctionName { name: String, reason: String },
}

/// Errors that can occur during file output
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write file: {0}")]
    WriteFailed(#[from] std::io::Error),

    #[error("Failed to serialize JSON: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("Invalid output path: {0}")]
    InvalidPath(String),

    #[error("Incompatible schema version: expected {expected}, found {found}")]
    IncompatibleVersion { expected: String, found: String },
}
