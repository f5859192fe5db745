//! hierprof
//!
//! Hierarchical call-graph profiler. Instrumented code reports every
//! function entry and exit; the engine attributes wall time, CPU time and
//! memory deltas to caller→callee edges and returns a deterministic report
//! keyed by edge.
//!
//! ## Getting Started
//!
//! ```ignore
//! use hierprof::metrics::MetricFlags;
//! use hierprof::session::{self, ProfilerOptions};
//!
//! session::enable(MetricFlags::CPU, &ProfilerOptions::new().ignore("log_line"))?;
//! session::profiled("handle_request", || handle_request());
//! let report = session::disable()?;
//! print!("{}", hierprof::report::render_canonical(&report));
//! ```
//!
//! The `hierprof` binary runs built-in scenarios under the profiler:
//!
//! ```bash
//! hierprof run bar-loop --cpu
//! ```

pub mod aggregator;
pub mod commands;
pub mod filter;
pub mod metrics;
pub mod output;
pub mod report;
pub mod scenarios;
pub mod session;
pub mod utils;

pub use metrics::MetricFlags;
pub use report::Report;
pub use session::{ProfilerOptions, ProfilerSession};
