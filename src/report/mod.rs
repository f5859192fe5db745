//! The aggregated report and its post-processing.
//!
//! - `schema`: the immutable edge table returned by `disable()`
//! - `canonical`: marker-free sorted view and its stable text rendering
//! - `diff`: comparison of two reports over canonical edges

pub mod canonical;
pub mod diff;
pub mod schema;

pub use canonical::{canonicalize, render_canonical, CanonicalReport};
pub use diff::{diff_reports, safe_percentage, EdgeDelta, LoneEdge, ReportDiff};
pub use schema::Report;
