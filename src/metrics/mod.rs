//! Metric providers and snapshot arithmetic.
//!
//! This module provides:
//! - The `MetricSource` contract the engine reads from
//! - `MetricFlags` selecting optional metrics
//! - A process-backed source (`SystemMetrics`) and its allocation tracker
//! - A scripted source (`ManualMetrics`) for deterministic runs

pub mod alloc;
pub mod manual;
pub mod source;
pub mod system;

// Re-export main types
pub use alloc::TrackingAllocator;
pub use manual::ManualMetrics;
pub use source::{
    DegradedFields, MetricDeltas, MetricFlags, MetricReader, MetricSnapshot, MetricSource,
};
pub use system::SystemMetrics;
