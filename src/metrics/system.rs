//! Metric source backed by the running process.
//!
//! - wall clock: `Instant` relative to the source's creation
//! - CPU time: `getrusage` (per thread on Linux, per process elsewhere)
//! - memory: counters maintained by [`TrackingAllocator`](super::TrackingAllocator)

use super::alloc;
use super::source::MetricSource;
use crate::utils::error::MetricError;
use std::time::Instant;

/// Readings from the OS and the tracking allocator
///
/// Memory readings stay at zero unless the host installed
/// `TrackingAllocator` as its global allocator.
#[derive(Debug, Clone)]
pub struct SystemMetrics {
    origin: Instant,
}

impl SystemMetrics {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricSource for SystemMetrics {
    fn wall_time_us(&mut self) -> Result<u64, MetricError> {
        let elapsed = self.origin.elapsed().as_micros();
        Ok(u64::try_from(elapsed).unwrap_or(u64::MAX))
    }

    fn cpu_time_us(&mut self) -> Result<u64, MetricError> {
        cpu_time_us()
    }

    fn memory_usage(&mut self) -> Result<u64, MetricError> {
        Ok(alloc::current_bytes())
    }

    fn peak_memory_usage(&mut self) -> Result<u64, MetricError> {
        Ok(alloc::peak_bytes())
    }
}

#[cfg(unix)]
fn cpu_time_us() -> Result<u64, MetricError> {
    use nix::sys::resource::{getrusage, UsageWho};
    use nix::sys::time::TimeValLike;

    #[cfg(target_os = "linux")]
    let who = UsageWho::RUSAGE_THREAD;
    #[cfg(not(target_os = "linux"))]
    let who = UsageWho::RUSAGE_SELF;

    let usage = getrusage(who).map_err(|errno| MetricError::Os {
        metric: "cpu",
        reason: errno.to_string(),
    })?;

    let micros = usage.user_time().num_microseconds() + usage.system_time().num_microseconds();
    Ok(u64::try_from(micros).unwrap_or(0))
}

#[cfg(not(unix))]
fn cpu_time_us() -> Result<u64, MetricError> {
    Err(MetricError::Unavailable("cpu"))
}
