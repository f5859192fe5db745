//! Scripted metric source for deterministic runs.
//!
//! `ManualMetrics` is a cheap handle: clones share the same readings, so a
//! test can keep one clone to advance the clock while the session owns the
//! other.

use super::source::{MetricSnapshot, MetricSource};
use crate::utils::error::MetricError;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Default)]
struct ManualState {
    now: MetricSnapshot,
    step: MetricSnapshot,
}

/// Metric source whose readings are set by hand or advance by a fixed step
///
/// With a non-zero step every wall-clock reading first advances all
/// readings by that step, so each snapshot costs exactly one step.
#[derive(Debug, Clone, Default)]
pub struct ManualMetrics {
    state: Rc<RefCell<ManualState>>,
}

impl ManualMetrics {
    /// All readings frozen at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Readings start at `start` and advance by `step` per snapshot
    pub fn ticking(start: MetricSnapshot, step: MetricSnapshot) -> Self {
        Self {
            state: Rc::new(RefCell::new(ManualState { now: start, step })),
        }
    }

    /// Wall clock advancing by `wall_step_us` per snapshot, other readings zero
    pub fn wall_ticks(wall_step_us: u64) -> Self {
        Self::ticking(
            MetricSnapshot::default(),
            MetricSnapshot {
                wall_us: wall_step_us,
                ..MetricSnapshot::default()
            },
        )
    }

    /// Move every reading forward
    pub fn advance(&self, by: MetricSnapshot) {
        let mut state = self.state.borrow_mut();
        state.now = add(state.now, by);
    }

    /// Move the wall clock forward
    pub fn advance_wall(&self, micros: u64) {
        self.advance(MetricSnapshot {
            wall_us: micros,
            ..MetricSnapshot::default()
        });
    }

    /// Set current memory usage, raising the peak when exceeded
    pub fn set_memory(&self, bytes: u64) {
        let mut state = self.state.borrow_mut();
        state.now.memory = bytes;
        state.now.peak_memory = state.now.peak_memory.max(bytes);
    }

    /// Current readings
    pub fn now(&self) -> MetricSnapshot {
        self.state.borrow().now
    }
}

fn add(a: MetricSnapshot, b: MetricSnapshot) -> MetricSnapshot {
    let memory = a.memory.saturating_add(b.memory);
    MetricSnapshot {
        wall_us: a.wall_us.saturating_add(b.wall_us),
        cpu_us: a.cpu_us.saturating_add(b.cpu_us),
        memory,
        peak_memory: a.peak_memory.saturating_add(b.peak_memory).max(memory),
        ..a
    }
}

impl MetricSource for ManualMetrics {
    fn wall_time_us(&mut self) -> Result<u64, MetricError> {
        let mut state = self.state.borrow_mut();
        state.now = add(state.now, state.step);
        Ok(state.now.wall_us)
    }

    fn cpu_time_us(&mut self) -> Result<u64, MetricError> {
        Ok(self.state.borrow().now.cpu_us)
    }

    fn memory_usage(&mut self) -> Result<u64, MetricError> {
        Ok(self.state.borrow().now.memory)
    }

    fn peak_memory_usage(&mut self) -> Result<u64, MetricError> {
        Ok(self.state.borrow().now.peak_memory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_readings() {
        let handle = ManualMetrics::new();
        let mut source = handle.clone();

        handle.advance_wall(250);
        assert_eq!(source.wall_time_us().unwrap(), 250);
    }

    #[test]
    fn test_ticking_advances_per_wall_read() {
        let mut source = ManualMetrics::wall_ticks(10);
        assert_eq!(source.wall_time_us().unwrap(), 10);
        assert_eq!(source.wall_time_us().unwrap(), 20);
        assert_eq!(source.cpu_time_us().unwrap(), 0);
    }

    #[test]
    fn test_set_memory_tracks_peak() {
        let handle = ManualMetrics::new();
        let mut source = handle.clone();

        handle.set_memory(1000);
        handle.set_memory(400);
        assert_eq!(source.memory_usage().unwrap(), 400);
        assert_eq!(source.peak_memory_usage().unwrap(), 1000);
    }
}
