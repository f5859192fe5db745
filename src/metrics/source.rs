//! Metric source contract, readings and collection flags.
//!
//! A `MetricSource` hands out raw point-in-time readings. The engine never
//! stores absolute readings in a report: it snapshots a source at frame entry
//! and exit and only keeps the difference.

use crate::utils::config::{FLAG_CPU, FLAG_MEMORY, FLAG_NO_BUILTINS};
use crate::utils::error::MetricError;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::ops::{BitOr, BitOrAssign};

/// Bitmask selecting the optional metrics of a session
///
/// Wall time and call count are always collected. CPU and memory readings
/// each cost a system call or an atomic load per hook, so they are opt-in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricFlags(u32);

impl MetricFlags {
    pub const NONE: Self = Self(0);
    pub const NO_BUILTINS: Self = Self(FLAG_NO_BUILTINS);
    pub const CPU: Self = Self(FLAG_CPU);
    pub const MEMORY: Self = Self(FLAG_MEMORY);

    const KNOWN_BITS: u32 = FLAG_NO_BUILTINS | FLAG_CPU | FLAG_MEMORY;

    /// Build flags from raw bits, dropping unknown bits
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits & Self::KNOWN_BITS)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn collects_cpu(self) -> bool {
        self.contains(Self::CPU)
    }

    pub const fn collects_memory(self) -> bool {
        self.contains(Self::MEMORY)
    }

    pub const fn skips_builtins(self) -> bool {
        self.contains(Self::NO_BUILTINS)
    }

    /// Short names of the metrics a report collected under these flags
    ///
    /// Sorted alphabetically, the order canonical rendering prints them in.
    pub fn metric_names(self) -> Vec<&'static str> {
        let mut names = vec!["ct", "wt"];
        if self.collects_cpu() {
            names.push("cpu");
        }
        if self.collects_memory() {
            names.push("mu");
            names.push("pmu");
        }
        names.sort_unstable();
        names
    }
}

impl BitOr for MetricFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for MetricFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Supplier of point-in-time readings
///
/// Every reading must be monotonic non-decreasing within one session,
/// except current memory usage which may go down.
pub trait MetricSource {
    /// Monotonic wall clock, in microseconds from an arbitrary origin
    fn wall_time_us(&mut self) -> Result<u64, MetricError>;

    /// CPU time consumed by the current execution context, in microseconds
    fn cpu_time_us(&mut self) -> Result<u64, MetricError>;

    /// Bytes currently in use
    fn memory_usage(&mut self) -> Result<u64, MetricError>;

    /// Highest value `memory_usage` has reached so far
    fn peak_memory_usage(&mut self) -> Result<u64, MetricError>;
}

impl<M: MetricSource + ?Sized> MetricSource for Box<M> {
    fn wall_time_us(&mut self) -> Result<u64, MetricError> {
        (**self).wall_time_us()
    }

    fn cpu_time_us(&mut self) -> Result<u64, MetricError> {
        (**self).cpu_time_us()
    }

    fn memory_usage(&mut self) -> Result<u64, MetricError> {
        (**self).memory_usage()
    }

    fn peak_memory_usage(&mut self) -> Result<u64, MetricError> {
        (**self).peak_memory_usage()
    }
}

/// Set of snapshot fields whose reading failed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DegradedFields(u8);

impl DegradedFields {
    pub const NONE: Self = Self(0);
    pub const WALL: Self = Self(0x1);
    pub const CPU: Self = Self(0x2);
    pub const MEMORY: Self = Self(0x4);
    pub const PEAK_MEMORY: Self = Self(0x8);

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for DegradedFields {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for DegradedFields {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Readings taken at one instant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricSnapshot {
    pub wall_us: u64,
    pub cpu_us: u64,
    pub memory: u64,
    pub peak_memory: u64,

    /// Fields holding a zero substituted for a failed reading
    pub degraded: DegradedFields,
}

/// Cost between two snapshots
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricDeltas {
    pub wall_us: u64,
    pub cpu_us: u64,
    pub memory: i64,
    pub peak_memory: i64,
}

impl MetricDeltas {
    /// Compute `end - start`
    ///
    /// A field degraded at either end has no meaningful difference and
    /// yields zero. Clock deltas also saturate at zero.
    pub fn between(start: &MetricSnapshot, end: &MetricSnapshot) -> Self {
        let lost = start.degraded | end.degraded;
        let kept = |field: DegradedFields| !lost.contains(field);

        Self {
            wall_us: if kept(DegradedFields::WALL) {
                end.wall_us.saturating_sub(start.wall_us)
            } else {
                0
            },
            cpu_us: if kept(DegradedFields::CPU) {
                end.cpu_us.saturating_sub(start.cpu_us)
            } else {
                0
            },
            memory: if kept(DegradedFields::MEMORY) {
                signed_delta(start.memory, end.memory)
            } else {
                0
            },
            peak_memory: if kept(DegradedFields::PEAK_MEMORY) {
                signed_delta(start.peak_memory, end.peak_memory)
            } else {
                0
            },
        }
    }
}

fn signed_delta(start: u64, end: u64) -> i64 {
    if end >= start {
        i64::try_from(end - start).unwrap_or(i64::MAX)
    } else {
        i64::try_from(start - end).map(|d| -d).unwrap_or(i64::MIN)
    }
}

/// Takes snapshots according to a session's flags
///
/// Failed readings are replaced by zero, flagged in the snapshot and
/// counted; a session never stops because a metric went missing.
#[derive(Debug, Clone, Default)]
pub struct MetricReader {
    flags: MetricFlags,
    degraded: u64,
}

impl MetricReader {
    pub fn new(flags: MetricFlags) -> Self {
        Self { flags, degraded: 0 }
    }

    pub fn flags(&self) -> MetricFlags {
        self.flags
    }

    /// Number of readings substituted with zero so far
    pub fn degraded_samples(&self) -> u64 {
        self.degraded
    }

    /// Snapshot every metric enabled by the flags
    pub fn snapshot(&mut self, source: &mut dyn MetricSource) -> MetricSnapshot {
        let mut snap = MetricSnapshot::default();

        snap.wall_us = self.absorb(DegradedFields::WALL, source.wall_time_us(), &mut snap.degraded);

        if self.flags.collects_cpu() {
            snap.cpu_us = self.absorb(DegradedFields::CPU, source.cpu_time_us(), &mut snap.degraded);
        }

        if self.flags.collects_memory() {
            snap.memory =
                self.absorb(DegradedFields::MEMORY, source.memory_usage(), &mut snap.degraded);
            snap.peak_memory = self.absorb(
                DegradedFields::PEAK_MEMORY,
                source.peak_memory_usage(),
                &mut snap.degraded,
            );
        }

        snap
    }

    fn absorb(
        &mut self,
        field: DegradedFields,
        reading: Result<u64, MetricError>,
        degraded: &mut DegradedFields,
    ) -> u64 {
        match reading {
            Ok(value) => value,
            Err(err) => {
                self.degraded += 1;
                *degraded |= field;
                // Only the first failure is worth a warning; a broken source
                // fails on every hook.
                if self.degraded == 1 {
                    warn!("Substituting zero for {:?} reading: {}", field, err);
                } else {
                    debug!("Substituting zero for {:?} reading: {}", field, err);
                }
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenCpu {
        wall: u64,
    }

    impl MetricSource for BrokenCpu {
        fn wall_time_us(&mut self) -> Result<u64, MetricError> {
            self.wall += 10;
            Ok(self.wall)
        }

        fn cpu_time_us(&mut self) -> Result<u64, MetricError> {
            Err(MetricError::Unavailable("cpu"))
        }

        fn memory_usage(&mut self) -> Result<u64, MetricError> {
            Ok(4096)
        }

        fn peak_memory_usage(&mut self) -> Result<u64, MetricError> {
            Ok(8192)
        }
    }

    #[test]
    fn test_flags_bits_and_names() {
        let flags = MetricFlags::CPU | MetricFlags::MEMORY;
        assert_eq!(flags.bits(), 0x6);
        assert!(flags.collects_cpu());
        assert!(flags.collects_memory());
        assert!(!flags.skips_builtins());
        assert_eq!(flags.metric_names(), vec!["cpu", "ct", "mu", "pmu", "wt"]);
        assert_eq!(MetricFlags::NONE.metric_names(), vec!["ct", "wt"]);
    }

    #[test]
    fn test_from_bits_drops_unknown() {
        assert_eq!(MetricFlags::from_bits(0xff).bits(), 0x7);
    }

    #[test]
    fn test_deltas_between() {
        let start = MetricSnapshot {
            wall_us: 100,
            cpu_us: 50,
            memory: 1000,
            peak_memory: 2000,
            ..MetricSnapshot::default()
        };
        let end = MetricSnapshot {
            wall_us: 160,
            cpu_us: 40,
            memory: 400,
            peak_memory: 2500,
            ..MetricSnapshot::default()
        };

        let deltas = MetricDeltas::between(&start, &end);
        assert_eq!(deltas.wall_us, 60);
        assert_eq!(deltas.cpu_us, 0);
        assert_eq!(deltas.memory, -600);
        assert_eq!(deltas.peak_memory, 500);
    }

    #[test]
    fn test_reader_substitutes_zero() {
        let mut source = BrokenCpu { wall: 0 };
        let mut reader = MetricReader::new(MetricFlags::CPU | MetricFlags::MEMORY);

        let snap = reader.snapshot(&mut source);
        assert_eq!(snap.wall_us, 10);
        assert_eq!(snap.cpu_us, 0);
        assert_eq!(snap.memory, 4096);
        assert_eq!(snap.degraded, DegradedFields::CPU);
        assert_eq!(reader.degraded_samples(), 1);

        reader.snapshot(&mut source);
        assert_eq!(reader.degraded_samples(), 2);
    }

    #[test]
    fn test_reader_skips_disabled_metrics() {
        let mut source = BrokenCpu { wall: 0 };
        let mut reader = MetricReader::new(MetricFlags::NONE);

        let snap = reader.snapshot(&mut source);
        assert_eq!(snap.cpu_us, 0);
        assert_eq!(snap.memory, 0);
        assert_eq!(reader.degraded_samples(), 0);
    }

    #[test]
    fn test_deltas_ignore_fields_degraded_at_one_end() {
        let start = MetricSnapshot {
            wall_us: 0,
            cpu_us: 50,
            memory: 1000,
            peak_memory: 1000,
            degraded: DegradedFields::WALL,
        };
        let end = MetricSnapshot {
            wall_us: 1_700_000_000_000_000,
            cpu_us: 0,
            memory: 1500,
            peak_memory: 1500,
            degraded: DegradedFields::CPU,
        };

        let deltas = MetricDeltas::between(&start, &end);
        assert_eq!(deltas.wall_us, 0);
        assert_eq!(deltas.cpu_us, 0);
        assert_eq!(deltas.memory, 500);
        assert_eq!(deltas.peak_memory, 500);
    }
}
