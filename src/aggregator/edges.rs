//! Per-edge metric accumulation.
//!
//! Every completed frame is recorded against the edge from its parent
//! (or the root) to itself. A child that is a recursive occurrence carries
//! its recursion-depth marker, and so does a parent, which makes
//! `foo==>foo@1` and `foo@1==>foo@2` distinct edges.
//!
//! Text form: `<parent>==><child>`, where each side is `name` or
//! `name@<marker>`, and the root entry is the bare child.

use super::names::{FunctionId, FunctionNames};
use crate::metrics::MetricDeltas;
use crate::utils::config::{EDGE_SEPARATOR, RECURSION_MARKER};
use crate::utils::error::{ReportError, UsageError};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

/// One side of an edge: a function and its recursion-depth marker
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameLabel {
    pub function: String,
    pub marker: Option<u32>,
}

impl FrameLabel {
    pub fn new(function: impl Into<String>, marker: Option<u32>) -> Self {
        Self {
            function: function.into(),
            marker,
        }
    }

    pub fn plain(function: impl Into<String>) -> Self {
        Self::new(function, None)
    }

    pub fn is_recursive(&self) -> bool {
        self.marker.is_some()
    }

    /// Check that `function` reads back from the text form unchanged
    ///
    /// Names containing the edge separator or ending in `@<n>` would be
    /// split or stripped when a report is parsed.
    pub fn check_function(function: &str) -> Result<(), ReportError> {
        let invalid = |reason: &str| -> Result<(), ReportError> {
            Err(ReportError::InvalidFunctionName {
                name: function.to_string(),
                reason: reason.to_string(),
            })
        };

        if function.is_empty() {
            return invalid("empty name");
        }
        if function.contains(EDGE_SEPARATOR) {
            return invalid("contains the edge separator");
        }
        if function.parse::<FrameLabel>().is_ok_and(|label| label.is_recursive()) {
            return invalid("ends in a recursion marker");
        }
        Ok(())
    }
}

impl fmt::Display for FrameLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.marker {
            Some(marker) => write!(f, "{}{}{}", self.function, RECURSION_MARKER, marker),
            None => f.write_str(&self.function),
        }
    }
}

impl FromStr for FrameLabel {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ReportError::InvalidEdgeKey {
                key: s.to_string(),
                reason: "empty function name".to_string(),
            });
        }

        // A trailing `@<n>` with n >= 1 is a marker; any other `@` is part of the name.
        if let Some((function, marker)) = s.rsplit_once(RECURSION_MARKER) {
            if let Ok(marker) = marker.parse::<u32>() {
                if marker >= 1 && !function.is_empty() {
                    return Ok(Self::new(function, Some(marker)));
                }
            }
        }
        Ok(Self::plain(s))
    }
}

/// Identifies one caller→callee relationship
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeKey {
    /// `None` for the root entry
    pub parent: Option<FrameLabel>,
    pub child: FrameLabel,
}

impl EdgeKey {
    pub fn new(parent: Option<FrameLabel>, child: FrameLabel) -> Self {
        Self { parent, child }
    }

    /// Key of a top-level entry without a parent
    pub fn root(child: impl Into<String>) -> Self {
        Self::new(None, FrameLabel::plain(child))
    }

    /// Key `parent==>child` between two non-recursive occurrences
    pub fn between(parent: impl Into<String>, child: impl Into<String>) -> Self {
        Self::new(Some(FrameLabel::plain(parent)), FrameLabel::plain(child))
    }

    /// Recursion-depth marker of the child, if recursive
    pub fn marker(&self) -> Option<u32> {
        self.child.marker
    }

    /// Same edge with markers removed from both sides
    pub fn stripped(&self) -> EdgeKey {
        EdgeKey {
            parent: self
                .parent
                .as_ref()
                .map(|p| FrameLabel::plain(p.function.clone())),
            child: FrameLabel::plain(self.child.function.clone()),
        }
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.parent {
            Some(parent) => write!(f, "{}{}{}", parent, EDGE_SEPARATOR, self.child),
            None => write!(f, "{}", self.child),
        }
    }
}

impl FromStr for EdgeKey {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ReportError::InvalidEdgeKey {
            key: s.to_string(),
            reason: reason.to_string(),
        };

        match s.split_once(EDGE_SEPARATOR) {
            Some((parent, child)) => {
                if child.contains(EDGE_SEPARATOR) {
                    return Err(invalid("more than one edge separator"));
                }
                let parent = parent.parse().map_err(|_| invalid("empty parent"))?;
                let child = child.parse().map_err(|_| invalid("empty child"))?;
                Ok(EdgeKey::new(Some(parent), child))
            }
            None => Ok(EdgeKey::new(None, s.parse()?)),
        }
    }
}

/// Accumulated cost of one edge
///
/// Every field is a sum over all occurrences of the edge in the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeMetrics {
    pub count: u64,
    /// Inclusive wall time, microseconds
    pub wall: u64,
    /// Inclusive CPU time, microseconds
    pub cpu: u64,
    /// Inclusive change in memory usage, bytes
    pub memory_delta: i64,
    /// Inclusive change in peak memory usage, bytes
    pub peak_memory_delta: i64,
}

impl EdgeMetrics {
    /// Add one occurrence
    pub fn record(&mut self, deltas: &MetricDeltas) {
        self.count += 1;
        self.wall = self.wall.saturating_add(deltas.wall_us);
        self.cpu = self.cpu.saturating_add(deltas.cpu_us);
        self.memory_delta = self.memory_delta.saturating_add(deltas.memory);
        self.peak_memory_delta = self.peak_memory_delta.saturating_add(deltas.peak_memory);
    }

    /// Fold another accumulation into this one
    pub fn merge(&mut self, other: &EdgeMetrics) {
        self.count += other.count;
        self.wall = self.wall.saturating_add(other.wall);
        self.cpu = self.cpu.saturating_add(other.cpu);
        self.memory_delta = self.memory_delta.saturating_add(other.memory_delta);
        self.peak_memory_delta = self.peak_memory_delta.saturating_add(other.peak_memory_delta);
    }
}

/// Interned side of an edge, used while the session is running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EdgeNode {
    pub function: FunctionId,
    pub marker: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct RawEdge {
    parent: Option<EdgeNode>,
    child: EdgeNode,
}

/// Cumulative edge table of a session
#[derive(Debug, Clone, Default)]
pub struct EdgeAggregator {
    edges: HashMap<RawEdge, EdgeMetrics>,
    frozen: bool,
}

impl EdgeAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard all edges and accept records again
    pub fn reset(&mut self) {
        self.edges.clear();
        self.frozen = false;
    }

    /// Number of distinct edges so far
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Add one completed occurrence of `parent ==> child@marker`
    pub fn record(
        &mut self,
        parent: Option<EdgeNode>,
        child: FunctionId,
        marker: Option<u32>,
        deltas: &MetricDeltas,
    ) -> Result<(), UsageError> {
        if self.frozen {
            return Err(UsageError::AggregatorFrozen);
        }

        let key = RawEdge {
            parent,
            child: EdgeNode {
                function: child,
                marker,
            },
        };
        self.edges.entry(key).or_default().record(deltas);
        Ok(())
    }

    /// Stop accepting records and resolve names into an ordered table
    pub fn freeze(&mut self, names: &FunctionNames) -> BTreeMap<EdgeKey, EdgeMetrics> {
        self.frozen = true;

        let label = |node: &EdgeNode| FrameLabel::new(names.name(node.function), node.marker);
        let table: BTreeMap<EdgeKey, EdgeMetrics> = self
            .edges
            .drain()
            .map(|(raw, metrics)| {
                let key = EdgeKey::new(raw.parent.as_ref().map(label), label(&raw.child));
                (key, metrics)
            })
            .collect();

        debug!("Froze edge table with {} edges", table.len());
        table
    }
}
