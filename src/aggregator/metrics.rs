//! Derived views over a finished report.
//!
//! Hot edges are the caller→callee relationships with the largest inclusive
//! wall time. Function summaries flatten the edge graph into a per-function
//! profile with inclusive and exclusive cost.

use super::edges::{EdgeKey, EdgeMetrics, FrameLabel};
use crate::report::Report;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// An edge ranked by inclusive wall time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotEdge {
    /// Edge key in text form
    pub key: String,

    pub count: u64,

    /// Inclusive wall time, microseconds
    pub wall: u64,

    /// Share of the whole-session wall time
    pub percentage: f64,
}

/// Calculate the top edges by inclusive wall time
///
/// **Public** - main entry point for hot-edge ranking
///
/// # Arguments
/// * `report` - Finished report
/// * `top_n` - Number of edges to return
///
/// # Returns
/// Edges sorted by wall time (descending), ties broken by key. The root
/// entry is left out since it is the total everything is measured against.
pub fn calculate_hot_edges(report: &Report, top_n: usize) -> Vec<HotEdge> {
    let total_wall = report.root().map(|root| root.wall).unwrap_or(0);
    debug!(
        "Ranking top {} of {} edges against {}us",
        top_n,
        report.len(),
        total_wall
    );

    let mut edges: Vec<(&EdgeKey, &EdgeMetrics)> = report
        .iter()
        .filter(|(key, _)| key.parent.is_some())
        .collect();
    edges.sort_by(|a, b| b.1.wall.cmp(&a.1.wall).then_with(|| a.0.cmp(b.0)));

    edges
        .into_iter()
        .take(top_n)
        .map(|(key, metrics)| HotEdge {
            key: key.to_string(),
            count: metrics.count,
            wall: metrics.wall,
            percentage: percentage_of(metrics.wall, total_wall),
        })
        .collect()
}

fn percentage_of(part: u64, total: u64) -> f64 {
    if total > 0 {
        (part as f64 / total as f64) * 100.0
    } else {
        0.0
    }
}

/// Cost figures of one function
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostTotals {
    pub wall: u64,
    pub cpu: u64,
    pub memory_delta: i64,
    pub peak_memory_delta: i64,
}

impl CostTotals {
    fn add(&mut self, metrics: &EdgeMetrics) {
        self.wall = self.wall.saturating_add(metrics.wall);
        self.cpu = self.cpu.saturating_add(metrics.cpu);
        self.memory_delta = self.memory_delta.saturating_add(metrics.memory_delta);
        self.peak_memory_delta = self
            .peak_memory_delta
            .saturating_add(metrics.peak_memory_delta);
    }

    fn subtract(&mut self, metrics: &EdgeMetrics) {
        self.wall = self.wall.saturating_sub(metrics.wall);
        self.cpu = self.cpu.saturating_sub(metrics.cpu);
        self.memory_delta = self.memory_delta.saturating_sub(metrics.memory_delta);
        self.peak_memory_delta = self
            .peak_memory_delta
            .saturating_sub(metrics.peak_memory_delta);
    }

    fn merge(&mut self, other: &CostTotals) {
        self.wall = self.wall.saturating_add(other.wall);
        self.cpu = self.cpu.saturating_add(other.cpu);
        self.memory_delta = self.memory_delta.saturating_add(other.memory_delta);
        self.peak_memory_delta = self
            .peak_memory_delta
            .saturating_add(other.peak_memory_delta);
    }
}

/// Flat profile entry for one function
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSummary {
    pub function: String,

    /// Total activations
    pub count: u64,

    /// Cost including callees, counted once per outermost activation
    pub inclusive: CostTotals,

    /// Cost excluding callees, summed over every activation
    pub exclusive: CostTotals,
}

#[derive(Default)]
struct SymbolTotals {
    count: u64,
    inclusive: CostTotals,
    exclusive: CostTotals,
}

/// Flatten a report into per-function summaries
///
/// Every marked occurrence (`foo@2`) is its own graph node: its inclusive
/// cost is the sum of edges into it and its exclusive cost is that minus
/// the edges out of it. Occurrences are then folded per function, taking
/// inclusive cost from the unmarked node only so recursion is not counted
/// twice.
///
/// Sorted by exclusive wall time (descending), ties broken by name.
pub fn calculate_function_summaries(report: &Report) -> Vec<FunctionSummary> {
    let mut symbols: HashMap<&FrameLabel, SymbolTotals> = HashMap::new();

    for (key, metrics) in report.iter() {
        let child = symbols.entry(&key.child).or_default();
        child.count += metrics.count;
        child.inclusive.add(metrics);
        child.exclusive.add(metrics);
    }
    for (key, metrics) in report.iter() {
        if let Some(parent) = &key.parent {
            if let Some(totals) = symbols.get_mut(parent) {
                totals.exclusive.subtract(metrics);
            }
        }
    }

    let mut functions: BTreeMap<&str, FunctionSummary> = BTreeMap::new();
    for (label, totals) in symbols {
        let summary = functions
            .entry(label.function.as_str())
            .or_insert_with(|| FunctionSummary {
                function: label.function.clone(),
                count: 0,
                inclusive: CostTotals::default(),
                exclusive: CostTotals::default(),
            });
        summary.count += totals.count;
        summary.exclusive.merge(&totals.exclusive);
        if !label.is_recursive() {
            summary.inclusive.merge(&totals.inclusive);
        }
    }

    let mut summaries: Vec<FunctionSummary> = functions.into_values().collect();
    summaries.sort_by(|a, b| {
        b.exclusive
            .wall
            .cmp(&a.exclusive.wall)
            .then_with(|| a.function.cmp(&b.function))
    });

    debug!("Summarized {} functions", summaries.len());
    summaries
}
