//! Comparison of two reports over their canonical edges.
//!
//! Recursion markers are stripped before comparing, so two runs that reach
//! different recursion depths still line up edge by edge.

use super::canonical::canonicalize;
use super::schema::Report;
use crate::aggregator::EdgeMetrics;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Change of one canonical edge present in both reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeDelta {
    pub key: String,
    pub baseline_count: u64,
    pub target_count: u64,
    pub count_change: i64,
    pub baseline_wall: u64,
    pub target_wall: u64,
    pub wall_change: i64,
    pub wall_percent_change: f64,
}

/// An edge present in only one of the reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoneEdge {
    pub key: String,
    pub metrics: EdgeMetrics,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDiff {
    /// Edges present in both reports, in key order
    pub common: Vec<EdgeDelta>,

    /// Edges that disappeared
    pub baseline_only: Vec<LoneEdge>,

    /// Edges that are new
    pub target_only: Vec<LoneEdge>,
}

impl ReportDiff {
    /// Whether the two reports have the same edges with the same counts
    pub fn same_shape(&self) -> bool {
        self.baseline_only.is_empty()
            && self.target_only.is_empty()
            && self.common.iter().all(|delta| delta.count_change == 0)
    }

    /// Human-readable listing of count changes and lone edges
    pub fn render(&self) -> String {
        let mut out = String::new();

        for delta in &self.common {
            if delta.count_change != 0 {
                let _ = writeln!(
                    out,
                    "~ {}: ct {} -> {} ({:+})",
                    delta.key, delta.baseline_count, delta.target_count, delta.count_change
                );
            }
        }
        for edge in &self.baseline_only {
            let _ = writeln!(out, "- {}: ct {}", edge.key, edge.metrics.count);
        }
        for edge in &self.target_only {
            let _ = writeln!(out, "+ {}: ct {}", edge.key, edge.metrics.count);
        }
        if out.is_empty() {
            out.push_str("No call-count changes\n");
        }
        out
    }
}

/// Percentage change against a baseline; zero when the baseline is zero
pub fn safe_percentage(change: i64, baseline: u64) -> f64 {
    if baseline == 0 {
        0.0
    } else {
        (change as f64 / baseline as f64) * 100.0
    }
}

fn signed_change(baseline: u64, target: u64) -> i64 {
    (target as i64).wrapping_sub(baseline as i64)
}

/// Compare two reports edge by edge after canonicalization
pub fn diff_reports(baseline: &Report, target: &Report) -> ReportDiff {
    let baseline = canonicalize(baseline);
    let target = canonicalize(target);

    let mut diff = ReportDiff::default();

    for (key, base) in &baseline.edges {
        match target.edges.get(key) {
            Some(next) => {
                let wall_change = signed_change(base.wall, next.wall);
                diff.common.push(EdgeDelta {
                    key: key.clone(),
                    baseline_count: base.count,
                    target_count: next.count,
                    count_change: signed_change(base.count, next.count),
                    baseline_wall: base.wall,
                    target_wall: next.wall,
                    wall_change,
                    wall_percent_change: safe_percentage(wall_change, base.wall),
                });
            }
            None => diff.baseline_only.push(LoneEdge {
                key: key.clone(),
                metrics: *base,
            }),
        }
    }

    diff.target_only = target
        .edges
        .iter()
        .filter(|(key, _)| !baseline.edges.contains_key(*key))
        .map(|(key, metrics)| LoneEdge {
            key: key.clone(),
            metrics: *metrics,
        })
        .collect();

    debug!(
        "Diff: {} common, {} removed, {} added",
        diff.common.len(),
        diff.baseline_only.len(),
        diff.target_only.len()
    );
    diff
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::EdgeKey;
    use crate::metrics::MetricFlags;

    fn report(entries: &[(&str, u64, u64)]) -> Report {
        let edges = entries
            .iter()
            .map(|(key, count, wall)| {
                (
                    key.parse::<EdgeKey>().unwrap(),
                    EdgeMetrics {
                        count: *count,
                        wall: *wall,
                        ..EdgeMetrics::default()
                    },
                )
            })
            .collect();
        Report::new(MetricFlags::NONE, edges, 0)
    }

    #[test]
    fn test_safe_percentage() {
        assert_eq!(safe_percentage(50, 100), 50.0);
        assert_eq!(safe_percentage(-25, 100), -25.0);
        assert_eq!(safe_percentage(10, 0), 0.0);
    }

    #[test]
    fn test_diff_common_and_lone_edges() {
        let baseline = report(&[("main()", 1, 100), ("main()==>foo", 1, 80), ("foo==>bar", 2, 10)]);
        let target = report(&[("main()", 1, 150), ("main()==>foo", 1, 120), ("foo==>baz", 1, 5)]);

        let diff = diff_reports(&baseline, &target);

        assert_eq!(diff.common.len(), 2);
        let foo = diff.common.iter().find(|d| d.key == "main()==>foo").unwrap();
        assert_eq!(foo.wall_change, 40);
        assert_eq!(foo.wall_percent_change, 50.0);

        assert_eq!(diff.baseline_only[0].key, "foo==>bar");
        assert_eq!(diff.target_only[0].key, "foo==>baz");
        assert!(!diff.same_shape());
    }

    #[test]
    fn test_diff_ignores_markers_and_timing() {
        let baseline = report(&[("main()", 1, 100), ("foo==>foo@1", 1, 40), ("foo@1==>foo@2", 1, 10)]);
        let target = report(&[("main()", 1, 90), ("foo==>foo@1", 2, 70)]);

        let diff = diff_reports(&baseline, &target);
        assert!(diff.same_shape());
        assert_eq!(diff.render(), "No call-count changes\n");
    }
}
