//! Marker-free, sorted view of a report for stable comparison.
//!
//! Only call counts survive canonical rendering verbatim. Every other
//! collected metric is printed as a wildcard so the text stays identical
//! across runs while still showing which metrics were collected.

use super::schema::Report;
use crate::aggregator::EdgeMetrics;
use crate::metrics::MetricFlags;
use crate::utils::config::CANONICAL_KEY_WIDTH;
use std::collections::BTreeMap;
use std::fmt::Write;

/// Report with recursion markers stripped and colliding edges merged
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanonicalReport {
    pub flags: MetricFlags,
    pub edges: BTreeMap<String, EdgeMetrics>,
}

impl CanonicalReport {
    pub fn get(&self, key: &str) -> Option<&EdgeMetrics> {
        self.edges.get(key)
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Call counts by key
    pub fn counts(&self) -> BTreeMap<&str, u64> {
        self.edges
            .iter()
            .map(|(key, metrics)| (key.as_str(), metrics.count))
            .collect()
    }

    /// One line per key: `<key padded>:ct=<count>;<metric>=*;...`
    pub fn render(&self) -> String {
        let names = self.flags.metric_names();
        let mut out = String::new();

        for (key, metrics) in &self.edges {
            let _ = write!(out, "{:<width$}:", key, width = CANONICAL_KEY_WIDTH);
            for name in &names {
                if *name == "ct" {
                    let _ = write!(out, "ct={:>8};", metrics.count);
                } else {
                    let _ = write!(out, "{}=*;", name);
                }
            }
            out.push('\n');
        }
        out
    }
}

/// Strip markers from both sides of every key and merge what collides
pub fn canonicalize(report: &Report) -> CanonicalReport {
    let mut edges: BTreeMap<String, EdgeMetrics> = BTreeMap::new();
    for (key, metrics) in report.iter() {
        edges
            .entry(key.stripped().to_string())
            .or_default()
            .merge(metrics);
    }

    CanonicalReport {
        flags: report.flags(),
        edges,
    }
}

/// Canonical text of a report
pub fn render_canonical(report: &Report) -> String {
    canonicalize(report).render()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::EdgeKey;

    fn report(flags: MetricFlags, entries: &[(&str, u64)]) -> Report {
        let edges = entries
            .iter()
            .map(|(key, count)| {
                (
                    key.parse::<EdgeKey>().unwrap(),
                    EdgeMetrics {
                        count: *count,
                        wall: 7 * count,
                        ..EdgeMetrics::default()
                    },
                )
            })
            .collect();
        Report::new(flags, edges, 0)
    }

    #[test]
    fn test_canonicalize_merges_levels() {
        let report = report(
            MetricFlags::NONE,
            &[
                ("main()", 1),
                ("main()==>foo", 1),
                ("foo==>foo@1", 1),
                ("foo@1==>foo@2", 1),
                ("foo@2==>foo@3", 1),
            ],
        );

        let canonical = canonicalize(&report);
        assert_eq!(canonical.len(), 3);
        assert_eq!(canonical.get("foo==>foo").unwrap().count, 3);
        assert_eq!(canonical.get("foo==>foo").unwrap().wall, 21);
    }

    #[test]
    fn test_render_line_format() {
        let report = report(MetricFlags::NONE, &[("main()", 1), ("main()==>foo", 12)]);
        let text = render_canonical(&report);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines[0],
            format!("{:<40}:ct=       1;wt=*;", "main()")
        );
        assert_eq!(
            lines[1],
            format!("{:<40}:ct=      12;wt=*;", "main()==>foo")
        );
    }

    #[test]
    fn test_render_lists_collected_metrics() {
        let report = report(MetricFlags::CPU | MetricFlags::MEMORY, &[("main()", 1)]);
        let text = render_canonical(&report);
        assert!(text.ends_with(":cpu=*;ct=       1;mu=*;pmu=*;wt=*;\n"));
    }
}
