//! The aggregated report returned by `disable()`.
//!
//! In JSON a report is an object of textual edge keys to metric records,
//! along with the flags it was collected under:
//!
//! ```json
//! {
//!   "flags": 2,
//!   "degradedSamples": 0,
//!   "edges": {
//!     "main()": { "count": 1, "wall": 120, ... },
//!     "main()==>foo": { "count": 1, "wall": 80, ... }
//!   }
//! }
//! ```

use crate::aggregator::{EdgeKey, EdgeMetrics};
use crate::metrics::MetricFlags;
use crate::utils::config::ROOT_SYMBOL;
use crate::utils::error::ReportError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Immutable mapping from edge key to accumulated metrics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ReportRepr", into = "ReportRepr")]
pub struct Report {
    flags: MetricFlags,
    edges: BTreeMap<EdgeKey, EdgeMetrics>,
    degraded_samples: u64,
}

impl Report {
    pub fn new(
        flags: MetricFlags,
        edges: BTreeMap<EdgeKey, EdgeMetrics>,
        degraded_samples: u64,
    ) -> Self {
        Self {
            flags,
            edges,
            degraded_samples,
        }
    }

    /// Flags the session was enabled with
    pub fn flags(&self) -> MetricFlags {
        self.flags
    }

    /// Metric readings that were substituted with zero
    pub fn degraded_samples(&self) -> u64 {
        self.degraded_samples
    }

    /// Look up an edge by its text form, e.g. `"foo==>bar@1"`
    pub fn get(&self, key: &str) -> Option<&EdgeMetrics> {
        let key: EdgeKey = key.parse().ok()?;
        self.edges.get(&key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Whole-session totals
    pub fn root(&self) -> Option<&EdgeMetrics> {
        self.edges.get(&EdgeKey::root(ROOT_SYMBOL))
    }

    /// Total activations of `function`, summed over every edge into it
    pub fn activations(&self, function: &str) -> u64 {
        self.edges
            .iter()
            .filter(|(key, _)| key.child.function == function)
            .map(|(_, metrics)| metrics.count)
            .sum()
    }

    /// Whether `function` appears on either side of any edge
    pub fn mentions(&self, function: &str) -> bool {
        self.edges.keys().any(|key| {
            key.child.function == function
                || key
                    .parent
                    .as_ref()
                    .is_some_and(|parent| parent.function == function)
        })
    }

    /// Edges in key order
    pub fn iter(&self) -> impl Iterator<Item = (&EdgeKey, &EdgeMetrics)> {
        self.edges.iter()
    }

    /// Textual keys in key order
    pub fn keys(&self) -> Vec<String> {
        self.edges.keys().map(EdgeKey::to_string).collect()
    }

    pub fn edges(&self) -> &BTreeMap<EdgeKey, EdgeMetrics> {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

}

/// Serialized form with textual keys
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportRepr {
    flags: MetricFlags,
    #[serde(default)]
    degraded_samples: u64,
    edges: BTreeMap<String, EdgeMetrics>,
}

impl From<Report> for ReportRepr {
    fn from(report: Report) -> Self {
        Self {
            flags: report.flags,
            degraded_samples: report.degraded_samples,
            edges: report
                .edges
                .into_iter()
                .map(|(key, metrics)| (key.to_string(), metrics))
                .collect(),
        }
    }
}

impl TryFrom<ReportRepr> for Report {
    type Error = ReportError;

    fn try_from(repr: ReportRepr) -> Result<Self, Self::Error> {
        let edges = repr
            .edges
            .into_iter()
            .map(|(key, metrics)| Ok((key.parse::<EdgeKey>()?, metrics)))
            .collect::<Result<BTreeMap<_, _>, ReportError>>()?;

        Ok(Report {
            flags: MetricFlags::from_bits(repr.flags.bits()),
            edges,
            degraded_samples: repr.degraded_samples,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Report {
        let mut edges = BTreeMap::new();
        edges.insert(
            EdgeKey::root(ROOT_SYMBOL),
            EdgeMetrics {
                count: 1,
                wall: 100,
                ..EdgeMetrics::default()
            },
        );
        edges.insert(
            "main()==>foo".parse().unwrap(),
            EdgeMetrics {
                count: 1,
                wall: 70,
                ..EdgeMetrics::default()
            },
        );
        edges.insert(
            "foo==>foo@1".parse().unwrap(),
            EdgeMetrics {
                count: 2,
                wall: 30,
                ..EdgeMetrics::default()
            },
        );
        Report::new(MetricFlags::CPU, edges, 0)
    }

    #[test]
    fn test_lookup_by_text_key() {
        let report = sample();
        assert_eq!(report.root().unwrap().wall, 100);
        assert_eq!(report.get("foo==>foo@1").unwrap().count, 2);
        assert!(report.get("foo==>foo").is_none());
        assert!(report.get("").is_none());
    }

    #[test]
    fn test_activations_and_mentions() {
        let report = sample();
        assert_eq!(report.activations("foo"), 3);
        assert_eq!(report.activations("main()"), 1);
        assert!(report.mentions("foo"));
        assert!(!report.mentions("bar"));
    }

    #[test]
    fn test_json_uses_text_keys() {
        let report = sample();
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["flags"], 2);
        assert_eq!(json["edges"]["foo==>foo@1"]["count"], 2);
        assert_eq!(json["edges"]["main()==>foo"]["memoryDelta"], 0);

        let back: Report = serde_json::from_value(json).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn test_json_rejects_bad_keys() {
        let json = serde_json::json!({
            "flags": 0,
            "edges": { "a==>b==>c": { "count": 1, "wall": 0, "cpu": 0, "memoryDelta": 0, "peakMemoryDelta": 0 } }
        });
        assert!(serde_json::from_value::<Report>(json).is_err());
    }
}
