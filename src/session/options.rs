//! Options accepted by `enable()`.
//!
//! Accepted JSON shape:
//!
//! ```json
//! {
//!   "ignored_functions": "name" | ["name", ...],
//!   "track_functions": "name" | ["name", ...],
//!   "track_algorithm": "hash" | "trie"
//! }
//! ```
//!
//! Every key is optional. `tracked_functions` is accepted as an alias of
//! `track_functions`.

use crate::filter::{FilterSet, FunctionSpec, TrackAlgorithm};
use crate::utils::error::UsageError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfilerOptions {
    /// Functions elided from the call graph
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignored_functions: Option<FunctionSpec>,

    /// Allow-list narrowing instrumentation to the named functions
    #[serde(
        default,
        alias = "tracked_functions",
        skip_serializing_if = "Option::is_none"
    )]
    pub track_functions: Option<FunctionSpec>,

    #[serde(default)]
    pub track_algorithm: TrackAlgorithm,
}

impl ProfilerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add names to the ignored set
    pub fn ignore(mut self, names: impl Into<FunctionSpec>) -> Self {
        self.ignored_functions = Some(extend(self.ignored_functions.take(), names.into()));
        self
    }

    /// Add names to the tracked allow-list
    pub fn track(mut self, names: impl Into<FunctionSpec>) -> Self {
        self.track_functions = Some(extend(self.track_functions.take(), names.into()));
        self
    }

    pub fn with_algorithm(mut self, algorithm: TrackAlgorithm) -> Self {
        self.track_algorithm = algorithm;
        self
    }

    /// Decode options from an untyped value
    ///
    /// `null` yields the defaults. Unknown keys are ignored, as are keys of
    /// an options object that hold `null`.
    pub fn from_value(value: &Value) -> Result<Self, UsageError> {
        let object = match value {
            Value::Null => return Ok(Self::default()),
            Value::Object(object) => object,
            other => {
                return Err(UsageError::MalformedOptions {
                    option: "options".to_string(),
                    reason: format!("expected an object, found {}", other),
                })
            }
        };

        let spec = |option: &str| -> Result<Option<FunctionSpec>, UsageError> {
            match object.get(option) {
                Some(value) => FunctionSpec::from_value(option, value),
                None => Ok(None),
            }
        };

        let ignored_functions = spec("ignored_functions")?;
        let track_functions = match spec("track_functions")? {
            Some(tracked) => Some(tracked),
            None => spec("tracked_functions")?,
        };

        let track_algorithm = match object.get("track_algorithm") {
            None | Some(Value::Null) => TrackAlgorithm::default(),
            Some(value) => {
                serde_json::from_value(value.clone()).map_err(|e| UsageError::MalformedOptions {
                    option: "track_algorithm".to_string(),
                    reason: e.to_string(),
                })?
            }
        };

        Ok(Self {
            ignored_functions,
            track_functions,
            track_algorithm,
        })
    }

    /// Decode options from JSON text
    pub fn from_json_str(text: &str) -> Result<Self, UsageError> {
        let value: Value = serde_json::from_str(text).map_err(|e| UsageError::MalformedOptions {
            option: "options".to_string(),
            reason: e.to_string(),
        })?;
        Self::from_value(&value)
    }

    /// Filter rules these options describe
    pub fn filter_set(&self) -> FilterSet {
        FilterSet::new(
            self.ignored_functions.as_ref(),
            self.track_functions.as_ref(),
            self.track_algorithm,
        )
    }
}

fn extend(current: Option<FunctionSpec>, more: FunctionSpec) -> FunctionSpec {
    match current {
        None => more,
        Some(current) => {
            let names: Vec<String> = current
                .names()
                .chain(more.names())
                .map(str::to_string)
                .collect();
            FunctionSpec::Many(names)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder() {
        let options = ProfilerOptions::new()
            .ignore("call_user_func")
            .ignore(vec!["call_user_func_array"])
            .track(vec!["test", "bar"])
            .with_algorithm(TrackAlgorithm::Trie);

        let ignored: Vec<&str> = options.ignored_functions.as_ref().unwrap().names().collect();
        assert_eq!(ignored, vec!["call_user_func", "call_user_func_array"]);
        assert_eq!(options.track_algorithm, TrackAlgorithm::Trie);

        let filter = options.filter_set();
        assert!(filter.excludes("call_user_func"));
        assert!(filter.excludes("foo"));
        assert!(!filter.excludes("bar"));
    }

    #[test]
    fn test_from_value() {
        let options = ProfilerOptions::from_value(&json!({
            "ignored_functions": "strlen",
            "tracked_functions": ["test"],
            "track_algorithm": "trie",
        }))
        .unwrap();

        assert_eq!(options.ignored_functions, Some(FunctionSpec::from("strlen")));
        assert_eq!(options.track_functions, Some(FunctionSpec::from(vec!["test"])));
        assert_eq!(options.track_algorithm, TrackAlgorithm::Trie);

        assert_eq!(ProfilerOptions::from_value(&json!(null)).unwrap(), ProfilerOptions::default());
        assert_eq!(ProfilerOptions::from_value(&json!({})).unwrap(), ProfilerOptions::default());
    }

    #[test]
    fn test_from_value_rejects_malformed() {
        let err = ProfilerOptions::from_value(&json!({ "ignored_functions": 3 })).unwrap_err();
        assert!(matches!(err, UsageError::MalformedOptions { ref option, .. } if option == "ignored_functions"));

        assert!(ProfilerOptions::from_value(&json!({ "track_algorithm": "btree" })).is_err());
        assert!(ProfilerOptions::from_value(&json!([1, 2])).is_err());
        assert!(ProfilerOptions::from_json_str("{not json").is_err());
    }

    #[test]
    fn test_serde_roundtrip_uses_snake_case() {
        let options = ProfilerOptions::from_json_str(
            r#"{"ignored_functions": ["a", "b"], "track_functions": "c"}"#,
        )
        .unwrap();
        let json = serde_json::to_value(&options).unwrap();
        assert_eq!(json["ignored_functions"], json!(["a", "b"]));
        assert_eq!(json["track_algorithm"], json!("hash"));
    }
}
