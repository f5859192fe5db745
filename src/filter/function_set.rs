//! Ignored and tracked function sets.
//!
//! A `FilterSet` answers one question per hook: does this function get a
//! frame of its own? Ignored functions are elided (their children attach to
//! the caller), and in tracked mode everything outside the allow-list is
//! elided the same way.

use super::trie::FunctionTrie;
use crate::utils::config::{BUILTIN_PROFILER_FUNCTIONS, SCOPE_SEPARATOR};
use crate::utils::error::UsageError;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A single function name or a list of names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FunctionSpec {
    One(String),
    Many(Vec<String>),
}

impl FunctionSpec {
    /// Iterate the names in the spec
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        let names: &[String] = match self {
            FunctionSpec::One(name) => std::slice::from_ref(name),
            FunctionSpec::Many(names) => names,
        };
        names.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        match self {
            FunctionSpec::One(name) => name.is_empty(),
            FunctionSpec::Many(names) => names.iter().all(String::is_empty),
        }
    }

    /// Decode an untyped option value
    ///
    /// `null` means the option is absent. Anything other than a string or
    /// an array of strings is a usage error.
    pub fn from_value(
        option: &str,
        value: &serde_json::Value,
    ) -> Result<Option<Self>, UsageError> {
        use serde_json::Value;

        match value {
            Value::Null => Ok(None),
            Value::String(name) => Ok(Some(FunctionSpec::One(name.clone()))),
            Value::Array(items) => {
                let names = items
                    .iter()
                    .map(|item| {
                        item.as_str().map(str::to_string).ok_or_else(|| {
                            UsageError::MalformedOptions {
                                option: option.to_string(),
                                reason: format!("expected a function name, found {}", item),
                            }
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Some(FunctionSpec::Many(names)))
            }
            other => Err(UsageError::MalformedOptions {
                option: option.to_string(),
                reason: format!("expected a name or a list of names, found {}", other),
            }),
        }
    }
}

impl From<&str> for FunctionSpec {
    fn from(name: &str) -> Self {
        FunctionSpec::One(name.to_string())
    }
}

impl From<Vec<&str>> for FunctionSpec {
    fn from(names: Vec<&str>) -> Self {
        FunctionSpec::Many(names.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<String>> for FunctionSpec {
    fn from(names: Vec<String>) -> Self {
        FunctionSpec::Many(names)
    }
}

/// Lookup structure used for tracked-function membership
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackAlgorithm {
    /// Hash set of qualified names
    #[default]
    Hash,
    /// Character trie, walked without building qualified names
    Trie,
}

#[derive(Debug, Clone)]
enum TrackedFunctions {
    Hash(HashSet<String>),
    Trie(FunctionTrie),
}

/// Join a type/class scope and a method name into a function identifier
pub fn qualify(scope: Option<&str>, name: &str) -> String {
    match scope.filter(|s| !s.is_empty()) {
        Some(scope) => format!("{}{}{}", scope, SCOPE_SEPARATOR, name),
        None => name.to_string(),
    }
}

/// Per-session filtering rules
#[derive(Debug, Clone, Default)]
pub struct FilterSet {
    ignored: HashSet<String>,
    tracked: Option<TrackedFunctions>,
}

impl FilterSet {
    /// Filter set without user restrictions (built-ins are still ignored)
    pub fn unrestricted() -> Self {
        Self::default()
    }

    /// Build from optional specs; absent or empty specs impose no restriction
    pub fn new(
        ignored: Option<&FunctionSpec>,
        tracked: Option<&FunctionSpec>,
        algorithm: TrackAlgorithm,
    ) -> Self {
        let ignored: HashSet<String> = ignored
            .into_iter()
            .flat_map(|spec| spec.names())
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();

        let tracked = tracked.filter(|spec| !spec.is_empty()).map(|spec| {
            let names = spec.names().filter(|name| !name.is_empty());
            match algorithm {
                TrackAlgorithm::Hash => TrackedFunctions::Hash(names.map(str::to_string).collect()),
                TrackAlgorithm::Trie => {
                    let mut trie = FunctionTrie::new();
                    for name in names {
                        trie.insert(name);
                    }
                    TrackedFunctions::Trie(trie)
                }
            }
        });

        debug!(
            "Filter set: {} ignored, tracked mode {}",
            ignored.len(),
            if tracked.is_some() { "on" } else { "off" }
        );

        Self { ignored, tracked }
    }

    /// Whether `name` is elided by the ignore rules (built-ins included)
    pub fn is_ignored(&self, name: &str) -> bool {
        BUILTIN_PROFILER_FUNCTIONS.iter().any(|builtin| *builtin == name)
            || self.ignored.contains(name)
    }

    /// Whether `name` passes the tracked allow-list (always true without one)
    pub fn is_tracked(&self, name: &str) -> bool {
        match &self.tracked {
            None => true,
            Some(TrackedFunctions::Hash(names)) => names.contains(name),
            Some(TrackedFunctions::Trie(trie)) => trie.contains(name),
        }
    }

    /// Tracked check for a scope and method name given separately
    pub fn is_tracked_qualified(&self, scope: Option<&str>, name: &str) -> bool {
        match &self.tracked {
            None => true,
            Some(TrackedFunctions::Hash(names)) => names.contains(&qualify(scope, name)),
            Some(TrackedFunctions::Trie(trie)) => trie.lookup_qualified(scope, name).is_some(),
        }
    }

    /// Whether an allow-list is in effect
    pub fn is_tracking(&self) -> bool {
        self.tracked.is_some()
    }

    /// Tracked narrows first, then ignored elides within
    pub fn excludes(&self, name: &str) -> bool {
        !self.is_tracked(name) || self.is_ignored(name)
    }

    /// `excludes` for a scope and method name given separately
    ///
    /// The trie walks both parts in place; a qualified name is only built
    /// for hash lookups.
    pub fn excludes_qualified(&self, scope: Option<&str>, name: &str) -> bool {
        if !self.is_tracked_qualified(scope, name) {
            return true;
        }
        match scope.filter(|s| !s.is_empty()) {
            None => self.is_ignored(name),
            Some(scope) => {
                BUILTIN_PROFILER_FUNCTIONS
                    .iter()
                    .any(|builtin| builtin.split_once(SCOPE_SEPARATOR) == Some((scope, name)))
                    || (!self.ignored.is_empty()
                        && self.ignored.contains(&qualify(Some(scope), name)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unrestricted_ignores_builtins_only() {
        let filter = FilterSet::unrestricted();
        assert!(filter.is_ignored("hierprof::enable"));
        assert!(filter.is_ignored("ProfilerSession::disable"));
        assert!(!filter.is_ignored("foo"));
        assert!(filter.is_tracked("foo"));
        assert!(!filter.is_tracking());
    }

    #[test]
    fn test_single_name_spec() {
        let spec = FunctionSpec::from("my_call_user_func_array_safe");
        let filter = FilterSet::new(Some(&spec), None, TrackAlgorithm::Hash);
        assert!(filter.is_ignored("my_call_user_func_array_safe"));
        assert!(!filter.is_ignored("call_user_func_array"));
    }

    #[test]
    fn test_empty_specs_impose_nothing() {
        let ignored = FunctionSpec::Many(vec![]);
        let tracked = FunctionSpec::Many(vec![]);
        let filter = FilterSet::new(Some(&ignored), Some(&tracked), TrackAlgorithm::Hash);
        assert!(!filter.is_tracking());
        assert!(!filter.excludes("foo"));
    }

    #[test]
    fn test_tracked_then_ignored() {
        let tracked = FunctionSpec::from(vec!["test", "bar"]);
        let ignored = FunctionSpec::from("bar");
        let filter = FilterSet::new(Some(&ignored), Some(&tracked), TrackAlgorithm::Hash);

        assert!(!filter.excludes("test"));
        assert!(filter.excludes("bar"));
        assert!(filter.excludes("foo"));
    }

    #[test]
    fn test_hash_and_trie_agree() {
        let tracked = FunctionSpec::from(vec!["test", "bar", "C::get_attr"]);
        let hash = FilterSet::new(None, Some(&tracked), TrackAlgorithm::Hash);
        let trie = FilterSet::new(None, Some(&tracked), TrackAlgorithm::Trie);

        for name in ["test", "bar", "ba", "bart", "C::get_attr", "get_attr", "foo"] {
            assert_eq!(hash.is_tracked(name), trie.is_tracked(name), "{}", name);
        }
        assert!(hash.is_tracked_qualified(Some("C"), "get_attr"));
        assert!(trie.is_tracked_qualified(Some("C"), "get_attr"));
        assert!(!trie.is_tracked_qualified(Some("D"), "get_attr"));
    }

    #[test]
    fn test_excludes_qualified_matches_excludes() {
        let tracked = FunctionSpec::from(vec!["C::get_attr", "C::drop", "strlen"]);
        let ignored = FunctionSpec::from("C::drop");

        for algorithm in [TrackAlgorithm::Hash, TrackAlgorithm::Trie] {
            let filter = FilterSet::new(Some(&ignored), Some(&tracked), algorithm);
            for (scope, name) in [
                (Some("C"), "get_attr"),
                (Some("C"), "drop"),
                (Some("C"), "new"),
                (None, "strlen"),
                (Some(""), "strlen"),
                (Some("D"), "get_attr"),
            ] {
                assert_eq!(
                    filter.excludes_qualified(scope, name),
                    filter.excludes(&qualify(scope, name)),
                    "{:?} {}",
                    scope,
                    name
                );
            }
        }

        let unrestricted = FilterSet::unrestricted();
        assert!(unrestricted.excludes_qualified(Some("ProfilerSession"), "disable"));
        assert!(!unrestricted.excludes_qualified(Some("C"), "disable"));
    }

    #[test]
    fn test_spec_from_value() {
        assert_eq!(FunctionSpec::from_value("ignored_functions", &json!(null)).unwrap(), None);
        assert_eq!(
            FunctionSpec::from_value("ignored_functions", &json!("strlen")).unwrap(),
            Some(FunctionSpec::One("strlen".to_string()))
        );
        assert_eq!(
            FunctionSpec::from_value("ignored_functions", &json!(["a", "b"])).unwrap(),
            Some(FunctionSpec::from(vec!["a", "b"]))
        );
    }

    #[test]
    fn test_spec_from_value_rejects_other_shapes() {
        let err = FunctionSpec::from_value("ignored_functions", &json!(42)).unwrap_err();
        assert!(matches!(err, UsageError::MalformedOptions { ref option, .. } if option == "ignored_functions"));

        assert!(FunctionSpec::from_value("track_functions", &json!(["ok", 1])).is_err());
        assert!(FunctionSpec::from_value("track_functions", &json!({"a": 1})).is_err());
    }

    #[test]
    fn test_qualify() {
        assert_eq!(qualify(Some("C"), "outer_static"), "C::outer_static");
        assert_eq!(qualify(None, "foo"), "foo");
        assert_eq!(qualify(Some(""), "foo"), "foo");
    }
}
