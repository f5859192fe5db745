//! Function filtering rules.
//!
//! Decides which function activations get frames:
//! - built-in profiler control functions never do
//! - user-ignored functions are elided
//! - with a tracked list, only listed functions are instrumented

pub mod function_set;
pub mod trie;

pub use function_set::{qualify, FilterSet, FunctionSpec, TrackAlgorithm};
pub use trie::FunctionTrie;
