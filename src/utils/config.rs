//! Configuration and constants for the profiler and the CLI.

/// Current report document schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Symbol of the synthetic root frame pushed by `enable()`
pub const ROOT_SYMBOL: &str = "main()";

/// Separator between parent and child in a textual edge key
pub const EDGE_SEPARATOR: &str = "==>";

/// Separator between a function name and its recursion-depth marker
pub const RECURSION_MARKER: char = '@';

/// Separator between a type/class scope and a method name
pub const SCOPE_SEPARATOR: &str = "::";

// Profiler control entry points. These never show up in a report,
// whatever the user configuration says.
pub const BUILTIN_PROFILER_FUNCTIONS: &[&str] = &[
    "hierprof::enable",
    "hierprof::disable",
    "ProfilerSession::enable",
    "ProfilerSession::disable",
];

// Metric flag bits (wall time and call count are always collected)
pub const FLAG_NO_BUILTINS: u32 = 0x0001;
pub const FLAG_CPU: u32 = 0x0002;
pub const FLAG_MEMORY: u32 = 0x0004;

/// Column width used when rendering canonical report lines
pub const CANONICAL_KEY_WIDTH: usize = 40;

/// Default number of hot edges shown by the CLI
pub const DEFAULT_TOP_EDGES: usize = 10;

/// Initial frame capacity reserved by a fresh call stack
pub const INITIAL_STACK_CAPACITY: usize = 64;
