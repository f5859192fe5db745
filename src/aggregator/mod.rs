//! Call-graph bookkeeping.
//!
//! This module turns a stream of completed frames into:
//! - Interned function names
//! - The active call stack with recursion depths
//! - The cumulative per-edge metric table
//! - Hot edges and per-function summaries of a finished report

pub mod call_stack;
pub mod edges;
pub mod metrics;
pub mod names;

pub use call_stack::{CallStack, Frame};
pub use edges::{EdgeAggregator, EdgeKey, EdgeMetrics, EdgeNode, FrameLabel};
pub use metrics::{
    calculate_function_summaries, calculate_hot_edges, CostTotals, FunctionSummary, HotEdge,
};
pub use names::{FunctionId, FunctionNames};
