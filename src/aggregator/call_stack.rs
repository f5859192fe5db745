//! The dynamic call path of a session.
//!
//! Frames form a strict stack: only the top frame may be popped. Each frame
//! carries its recursion depth, i.e. how many frames of the same function
//! are active below it plus one, which is what edge keys are disambiguated
//! with.

use super::names::FunctionId;
use crate::metrics::MetricSnapshot;
use crate::utils::config::INITIAL_STACK_CAPACITY;
use log::trace;

/// One active function invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    /// Interned function identifier
    pub function: FunctionId,

    /// 1-based recursion depth of this function within the stack
    pub depth: u32,

    /// Readings taken when the frame was pushed
    pub entry: MetricSnapshot,

    /// Session-unique, monotonically increasing sequence number
    pub seq: u64,
}

impl Frame {
    /// Recursion-depth marker, present only for recursive occurrences
    pub fn marker(&self) -> Option<u32> {
        if self.depth > 1 {
            Some(self.depth - 1)
        } else {
            None
        }
    }
}

/// Stack of active frames with per-function activity counts
///
/// Keeps its buffers across `clear` so a reused stack does not allocate
/// once it has reached its working depth.
#[derive(Debug, Clone)]
pub struct CallStack {
    frames: Vec<Frame>,

    /// Active frame count per function, indexed by `FunctionId`
    active: Vec<u32>,

    next_seq: u64,
}

impl Default for CallStack {
    fn default() -> Self {
        Self::new()
    }
}

impl CallStack {
    pub fn new() -> Self {
        Self {
            frames: Vec::with_capacity(INITIAL_STACK_CAPACITY),
            active: Vec::new(),
            next_seq: 0,
        }
    }

    /// Drop every frame and restart sequence numbering
    pub fn clear(&mut self) {
        self.frames.clear();
        self.active.clear();
        self.next_seq = 0;
    }

    /// Push a frame for `function`, returning its sequence number
    pub fn push(&mut self, function: FunctionId, entry: MetricSnapshot) -> u64 {
        let depth = self.active_count(function) + 1;
        let slot = function as usize;
        if slot >= self.active.len() {
            self.active.resize(slot + 1, 0);
        }
        self.active[slot] = depth;

        let seq = self.next_seq;
        self.next_seq += 1;

        let frame = Frame {
            function,
            depth,
            entry,
            seq,
        };
        trace!("push #{} fn={} depth={}", seq, function, frame.depth);
        self.frames.push(frame);
        seq
    }

    /// Pop the top frame
    pub fn pop(&mut self) -> Option<Frame> {
        let frame = self.frames.pop()?;
        if let Some(count) = self.active.get_mut(frame.function as usize) {
            *count = count.saturating_sub(1);
        }
        trace!("pop #{} fn={}", frame.seq, frame.function);
        Some(frame)
    }

    pub fn top(&self) -> Option<&Frame> {
        self.frames.last()
    }

    /// Number of active frames
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Active frames of `function`
    pub fn active_count(&self, function: FunctionId) -> u32 {
        self.active.get(function as usize).copied().unwrap_or(0)
    }

    /// Frames from bottom to top
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }
}
