//! Profiling session lifecycle and the entry/exit hooks.
//!
//! A session moves Idle → Active → Idle. `enable()` arms the hooks and
//! pushes the root frame; `disable()` closes whatever is still open at the
//! teardown instant, freezes the edge table and hands back the report.
//!
//! Hooks run inline with the instrumented code, so they only do integer
//! work after the first sighting of a function name: a filter lookup, one
//! metric snapshot, and a push or a pop plus one hash-map update.

use super::options::ProfilerOptions;
use crate::aggregator::{CallStack, EdgeAggregator, EdgeNode, FrameLabel, FunctionNames};
use crate::filter::{qualify, FilterSet};
use crate::metrics::{
    MetricDeltas, MetricFlags, MetricReader, MetricSnapshot, MetricSource, SystemMetrics,
};
use crate::report::Report;
use crate::utils::config::ROOT_SYMBOL;
use crate::utils::error::{ProfilerError, UsageError};
use log::{debug, error, info, trace, warn};
use std::collections::HashSet;
use std::fmt;
use std::ops::{Deref, DerefMut};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Active,
}

/// What kind of callee a hook is reporting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CallKind {
    #[default]
    User,
    /// Runtime-provided function, elided under `MetricFlags::NO_BUILTINS`
    Builtin,
}

/// Handle returned by the entry hook, to be passed back to the exit hook
///
/// A no-op token stands for an activation that got no frame (ignored,
/// untracked, or the session was idle) and makes the exit hook a no-op too.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "every entry needs exactly one matching exit"]
pub struct FrameToken {
    session: u64,
    seq: Option<u64>,
}

impl FrameToken {
    pub const NOOP: FrameToken = FrameToken {
        session: 0,
        seq: None,
    };

    pub fn is_noop(&self) -> bool {
        self.seq.is_none()
    }

    /// Sequence number of the frame behind the token
    pub fn seq(&self) -> Option<u64> {
        self.seq
    }
}

/// One profiling session with its own stack, edge table and metric source
pub struct ProfilerSession {
    source: Box<dyn MetricSource>,
    state: SessionState,

    /// Incremented by every `enable()`; tokens from older sessions are stale
    session_id: u64,

    reader: MetricReader,
    filter: FilterSet,
    names: FunctionNames,
    stack: CallStack,
    edges: EdgeAggregator,

    /// Names refused because they would not survive the edge key text form
    rejected: HashSet<String>,

    /// First stack corruption seen; poisons the rest of the session
    corruption: Option<ProfilerError>,
}

impl fmt::Debug for ProfilerSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfilerSession")
            .field("state", &self.state)
            .field("session_id", &self.session_id)
            .field("flags", &self.reader.flags())
            .field("depth", &self.stack.depth())
            .field("edges", &self.edges.len())
            .field("poisoned", &self.corruption.is_some())
            .finish()
    }
}

impl Default for ProfilerSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfilerSession {
    /// Idle session reading the system clocks and the allocation tracker
    pub fn new() -> Self {
        Self::with_source(SystemMetrics::new())
    }

    /// Idle session reading from `source`
    pub fn with_source(source: impl MetricSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            state: SessionState::Idle,
            session_id: 0,
            reader: MetricReader::default(),
            filter: FilterSet::unrestricted(),
            names: FunctionNames::new(),
            stack: CallStack::new(),
            edges: EdgeAggregator::new(),
            rejected: HashSet::new(),
            corruption: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    /// Flags of the current (or last) session
    pub fn flags(&self) -> MetricFlags {
        self.reader.flags()
    }

    /// Whether a stack corruption has been detected in the active session
    pub fn is_poisoned(&self) -> bool {
        self.corruption.is_some()
    }

    /// Open frames, the root frame included
    pub fn stack_depth(&self) -> usize {
        self.stack.depth()
    }

    /// Start a session
    ///
    /// Resets the stack and the edge table, builds the filter rules from
    /// `options` and opens the root frame.
    ///
    /// # Errors
    /// * `UsageError::AlreadyEnabled` - a session is active; it is left untouched
    pub fn enable(&mut self, flags: MetricFlags, options: &ProfilerOptions) -> Result<(), UsageError> {
        if self.is_active() {
            warn!("enable() called while a session is active");
            return Err(UsageError::AlreadyEnabled);
        }

        self.session_id += 1;
        self.reader = MetricReader::new(flags);
        self.filter = options.filter_set();
        self.names.clear();
        self.stack.clear();
        self.edges.reset();
        self.rejected.clear();
        self.corruption = None;
        self.state = SessionState::Active;

        let root = self.names.intern(ROOT_SYMBOL);
        let entry = self.snapshot();
        self.stack.push(root, entry);

        info!(
            "Profiling session #{} enabled (flags {:#x}, tracked mode {})",
            self.session_id,
            flags.bits(),
            if self.filter.is_tracking() { "on" } else { "off" }
        );
        Ok(())
    }

    /// End the session and return its report
    ///
    /// Frames still open are closed innermost first at the teardown
    /// instant, so the report accounts for everything between `enable()`
    /// and `disable()`.
    ///
    /// # Errors
    /// * `UsageError::NotEnabled` - no session is active
    /// * `ProfilerError::StackCorruption` - an exit was misordered during the
    ///   session; no report is produced and the session is reset to idle
    pub fn disable(&mut self) -> Result<Report, ProfilerError> {
        if !self.is_active() {
            warn!("disable() called while no session is active");
            return Err(UsageError::NotEnabled.into());
        }

        if let Some(corruption) = self.corruption.take() {
            error!("Discarding session #{}: {}", self.session_id, corruption);
            self.stack.clear();
            self.edges.reset();
            self.state = SessionState::Idle;
            return Err(corruption);
        }

        let exit = self.snapshot();
        let unclosed = self.stack.depth().saturating_sub(1);
        if unclosed > 0 {
            info!("Closing {} frames left open at teardown", unclosed);
            for frame in self.stack.frames().iter().skip(1).rev() {
                debug!("  open: {} (#{})", self.names.name(frame.function), frame.seq);
            }
        }
        while !self.stack.is_empty() {
            self.close_top(exit)?;
        }

        let edges = self.edges.freeze(&self.names);
        let report = Report::new(self.reader.flags(), edges, self.reader.degraded_samples());
        self.state = SessionState::Idle;

        if report.degraded_samples() > 0 {
            warn!(
                "{} metric readings were unavailable and recorded as zero",
                report.degraded_samples()
            );
        }
        info!(
            "Profiling session #{} disabled ({} edges, {} functions)",
            self.session_id,
            report.len(),
            self.names.len()
        );
        Ok(report)
    }

    /// Entry hook for a user function
    pub fn on_enter(&mut self, name: &str) -> FrameToken {
        self.on_enter_kind(name, CallKind::User)
    }

    /// Entry hook
    ///
    /// Returns a no-op token when the session is idle or poisoned, or when
    /// the function is elided by the filter rules. Names that cannot be
    /// written as an edge key (see [`FrameLabel::check_function`]) are
    /// elided too, with a warning the first time.
    pub fn on_enter_kind(&mut self, name: &str, kind: CallKind) -> FrameToken {
        if !self.accepts(name, kind) {
            return FrameToken::NOOP;
        }
        if self.filter.excludes(name) {
            trace!("elide {}", name);
            return FrameToken::NOOP;
        }
        self.push_frame(name)
    }

    /// Entry hook for a method of `scope`, recorded as `scope::name`
    ///
    /// Filter rules see the two parts separately, so the qualified name is
    /// only built for calls that actually get a frame.
    pub fn on_enter_qualified(
        &mut self,
        scope: Option<&str>,
        name: &str,
        kind: CallKind,
    ) -> FrameToken {
        if !self.accepts(name, kind) {
            return FrameToken::NOOP;
        }
        if self.filter.excludes_qualified(scope, name) {
            trace!("elide {:?}::{}", scope, name);
            return FrameToken::NOOP;
        }
        self.push_frame(&qualify(scope, name))
    }

    /// Exit hook
    ///
    /// No-op for no-op tokens and for tokens of a session that already
    /// ended. Otherwise the token must name the top frame.
    ///
    /// # Errors
    /// * `ProfilerError::StackCorruption` - the token is not the top frame;
    ///   later hooks become no-ops and `disable()` reports the same error
    pub fn on_exit(&mut self, token: FrameToken) -> Result<(), ProfilerError> {
        let seq = match token.seq {
            Some(seq) => seq,
            None => return Ok(()),
        };
        if !self.is_active() || token.session != self.session_id {
            debug!("Ignoring exit for frame #{} of an ended session", seq);
            return Ok(());
        }
        if self.corruption.is_some() {
            return Ok(());
        }

        let top = self.stack.top().map(|frame| (frame.seq, frame.function));
        match top {
            Some((top_seq, _)) if top_seq == seq => {
                let exit = self.snapshot();
                self.close_top(exit)
            }
            Some((top_seq, function)) => {
                let err = ProfilerError::StackCorruption {
                    expected: top_seq,
                    found: seq,
                    function: self.names.name(function).to_string(),
                };
                error!("{}", err);
                self.corruption = Some(err.clone());
                Err(err)
            }
            None => {
                // The root frame is only popped by disable(), so an empty
                // stack while active cannot match any token.
                let err = ProfilerError::StackCorruption {
                    expected: 0,
                    found: seq,
                    function: String::new(),
                };
                error!("{}", err);
                self.corruption = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Open a frame that is closed when the returned guard drops
    pub fn enter_scope(&mut self, name: &str) -> ScopedCall<'_> {
        self.enter_scope_kind(name, CallKind::User)
    }

    pub fn enter_scope_kind(&mut self, name: &str, kind: CallKind) -> ScopedCall<'_> {
        let token = self.on_enter_kind(name, kind);
        ScopedCall {
            session: self,
            token,
        }
    }

    /// Run `f` inside a frame for `name`
    ///
    /// The frame is closed on every path out of `f`, unwinding included.
    pub fn call<R>(&mut self, name: &str, f: impl FnOnce(&mut ProfilerSession) -> R) -> R {
        let mut scope = self.enter_scope(name);
        f(&mut scope)
    }

    /// Session and flag checks shared by the entry hooks
    fn accepts(&self, name: &str, kind: CallKind) -> bool {
        if !self.is_active() || self.corruption.is_some() {
            return false;
        }
        if kind == CallKind::Builtin && self.reader.flags().skips_builtins() {
            trace!("elide builtin {}", name);
            return false;
        }
        true
    }

    fn push_frame(&mut self, name: &str) -> FrameToken {
        let function = match self.names.lookup(name) {
            Some(function) => function,
            None => {
                if let Err(err) = FrameLabel::check_function(name) {
                    if !self.rejected.contains(name) {
                        warn!("Not profiling: {}", err);
                        self.rejected.insert(name.to_string());
                    }
                    return FrameToken::NOOP;
                }
                self.names.intern(name)
            }
        };

        let entry = self.snapshot();
        let seq = self.stack.push(function, entry);
        FrameToken {
            session: self.session_id,
            seq: Some(seq),
        }
    }

    fn snapshot(&mut self) -> MetricSnapshot {
        self.reader.snapshot(&mut *self.source)
    }

    /// Pop the top frame and charge its deltas to the edge from its parent
    fn close_top(&mut self, exit: MetricSnapshot) -> Result<(), ProfilerError> {
        let frame = match self.stack.pop() {
            Some(frame) => frame,
            None => return Ok(()),
        };
        let deltas = MetricDeltas::between(&frame.entry, &exit);
        let parent = self.stack.top().map(|parent| EdgeNode {
            function: parent.function,
            marker: parent.marker(),
        });

        self.edges
            .record(parent, frame.function, frame.marker(), &deltas)?;
        Ok(())
    }
}

/// Frame guard borrowing the session
///
/// Dereferences to the session, so nested calls go through the guard:
///
/// ```ignore
/// let mut foo = session.enter_scope("foo");
/// let bar = foo.enter_scope("bar");
/// drop(bar);
/// ```
pub struct ScopedCall<'a> {
    session: &'a mut ProfilerSession,
    token: FrameToken,
}

impl ScopedCall<'_> {
    pub fn token(&self) -> FrameToken {
        self.token
    }
}

impl Deref for ScopedCall<'_> {
    type Target = ProfilerSession;

    fn deref(&self) -> &ProfilerSession {
        self.session
    }
}

impl DerefMut for ScopedCall<'_> {
    fn deref_mut(&mut self) -> &mut ProfilerSession {
        self.session
    }
}

impl Drop for ScopedCall<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.session.on_exit(self.token) {
            error!("Scoped exit failed: {}", err);
        }
    }
}
