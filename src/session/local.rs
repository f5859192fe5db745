//! Per-thread session slot.
//!
//! Each thread owns one `ProfilerSession`, created lazily with system
//! metrics. Instrumented code marks its functions with `enter()` guards or
//! `profiled()` wrappers instead of threading a session reference through
//! every call.
//!
//! ```ignore
//! fn parse(input: &str) -> Ast {
//!     let _guard = hierprof::session::enter("parse");
//!     // ...
//! }
//! ```

use super::options::ProfilerOptions;
use super::profiler::{CallKind, FrameToken, ProfilerSession};
use crate::metrics::MetricFlags;
use crate::report::Report;
use crate::utils::error::{ProfilerError, UsageError};
use log::{error, warn};
use std::cell::RefCell;
use std::marker::PhantomData;

thread_local! {
    static SESSION: RefCell<ProfilerSession> = RefCell::new(ProfilerSession::new());
}

/// Replace this thread's session, returning the previous one
///
/// Used to plug a different metric source into the thread-local slot.
pub fn install(session: ProfilerSession) -> ProfilerSession {
    SESSION.with(|slot| slot.replace(session))
}

/// Run `f` with this thread's session
///
/// Hooks issued from inside `f` through the free functions of this module
/// are no-ops, since the session is already borrowed.
pub fn with_session<R>(f: impl FnOnce(&mut ProfilerSession) -> R) -> R {
    SESSION.with(|slot| f(&mut slot.borrow_mut()))
}

/// Enable this thread's session
pub fn enable(flags: MetricFlags, options: &ProfilerOptions) -> Result<(), UsageError> {
    with_session(|session| session.enable(flags, options))
}

/// Disable this thread's session and return its report
pub fn disable() -> Result<Report, ProfilerError> {
    with_session(ProfilerSession::disable)
}

pub fn is_active() -> bool {
    SESSION
        .try_with(|slot| slot.try_borrow().map(|s| s.is_active()).unwrap_or(false))
        .unwrap_or(false)
}

/// Open a frame on this thread's session, closed when the guard drops
pub fn enter(name: &str) -> CallGuard {
    enter_kind(name, CallKind::User)
}

/// Open a frame for a runtime-provided function
pub fn enter_builtin(name: &str) -> CallGuard {
    enter_kind(name, CallKind::Builtin)
}

/// Open a frame for method `name` of `scope`, recorded as `scope::name`
pub fn enter_method(scope: &str, name: &str) -> CallGuard {
    open(name, |session| {
        session.on_enter_qualified(Some(scope), name, CallKind::User)
    })
}

fn enter_kind(name: &str, kind: CallKind) -> CallGuard {
    open(name, |session| session.on_enter_kind(name, kind))
}

fn open(name: &str, hook: impl FnOnce(&mut ProfilerSession) -> FrameToken) -> CallGuard {
    let token = SESSION
        .try_with(|slot| match slot.try_borrow_mut() {
            Ok(mut session) => hook(&mut session),
            Err(_) => {
                warn!("Session busy; not instrumenting {}", name);
                FrameToken::NOOP
            }
        })
        .unwrap_or(FrameToken::NOOP);

    CallGuard {
        token,
        _not_send: PhantomData,
    }
}

/// Run `f` inside a frame for `name` on this thread's session
pub fn profiled<R>(name: &str, f: impl FnOnce() -> R) -> R {
    let _guard = enter(name);
    f()
}

/// Run `f` inside a frame for method `name` of `scope`
pub fn profiled_method<R>(scope: &str, name: &str, f: impl FnOnce() -> R) -> R {
    let _guard = enter_method(scope, name);
    f()
}

/// Guard closing a thread-local frame on drop
///
/// Tied to the thread that opened it.
#[must_use = "the frame closes as soon as the guard is dropped"]
pub struct CallGuard {
    token: FrameToken,
    _not_send: PhantomData<*const ()>,
}

impl CallGuard {
    pub fn token(&self) -> FrameToken {
        self.token
    }
}

impl Drop for CallGuard {
    fn drop(&mut self) {
        if self.token.is_noop() {
            return;
        }
        let token = self.token;
        let closed = SESSION.try_with(|slot| match slot.try_borrow_mut() {
            Ok(mut session) => session.on_exit(token),
            Err(_) => {
                warn!("Session busy; exit for frame {:?} dropped", token.seq());
                Ok(())
            }
        });
        if let Ok(Err(err)) = closed {
            error!("Guarded exit failed: {}", err);
        }
    }
}
