//! Session control surface.
//!
//! - `ProfilerSession`: an explicit session object with its hooks
//! - `ProfilerOptions`: ignored/tracked function configuration
//! - per-thread slot with RAII call guards for instrumented code

pub mod local;
pub mod options;
pub mod profiler;

pub use local::{
    disable, enable, enter, enter_builtin, enter_method, install, is_active, profiled,
    profiled_method, with_session, CallGuard,
};
pub use options::ProfilerOptions;
pub use profiler::{CallKind, FrameToken, ProfilerSession, ScopedCall, SessionState};
