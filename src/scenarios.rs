//! Built-in instrumented workloads.
//!
//! Each scenario is ordinary Rust code whose functions open frames on the
//! per-thread session through `profiled()`. The CLI runs them by name and
//! the integration tests check their canonical reports.

use crate::metrics::{MetricFlags, MetricSource};
use crate::report::Report;
use crate::session::{
    self, enter_builtin, profiled, profiled_method, ProfilerOptions, ProfilerSession,
};
use crate::utils::error::ProfilerError;
use log::{debug, info, warn};
use std::collections::HashSet;
use std::hint::black_box;

/// A named workload with the options it is profiled under
#[derive(Debug, Clone, Copy)]
pub struct Scenario {
    pub name: &'static str,
    pub description: &'static str,
    options: fn() -> ProfilerOptions,
    workload: fn(),
}

impl Scenario {
    pub fn options(&self) -> ProfilerOptions {
        (self.options)()
    }

    /// Run the workload on the current thread's session
    pub fn run(&self) {
        (self.workload)()
    }
}

/// Functions the `dispatch-ignored` scenario elides
pub const DISPATCH_TRAMPOLINES: &[&str] = &[
    "call_user_func",
    "call_user_func_array",
    "my_call_user_func_safe",
    "my_call_user_func_array_safe",
];

/// Allow-list of the `tracked` scenario
pub const TRACKED_FUNCTIONS: &[&str] = &["test", "bar"];

pub const SCENARIOS: &[Scenario] = &[
    Scenario {
        name: "recursion-direct",
        description: "foo(4) calling itself directly",
        options: ProfilerOptions::new,
        workload: recursion_direct,
    },
    Scenario {
        name: "recursion-indirect",
        description: "foo(4) recursing through a bar wrapper",
        options: ProfilerOptions::new,
        workload: recursion_indirect,
    },
    Scenario {
        name: "classes",
        description: "static methods, constructor, accessor and destructor of a type",
        options: ProfilerOptions::new,
        workload: classes,
    },
    Scenario {
        name: "include-once",
        description: "two guarded one-time units, each attempted three times",
        options: ProfilerOptions::new,
        workload: include_once,
    },
    Scenario {
        name: "dispatch-ignored",
        description: "dynamic dispatch through ignored trampolines",
        options: dispatch_options,
        workload: dispatch_ignored,
    },
    Scenario {
        name: "bar-loop",
        description: "foo() calling bar(x) for x in 0..5, bar recursing x times",
        options: ProfilerOptions::new,
        workload: bar_loop,
    },
    Scenario {
        name: "tracked",
        description: "bar-loop and test() with only test and bar tracked",
        options: tracked_options,
        workload: tracked,
    },
];

/// Look up a scenario by name
pub fn find(name: &str) -> Option<&'static Scenario> {
    SCENARIOS.iter().find(|scenario| scenario.name == name)
}

/// Profile `scenario` on this thread's session and return the report
///
/// A workload that panics leaves the session idle again, so the thread
/// can run the next scenario.
pub fn run_scenario(scenario: &Scenario, flags: MetricFlags) -> Result<Report, ProfilerError> {
    info!("Running scenario {}", scenario.name);
    session::enable(flags, &scenario.options())?;
    let _run = ActiveRun;
    scenario.run();
    session::disable()
}

/// Profile `scenario` against `source`
///
/// Swaps a fresh session reading from `source` into this thread's slot for
/// the duration of the run and restores the previous one afterwards.
pub fn run_with_source(
    scenario: &Scenario,
    flags: MetricFlags,
    source: impl MetricSource + 'static,
) -> Result<Report, ProfilerError> {
    let _restore = Restore(Some(session::install(ProfilerSession::with_source(source))));
    run_scenario(scenario, flags)
}

/// Disables this thread's session when a workload unwinds
struct ActiveRun;

impl Drop for ActiveRun {
    fn drop(&mut self) {
        if std::thread::panicking() && session::is_active() {
            warn!("Workload panicked; discarding its session");
            if let Err(err) = session::disable() {
                debug!("Discarded session ended with: {}", err);
            }
        }
    }
}

/// Puts the previous session back into this thread's slot
struct Restore(Option<ProfilerSession>);

impl Drop for Restore {
    fn drop(&mut self) {
        if let Some(previous) = self.0.take() {
            session::install(previous);
        }
    }
}

fn dispatch_options() -> ProfilerOptions {
    ProfilerOptions::new().ignore(DISPATCH_TRAMPOLINES.to_vec())
}

fn tracked_options() -> ProfilerOptions {
    ProfilerOptions::new().track(TRACKED_FUNCTIONS.to_vec())
}

// Recursion

fn foo_direct(depth: u32) {
    profiled("foo", || {
        if depth > 0 {
            foo_direct(depth - 1);
        }
    })
}

fn recursion_direct() {
    foo_direct(4);
}

fn foo_indirect(depth: u32) {
    profiled("foo", || {
        if depth > 0 {
            bar_indirect(depth - 1);
        }
    })
}

fn bar_indirect(depth: u32) {
    profiled("bar", || foo_indirect(depth))
}

fn recursion_indirect() {
    foo_indirect(4);
}

// Methods

const CLASS: &str = "C";

struct C {
    attr: String,
}

impl C {
    fn outer_static() -> usize {
        profiled_method(CLASS, "outer_static", || C::inner_static() + 1)
    }

    fn inner_static() -> usize {
        profiled_method(CLASS, "inner_static", || black_box(41))
    }

    fn new(attr: &str) -> C {
        profiled_method(CLASS, "new", || C {
            attr: attr.to_string(),
        })
    }

    fn get_attr(&self) -> &str {
        profiled_method(CLASS, "get_attr", || self.attr.as_str())
    }
}

impl Drop for C {
    fn drop(&mut self) {
        profiled_method(CLASS, "drop", || {
            black_box(&self.attr);
        })
    }
}

fn classes() {
    black_box(C::outer_static());

    let object = C::new("test");
    black_box(object.get_attr().len());
    drop(object);
}

// One-time inclusion

/// Units already loaded; later attempts return without running the unit
#[derive(Debug, Default)]
struct OnceUnits {
    loaded: HashSet<&'static str>,
}

impl OnceUnits {
    /// Run `unit` under a `run_init::<name>` frame unless it already ran
    fn load(&mut self, name: &'static str, unit: impl FnOnce()) -> bool {
        if !self.loaded.insert(name) {
            debug!("Unit {} already loaded", name);
            return false;
        }
        profiled(&format!("run_init::{}", name), unit);
        true
    }
}

fn included_helper() -> usize {
    profiled("included_helper", || black_box(1))
}

fn include_once() {
    let mut units = OnceUnits::default();
    for _ in 0..3 {
        units.load("include_once_unit", || {
            black_box(included_helper());
        });
    }
    for _ in 0..3 {
        units.load("require_once_unit", || {
            black_box(included_helper());
        });
    }
}

// Dynamic dispatch

fn bar() -> usize {
    profiled("bar", || 1)
}

fn strlen(text: &str) -> usize {
    let _guard = enter_builtin("strlen");
    text.len()
}

fn foo(x: &str) -> usize {
    profiled("foo", || {
        let sum: usize = (0..2).map(|_| bar()).sum();
        black_box(sum);
        strlen(&format!("hello: {}", x))
    })
}

fn foo_array(args: &[&str]) -> usize {
    profiled("foo_array", || {
        let sum: usize = args.iter().map(|_| bar()).sum();
        black_box(sum);
        strlen(&format!("hello: {}", args.join(" ")))
    })
}

fn call_user_func(function: fn(&str) -> usize, arg: &str) -> usize {
    profiled("call_user_func", || function(arg))
}

fn call_user_func_array(function: fn(&[&str]) -> usize, args: &[&str]) -> usize {
    profiled("call_user_func_array", || function(args))
}

fn my_call_user_func_safe(function: fn(&str) -> usize, arg: &str) -> usize {
    profiled("my_call_user_func_safe", || call_user_func(function, arg))
}

fn my_call_user_func_array_safe(function: fn(&[&str]) -> usize, args: &[&str]) -> usize {
    profiled("my_call_user_func_array_safe", || {
        call_user_func_array(function, args)
    })
}

fn dispatch_ignored() {
    profiled("test_call_user_func", || call_user_func(foo, "user_func test"));
    profiled("test_call_user_func_array", || {
        call_user_func_array(foo_array, &["user_func_array", "test"])
    });
    profiled("test_my_call_user_func_safe", || {
        my_call_user_func_safe(foo, "my_user_func_safe test")
    });
    profiled("test_my_call_user_func_array_safe", || {
        my_call_user_func_array_safe(foo_array, &["my_user_func_array_safe", "test"])
    });
}

// Loop over a recursive function

fn bar_recursive(x: u32) {
    profiled("bar", || {
        if x > 0 {
            bar_recursive(x - 1);
        }
    })
}

fn foo_loop() {
    profiled("foo", || {
        for x in 0..5 {
            bar_recursive(x);
            black_box(strlen("abc"));
        }
    })
}

fn bar_loop() {
    foo_loop();
}

fn test_fn() {
    profiled("test", || bar_recursive(1))
}

fn tracked() {
    foo_loop();
    test_fn();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::ManualMetrics;

    #[test]
    fn test_find() {
        assert!(find("bar-loop").is_some());
        assert!(find("nope").is_none());

        let names: HashSet<&str> = SCENARIOS.iter().map(|s| s.name).collect();
        assert_eq!(names.len(), SCENARIOS.len());
    }

    #[test]
    fn test_once_units() {
        let mut units = OnceUnits::default();
        assert!(units.load("a", || ()));
        assert!(!units.load("a", || ()));
        assert!(units.load("b", || ()));
    }

    #[test]
    fn test_run_with_source_restores_slot() {
        let scenario = find("recursion-direct").unwrap();
        let report = run_with_source(scenario, MetricFlags::NONE, ManualMetrics::wall_ticks(1)).unwrap();
        assert_eq!(report.activations("foo"), 5);
        assert!(!session::is_active());
    }

    fn panicking_workload() {
        profiled("doomed", || panic!("workload failed"));
    }

    #[test]
    fn test_panicking_workload_leaves_session_idle() {
        let doomed = Scenario {
            name: "doomed",
            description: "panics mid-call",
            options: ProfilerOptions::new,
            workload: panicking_workload,
        };

        let result = std::panic::catch_unwind(|| run_scenario(&doomed, MetricFlags::NONE));
        assert!(result.is_err());
        assert!(!session::is_active());

        let report = run_scenario(find("recursion-direct").unwrap(), MetricFlags::NONE).unwrap();
        assert_eq!(report.activations("foo"), 5);
    }

    #[test]
    fn test_run_with_source_restores_slot_on_panic() {
        let doomed = Scenario {
            name: "doomed",
            description: "panics mid-call",
            options: ProfilerOptions::new,
            workload: panicking_workload,
        };
        let quiet = Scenario {
            name: "quiet",
            description: "no calls",
            options: ProfilerOptions::new,
            workload: || (),
        };
        session::install(ProfilerSession::with_source(ManualMetrics::wall_ticks(5)));

        let result = std::panic::catch_unwind(|| {
            run_with_source(&doomed, MetricFlags::NONE, ManualMetrics::wall_ticks(1))
        });
        assert!(result.is_err());
        assert!(!session::is_active());

        let report = run_scenario(&quiet, MetricFlags::NONE).unwrap();
        assert_eq!(report.root().unwrap().wall, 5);
    }
}
