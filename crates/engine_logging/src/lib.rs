#![deny(missing_docs)]
//! Shared logging utilities for the workbench crates.
//!
//! This crate provides the `engine_*` logging macros used across the codebase,
//! a per-thread job context that tags log lines emitted from inside a
//! background job, and helpers for installing a logger in tests.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::rc::Rc;

pub mod capture;

#[doc(hidden)]
pub use log;

thread_local! {
    /// Label of the job currently running on this thread, if any.
    static JOB_CONTEXT: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Marks the current thread as running the job `name` with the given id.
///
/// Log lines emitted through the `engine_*` macros are prefixed with
/// `[name#id]` until the returned guard is dropped.
pub fn enter_job(name: &str, id: u64) -> JobContextGuard {
    let previous = JOB_CONTEXT.with(|ctx| ctx.replace(Some(format!("{name}#{id}"))));
    JobContextGuard {
        previous,
        _not_send: PhantomData,
    }
}

/// Returns the label of the job running on this thread.
pub fn current_job() -> Option<String> {
    JOB_CONTEXT.with(|ctx| ctx.borrow().clone())
}

/// Restores the previous job context when dropped.
pub struct JobContextGuard {
    previous: Option<String>,
    _not_send: PhantomData<Rc<()>>,
}

impl Drop for JobContextGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        JOB_CONTEXT.with(|ctx| *ctx.borrow_mut() = previous);
    }
}

/// Prefix for log lines emitted on this thread; empty outside a job.
#[doc(hidden)]
pub fn job_prefix() -> String {
    JOB_CONTEXT.with(|ctx| match ctx.borrow().as_deref() {
        Some(label) => format!("[{label}] "),
        None => String::new(),
    })
}

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! engine_trace {
    ($($arg:tt)*) => {{
        $crate::log::trace!("{}{}", $crate::job_prefix(), format_args!($($arg)*));
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! engine_debug {
    ($($arg:tt)*) => {{
        $crate::log::debug!("{}{}", $crate::job_prefix(), format_args!($($arg)*));
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! engine_info {
    ($($arg:tt)*) => {{
        $crate::log::info!("{}{}", $crate::job_prefix(), format_args!($($arg)*));
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! engine_warn {
    ($($arg:tt)*) => {{
        $crate::log::warn!("{}{}", $crate::job_prefix(), format_args!($($arg)*));
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! engine_error {
    ($($arg:tt)*) => {{
        $crate::log::error!("{}{}", $crate::job_prefix(), format_args!($($arg)*));
    }};
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}
