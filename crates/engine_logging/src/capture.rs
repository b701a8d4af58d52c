//! Record capture for tests that assert on emitted log lines.
//!
//! Capture is per thread: only records logged on the thread that called
//! [`start`] are collected, so tests running in parallel do not see each
//! other's output. The capture logger is installed as the global logger on
//! first use; if another logger is already installed nothing is captured.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::rc::Rc;

use log::{Level, LevelFilter, Log, Metadata, Record};

thread_local! {
    static BUFFER: RefCell<Option<Vec<CapturedRecord>>> = const { RefCell::new(None) };
}

/// A single captured log record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedRecord {
    /// Severity of the record.
    pub level: Level,
    /// Fully formatted message.
    pub message: String,
}

struct CaptureLogger;

static LOGGER: CaptureLogger = CaptureLogger;

impl Log for CaptureLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        BUFFER.with(|buffer| {
            if let Some(records) = buffer.borrow_mut().as_mut() {
                records.push(CapturedRecord {
                    level: record.level(),
                    message: record.args().to_string(),
                });
            }
        });
    }

    fn flush(&self) {}
}

/// Starts capturing records logged on the current thread.
pub fn start() -> CaptureGuard {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(LevelFilter::Trace);
    }
    BUFFER.with(|buffer| *buffer.borrow_mut() = Some(Vec::new()));
    CaptureGuard {
        _not_send: PhantomData,
    }
}

/// Active capture on the current thread; capture stops when dropped.
pub struct CaptureGuard {
    _not_send: PhantomData<Rc<()>>,
}

impl CaptureGuard {
    /// All records captured so far.
    pub fn records(&self) -> Vec<CapturedRecord> {
        BUFFER.with(|buffer| buffer.borrow().clone().unwrap_or_default())
    }

    /// Messages of the warn-level records captured so far.
    pub fn warnings(&self) -> Vec<String> {
        self.records()
            .into_iter()
            .filter(|record| record.level == Level::Warn)
            .map(|record| record.message)
            .collect()
    }
}

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        BUFFER.with(|buffer| *buffer.borrow_mut() = None);
    }
}
