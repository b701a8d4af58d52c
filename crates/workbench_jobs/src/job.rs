use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::JobError;

/// Process-unique identifier of a scheduled job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(pub(crate) u64);

impl JobId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Scheduled,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProgressSnapshot {
    pub task: String,
    pub done: u64,
    pub total: Option<u64>,
}

#[derive(Debug, Default)]
struct Progress {
    task: Mutex<String>,
    done: AtomicU64,
    // 0 means unknown.
    total: AtomicU64,
}

/// Cancellation and progress channel shared between a job and its observers.
///
/// Cancellation is cooperative: nothing interrupts a running job, the job
/// polls [`JobMonitor::is_cancelled`] at points where stopping is safe.
#[derive(Debug, Clone, Default)]
pub struct JobMonitor {
    token: CancellationToken,
    progress: Arc<Progress>,
}

impl JobMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn check_cancelled(&self) -> Result<(), JobError> {
        if self.is_cancelled() {
            Err(JobError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Starts a new unit of work, resetting the done counter.
    pub fn begin_task(&self, task: impl Into<String>, total: Option<u64>) {
        if let Ok(mut current) = self.progress.task.lock() {
            *current = task.into();
        }
        self.progress.done.store(0, Ordering::Relaxed);
        self.progress
            .total
            .store(total.unwrap_or(0), Ordering::Relaxed);
    }

    pub fn worked(&self, units: u64) {
        self.progress.done.fetch_add(units, Ordering::Relaxed);
    }

    pub fn progress(&self) -> ProgressSnapshot {
        let task = self
            .progress
            .task
            .lock()
            .map(|task| task.clone())
            .unwrap_or_default();
        let total = match self.progress.total.load(Ordering::Relaxed) {
            0 => None,
            total => Some(total),
        };
        ProgressSnapshot {
            task,
            done: self.progress.done.load(Ordering::Relaxed),
            total,
        }
    }
}

#[derive(Debug)]
pub(crate) struct StatusCell {
    status: Mutex<JobStatus>,
    changed: Condvar,
}

impl StatusCell {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            status: Mutex::new(JobStatus::Scheduled),
            changed: Condvar::new(),
        })
    }

    pub(crate) fn set(&self, status: JobStatus) {
        if let Ok(mut current) = self.status.lock() {
            *current = status;
        }
        self.changed.notify_all();
    }

    fn get(&self) -> JobStatus {
        self.status
            .lock()
            .map(|status| *status)
            .unwrap_or(JobStatus::Failed)
    }

    fn wait_terminal(&self, timeout: Duration) -> Option<JobStatus> {
        let deadline = Instant::now() + timeout;
        let mut status = self.status.lock().ok()?;
        while !status.is_terminal() {
            let remaining = deadline.checked_duration_since(Instant::now())?;
            let (next, result) = self.changed.wait_timeout(status, remaining).ok()?;
            status = next;
            if result.timed_out() && !status.is_terminal() {
                return None;
            }
        }
        Some(*status)
    }
}

/// Handle to a scheduled job for status queries and cancellation.
#[derive(Debug, Clone)]
pub struct JobHandle {
    id: JobId,
    name: Arc<str>,
    monitor: JobMonitor,
    status: Arc<StatusCell>,
}

impl JobHandle {
    pub(crate) fn new(
        id: JobId,
        name: Arc<str>,
        monitor: JobMonitor,
        status: Arc<StatusCell>,
    ) -> Self {
        Self {
            id,
            name,
            monitor,
            status,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn monitor(&self) -> &JobMonitor {
        &self.monitor
    }

    /// Requests cooperative cancellation.
    pub fn cancel(&self) {
        self.monitor.cancel();
    }

    pub fn status(&self) -> JobStatus {
        self.status.get()
    }

    pub fn is_finished(&self) -> bool {
        self.status().is_terminal()
    }

    /// Blocks until the job reaches a terminal status or `timeout` elapses.
    pub fn wait(&self, timeout: Duration) -> Option<JobStatus> {
        self.status.wait_terminal(timeout)
    }
}
