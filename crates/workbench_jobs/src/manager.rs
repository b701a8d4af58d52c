use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use engine_logging::{engine_debug, engine_error, engine_info, engine_warn};
use tokio::runtime::{Handle, Runtime};

use crate::job::StatusCell;
use crate::{JobError, JobHandle, JobId, JobMonitor, JobStatus};

#[derive(Debug, Clone)]
pub struct JobManagerConfig {
    /// Prefix of worker thread names.
    pub thread_name: String,
    /// Upper bound on concurrently running jobs; threads beyond it queue.
    pub max_threads: usize,
    /// How long an idle worker thread is kept for reuse.
    pub keep_alive: Duration,
    /// How long `shutdown` waits for running jobs.
    pub shutdown_timeout: Duration,
}

impl Default for JobManagerConfig {
    fn default() -> Self {
        Self {
            thread_name: "WorkbenchJobs".to_string(),
            max_threads: 512,
            keep_alive: Duration::from_secs(10),
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

/// Shared scheduler for background jobs.
///
/// Jobs run on the blocking pool of a private tokio runtime, which behaves as
/// a cached thread pool: threads are spawned on demand and idle ones are
/// reused until `keep_alive` expires. The same runtime drives async I/O for
/// jobs that need it. Clones share the pool; it is shut down by
/// [`JobManager::shutdown`] or when the last clone is dropped.
///
/// Shutdown drops jobs that are still queued for a free thread. They never
/// run, their status stays `Scheduled`, and a view waiting on one of them
/// gets no completion.
#[derive(Clone)]
pub struct JobManager {
    inner: Arc<Inner>,
}

struct Inner {
    handle: Handle,
    runtime: Mutex<Option<Runtime>>,
    shut_down: AtomicBool,
    next_id: AtomicU64,
    shutdown_timeout: Duration,
}

impl JobManager {
    pub fn new(config: JobManagerConfig) -> Result<Self, JobError> {
        let thread_counter = AtomicUsize::new(1);
        let thread_name = config.thread_name.clone();
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(config.max_threads.max(1))
            .thread_keep_alive(config.keep_alive)
            .thread_name_fn(move || {
                let n = thread_counter.fetch_add(1, Ordering::Relaxed);
                format!("{thread_name}-{n}")
            })
            .enable_all()
            .build()?;

        engine_info!(
            "Job manager '{}' started (max_threads={})",
            config.thread_name,
            config.max_threads
        );

        Ok(Self {
            inner: Arc::new(Inner {
                handle: runtime.handle().clone(),
                runtime: Mutex::new(Some(runtime)),
                shut_down: AtomicBool::new(false),
                next_id: AtomicU64::new(1),
                shutdown_timeout: config.shutdown_timeout,
            }),
        })
    }

    /// Runs `task` on a pool thread.
    ///
    /// The task receives the job's monitor. An `Err` result is logged as a
    /// warning and a panic as an error; neither takes down the worker.
    pub fn schedule<F>(&self, name: impl Into<String>, task: F) -> Result<JobHandle, JobError>
    where
        F: FnOnce(&JobMonitor) -> Result<(), JobError> + Send + 'static,
    {
        if self.inner.shut_down.load(Ordering::Acquire) {
            return Err(JobError::ShutDown);
        }

        let id = JobId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let name: Arc<str> = Arc::from(name.into());
        let monitor = JobMonitor::new();
        let status = StatusCell::new();
        let handle = JobHandle::new(id, name.clone(), monitor.clone(), status.clone());

        engine_debug!("Scheduling job '{}' ({})", name, id);
        // Detached: completion is observed through the status cell.
        drop(
            self.inner
                .handle
                .spawn_blocking(move || run_job(id, &name, &monitor, &status, task)),
        );

        Ok(handle)
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.shut_down.load(Ordering::Acquire)
    }

    /// Stops accepting jobs and waits up to the configured timeout for running ones.
    pub fn shutdown(&self) {
        self.inner.shutdown();
    }
}

impl Inner {
    fn shutdown(&self) {
        self.shut_down.store(true, Ordering::Release);
        let runtime = self.runtime.lock().ok().and_then(|mut guard| guard.take());
        if let Some(runtime) = runtime {
            engine_info!("Job manager shutting down");
            // Blocking on shutdown is not allowed from inside a runtime.
            if Handle::try_current().is_ok() {
                runtime.shutdown_background();
            } else {
                runtime.shutdown_timeout(self.shutdown_timeout);
            }
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_job<F>(id: JobId, name: &str, monitor: &JobMonitor, status: &StatusCell, task: F)
where
    F: FnOnce(&JobMonitor) -> Result<(), JobError>,
{
    let _context = engine_logging::enter_job(name, id.get());
    status.set(JobStatus::Running);

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| task(monitor)));
    let final_status = match outcome {
        Ok(Ok(())) => JobStatus::Completed,
        Ok(Err(JobError::Cancelled)) => {
            engine_debug!("Job cancelled");
            JobStatus::Cancelled
        }
        Ok(Err(err)) => {
            engine_warn!("Job '{}' failed: {}", name, err);
            JobStatus::Failed
        }
        Err(payload) => {
            engine_error!("Job '{}' panicked: {}", name, panic_message(payload.as_ref()));
            JobStatus::Failed
        }
    };
    status.set(final_status);
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
