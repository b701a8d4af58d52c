use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use engine_logging::{engine_debug, engine_warn};
use workbench_core::{
    update, Effect, FailureStage, LoadFailure, LoadId, Msg, OverlapPolicy, ViewModel, ViewState,
};

use crate::mailbox::{owner_channel, Mailbox, Poster};
use crate::{
    JobError, JobHandle, JobManager, JobMonitor, LoadError, ResourceLoader, StructureBuilder,
};

pub const DEFAULT_JOB_NAME: &str = "Read 3d viewer resource";

#[derive(Debug, Clone)]
pub struct BindingConfig {
    /// Name given to every load job scheduled by the view.
    pub job_name: String,
    pub overlap: OverlapPolicy,
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            job_name: DEFAULT_JOB_NAME.to_string(),
            overlap: OverlapPolicy::default(),
        }
    }
}

type InputCallback = Box<dyn FnMut(Option<&str>)>;

/// Drives one view's [`ViewState`] from its owner thread.
///
/// Loads run as jobs on the shared [`JobManager`]; each job posts exactly one
/// completion message back through the owner mailbox, and that message is
/// only applied when the owner calls [`ViewBinding::process_pending`] (or one
/// of the waiting variants). The binding is not `Send`, so every state
/// mutation happens on the thread that created it.
pub struct ViewBinding<S: Send + 'static> {
    state: ViewState<S>,
    jobs: JobManager,
    loader: Arc<dyn ResourceLoader>,
    builder: Arc<dyn StructureBuilder<Structure = S>>,
    job_name: String,
    poster: Poster<Msg<S>>,
    mailbox: Mailbox<Msg<S>>,
    running: HashMap<LoadId, JobHandle>,
    set_input: Option<InputCallback>,
}

impl<S: Send + 'static> ViewBinding<S> {
    pub fn new(
        config: BindingConfig,
        jobs: JobManager,
        loader: Arc<dyn ResourceLoader>,
        builder: Arc<dyn StructureBuilder<Structure = S>>,
    ) -> Self {
        let (poster, mailbox) = owner_channel();
        Self {
            state: ViewState::with_policy(config.overlap),
            jobs,
            loader,
            builder,
            job_name: config.job_name,
            poster,
            mailbox,
            running: HashMap::new(),
            set_input: None,
        }
    }

    /// Registers the consumer told about the resource the view shows.
    ///
    /// Called with the identifier after each successful load and with
    /// `None` after a clear; never called for failures.
    pub fn with_set_input(mut self, set_input: impl FnMut(Option<&str>) + 'static) -> Self {
        self.set_input = Some(Box::new(set_input));
        self
    }

    /// Handle for other threads to feed messages into this view.
    pub fn poster(&self) -> Poster<Msg<S>> {
        self.poster.clone()
    }

    pub fn state(&self) -> &ViewState<S> {
        &self.state
    }

    pub fn view(&self) -> ViewModel {
        self.state.view()
    }

    pub fn current_resource(&self) -> Option<&str> {
        self.state.current_resource()
    }

    pub fn structure(&self) -> Option<&S> {
        self.state.structure()
    }

    pub fn consume_dirty(&mut self) -> bool {
        self.state.consume_dirty()
    }

    pub fn load(&mut self, resource: impl Into<String>) {
        self.dispatch(Msg::LoadRequested(resource.into()));
    }

    /// Equivalent of typing `text` into the input field and pressing Enter.
    pub fn submit_input(&mut self, text: impl Into<String>) {
        self.dispatch(Msg::InputChanged(text.into()));
        self.dispatch(Msg::InputSubmitted);
    }

    pub fn choose_file(&mut self, path: impl Into<PathBuf>) {
        self.dispatch(Msg::FileChosen(path.into()));
    }

    pub fn refresh(&mut self) {
        self.dispatch(Msg::RefreshClicked);
    }

    pub fn clear(&mut self) {
        self.dispatch(Msg::ClearClicked);
    }

    pub fn dispatch(&mut self, msg: Msg<S>) {
        if let Msg::LoadSucceeded { load_id, .. } | Msg::LoadFailed { load_id, .. } = &msg {
            self.running.remove(load_id);
        }

        let state = std::mem::take(&mut self.state);
        let (state, effects) = update(state, msg);
        self.state = state;

        for effect in effects {
            self.run_effect(effect);
        }
    }

    /// Applies every message already queued for the owner.
    pub fn process_pending(&mut self) -> usize {
        let inbox = self.mailbox.drain();
        let count = inbox.len();
        for msg in inbox {
            self.dispatch(msg);
        }
        count
    }

    /// Waits up to `timeout` for one message, then applies it and anything queued behind it.
    pub fn wait_for_message(&mut self, timeout: Duration) -> usize {
        match self.mailbox.recv_timeout(timeout) {
            Some(msg) => {
                self.dispatch(msg);
                1 + self.process_pending()
            }
            None => 0,
        }
    }

    /// Pumps messages until no load is in flight. Returns false on timeout.
    pub fn wait_until_settled(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.state.is_loading() {
            let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
                return false;
            };
            self.wait_for_message(remaining);
        }
        true
    }

    fn run_effect(&mut self, effect: Effect) {
        match effect {
            Effect::ScheduleLoad { load_id, resource } => self.schedule_load(load_id, resource),
            Effect::NotifyInput(resource) => {
                if let Some(set_input) = self.set_input.as_mut() {
                    set_input(resource.as_deref());
                }
            }
            Effect::CancelLoads(load_ids) => {
                for load_id in load_ids {
                    if let Some(handle) = self.running.remove(&load_id) {
                        engine_debug!("Cancelling superseded load {} ({})", load_id, handle.id());
                        handle.cancel();
                    }
                }
            }
            Effect::ReportFailure {
                load_id,
                resource,
                failure,
            } => {
                engine_warn!(
                    "Loading resource '{}' failed (load {}): {}",
                    resource,
                    load_id,
                    failure
                );
            }
            Effect::ReportInvalidInput { input, reason } => {
                engine_warn!("Cannot load '{}': {}", input, reason);
            }
        }
    }

    fn schedule_load(&mut self, load_id: LoadId, resource: String) {
        let loader = Arc::clone(&self.loader);
        let builder = Arc::clone(&self.builder);
        let poster = self.poster.clone();
        let job_resource = resource.clone();

        let scheduled = self.jobs.schedule(self.job_name.clone(), move |monitor| {
            let outcome = load_structure(loader.as_ref(), builder.as_ref(), &job_resource, monitor);
            let msg = match outcome {
                Ok(structure) => Msg::LoadSucceeded {
                    load_id,
                    resource: job_resource,
                    structure,
                },
                Err(err) => Msg::LoadFailed {
                    load_id,
                    resource: job_resource,
                    failure: LoadFailure::from(err),
                },
            };
            let cancelled = matches!(
                &msg,
                Msg::LoadFailed { failure, .. } if failure.stage == FailureStage::Cancelled
            );
            poster.post(msg);
            if cancelled {
                Err(JobError::Cancelled)
            } else {
                Ok(())
            }
        });

        match scheduled {
            Ok(handle) => {
                engine_debug!("Load {} of '{}' runs as {}", load_id, resource, handle.id());
                self.running.insert(load_id, handle);
            }
            Err(err) => {
                // Still complete the load so the view leaves the loading phase.
                self.poster.post(Msg::LoadFailed {
                    load_id,
                    resource,
                    failure: LoadFailure::new(FailureStage::Cancelled, err.to_string()),
                });
            }
        }
    }
}

/// Opens `resource` and builds its structure. The stream is closed on every path.
fn load_structure<S: Send + 'static>(
    loader: &dyn ResourceLoader,
    builder: &dyn StructureBuilder<Structure = S>,
    resource: &str,
    monitor: &JobMonitor,
) -> Result<Option<S>, LoadError> {
    if monitor.is_cancelled() {
        return Err(LoadError::Cancelled);
    }

    engine_debug!("Opening resource '{}'", resource);
    let mut stream = loader.open(resource, monitor)?;
    if monitor.is_cancelled() {
        return Err(LoadError::Cancelled);
    }

    monitor.begin_task(format!("Building structure from {resource}"), None);
    let structure = builder.build(&mut stream, monitor)?;
    Ok(structure)
}
