use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use crate::view_model::ViewModel;
use crate::Effect;

pub type LoadId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadPhase {
    #[default]
    Idle,
    Loading,
    Ready,
    Error,
}

/// Visual state of the resource input control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Indicator {
    #[default]
    Normal,
    Error,
}

/// How completions of overlapping loads for the same view are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlapPolicy {
    /// Every load runs to completion and whichever result arrives last is shown.
    /// A load that completes after a clear still applies.
    #[default]
    LastCompletionWins,
    /// A newer request or a clear cancels earlier loads; their late results are dropped.
    LatestRequestWins,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    Open,
    Parse,
    Cancelled,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureStage::Open => write!(f, "open failed"),
            FailureStage::Parse => write!(f, "building structure failed"),
            FailureStage::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Summary of a failed load, as posted back to the owner thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadFailure {
    pub stage: FailureStage,
    pub message: String,
}

impl LoadFailure {
    pub fn new(stage: FailureStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }
}

impl fmt::Display for LoadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.stage, self.message)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewState<S> {
    phase: LoadPhase,
    indicator: Indicator,
    input_text: String,
    current_resource: Option<String>,
    structure: Option<S>,
    policy: OverlapPolicy,
    next_load_id: LoadId,
    in_flight: BTreeSet<LoadId>,
    latest_request: Option<LoadId>,
    dirty: bool,
}

impl<S> Default for ViewState<S> {
    fn default() -> Self {
        Self::with_policy(OverlapPolicy::default())
    }
}

impl<S> ViewState<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: OverlapPolicy) -> Self {
        Self {
            phase: LoadPhase::Idle,
            indicator: Indicator::Normal,
            input_text: String::new(),
            current_resource: None,
            structure: None,
            policy,
            next_load_id: 1,
            in_flight: BTreeSet::new(),
            latest_request: None,
            dirty: false,
        }
    }

    pub fn view(&self) -> ViewModel {
        ViewModel {
            phase: self.phase,
            indicator: self.indicator,
            input_text: self.input_text.clone(),
            current_resource: self.current_resource.clone(),
            has_structure: self.structure.is_some(),
            in_flight: self.in_flight.len(),
        }
    }

    pub fn phase(&self) -> LoadPhase {
        self.phase
    }

    pub fn indicator(&self) -> Indicator {
        self.indicator
    }

    pub fn input_text(&self) -> &str {
        &self.input_text
    }

    pub fn current_resource(&self) -> Option<&str> {
        self.current_resource.as_deref()
    }

    pub fn structure(&self) -> Option<&S> {
        self.structure.as_ref()
    }

    pub fn policy(&self) -> OverlapPolicy {
        self.policy
    }

    /// Loads scheduled whose completion has not been applied yet.
    pub fn in_flight(&self) -> impl Iterator<Item = LoadId> + '_ {
        self.in_flight.iter().copied()
    }

    pub fn is_loading(&self) -> bool {
        !self.in_flight.is_empty()
    }

    pub fn consume_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn set_input_text(&mut self, text: String) {
        if self.input_text != text {
            self.input_text = text;
            self.mark_dirty();
        }
    }

    pub(crate) fn set_invalid_input(&mut self) {
        self.indicator = Indicator::Error;
        self.mark_dirty();
    }

    /// Starts a load of `resource`. Empty identifiers are ignored.
    pub(crate) fn request_load(&mut self, resource: String) -> Vec<Effect> {
        if resource.is_empty() {
            return Vec::new();
        }

        let mut effects = Vec::with_capacity(2);
        if self.policy == OverlapPolicy::LatestRequestWins {
            let superseded = self.take_in_flight();
            if !superseded.is_empty() {
                effects.push(Effect::CancelLoads(superseded));
            }
        }

        let load_id = self.next_load_id;
        self.next_load_id += 1;
        self.in_flight.insert(load_id);
        self.latest_request = Some(load_id);
        self.phase = LoadPhase::Loading;
        self.mark_dirty();

        effects.push(Effect::ScheduleLoad { load_id, resource });
        effects
    }

    pub(crate) fn apply_success(
        &mut self,
        load_id: LoadId,
        resource: String,
        structure: Option<S>,
    ) -> Vec<Effect> {
        if !self.accepts_completion(load_id) {
            return Vec::new();
        }

        // An empty structure keeps whatever is already displayed.
        if let Some(structure) = structure {
            self.structure = Some(structure);
        }
        self.current_resource = Some(resource.clone());
        self.input_text = resource.clone();
        self.indicator = Indicator::Normal;
        self.phase = LoadPhase::Ready;
        self.mark_dirty();

        vec![Effect::NotifyInput(Some(resource))]
    }

    pub(crate) fn apply_failure(
        &mut self,
        load_id: LoadId,
        resource: String,
        failure: LoadFailure,
    ) -> Vec<Effect> {
        if !self.accepts_completion(load_id) {
            if failure.stage == FailureStage::Cancelled {
                return Vec::new();
            }
            return vec![Effect::ReportFailure {
                load_id,
                resource,
                failure,
            }];
        }

        self.indicator = Indicator::Error;
        self.phase = LoadPhase::Error;
        self.mark_dirty();

        vec![Effect::ReportFailure {
            load_id,
            resource,
            failure,
        }]
    }

    pub(crate) fn clear(&mut self) -> Vec<Effect> {
        let mut effects = Vec::with_capacity(2);
        if self.policy == OverlapPolicy::LatestRequestWins {
            let superseded = self.take_in_flight();
            if !superseded.is_empty() {
                effects.push(Effect::CancelLoads(superseded));
            }
            self.latest_request = None;
        }

        self.structure = None;
        self.input_text.clear();
        self.current_resource = None;
        self.indicator = Indicator::Normal;
        self.phase = LoadPhase::Idle;
        self.mark_dirty();

        effects.push(Effect::NotifyInput(None));
        effects
    }

    /// Retires `load_id` and reports whether its result may touch the view.
    fn accepts_completion(&mut self, load_id: LoadId) -> bool {
        let was_in_flight = self.in_flight.remove(&load_id);
        match self.policy {
            OverlapPolicy::LastCompletionWins => true,
            OverlapPolicy::LatestRequestWins => {
                was_in_flight && self.latest_request == Some(load_id)
            }
        }
    }

    fn take_in_flight(&mut self) -> Vec<LoadId> {
        std::mem::take(&mut self.in_flight).into_iter().collect()
    }
}

/// Converts a local file path into a `file:` URI string usable as a resource identifier.
pub fn file_identifier(path: &Path) -> Option<String> {
    let absolute = std::path::absolute(path).ok()?;
    url::Url::from_file_path(absolute).ok().map(String::from)
}
