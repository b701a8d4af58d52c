use crate::{LoadFailure, LoadId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Run a background load of `resource`; its completion comes back as
    /// `Msg::LoadSucceeded` or `Msg::LoadFailed` carrying the same `load_id`.
    ScheduleLoad { load_id: LoadId, resource: String },
    /// Tell the outer context which resource the view now shows (`None` after clear).
    NotifyInput(Option<String>),
    /// Ask the still running loads to stop.
    CancelLoads(Vec<LoadId>),
    ReportFailure {
        load_id: LoadId,
        resource: String,
        failure: LoadFailure,
    },
    ReportInvalidInput { input: String, reason: String },
}
