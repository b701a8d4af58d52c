//! Workbench core: pure view load state machine and view-model helpers.
mod effect;
mod msg;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use msg::Msg;
pub use state::{
    file_identifier, FailureStage, Indicator, LoadFailure, LoadId, LoadPhase, OverlapPolicy,
    ViewState,
};
pub use update::update;
pub use view_model::ViewModel;
