use crate::{Indicator, LoadPhase};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ViewModel {
    pub phase: LoadPhase,
    pub indicator: Indicator,
    pub input_text: String,
    pub current_resource: Option<String>,
    pub has_structure: bool,
    pub in_flight: usize,
}
