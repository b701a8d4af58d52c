use crate::{file_identifier, Effect, Msg, ViewState};

/// Pure update function: applies a message to state and returns any effects.
pub fn update<S>(mut state: ViewState<S>, msg: Msg<S>) -> (ViewState<S>, Vec<Effect>) {
    let effects = match msg {
        Msg::InputChanged(text) => {
            state.set_input_text(text);
            Vec::new()
        }
        Msg::InputSubmitted => {
            let resource = state.input_text().trim().to_owned();
            state.request_load(resource)
        }
        Msg::FileChosen(path) => match file_identifier(&path) {
            Some(resource) => state.request_load(resource),
            None => {
                state.set_invalid_input();
                vec![Effect::ReportInvalidInput {
                    input: path.display().to_string(),
                    reason: "path cannot be expressed as a file URI".to_string(),
                }]
            }
        },
        Msg::LoadRequested(resource) => state.request_load(resource),
        Msg::RefreshClicked => match state.current_resource().map(ToOwned::to_owned) {
            Some(resource) => state.request_load(resource),
            None => Vec::new(),
        },
        Msg::ClearClicked => state.clear(),
        Msg::LoadSucceeded {
            load_id,
            resource,
            structure,
        } => state.apply_success(load_id, resource, structure),
        Msg::LoadFailed {
            load_id,
            resource,
            failure,
        } => state.apply_failure(load_id, resource, failure),
    };

    (state, effects)
}
