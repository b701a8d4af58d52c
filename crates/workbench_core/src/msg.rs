use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub enum Msg<S> {
    /// User edited the resource text field.
    InputChanged(String),
    /// User pressed Enter in the resource text field.
    InputSubmitted,
    /// User picked a file in the file chooser.
    FileChosen(PathBuf),
    /// Load requested programmatically, e.g. the initial resource of the view.
    LoadRequested(String),
    /// User clicked Refresh.
    RefreshClicked,
    /// User clicked Clear.
    ClearClicked,
    /// Background load finished with a (possibly empty) structure.
    LoadSucceeded {
        load_id: crate::LoadId,
        resource: String,
        structure: Option<S>,
    },
    /// Background load failed to open or parse the resource.
    LoadFailed {
        load_id: crate::LoadId,
        resource: String,
        failure: crate::LoadFailure,
    },
}
