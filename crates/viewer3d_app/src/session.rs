//! What the viewer remembers about the resources it has shown.

use serde::{Deserialize, Serialize};

pub const HISTORY_LIMIT: usize = 20;
const TITLE: &str = "3D Viewer";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub resource: String,
    pub loaded_utc: String,
}

/// Window title and navigation history, updated from the view's input callback.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Session {
    resource: Option<String>,
    history: Vec<HistoryEntry>,
}

impl Session {
    pub fn restore(resource: Option<String>, history: Vec<HistoryEntry>) -> Self {
        let mut history = history;
        history.truncate(HISTORY_LIMIT);
        Self { resource, history }
    }

    /// Records the resource the view now shows; `None` after a clear.
    pub fn set_input(&mut self, resource: Option<&str>, now_utc: String) {
        self.resource = resource.map(ToOwned::to_owned);
        if let Some(resource) = resource {
            self.history.retain(|entry| entry.resource != resource);
            self.history.insert(
                0,
                HistoryEntry {
                    resource: resource.to_owned(),
                    loaded_utc: now_utc,
                },
            );
            self.history.truncate(HISTORY_LIMIT);
        }
    }

    pub fn resource(&self) -> Option<&str> {
        self.resource.as_deref()
    }

    /// Most recent first.
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn title(&self) -> String {
        match &self.resource {
            Some(resource) => format!("{TITLE} - {resource}"),
            None => TITLE.to_string(),
        }
    }
}
