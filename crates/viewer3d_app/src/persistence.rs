use std::fs;
use std::io::{self, Write};
use std::path::Path;

use engine_logging::{engine_error, engine_info, engine_warn};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::session::{HistoryEntry, Session};

pub const STATE_FILENAME: &str = ".viewer3d_state.ron";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PersistedState {
    last_resource: Option<String>,
    history: Vec<HistoryEntry>,
}

/// Restores the session saved in `dir`; problems are logged and yield an empty session.
pub fn load_session(dir: &Path) -> Session {
    let path = dir.join(STATE_FILENAME);
    let content = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Session::default();
        }
        Err(err) => {
            engine_warn!("Failed to read persisted state from {:?}: {}", path, err);
            return Session::default();
        }
    };

    let state: PersistedState = match ron::from_str(&content) {
        Ok(state) => state,
        Err(err) => {
            engine_warn!("Failed to parse persisted state from {:?}: {}", path, err);
            return Session::default();
        }
    };

    engine_info!("Loaded persisted viewer state from {:?}", path);
    Session::restore(state.last_resource, state.history)
}

pub fn save_session(dir: &Path, session: &Session) {
    let state = PersistedState {
        last_resource: session.resource().map(ToOwned::to_owned),
        history: session.history().to_vec(),
    };

    let pretty = ron::ser::PrettyConfig::new();
    let content = match ron::ser::to_string_pretty(&state, pretty) {
        Ok(text) => text,
        Err(err) => {
            engine_error!("Failed to serialize viewer state: {}", err);
            return;
        }
    };

    if let Err(err) = write_atomically(dir, STATE_FILENAME, &content) {
        engine_error!("Failed to write viewer state to {:?}: {}", dir, err);
    }
}

/// Writes `{dir}/{filename}` through a temp file so readers never see a partial file.
fn write_atomically(dir: &Path, filename: &str, content: &str) -> io::Result<()> {
    fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.flush()?;
    tmp.as_file_mut().sync_all()?;
    tmp.persist(dir.join(filename)).map_err(|e| e.error)?;
    Ok(())
}
