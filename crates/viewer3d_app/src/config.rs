//! Viewer configuration read from `viewer3d.ron`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use workbench_core::OverlapPolicy;
use workbench_jobs::{BindingConfig, FetchSettings, JobManagerConfig};

pub const CONFIG_FILENAME: &str = "viewer3d.ron";
pub const CONFIG_ENV: &str = "VIEWER3D_CONFIG";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Overlap {
    #[default]
    LastCompletionWins,
    LatestRequestWins,
}

impl From<Overlap> for OverlapPolicy {
    fn from(overlap: Overlap) -> Self {
        match overlap {
            Overlap::LastCompletionWins => OverlapPolicy::LastCompletionWins,
            Overlap::LatestRequestWins => OverlapPolicy::LatestRequestWins,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LogDestination {
    /// Write to ./viewer3d.log in the current directory.
    #[default]
    File,
    /// Write to the terminal.
    Terminal,
    Both,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    pub job_threads: usize,
    pub job_keep_alive_secs: u64,
    pub overlap: Overlap,
    pub log_destination: LogDestination,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        let fetch = FetchSettings::default();
        let jobs = JobManagerConfig::default();
        Self {
            connect_timeout_secs: fetch.connect_timeout.as_secs(),
            request_timeout_secs: fetch.request_timeout.as_secs(),
            redirect_limit: fetch.redirect_limit,
            max_bytes: fetch.max_bytes,
            job_threads: jobs.max_threads,
            job_keep_alive_secs: jobs.keep_alive.as_secs(),
            overlap: Overlap::default(),
            log_destination: LogDestination::default(),
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            redirect_limit: self.redirect_limit,
            max_bytes: self.max_bytes,
            ..FetchSettings::default()
        }
    }

    pub fn job_manager_config(&self) -> JobManagerConfig {
        JobManagerConfig {
            max_threads: self.job_threads,
            keep_alive: Duration::from_secs(self.job_keep_alive_secs),
            ..JobManagerConfig::default()
        }
    }

    pub fn binding_config(&self) -> BindingConfig {
        BindingConfig {
            overlap: self.overlap.into(),
            ..BindingConfig::default()
        }
    }

    /// Unknown level names fall back to `Info`.
    pub fn level_filter(&self) -> LevelFilter {
        self.log_level.parse().unwrap_or(LevelFilter::Info)
    }
}

/// Path from `VIEWER3D_CONFIG`, or `viewer3d.ron` in the current directory.
pub fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILENAME))
}

/// Reads the config at `path`; a missing file yields the defaults.
pub fn load(path: &Path) -> anyhow::Result<AppConfig> {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(AppConfig::default()),
        Err(err) => {
            return Err(err).with_context(|| format!("reading config {}", path.display()))
        }
    };

    ron::from_str(&content).with_context(|| format!("parsing config {}", path.display()))
}
