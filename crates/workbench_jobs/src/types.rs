use std::fmt;
use std::io;

use thiserror::Error;
use workbench_core::{FailureStage, LoadFailure};

#[derive(Debug, Error)]
pub enum JobError {
    #[error("job cancelled")]
    Cancelled,
    #[error("job failed: {0}")]
    Failed(String),
    #[error("job manager is shut down")]
    ShutDown,
    #[error("failed to start job runtime: {0}")]
    Runtime(#[from] io::Error),
}

/// Failure to turn a resource identifier into an open byte stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ResourceError {
    pub kind: FailureKind,
    pub message: String,
}

impl ResourceError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidIdentifier,
    UnsupportedScheme { scheme: String },
    NotFound,
    Io,
    HttpStatus(u16),
    Timeout,
    RedirectLimitExceeded,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    UnsupportedContentType { content_type: String },
    Cancelled,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidIdentifier => write!(f, "invalid resource identifier"),
            FailureKind::UnsupportedScheme { scheme } => write!(f, "unsupported scheme {scheme}"),
            FailureKind::NotFound => write!(f, "not found"),
            FailureKind::Io => write!(f, "io error"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::RedirectLimitExceeded => write!(f, "redirect limit exceeded"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::UnsupportedContentType { content_type } => {
                write!(f, "unsupported content type {content_type}")
            }
            FailureKind::Cancelled => write!(f, "cancelled"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}

/// The resource was opened but no structure could be built from it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn at_line(line: usize, message: impl fmt::Display) -> Self {
        Self::new(format!("line {line}: {message}"))
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("opening resource failed: {0}")]
    Open(#[from] ResourceError),
    #[error("building structure failed: {0}")]
    Parse(#[from] ParseError),
    #[error("load cancelled")]
    Cancelled,
}

impl From<LoadError> for LoadFailure {
    fn from(err: LoadError) -> Self {
        match err {
            LoadError::Open(ResourceError {
                kind: FailureKind::Cancelled,
                message,
            }) => LoadFailure::new(FailureStage::Cancelled, message),
            LoadError::Open(err) => LoadFailure::new(FailureStage::Open, err.to_string()),
            LoadError::Parse(err) => LoadFailure::new(FailureStage::Parse, err.to_string()),
            LoadError::Cancelled => LoadFailure::new(FailureStage::Cancelled, "load cancelled"),
        }
    }
}
