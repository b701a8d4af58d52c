use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader, Cursor, Read};
use std::path::PathBuf;
use std::sync::Arc;

use engine_logging::engine_debug;
use tokio::runtime::Handle;
use url::Url;

use crate::fetch::{FetchSettings, Fetcher, ReqwestFetcher};
use crate::{FailureKind, JobMonitor, ResourceError};

/// An open resource. Dropping it releases the underlying handle.
pub type ResourceStream = Box<dyn Read + Send>;

/// Opens a resource identifier as a byte stream.
///
/// Implementations may block; they are only called from job threads.
pub trait ResourceLoader: Send + Sync {
    fn open(&self, identifier: &str, monitor: &JobMonitor) -> Result<ResourceStream, ResourceError>;
}

/// Opens URLs of one custom scheme, e.g. `pva:` or `archive:`.
pub trait SchemeHandler: Send + Sync {
    fn open(&self, url: &Url, monitor: &JobMonitor) -> Result<ResourceStream, ResourceError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceLocation {
    File(PathBuf),
    Remote(Url),
    /// URL with a scheme that is neither `file` nor `http(s)`.
    Custom(Url),
}

/// Classifies an identifier as a local file or a URL.
///
/// Identifiers without a scheme, and one-letter schemes (Windows drive
/// letters), are taken as local paths.
pub fn resolve_identifier(identifier: &str) -> Result<ResourceLocation, ResourceError> {
    if identifier.trim().is_empty() {
        return Err(ResourceError::new(
            FailureKind::InvalidIdentifier,
            "empty resource identifier",
        ));
    }

    match Url::parse(identifier) {
        Ok(url) if url.scheme().len() == 1 => Ok(ResourceLocation::File(PathBuf::from(identifier))),
        Ok(url) => match url.scheme() {
            "file" => url
                .to_file_path()
                .map(ResourceLocation::File)
                .map_err(|()| {
                    ResourceError::new(
                        FailureKind::InvalidIdentifier,
                        format!("'{identifier}' is not a local file URL"),
                    )
                }),
            "http" | "https" => Ok(ResourceLocation::Remote(url)),
            _ => Ok(ResourceLocation::Custom(url)),
        },
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            Ok(ResourceLocation::File(PathBuf::from(identifier)))
        }
        Err(err) => Err(ResourceError::new(
            FailureKind::InvalidIdentifier,
            format!("'{identifier}': {err}"),
        )),
    }
}

/// Loader for local files, `file:` URLs and `http(s)` URLs, extensible with
/// [`SchemeHandler`]s for other schemes.
pub struct DefaultResourceLoader {
    fetcher: Arc<dyn Fetcher>,
    handlers: HashMap<String, Arc<dyn SchemeHandler>>,
}

impl DefaultResourceLoader {
    pub fn new(settings: FetchSettings) -> Self {
        Self::with_fetcher(Arc::new(ReqwestFetcher::new(settings)))
    }

    pub fn with_fetcher(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            fetcher,
            handlers: HashMap::new(),
        }
    }

    pub fn register_scheme(
        mut self,
        scheme: impl Into<String>,
        handler: Arc<dyn SchemeHandler>,
    ) -> Self {
        self.handlers
            .insert(scheme.into().to_ascii_lowercase(), handler);
        self
    }

    fn open_file(&self, path: PathBuf) -> Result<ResourceStream, ResourceError> {
        let file = File::open(&path).map_err(|err| {
            let kind = if err.kind() == io::ErrorKind::NotFound {
                FailureKind::NotFound
            } else {
                FailureKind::Io
            };
            ResourceError::new(kind, format!("{}: {err}", path.display()))
        })?;

        let metadata = file
            .metadata()
            .map_err(|err| ResourceError::new(FailureKind::Io, err.to_string()))?;
        if metadata.is_dir() {
            return Err(ResourceError::new(
                FailureKind::Io,
                format!("{} is a directory", path.display()),
            ));
        }

        engine_debug!("Opened {} ({} bytes)", path.display(), metadata.len());
        Ok(Box::new(BufReader::new(file)))
    }

    fn open_remote(&self, url: Url, monitor: &JobMonitor) -> Result<ResourceStream, ResourceError> {
        let fetch = self.fetcher.fetch(&url, monitor);
        let output = match Handle::try_current() {
            Ok(handle) => handle.block_on(fetch),
            Err(_) => tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|err| ResourceError::new(FailureKind::Io, err.to_string()))?
                .block_on(fetch),
        }?;

        engine_debug!(
            "Fetched {} ({} bytes, {} redirects)",
            output.final_url,
            output.bytes.len(),
            output.redirect_count
        );
        Ok(Box::new(Cursor::new(output.bytes)))
    }
}

impl Default for DefaultResourceLoader {
    fn default() -> Self {
        Self::new(FetchSettings::default())
    }
}

impl ResourceLoader for DefaultResourceLoader {
    fn open(&self, identifier: &str, monitor: &JobMonitor) -> Result<ResourceStream, ResourceError> {
        match resolve_identifier(identifier)? {
            ResourceLocation::File(path) => self.open_file(path),
            ResourceLocation::Remote(url) => self.open_remote(url, monitor),
            ResourceLocation::Custom(url) => match self.handlers.get(url.scheme()) {
                Some(handler) => handler.open(&url, monitor),
                None => Err(ResourceError::new(
                    FailureKind::UnsupportedScheme {
                        scheme: url.scheme().to_string(),
                    },
                    identifier.to_string(),
                )),
            },
        }
    }
}
