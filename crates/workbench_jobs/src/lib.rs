//! Workbench jobs: background job scheduling, resource loading and the
//! owner-thread view binding that ties them to `workbench_core`.
mod binding;
mod fetch;
mod job;
mod mailbox;
mod manager;
mod resource;
mod structure;
mod types;

pub use binding::{BindingConfig, ViewBinding, DEFAULT_JOB_NAME};
pub use fetch::{FetchOutput, FetchSettings, Fetcher, ReqwestFetcher};
pub use job::{JobHandle, JobId, JobMonitor, JobStatus, ProgressSnapshot};
pub use mailbox::{owner_channel, Mailbox, Poster};
pub use manager::{JobManager, JobManagerConfig};
pub use resource::{
    resolve_identifier, DefaultResourceLoader, ResourceLoader, ResourceLocation, ResourceStream,
    SchemeHandler,
};
pub use structure::StructureBuilder;
pub use types::{FailureKind, JobError, LoadError, ParseError, ResourceError};
