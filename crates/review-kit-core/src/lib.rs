//! review-kit core: run-log retrieval and step walking
//!
//! Given a completed GitHub Actions job (or the check run that reports it),
//! this crate resolves the location of the run's log bundle, downloads and
//! opens the zip archive, indexes the per-step log files of a job and walks
//! them in step order alongside the step metadata reported by the API.
//!
//! ## Layout
//!
//! - [`archive`]: random-access view over the downloaded zip bundle
//! - [`step_index`]: `<job>/<N>_<step>.txt` entry parsing
//! - [`resolver`]: log location resolution with bounded redirect following
//! - [`walker`]: the `Unfetched -> Fetched` walker joining logs and metadata
//! - [`transport`]: the HTTP seam implemented by the GitHub client
//! - [`fakes`]: scripted in-memory transport for tests
//!
//! The crate performs no logging and no retries; callers decide both.

pub mod archive;
pub mod error;
pub mod fakes;
pub mod model;
pub mod resolver;
pub mod step_index;
pub mod transport;
pub mod walker;

pub use archive::LogArchive;
pub use error::{Result, RunLogError};
pub use model::{
    CheckRun, CheckStatus, Conclusion, JobMetadata, ParseRepositoryError, Repository,
    StepMetadata,
};
pub use resolver::{fetch_job_log, LogSource, ResolvedLocation};
pub use step_index::{index_steps, StepLogEntry};
pub use transport::{HttpResponse, HttpTransport, RedirectMode};
pub use walker::{RunLogWalker, StepLog};

/// Default number of API redirect hops followed when resolving a log URL.
pub const DEFAULT_MAX_REDIRECTS: u32 = 3;
