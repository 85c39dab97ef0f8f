//! Error types for run-log retrieval and walking

use thiserror::Error;

/// Result type for run-log operations
pub type Result<T> = std::result::Result<T, RunLogError>;

/// Errors raised while resolving, downloading, opening or walking a run log.
#[derive(Error, Debug)]
pub enum RunLogError {
    /// The supplied check run or job carries no identifier a log source can use
    #[error("no log fetcher available for the given context: {0}")]
    UnsupportedContext(String),

    /// More redirect hops were needed than the caller allowed
    #[error("redirect limit of {max_redirects} exceeded while resolving {url}")]
    RedirectLimitExceeded { url: String, max_redirects: u32 },

    /// Network failure or non-success status while downloading
    #[error("failed to download {url}: {reason}")]
    Download { url: String, reason: String },

    /// The provider answered with a status the resolver does not handle
    #[error("unexpected status {status} from {url}")]
    UnexpectedStatus { url: String, status: u16 },

    /// The provider answered with a body that could not be decoded
    #[error("invalid payload from {url}: {reason}")]
    InvalidPayload { url: String, reason: String },

    /// The downloaded bytes are not a zip archive
    #[error("invalid log archive: {0}")]
    ArchiveFormat(String),

    /// A declared archive entry could not be read in full
    #[error("truncated archive entry {entry}: {reason}")]
    TruncatedArchive { entry: String, reason: String },

    /// No entry with this name exists in the archive
    #[error("archive entry not found: {0}")]
    MissingEntry(String),

    /// The archive holds no directory for the job
    #[error("job {job:?} not found in the logs")]
    JobNotFound { job: String },

    /// `walk` was called before a successful `fetch`
    #[error("logs have not been fetched yet")]
    NotFetched,

    /// The job description carries no steps
    #[error("job {job:?} has no steps")]
    NoSteps { job: String },

    /// A logged step number has no matching step metadata
    #[error("step number {step} not found in job {job:?}")]
    StepMismatch { job: String, step: u32 },
}

