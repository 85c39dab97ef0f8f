//! Error types for review-kit-github

use review_kit_core::RunLogError;
use thiserror::Error;

/// Errors that can occur talking to the GitHub API
#[derive(Error, Debug)]
pub enum GitHubError {
    /// HTTP client construction or transport failure
    #[error("HTTP error: {0}")]
    Http(String),

    /// The API answered with a non-success status
    #[error("GitHub API error {status} for {url}: {message}")]
    Api {
        status: u16,
        url: String,
        message: String,
    },

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// No token could be found in the environment or from `gh`
    #[error("no GitHub token found; set GH_TOKEN or run `gh auth login`")]
    MissingToken,

    /// Invalid argument supplied by the caller
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Run-log retrieval error
    #[error(transparent)]
    RunLog(#[from] RunLogError),
}

impl From<reqwest::Error> for GitHubError {
    fn from(err: reqwest::Error) -> Self {
        GitHubError::Http(err.to_string())
    }
}
