//! review-kit-github: GitHub REST access for review-kit
//!
//! Provides the reqwest-backed [`GitHubClient`], which serves both the
//! typed endpoints the CLI needs (pull requests, check runs, jobs, reviews)
//! and the raw [`review_kit_core::HttpTransport`] the log walker drives.

pub mod checks;
pub mod client;
pub mod config;
pub mod error;
pub mod pulls;

pub use checks::{sort_by_name, CheckRunFilter};
pub use client::GitHubClient;
pub use config::{api_url_for_host, GitHubConfig};
pub use error::GitHubError;
pub use pulls::{
    approved_reviewers, latest_reviews, PullRequest, Review, ReviewState, ReviewersRequest,
    TeamRef, User,
};

/// Result type for GitHub operations
pub type Result<T> = std::result::Result<T, GitHubError>;
