//! Domain types shared by the resolver, the walker and the GitHub client.
//!
//! The check-run and job types deserialize directly from the GitHub REST
//! payloads; unknown enum values map to `Unknown` instead of failing.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a repository reference cannot be parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid repository {0:?}: expected [HOST/]OWNER/REPO")]
pub struct ParseRepositoryError(pub String);

/// A repository on a GitHub host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Repository {
    /// Host name, `None` for the default host
    pub host: Option<String>,
    pub owner: String,
    pub name: String,
}

impl Repository {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Repository {
            host: None,
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Set the host this repository lives on.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Path prefix of the repository's REST endpoints (`/repos/{owner}/{repo}`).
    pub fn api_path(&self) -> String {
        format!("/repos/{}/{}", self.owner, self.name)
    }

    /// Parse a git remote URL.
    ///
    /// Accepts `https://host/owner/repo(.git)`, `ssh://git@host/owner/repo`
    /// and the scp-like `git@host:owner/repo.git`.
    pub fn from_remote_url(url: &str) -> Result<Self, ParseRepositoryError> {
        let invalid = || ParseRepositoryError(url.to_string());
        let url = url.trim();

        let (host, path) = if let Some((_, rest)) = url.split_once("://") {
            let (authority, path) = rest.split_once('/').ok_or_else(invalid)?;
            let host = authority.rsplit_once('@').map_or(authority, |(_, h)| h);
            (host, path)
        } else if let Some((user_host, path)) = url.split_once(':') {
            let host = user_host.rsplit_once('@').map_or(user_host, |(_, h)| h);
            (host, path)
        } else {
            return Err(invalid());
        };

        // Drop an explicit port, it is not part of the API host
        let host = host.split_once(':').map_or(host, |(h, _)| h);
        let path = path.trim_matches('/');
        let path = path.strip_suffix(".git").unwrap_or(path);
        let (owner, name) = path.split_once('/').ok_or_else(invalid)?;
        if host.is_empty() || owner.is_empty() || name.is_empty() || name.contains('/') {
            return Err(invalid());
        }

        Ok(Repository::new(owner, name).with_host(host))
    }
}

impl FromStr for Repository {
    type Err = ParseRepositoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split('/').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(ParseRepositoryError(s.to_string()));
        }
        match parts.as_slice() {
            [owner, name] => Ok(Repository::new(*owner, *name)),
            [host, owner, name] => Ok(Repository::new(*owner, *name).with_host(*host)),
            _ => Err(ParseRepositoryError(s.to_string())),
        }
    }
}

impl fmt::Display for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Final outcome of a check run, job or step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Conclusion {
    Success,
    Failure,
    Neutral,
    Cancelled,
    Skipped,
    TimedOut,
    ActionRequired,
    Stale,
    #[serde(other)]
    Unknown,
}

impl Conclusion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Conclusion::Success => "success",
            Conclusion::Failure => "failure",
            Conclusion::Neutral => "neutral",
            Conclusion::Cancelled => "cancelled",
            Conclusion::Skipped => "skipped",
            Conclusion::TimedOut => "timed_out",
            Conclusion::ActionRequired => "action_required",
            Conclusion::Stale => "stale",
            Conclusion::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Conclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Conclusion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(Conclusion::Success),
            "failure" => Ok(Conclusion::Failure),
            "neutral" => Ok(Conclusion::Neutral),
            "cancelled" => Ok(Conclusion::Cancelled),
            "skipped" => Ok(Conclusion::Skipped),
            "timed_out" => Ok(Conclusion::TimedOut),
            "action_required" => Ok(Conclusion::ActionRequired),
            "stale" => Ok(Conclusion::Stale),
            other => Err(format!("unknown conclusion: {other}")),
        }
    }
}

/// Lifecycle status of a check run, job or step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Queued,
    InProgress,
    Completed,
    Waiting,
    Requested,
    Pending,
    #[serde(other)]
    Unknown,
}

impl CheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckStatus::Queued => "queued",
            CheckStatus::InProgress => "in_progress",
            CheckStatus::Completed => "completed",
            CheckStatus::Waiting => "waiting",
            CheckStatus::Requested => "requested",
            CheckStatus::Pending => "pending",
            CheckStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CheckStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(CheckStatus::Queued),
            "in_progress" => Ok(CheckStatus::InProgress),
            "completed" => Ok(CheckStatus::Completed),
            "waiting" => Ok(CheckStatus::Waiting),
            "requested" => Ok(CheckStatus::Requested),
            "pending" => Ok(CheckStatus::Pending),
            other => Err(format!("unknown status: {other}")),
        }
    }
}

/// One step of a workflow job, as reported by the jobs API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepMetadata {
    /// 1-based step number, unique within the job
    pub number: u32,
    pub name: String,
    #[serde(default)]
    pub status: Option<CheckStatus>,
    #[serde(default)]
    pub conclusion: Option<Conclusion>,
}

impl StepMetadata {
    pub fn new(number: u32, name: impl Into<String>, conclusion: Option<Conclusion>) -> Self {
        StepMetadata {
            number,
            name: name.into(),
            status: Some(CheckStatus::Completed),
            conclusion,
        }
    }

    pub fn failed(&self) -> bool {
        self.conclusion == Some(Conclusion::Failure)
    }
}

/// A workflow job with its ordered steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobMetadata {
    pub id: u64,
    pub run_id: u64,
    #[serde(default)]
    pub run_attempt: Option<u32>,
    pub name: String,
    #[serde(default)]
    pub status: Option<CheckStatus>,
    #[serde(default)]
    pub conclusion: Option<Conclusion>,
    #[serde(default)]
    pub steps: Vec<StepMetadata>,
}

impl JobMetadata {
    /// Look up a step by its number.
    pub fn step(&self, number: u32) -> Option<&StepMetadata> {
        self.steps.iter().find(|s| s.number == number)
    }
}

/// A check run attached to a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRun {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub head_sha: Option<String>,
    pub status: CheckStatus,
    #[serde(default)]
    pub conclusion: Option<Conclusion>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub details_url: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
}

impl CheckRun {
    /// Workflow run id parsed from the details URL
    /// (`.../actions/runs/{run_id}/job/{job_id}`).
    pub fn run_id(&self) -> Option<u64> {
        self.actions_ids().map(|(run, _)| run)
    }

    /// Workflow job id parsed from the details URL.
    pub fn job_id(&self) -> Option<u64> {
        self.actions_ids().and_then(|(_, job)| job)
    }

    fn actions_ids(&self) -> Option<(u64, Option<u64>)> {
        let url = self.details_url.as_deref()?;
        let url = url.split(['?', '#']).next().unwrap_or(url);
        let segments: Vec<&str> = url.split('/').collect();
        let runs = segments.iter().position(|s| *s == "runs")?;
        if runs == 0 || segments[runs - 1] != "actions" {
            return None;
        }
        let run_id = segments.get(runs + 1)?.parse().ok()?;
        let job_id = match segments.get(runs + 2) {
            Some(&"job") => segments.get(runs + 3).and_then(|s| s.parse().ok()),
            _ => None,
        };
        Some((run_id, job_id))
    }
}
