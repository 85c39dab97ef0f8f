//! Check runs and workflow jobs

use review_kit_core::{CheckRun, CheckStatus, Conclusion, JobMetadata, Repository};
use serde::{Deserialize, Serialize};

use crate::client::GitHubClient;
use crate::Result;

/// Which check runs to list for a commit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRunFilter {
    /// Status filter; sent to the API when it accepts the value, and
    /// always applied client-side
    pub status: Option<CheckStatus>,
    /// Client-side conclusion filter
    pub conclusion: Option<Conclusion>,
    /// Include superseded runs (`filter=all`) instead of only the latest
    pub all: bool,
}

impl CheckRunFilter {
    /// Latest failed runs, as inspected by `flush-failure` and `rerun`.
    pub fn failed() -> Self {
        CheckRunFilter {
            conclusion: Some(Conclusion::Failure),
            ..Default::default()
        }
    }

    fn query(&self) -> String {
        let mut query = format!("filter={}", if self.all { "all" } else { "latest" });
        if let Some(status) = self.status.filter(|s| accepted_by_api(*s)) {
            query.push_str(&format!("&status={status}"));
        }
        query
    }

    /// Whether a listed run passes the client-side part of the filter.
    pub fn matches(&self, run: &CheckRun) -> bool {
        let status_ok = self.status.map_or(true, |s| run.status == s);
        let conclusion_ok = self.conclusion.map_or(true, |c| run.conclusion == Some(c));
        status_ok && conclusion_ok
    }
}

/// The check-runs endpoint only filters on these statuses.
fn accepted_by_api(status: CheckStatus) -> bool {
    matches!(
        status,
        CheckStatus::Queued | CheckStatus::InProgress | CheckStatus::Completed
    )
}

#[derive(Deserialize)]
struct CheckRunPage {
    check_runs: Vec<CheckRun>,
}

/// Sort check runs by name, then id, for stable output.
pub fn sort_by_name(runs: &mut [CheckRun]) {
    runs.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
}

impl GitHubClient {
    /// List the check runs of a commit.
    pub async fn list_check_runs(
        &self,
        repo: &Repository,
        sha: &str,
        filter: &CheckRunFilter,
    ) -> Result<Vec<CheckRun>> {
        let path = format!(
            "{}/commits/{}/check-runs?{}",
            repo.api_path(),
            sha,
            filter.query()
        );
        let runs = self
            .get_all(&path, |page: CheckRunPage| page.check_runs)
            .await?;
        Ok(runs.into_iter().filter(|r| filter.matches(r)).collect())
    }

    /// Fetch a workflow job with its steps.
    pub async fn get_workflow_job(&self, repo: &Repository, job_id: u64) -> Result<JobMetadata> {
        self.get_json(&format!("{}/actions/jobs/{}", repo.api_path(), job_id))
            .await
    }

    /// Re-run a single workflow job (and its dependents).
    pub async fn rerun_job(&self, repo: &Repository, job_id: u64) -> Result<()> {
        self.post_empty(&format!("{}/actions/jobs/{}/rerun", repo.api_path(), job_id))
            .await
    }
}
