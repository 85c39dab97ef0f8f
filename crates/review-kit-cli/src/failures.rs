//! Collecting the logs of failed steps.

use std::sync::Arc;

use review_kit_core::{HttpTransport, JobMetadata, Repository, RunLogError, RunLogWalker};
use tracing::{debug, warn};

/// Log text of one failed step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedStepLog {
    pub number: u32,
    pub name: String,
    pub content: String,
}

/// Fetch the job's run-log archive and return the logs of its failed steps,
/// in step order.
///
/// A step whose entry cannot be read is reported and skipped; fetch and
/// index errors abort the job.
pub async fn failed_step_logs<T>(
    transport: Arc<T>,
    repo: &Repository,
    job: &JobMetadata,
    max_redirects: u32,
) -> Result<Vec<FailedStepLog>, RunLogError>
where
    T: HttpTransport + ?Sized,
{
    let mut walker = RunLogWalker::for_job(transport, repo.clone(), job)?;
    walker.fetch(max_redirects).await?;
    if let Some(location) = walker.location() {
        debug!(job_id = job.id, url = %location.url, hops = location.chain.len(), "run logs fetched");
    }

    let mut logs = Vec::new();
    walker.walk(job, |step, log| {
        if !step.failed() {
            return Ok::<(), RunLogError>(());
        }
        match log.read_to_string() {
            Ok(content) => logs.push(FailedStepLog {
                number: step.number,
                name: step.name.clone(),
                content,
            }),
            Err(err) => warn!(step = %step.name, error = %err, "Failed to read step log content"),
        }
        Ok(())
    })?;
    Ok(logs)
}
