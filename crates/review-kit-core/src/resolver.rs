//! Log location resolution.
//!
//! The logs endpoints do not return a body: they answer `302 Found` with the
//! signed storage URL in `Location`. A `301`/`308` means the API resource
//! itself moved (renamed or transferred repository) and is re-requested at
//! the new location; each such hop counts against `max_redirects`.

use bytes::Bytes;
use serde::Serialize;

use crate::error::{Result, RunLogError};
use crate::model::{CheckRun, JobMetadata, Repository};
use crate::transport::{join_location, HttpResponse, HttpTransport, RedirectMode};

/// Where the log bundle of a job comes from.
///
/// Chosen once, when the walker is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LogSource {
    /// A workflow job whose run is known
    WorkflowJob {
        job_id: u64,
        run_id: u64,
        run_attempt: Option<u32>,
    },
    /// A check run; its workflow job is looked up before resolving
    CheckRun { check_run_id: u64 },
}

impl TryFrom<&JobMetadata> for LogSource {
    type Error = RunLogError;

    fn try_from(job: &JobMetadata) -> Result<Self> {
        if job.id == 0 || job.run_id == 0 {
            return Err(RunLogError::UnsupportedContext(format!(
                "job {:?} has no job or run id",
                job.name
            )));
        }
        Ok(LogSource::WorkflowJob {
            job_id: job.id,
            run_id: job.run_id,
            run_attempt: job.run_attempt,
        })
    }
}

impl TryFrom<&CheckRun> for LogSource {
    type Error = RunLogError;

    fn try_from(check_run: &CheckRun) -> Result<Self> {
        if check_run.id == 0 {
            return Err(RunLogError::UnsupportedContext(format!(
                "check run {:?} has no id",
                check_run.name
            )));
        }
        Ok(LogSource::CheckRun {
            check_run_id: check_run.id,
        })
    }
}

/// Result of a resolution: the URL to download and how we got there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedLocation {
    /// Literal download URL
    pub url: String,
    /// Every URL requested on the way, in order (the redirect chain)
    pub chain: Vec<String>,
}

impl LogSource {
    /// Resolve the download URL of the run-log archive.
    pub async fn resolve<T>(
        &self,
        transport: &T,
        repo: &Repository,
        max_redirects: u32,
    ) -> Result<ResolvedLocation>
    where
        T: HttpTransport + ?Sized,
    {
        let (run_id, run_attempt) = match *self {
            LogSource::WorkflowJob {
                run_id,
                run_attempt,
                ..
            } => (run_id, run_attempt),
            LogSource::CheckRun { check_run_id } => {
                let job = get_job(transport, repo, check_run_id).await?;
                (job.run_id, job.run_attempt)
            }
        };

        let path = match run_attempt {
            Some(attempt) => format!(
                "{}/actions/runs/{}/attempts/{}/logs",
                repo.api_path(),
                run_id,
                attempt
            ),
            None => format!("{}/actions/runs/{}/logs", repo.api_path(), run_id),
        };
        follow_redirects(transport, api_url(transport, &path), max_redirects).await
    }

    /// The job or check run id this source was built from.
    pub fn id(&self) -> u64 {
        match *self {
            LogSource::WorkflowJob { job_id, .. } => job_id,
            LogSource::CheckRun { check_run_id } => check_run_id,
        }
    }
}

/// Download the plain-text log of a single job.
///
/// Same redirect rules as archive resolution, on the
/// `/actions/jobs/{id}/logs` endpoint.
pub async fn fetch_job_log<T>(
    transport: &T,
    repo: &Repository,
    job_id: u64,
    max_redirects: u32,
) -> Result<Bytes>
where
    T: HttpTransport + ?Sized,
{
    let path = format!("{}/actions/jobs/{}/logs", repo.api_path(), job_id);
    let location = follow_redirects(transport, api_url(transport, &path), max_redirects).await?;
    download(transport, &location.url).await
}

/// Download the bytes at a resolved location, letting the transport follow
/// any storage-side redirects.
pub async fn download<T>(transport: &T, url: &str) -> Result<Bytes>
where
    T: HttpTransport + ?Sized,
{
    let response = transport.get(url, RedirectMode::Follow).await?;
    if !response.is_success() {
        return Err(RunLogError::Download {
            url: url.to_string(),
            reason: format!("HTTP status {}", response.status),
        });
    }
    Ok(response.body)
}

async fn get_job<T>(transport: &T, repo: &Repository, job_id: u64) -> Result<JobMetadata>
where
    T: HttpTransport + ?Sized,
{
    let url = api_url(
        transport,
        &format!("{}/actions/jobs/{}", repo.api_path(), job_id),
    );
    let response = transport.get(&url, RedirectMode::Follow).await?;
    if !response.is_success() {
        return Err(RunLogError::UnexpectedStatus {
            url,
            status: response.status,
        });
    }
    serde_json::from_slice(&response.body).map_err(|e| RunLogError::InvalidPayload {
        url,
        reason: e.to_string(),
    })
}

async fn follow_redirects<T>(
    transport: &T,
    start: String,
    max_redirects: u32,
) -> Result<ResolvedLocation>
where
    T: HttpTransport + ?Sized,
{
    let mut url = start;
    let mut chain = Vec::new();
    let mut hops = 0;

    loop {
        let response = transport.get(&url, RedirectMode::Manual).await?;
        chain.push(url.clone());

        match response.status {
            301 | 308 => {
                if hops == max_redirects {
                    return Err(RunLogError::RedirectLimitExceeded { url, max_redirects });
                }
                hops += 1;
                url = redirect_target(&url, &response)?;
            }
            302 | 303 | 307 => {
                let target = redirect_target(&url, &response)?;
                return Ok(ResolvedLocation { url: target, chain });
            }
            status => return Err(RunLogError::UnexpectedStatus { url, status }),
        }
    }
}

fn redirect_target(url: &str, response: &HttpResponse) -> Result<String> {
    match response.location.as_deref() {
        Some(location) if !location.is_empty() => Ok(join_location(url, location)),
        _ => Err(RunLogError::Download {
            url: url.to_string(),
            reason: format!("redirect {} without a Location header", response.status),
        }),
    }
}

fn api_url<T>(transport: &T, path: &str) -> String
where
    T: HttpTransport + ?Sized,
{
    format!("{}{}", transport.api_base().trim_end_matches('/'), path)
}
