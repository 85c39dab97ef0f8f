//! Run-log walker: fetch a job's log bundle, then visit its steps in order.
//!
//! A walker starts `Unfetched`. A successful [`RunLogWalker::fetch`] moves it
//! to `Fetched`, holding the opened archive; fetching again drops the old
//! archive first, so a failed refetch leaves the walker `Unfetched`.

use std::sync::Arc;

use crate::archive::LogArchive;
use crate::error::{Result, RunLogError};
use crate::model::{CheckRun, JobMetadata, Repository, StepMetadata};
use crate::resolver::{download, LogSource, ResolvedLocation};
use crate::step_index::{index_steps, StepLogEntry};
use crate::transport::HttpTransport;

enum WalkerState {
    Unfetched,
    Fetched {
        location: ResolvedLocation,
        archive: LogArchive,
    },
}

/// Walks the step logs of one job.
pub struct RunLogWalker<T: ?Sized> {
    transport: Arc<T>,
    repo: Repository,
    source: LogSource,
    state: WalkerState,
}

impl<T> RunLogWalker<T>
where
    T: HttpTransport + ?Sized,
{
    pub fn new(transport: Arc<T>, repo: Repository, source: LogSource) -> Self {
        RunLogWalker {
            transport,
            repo,
            source,
            state: WalkerState::Unfetched,
        }
    }

    /// Walker for a workflow job.
    pub fn for_job(transport: Arc<T>, repo: Repository, job: &JobMetadata) -> Result<Self> {
        Ok(Self::new(transport, repo, LogSource::try_from(job)?))
    }

    /// Walker for a check run.
    pub fn for_check_run(
        transport: Arc<T>,
        repo: Repository,
        check_run: &CheckRun,
    ) -> Result<Self> {
        Ok(Self::new(transport, repo, LogSource::try_from(check_run)?))
    }

    pub fn source(&self) -> &LogSource {
        &self.source
    }

    pub fn is_fetched(&self) -> bool {
        matches!(self.state, WalkerState::Fetched { .. })
    }

    /// Where the current archive was downloaded from.
    pub fn location(&self) -> Option<&ResolvedLocation> {
        match &self.state {
            WalkerState::Fetched { location, .. } => Some(location),
            WalkerState::Unfetched => None,
        }
    }

    pub fn archive(&self) -> Option<&LogArchive> {
        match &self.state {
            WalkerState::Fetched { archive, .. } => Some(archive),
            WalkerState::Unfetched => None,
        }
    }

    /// Resolve, download and open the run-log archive.
    ///
    /// Returns the first failure among resolution, download and archive
    /// parsing. Dropping the returned future cancels the fetch.
    pub async fn fetch(&mut self, max_redirects: u32) -> Result<()> {
        self.state = WalkerState::Unfetched;

        let location = self
            .source
            .resolve(self.transport.as_ref(), &self.repo, max_redirects)
            .await?;
        let bytes = download(self.transport.as_ref(), &location.url).await?;
        let archive = LogArchive::from_bytes(bytes)?;

        self.state = WalkerState::Fetched { location, archive };
        Ok(())
    }

    /// Visit each logged step of `job` in ascending step order.
    ///
    /// Every archived step must have matching metadata in `job.steps`; the
    /// first one that does not aborts the walk with
    /// [`RunLogError::StepMismatch`] before any later step is visited. An
    /// error returned by `visit` aborts the walk and is returned as is.
    pub fn walk<E, F>(&self, job: &JobMetadata, mut visit: F) -> std::result::Result<(), E>
    where
        E: From<RunLogError>,
        F: FnMut(&StepMetadata, &StepLog<'_>) -> std::result::Result<(), E>,
    {
        let archive = match &self.state {
            WalkerState::Fetched { archive, .. } => archive,
            WalkerState::Unfetched => return Err(RunLogError::NotFetched.into()),
        };
        if job.steps.is_empty() {
            return Err(RunLogError::NoSteps {
                job: job.name.clone(),
            }
            .into());
        }

        for entry in index_steps(archive, &job.name)? {
            let step = job.step(entry.number).ok_or_else(|| RunLogError::StepMismatch {
                job: job.name.clone(),
                step: entry.number,
            })?;
            visit(step, &StepLog { entry, archive })?;
        }
        Ok(())
    }
}

/// Handle on one step's log inside a fetched archive.
///
/// The content is only inflated when asked for.
#[derive(Debug)]
pub struct StepLog<'a> {
    entry: StepLogEntry,
    archive: &'a LogArchive,
}

impl StepLog<'_> {
    pub fn entry(&self) -> &StepLogEntry {
        &self.entry
    }

    pub fn number(&self) -> u32 {
        self.entry.number
    }

    pub fn job_name(&self) -> &str {
        &self.entry.job_name
    }

    /// Read the raw log bytes.
    pub fn read_content(&self) -> Result<Vec<u8>> {
        self.archive.read_entry(&self.entry.path)
    }

    /// Read the log as text, replacing invalid UTF-8.
    pub fn read_to_string(&self) -> Result<String> {
        let content = self.read_content()?;
        Ok(String::from_utf8_lossy(&content).into_owned())
    }
}
