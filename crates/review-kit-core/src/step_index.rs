//! Step-log index over a run-log archive.
//!
//! GitHub lays out a run's log bundle as one directory per job holding one
//! file per step, named `<job>/<N>_<step name>.txt`. Next to the job
//! directories sit `<N>_<job>.txt` files with the whole job log, which are
//! not step logs and are ignored here.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::archive::LogArchive;
use crate::error::{Result, RunLogError};

const STEP_LOG_EXTENSION: &str = ".txt";

/// One step-log file of a job, located by its archive path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepLogEntry {
    pub job_name: String,
    pub number: u32,
    /// Step name as encoded in the file name
    pub name: String,
    /// Full archive path of the entry
    pub path: String,
}

impl StepLogEntry {
    /// Parse an archive path of the form `<job>/<N>_<name>.txt`.
    ///
    /// Returns `None` for anything else: other depths, other extensions,
    /// missing separator, or a prefix that is not a decimal `u32`.
    pub fn parse(path: &str) -> Option<Self> {
        let (job_name, file_name) = path.split_once('/')?;
        if job_name.is_empty() || file_name.contains('/') {
            return None;
        }
        let stem = file_name.strip_suffix(STEP_LOG_EXTENSION)?;
        let (number, name) = stem.split_once('_')?;
        if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let number = number.parse().ok()?;

        Some(StepLogEntry {
            job_name: job_name.to_string(),
            number,
            name: name.to_string(),
            path: path.to_string(),
        })
    }
}

/// Collect the step logs of `job_name`, ordered by step number.
///
/// A job directory with no step files yields an empty list; a job with no
/// entries at all is [`RunLogError::JobNotFound`]. When two files carry the
/// same step number the first one in archive order wins.
pub fn index_steps(archive: &LogArchive, job_name: &str) -> Result<Vec<StepLogEntry>> {
    let prefix = format!("{job_name}/");
    let mut job_present = false;
    let mut steps: BTreeMap<u32, StepLogEntry> = BTreeMap::new();

    for path in archive.entry_names().filter(|p| p.starts_with(&prefix)) {
        job_present = true;
        if let Some(entry) = StepLogEntry::parse(path) {
            steps.entry(entry.number).or_insert(entry);
        }
    }

    if !job_present {
        return Err(RunLogError::JobNotFound {
            job: job_name.to_string(),
        });
    }
    Ok(steps.into_values().collect())
}
