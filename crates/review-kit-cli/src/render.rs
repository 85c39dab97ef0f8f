//! Check-run output: aligned tables and JSON.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use review_kit_core::CheckRun;
use serde::Serialize;

/// A table column of `checks` output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Name,
    Status,
    Conclusion,
    Id,
    RunId,
    JobId,
    HeadSha,
    StartedAt,
    CompletedAt,
    Url,
}

pub const DEFAULT_COLUMNS: &[Column] = &[Column::Name, Column::Status, Column::Conclusion];

pub const DETAIL_COLUMNS: &[Column] = &[
    Column::Name,
    Column::Status,
    Column::Conclusion,
    Column::RunId,
    Column::JobId,
    Column::StartedAt,
    Column::CompletedAt,
    Column::Url,
];

impl Column {
    pub fn header(&self) -> &'static str {
        match self {
            Column::Name => "NAME",
            Column::Status => "STATUS",
            Column::Conclusion => "CONCLUSION",
            Column::Id => "ID",
            Column::RunId => "RUN_ID",
            Column::JobId => "JOB_ID",
            Column::HeadSha => "HEAD_SHA",
            Column::StartedAt => "STARTED_AT",
            Column::CompletedAt => "COMPLETED_AT",
            Column::Url => "URL",
        }
    }

    fn value(&self, run: &CheckRun) -> String {
        let value = match self {
            Column::Name => Some(run.name.clone()),
            Column::Status => Some(run.status.to_string()),
            Column::Conclusion => run.conclusion.map(|c| c.to_string()),
            Column::Id => Some(run.id.to_string()),
            Column::RunId => run.run_id().map(|id| id.to_string()),
            Column::JobId => run.job_id().map(|id| id.to_string()),
            Column::HeadSha => run.head_sha.clone(),
            Column::StartedAt => run.started_at.as_ref().map(timestamp),
            Column::CompletedAt => run.completed_at.as_ref().map(timestamp),
            Column::Url => run.details_url.clone().or_else(|| run.html_url.clone()),
        };
        value.unwrap_or_else(|| "-".to_string())
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

impl FromStr for Column {
    type Err = String;

    /// Case-insensitive; `-` and `_` are interchangeable.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        match normalized.as_str() {
            "NAME" => Ok(Column::Name),
            "STATUS" => Ok(Column::Status),
            "CONCLUSION" => Ok(Column::Conclusion),
            "ID" => Ok(Column::Id),
            "RUN_ID" => Ok(Column::RunId),
            "JOB_ID" => Ok(Column::JobId),
            "HEAD_SHA" => Ok(Column::HeadSha),
            "STARTED_AT" => Ok(Column::StartedAt),
            "COMPLETED_AT" => Ok(Column::CompletedAt),
            "URL" => Ok(Column::Url),
            _ => Err(format!("unknown column: {s}")),
        }
    }
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Render runs as a left-aligned table with a header row.
pub fn render_table(runs: &[CheckRun], columns: &[Column]) -> String {
    let rows: Vec<Vec<String>> = runs
        .iter()
        .map(|run| columns.iter().map(|c| c.value(run)).collect())
        .collect();

    let mut widths: Vec<usize> = columns.iter().map(|c| c.header().len()).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let headers: Vec<String> = columns.iter().map(|c| c.header().to_string()).collect();
    let mut out = String::new();
    for row in std::iter::once(&headers).chain(rows.iter()) {
        let line = row
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ");
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

#[derive(Serialize)]
struct CheckRunJson<'a> {
    #[serde(flatten)]
    run: &'a CheckRun,
    run_id: Option<u64>,
    job_id: Option<u64>,
}

/// Render runs as a pretty-printed JSON array, with the ids derived from
/// `details_url` added to each object.
pub fn render_json(runs: &[CheckRun]) -> serde_json::Result<String> {
    let rows: Vec<CheckRunJson<'_>> = runs
        .iter()
        .map(|run| CheckRunJson {
            run,
            run_id: run.run_id(),
            job_id: run.job_id(),
        })
        .collect();
    serde_json::to_string_pretty(&rows)
}
