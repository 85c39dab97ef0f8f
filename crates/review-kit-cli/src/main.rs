//! gh-review-kit - pull request CI and review helper
//!
//! ## Commands
//!
//! - `checks`: List check runs of a pull request
//! - `flush-failure`: Print the logs of failed check runs
//! - `rerun`: Re-run failed jobs
//! - `rerequest`: Re-request reviews

mod failures;
mod render;
mod repo;
mod reviewers;
mod telemetry;

use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use review_kit_core::{
    fetch_job_log, CheckRun, CheckStatus, Conclusion, Repository, DEFAULT_MAX_REDIRECTS,
};
use review_kit_github::{
    approved_reviewers, latest_reviews, sort_by_name, CheckRunFilter, GitHubClient, GitHubConfig,
    GitHubError, PullRequest, ReviewersRequest,
};
use tracing::{info, warn, Level};

use render::Column;

#[derive(Parser)]
#[command(name = "gh-review-kit")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Pull request CI and review helper for GitHub", long_about = None)]
struct Cli {
    /// Repository as [HOST/]OWNER/REPO (default: GH_REPO, then the origin remote)
    #[arg(short = 'R', long, global = true)]
    repo: Option<String>,

    /// Log level when RUST_LOG is not set (error, warn, info, debug, trace)
    #[arg(short = 'L', long, global = true, default_value = "info")]
    log_level: Level,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List check runs for a pull request
    #[command(visible_aliases = ["cc", "check-checks"])]
    Checks {
        /// Pull request number
        pr: u64,

        /// Filter by status (queued, in_progress, completed, ...)
        #[arg(short, long)]
        status: Option<CheckStatus>,

        /// Filter by conclusion (success, failure, cancelled, ...)
        #[arg(short, long)]
        conclusion: Option<Conclusion>,

        /// Include superseded check runs, not only the latest of each
        #[arg(long)]
        all: bool,

        /// Show run ID, job ID, timestamps and URL
        #[arg(short, long)]
        details: bool,

        /// Columns to display (NAME, STATUS, CONCLUSION, ID, RUN_ID, JOB_ID, HEAD_SHA,
        /// STARTED_AT, COMPLETED_AT, URL)
        #[arg(short = 'H', long, value_delimiter = ',')]
        headers: Vec<Column>,

        /// Print the check runs as JSON
        #[arg(long)]
        json: bool,
    },

    /// Display logs for failed check runs
    ///
    /// By default only the logs of failed steps are printed. With --full the
    /// whole job log is printed instead.
    #[command(visible_aliases = ["ff", "flush-fail", "flush-failed"])]
    FlushFailure {
        /// Pull request number
        pr: u64,

        /// Display full job logs
        #[arg(long)]
        full: bool,

        /// Permanent redirects followed when resolving log URLs
        #[arg(long, default_value_t = DEFAULT_MAX_REDIRECTS)]
        max_redirects: u32,
    },

    /// Re-run the failed jobs of a pull request
    #[command(visible_alias = "rr-failed")]
    Rerun {
        /// Pull request number
        pr: u64,
    },

    /// Re-request review for a pull request
    ///
    /// Without --reviewers, review is re-requested from everyone who already
    /// submitted one. Reviewers are users or org/team slugs, optionally
    /// prefixed with @.
    #[command(visible_alias = "rr")]
    Rerequest {
        /// Pull request number
        pr: u64,

        /// Reviewers to re-request (users or teams, e.g. username or org/team)
        #[arg(short, long, value_delimiter = ',')]
        reviewers: Vec<String>,

        /// Exclude reviewers who have already approved
        #[arg(long)]
        exclude_approved: bool,

        /// Expand team reviewers to individual team members
        #[arg(long)]
        expand_team: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init_tracing(cli.json_logs, cli.log_level);

    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let repo = repo::resolve_repository(cli.repo.as_deref(), &cwd)
        .context("Failed to resolve repository")?;

    let config = GitHubConfig::from_env_for_host(repo.host.as_deref());
    if config.token.is_none() {
        return Err(GitHubError::MissingToken.into());
    }
    let client = Arc::new(GitHubClient::new(config).context("Failed to create GitHub client")?);

    match cli.command {
        Commands::Checks {
            pr,
            status,
            conclusion,
            all,
            details,
            headers,
            json,
        } => {
            let filter = CheckRunFilter {
                status,
                conclusion,
                all,
            };
            let columns = select_columns(&headers, details);
            cmd_checks(&client, &repo, pr, &filter, columns, json).await
        }
        Commands::FlushFailure {
            pr,
            full,
            max_redirects,
        } => cmd_flush_failure(client, &repo, pr, full, max_redirects).await,
        Commands::Rerun { pr } => cmd_rerun(&client, &repo, pr).await,
        Commands::Rerequest {
            pr,
            reviewers,
            exclude_approved,
            expand_team,
        } => cmd_rerequest(&client, &repo, pr, &reviewers, exclude_approved, expand_team).await,
    }
}

fn select_columns(headers: &[Column], details: bool) -> &[Column] {
    if !headers.is_empty() {
        headers
    } else if details {
        render::DETAIL_COLUMNS
    } else {
        render::DEFAULT_COLUMNS
    }
}

async fn get_pull_request(client: &GitHubClient, repo: &Repository, pr: u64) -> Result<PullRequest> {
    client
        .get_pull_request(repo, pr)
        .await
        .with_context(|| format!("Failed to get pull request #{pr}"))
}

/// Check runs of the pull request head, sorted by name.
async fn pull_request_check_runs(
    client: &GitHubClient,
    repo: &Repository,
    pull: &PullRequest,
    filter: &CheckRunFilter,
) -> Result<Vec<CheckRun>> {
    let mut runs = client
        .list_check_runs(repo, &pull.head.sha, filter)
        .await
        .with_context(|| format!("Failed to get check runs for pull request #{}", pull.number))?;
    sort_by_name(&mut runs);
    Ok(runs)
}

/// List check runs for a pull request
async fn cmd_checks(
    client: &GitHubClient,
    repo: &Repository,
    pr: u64,
    filter: &CheckRunFilter,
    columns: &[Column],
    json: bool,
) -> Result<()> {
    let pull = get_pull_request(client, repo, pr).await?;
    let runs = pull_request_check_runs(client, repo, &pull, filter).await?;

    if json {
        println!("{}", render::render_json(&runs)?);
    } else {
        print!("{}", render::render_table(&runs, columns));
    }
    Ok(())
}

/// Print the logs of every failed check run; a job whose logs cannot be
/// retrieved is reported and skipped.
async fn cmd_flush_failure(
    client: Arc<GitHubClient>,
    repo: &Repository,
    pr: u64,
    full: bool,
    max_redirects: u32,
) -> Result<()> {
    let pull = get_pull_request(&client, repo, pr).await?;
    let runs = pull_request_check_runs(&client, repo, &pull, &CheckRunFilter::failed()).await?;

    if runs.is_empty() {
        info!(pull_request = pull.number, "No failed check runs found");
        return Ok(());
    }

    let total = runs.len();
    info!(count = total, "Found failed check runs");

    for (i, run) in runs.iter().enumerate() {
        if run.id == 0 {
            warn!(name = %run.name, "Could not get check run ID");
            continue;
        }
        info!(index = %format!("{}/{}", i + 1, total), name = %run.name, id = run.id, "Check run");

        if full {
            let log = match fetch_job_log(client.as_ref(), repo, run.id, max_redirects).await {
                Ok(log) => log,
                Err(err) => {
                    warn!(name = %run.name, id = run.id, error = %err, "Failed to get logs for check run");
                    continue;
                }
            };
            let mut stdout = std::io::stdout();
            stdout
                .write_all(&log)
                .and_then(|_| stdout.write_all(b"\n"))
                .context("Failed to write log to stdout")?;
            continue;
        }

        let job = match client.get_workflow_job(repo, run.id).await {
            Ok(job) => job,
            Err(err) => {
                warn!(name = %run.name, id = run.id, error = %err, "Failed to get workflow job for check run");
                continue;
            }
        };
        match failures::failed_step_logs(client.clone(), repo, &job, max_redirects).await {
            Ok(logs) => {
                for log in logs {
                    info!(job_id = job.id, step = log.number, name = %log.name, "Failed step");
                    println!("{}", log.content);
                }
            }
            Err(err) => {
                warn!(job_id = job.id, error = %err, "Failed to walk through logs for workflow job");
            }
        }
    }

    Ok(())
}

/// Re-run each failed job of a pull request
async fn cmd_rerun(client: &GitHubClient, repo: &Repository, pr: u64) -> Result<()> {
    let pull = get_pull_request(client, repo, pr).await?;
    let runs = pull_request_check_runs(client, repo, &pull, &CheckRunFilter::failed()).await?;

    if runs.is_empty() {
        info!(pull_request = pull.number, "No failed check runs found");
        return Ok(());
    }

    let mut failed = 0usize;
    for run in &runs {
        // Only Actions jobs can be re-run; their check run id is the job id
        if run.run_id().is_none() {
            warn!(name = %run.name, id = run.id, "Not a GitHub Actions job, skipping");
            continue;
        }
        let job_id = run.job_id().unwrap_or(run.id);

        match client.rerun_job(repo, job_id).await {
            Ok(()) => println!("Re-running {} (job {})", run.name, job_id),
            Err(err) => {
                warn!(name = %run.name, job_id, error = %err, "Failed to re-run job");
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} failed jobs could not be re-run", runs.len());
    }
    Ok(())
}

/// Re-request review for a pull request
async fn cmd_rerequest(
    client: &GitHubClient,
    repo: &Repository,
    pr: u64,
    requested: &[String],
    exclude_approved: bool,
    expand_team: bool,
) -> Result<()> {
    let pull = get_pull_request(client, repo, pr).await?;

    let request = if requested.is_empty() {
        let reviews = client
            .list_reviews(repo, pr)
            .await
            .with_context(|| format!("Failed to get reviews for pull request #{pr}"))?;
        let latest = latest_reviews(&reviews);
        if latest.is_empty() {
            bail!(
                "No reviews found for pull request #{}, please specify reviewers using --reviewers",
                pull.number
            );
        }

        let request = reviewers::from_latest_reviews(&latest, exclude_approved);
        if request.is_empty() {
            bail!(
                "No eligible reviewers found for pull request #{} (all reviewers may be approved)",
                pull.number
            );
        }
        info!(pr = pull.number, "Re-requesting review from reviewers who have already reviewed");
        request
    } else {
        let mut request = ReviewersRequest::parse(requested)?;

        if expand_team {
            request = client
                .expand_team_reviewers(request)
                .await
                .context("Failed to expand team reviewers")?;
            info!(count = request.reviewers.len(), "Expanded team reviewers to individual members");
        }

        if exclude_approved {
            let reviews = client
                .list_reviews(repo, pr)
                .await
                .with_context(|| format!("Failed to get approved reviewers for pull request #{pr}"))?;
            let approved = approved_reviewers(&latest_reviews(&reviews));

            let mut members = HashMap::new();
            for team in &request.teams {
                let logins = client
                    .list_team_members(team)
                    .await
                    .with_context(|| format!("Failed to get members of team '{team}'"))?
                    .into_iter()
                    .map(|user| user.login)
                    .collect::<Vec<_>>();
                members.insert(team.clone(), logins);
            }

            request = reviewers::drop_approved(request, &approved, &members);
            if request.is_empty() {
                bail!(
                    "No eligible reviewers found for pull request #{} (all specified reviewers have already approved)",
                    pull.number
                );
            }
        }

        info!(pr = pull.number, "Re-requesting review from specified reviewers");
        request
    };

    client
        .request_reviewers(repo, pr, &request)
        .await
        .with_context(|| format!("Failed to re-request review for pull request #{pr}"))?;

    println!("Successfully re-requested review for pull request #{}", pull.number);
    Ok(())
}
