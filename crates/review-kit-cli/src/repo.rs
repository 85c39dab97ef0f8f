//! Target repository detection.

use std::path::Path;
use std::process::Command;

use anyhow::{bail, Context, Result};
use review_kit_core::Repository;
use tracing::debug;

/// Pick the repository to operate on: `--repo`, then `GH_REPO`, then the
/// `origin` remote of the git checkout in `dir`.
pub fn resolve_repository(flag: Option<&str>, dir: &Path) -> Result<Repository> {
    let env_repo = std::env::var("GH_REPO").ok().filter(|v| !v.is_empty());
    resolve_from(flag, env_repo.as_deref(), dir)
}

fn resolve_from(flag: Option<&str>, env_repo: Option<&str>, dir: &Path) -> Result<Repository> {
    if let Some(value) = flag {
        return value
            .parse::<Repository>()
            .with_context(|| format!("Invalid --repo value {value:?}"));
    }
    if let Some(value) = env_repo {
        return value
            .parse::<Repository>()
            .with_context(|| format!("Invalid GH_REPO value {value:?}"));
    }

    let url = origin_url(dir).context("No --repo given and no usable git remote")?;
    debug!(%url, "using origin remote");
    Repository::from_remote_url(&url)
        .with_context(|| format!("Cannot derive a GitHub repository from remote {url:?}"))
}

/// URL of the `origin` remote of the repository containing `dir`.
pub fn origin_url(dir: &Path) -> Result<String> {
    let output = Command::new("git")
        .args(["remote", "get-url", "origin"])
        .current_dir(dir)
        .output()
        .context("Failed to run git")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("git remote get-url origin failed: {}", stderr.trim());
    }

    let url = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if url.is_empty() {
        bail!("git remote get-url origin returned empty output");
    }
    Ok(url)
}
