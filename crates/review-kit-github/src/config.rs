//! Client configuration
//!
//! Resolved from the same environment the `gh` CLI reads: `GH_HOST` for the
//! host, then `GH_TOKEN`, `GITHUB_TOKEN` or `gh auth token` for credentials.

use std::process::Command;

use tracing::debug;

pub const DEFAULT_HOST: &str = "github.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// GitHub client configuration
#[derive(Clone)]
pub struct GitHubConfig {
    /// Host name (`github.com` or an Enterprise Server host)
    pub host: String,
    /// REST API base URL, without trailing slash
    pub api_url: String,
    /// Token sent as `Authorization: Bearer` to the API host
    pub token: Option<String>,
    /// Per-request timeout in seconds (0 = none)
    pub timeout_secs: u64,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        GitHubConfig::new(DEFAULT_HOST)
    }
}

impl GitHubConfig {
    /// Config for `host` with no token.
    pub fn new(host: &str) -> Self {
        GitHubConfig {
            host: host.to_string(),
            api_url: api_url_for_host(host),
            token: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Create a new config from environment variables, falling back to the
    /// `gh` CLI for the token.
    pub fn from_env() -> Self {
        Self::from_env_for_host(None)
    }

    /// Like [`GitHubConfig::from_env`], but an explicit host (e.g. from a
    /// `HOST/OWNER/REPO` argument) takes precedence over `GH_HOST`.
    pub fn from_env_for_host(host: Option<&str>) -> Self {
        let host = host
            .map(str::to_string)
            .or_else(|| std::env::var("GH_HOST").ok())
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let mut config = GitHubConfig::new(&host);
        config.token = token_from_env().or_else(|| token_from_gh(&host));
        config
    }

    /// Set authentication token
    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    /// Override the API base URL
    pub fn with_api_url(mut self, api_url: &str) -> Self {
        self.api_url = api_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

impl std::fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("host", &self.host)
            .field("api_url", &self.api_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// REST API base URL for a host.
///
/// `github.com` is served from `api.github.com`; Enterprise Server hosts
/// serve the API under `/api/v3`.
pub fn api_url_for_host(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host == DEFAULT_HOST || host == "api.github.com" {
        "https://api.github.com".to_string()
    } else {
        format!("https://{host}/api/v3")
    }
}

fn token_from_env() -> Option<String> {
    ["GH_TOKEN", "GITHUB_TOKEN"]
        .iter()
        .filter_map(|key| std::env::var(key).ok())
        .find(|token| !token.trim().is_empty())
}

fn token_from_gh(host: &str) -> Option<String> {
    let output = Command::new("gh")
        .args(["auth", "token", "--hostname", host])
        .output()
        .ok()?;

    if !output.status.success() {
        debug!("gh auth token failed for {host}");
        return None;
    }
    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = GitHubConfig::default();
        assert_eq!(config.host, "github.com");
        assert_eq!(config.api_url, "https://api.github.com");
        assert!(config.token.is_none());
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn test_enterprise_host_api_url() {
        let config = GitHubConfig::new("ghe.example.com");
        assert_eq!(config.api_url, "https://ghe.example.com/api/v3");
    }

    #[test]
    fn test_explicit_host_overrides_environment() {
        let config = GitHubConfig::from_env_for_host(Some("ghe.example.com"));
        assert_eq!(config.host, "ghe.example.com");
        assert_eq!(config.api_url, "https://ghe.example.com/api/v3");
    }

    #[test]
    fn test_config_builders() {
        let config = GitHubConfig::default()
            .with_token("secret-token")
            .with_api_url("http://127.0.0.1:8080/")
            .with_timeout(0);
        assert_eq!(config.token.as_deref(), Some("secret-token"));
        assert_eq!(config.api_url, "http://127.0.0.1:8080");
        assert_eq!(config.timeout_secs, 0);
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = GitHubConfig::default().with_token("secret-token");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("<redacted>"));
    }
}
