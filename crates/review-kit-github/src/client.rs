//! GitHub REST client
//!
//! Two `reqwest` clients share one configuration: API calls go through a
//! client that never follows redirects (the log endpoints answer with one),
//! storage downloads go through a client with the default redirect policy.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, LOCATION};
use reqwest::redirect::Policy;
use reqwest::{Method, RequestBuilder, Response, Url};
use review_kit_core::{HttpResponse, HttpTransport, RedirectMode, RunLogError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::GitHubConfig;
use crate::error::GitHubError;
use crate::Result;

const USER_AGENT: &str = concat!("review-kit/", env!("CARGO_PKG_VERSION"));
const API_VERSION: &str = "2022-11-28";

/// Items requested per page on list endpoints.
pub const PER_PAGE: usize = 100;

/// GitHub API client
pub struct GitHubClient {
    config: GitHubConfig,
    api_base: Url,
    api: reqwest::Client,
    storage: reqwest::Client,
}

impl GitHubClient {
    /// Create a new GitHub client
    pub fn new(config: GitHubConfig) -> Result<Self> {
        let api_base = Url::parse(&config.api_url).map_err(|e| {
            GitHubError::InvalidArgument(format!("invalid API URL {:?}: {e}", config.api_url))
        })?;
        let api = Self::builder(&config).redirect(Policy::none()).build()?;
        let storage = Self::builder(&config).build()?;

        Ok(GitHubClient {
            config,
            api_base,
            api,
            storage,
        })
    }

    fn builder(config: &GitHubConfig) -> reqwest::ClientBuilder {
        let builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if config.timeout_secs > 0 {
            builder.timeout(Duration::from_secs(config.timeout_secs))
        } else {
            builder
        }
    }

    pub fn config(&self) -> &GitHubConfig {
        &self.config
    }

    /// Absolute URL for an API path such as `/repos/o/r/pulls/1`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_url, path)
    }

    /// Same origin as the API base, and a path under the base path.
    fn is_api_url(&self, url: &str) -> bool {
        let Ok(url) = Url::parse(url) else {
            return false;
        };
        let base = &self.api_base;
        if url.scheme() != base.scheme()
            || url.host_str() != base.host_str()
            || url.port_or_known_default() != base.port_or_known_default()
        {
            return false;
        }

        let prefix = base.path().trim_end_matches('/');
        match url.path().strip_prefix(prefix) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }

    /// Attach API headers. Credentials only ever go to the API host, never
    /// to the storage hosts logs are served from.
    fn request(&self, client: &reqwest::Client, method: Method, url: &str) -> RequestBuilder {
        let builder = client.request(method, url);
        if !self.is_api_url(url) {
            return builder;
        }
        let builder = builder
            .header(ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION);
        match self.config.token.as_deref() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, method: Method, path: &str, body: Option<&serde_json::Value>) -> Result<Response> {
        let url = self.url(path);
        let mut builder = self.request(&self.api, method.clone(), &url);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        debug!(%method, %url, status = response.status().as_u16(), "GitHub API call");
        check_status(response, &url).await
    }

    /// GET a JSON document.
    pub async fn get_json<D: DeserializeOwned>(&self, path: &str) -> Result<D> {
        let response = self.send(Method::GET, path, None).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// POST a JSON body, decoding the JSON reply.
    pub async fn post_json<B: Serialize, D: DeserializeOwned>(&self, path: &str, body: &B) -> Result<D> {
        let body = serde_json::to_value(body)?;
        let response = self.send(Method::POST, path, Some(&body)).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// POST with no body, ignoring the reply body.
    pub async fn post_empty(&self, path: &str) -> Result<()> {
        self.send(Method::POST, path, None).await?;
        Ok(())
    }

    /// GET every page of a list endpoint.
    ///
    /// `items` pulls the list out of one page; paging stops at the first
    /// page shorter than [`PER_PAGE`].
    pub async fn get_all<P, D, F>(&self, path: &str, items: F) -> Result<Vec<D>>
    where
        P: DeserializeOwned,
        F: Fn(P) -> Vec<D>,
    {
        let separator = if path.contains('?') { '&' } else { '?' };
        let mut all = Vec::new();

        for page in 1u32.. {
            let page_path = format!("{path}{separator}per_page={PER_PAGE}&page={page}");
            let page_items = items(self.get_json(&page_path).await?);
            let count = page_items.len();
            all.extend(page_items);
            if count < PER_PAGE {
                break;
            }
        }
        Ok(all)
    }
}

#[async_trait]
impl HttpTransport for GitHubClient {
    fn api_base(&self) -> &str {
        &self.config.api_url
    }

    async fn get(&self, url: &str, redirects: RedirectMode) -> review_kit_core::Result<HttpResponse> {
        let client = match redirects {
            RedirectMode::Manual => &self.api,
            RedirectMode::Follow => &self.storage,
        };
        let download_error = |err: reqwest::Error| RunLogError::Download {
            url: url.to_string(),
            reason: err.to_string(),
        };

        let response = self
            .request(client, Method::GET, url)
            .send()
            .await
            .map_err(download_error)?;

        let status = response.status().as_u16();
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        debug!(url, status, location = location.as_deref(), "log transport GET");

        let body = response.bytes().await.map_err(download_error)?;
        Ok(HttpResponse {
            status,
            location,
            body,
        })
    }
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
}

async fn check_status(response: Response, url: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    Err(GitHubError::Api {
        status: status.as_u16(),
        url: url.to_string(),
        message: error_message(&text),
    })
}

/// The `message` field of an API error body, or the raw text.
pub(crate) fn error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.message)
        .unwrap_or_else(|_| body.trim().to_string())
}
