//! In-memory transport fake (testing only)
//!
//! `ScriptedTransport` answers GET requests from a fixed URL → response
//! table and records every request it sees. Unknown URLs answer `404`.
//! In [`RedirectMode::Follow`] it follows scripted redirects itself, like a
//! real HTTP client would.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::{Result, RunLogError};
use crate::transport::{join_location, HttpResponse, HttpTransport, RedirectMode};

/// Redirects followed in `Follow` mode before giving up.
const FOLLOW_LIMIT: usize = 10;

#[derive(Debug, Default)]
pub struct ScriptedTransport {
    api_base: String,
    routes: HashMap<String, HttpResponse>,
    requests: Mutex<Vec<(String, RedirectMode)>>,
}

impl ScriptedTransport {
    pub fn new(api_base: impl Into<String>) -> Self {
        ScriptedTransport {
            api_base: api_base.into(),
            ..Default::default()
        }
    }

    pub fn with_response(mut self, url: impl Into<String>, response: HttpResponse) -> Self {
        self.routes.insert(url.into(), response);
        self
    }

    /// Answer `url` with `200` and `value` serialized as JSON.
    pub fn with_json<V: Serialize>(self, url: impl Into<String>, value: &V) -> Self {
        let body = serde_json::to_vec(value).unwrap_or_default();
        self.with_response(url, HttpResponse::new(200, body))
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<(String, RedirectMode)> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn lookup(&self, url: &str) -> HttpResponse {
        self.routes
            .get(url)
            .cloned()
            .unwrap_or_else(|| HttpResponse::new(404, "{\"message\":\"Not Found\"}"))
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    fn api_base(&self) -> &str {
        &self.api_base
    }

    async fn get(&self, url: &str, redirects: RedirectMode) -> Result<HttpResponse> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push((url.to_string(), redirects));
        }

        let mut current = url.to_string();
        let mut response = self.lookup(&current);
        if redirects == RedirectMode::Manual {
            return Ok(response);
        }

        for _ in 0..FOLLOW_LIMIT {
            match response.location.as_deref() {
                Some(location) if response.is_redirect() => {
                    current = join_location(&current, location);
                    response = self.lookup(&current);
                }
                _ => return Ok(response),
            }
        }
        Err(RunLogError::Download {
            url: url.to_string(),
            reason: "too many redirects".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_manual_mode_returns_redirect() {
        let transport = ScriptedTransport::new("https://api.test")
            .with_response("https://a.test/x", HttpResponse::redirect(302, "https://b.test/y"));

        let response = transport
            .get("https://a.test/x", RedirectMode::Manual)
            .await
            .unwrap();
        assert_eq!(response.status, 302);
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_follow_mode_reaches_terminal_response() {
        let transport = ScriptedTransport::new("https://api.test")
            .with_response("https://a.test/x", HttpResponse::redirect(302, "https://b.test/y"))
            .with_response("https://b.test/y", HttpResponse::new(200, "payload"));

        let response = transport
            .get("https://a.test/x", RedirectMode::Follow)
            .await
            .unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(&response.body[..], b"payload");
    }

    #[tokio::test]
    async fn test_unknown_url_is_not_found() {
        let transport = ScriptedTransport::new("https://api.test");
        let response = transport
            .get("https://nowhere.test", RedirectMode::Follow)
            .await
            .unwrap();
        assert_eq!(response.status, 404);
    }

    #[tokio::test]
    async fn test_redirect_loop_is_an_error() {
        let transport = ScriptedTransport::new("https://api.test")
            .with_response("https://a.test/x", HttpResponse::redirect(302, "https://a.test/x"));
        let err = transport
            .get("https://a.test/x", RedirectMode::Follow)
            .await
            .unwrap_err();
        assert!(matches!(err, RunLogError::Download { .. }));
    }
}
