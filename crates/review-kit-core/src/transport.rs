//! HTTP seam between the log resolver and the hosting provider.
//!
//! The resolver needs to see redirect responses itself, so the transport
//! exposes the redirect policy per request instead of hiding it.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// Redirect policy for a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectMode {
    /// Return 3xx responses to the caller untouched
    Manual,
    /// Let the transport follow redirects (storage downloads)
    Follow,
}

/// A response reduced to what the resolver and downloader look at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// Value of the `Location` header, if any
    pub location: Option<String>,
    pub body: Bytes,
}

impl HttpResponse {
    /// A response with a body and no `Location`.
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        HttpResponse {
            status,
            location: None,
            body: body.into(),
        }
    }

    /// An empty-bodied redirect to `location`.
    pub fn redirect(status: u16, location: impl Into<String>) -> Self {
        HttpResponse {
            status,
            location: Some(location.into()),
            body: Bytes::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }
}

/// Minimal GET transport.
///
/// Implementations map network failures to [`crate::RunLogError::Download`];
/// HTTP error statuses are returned as responses, not errors.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Base URL of the REST API, without a trailing slash
    /// (e.g. `https://api.github.com`).
    fn api_base(&self) -> &str;

    /// Issue a GET request.
    async fn get(&self, url: &str, redirects: RedirectMode) -> Result<HttpResponse>;
}

/// Resolve a `Location` value against the URL that produced it.
///
/// Absolute locations are returned as is; origin-relative ones (`/path`)
/// keep the scheme and host of `base`.
pub fn join_location(base: &str, location: &str) -> String {
    if location.contains("://") {
        return location.to_string();
    }
    let origin_end = base
        .find("://")
        .map(|scheme| {
            let after = scheme + 3;
            base[after..].find('/').map_or(base.len(), |i| after + i)
        })
        .unwrap_or(0);
    if location.starts_with('/') {
        format!("{}{}", &base[..origin_end], location)
    } else {
        let dir_end = base.rfind('/').filter(|i| *i >= origin_end).unwrap_or(origin_end);
        format!("{}/{}", &base[..dir_end], location)
    }
}
