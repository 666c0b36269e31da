//! Fetch boundary: turns a configured source endpoint into a [`RawDocument`].
//!
//! Headers and cookies come from the source's config table and are applied per
//! request. One attempt per source; no retry.

use crate::adapters::RawDocument;
use crate::config::{HttpConfig, SourceConfig};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, COOKIE};
use reqwest::Client;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("invalid header '{name}': {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(http: &HttpConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(http.request_timeout_secs))
            .user_agent(&http.user_agent)
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self { client })
    }

    /// Fetch the source's document. The body is kept as text; adapters decide
    /// whether it is markup or JSON.
    pub async fn fetch(&self, source: &SourceConfig) -> Result<RawDocument, FetchError> {
        let headers = request_headers(&source.headers, &source.cookies)?;
        debug!("GET {} ({} headers)", source.url, headers.len());

        let response = self
            .client
            .get(&source.url)
            .headers(headers)
            .send()
            .await
            .map_err(|e| FetchError::Request {
                url: source.url.clone(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: source.url.clone(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(|e| FetchError::Request {
            url: source.url.clone(),
            source: e,
        })?;
        debug!("{} returned {} bytes", source.url, bytes.len());
        Ok(RawDocument::Text(String::from_utf8_lossy(&bytes).into_owned()))
    }
}

/// Header map for one source: its `headers` table plus a `Cookie` header
/// built from its `cookies` table.
pub fn request_headers(
    headers: &BTreeMap<String, String>,
    cookies: &BTreeMap<String, String>,
) -> Result<HeaderMap, FetchError> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| FetchError::InvalidHeader {
            name: name.clone(),
            reason: e.to_string(),
        })?;
        let header_value = HeaderValue::from_str(value).map_err(|e| FetchError::InvalidHeader {
            name: name.clone(),
            reason: e.to_string(),
        })?;
        map.insert(header_name, header_value);
    }

    if !cookies.is_empty() {
        let cookie = cookies
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("; ");
        let value = HeaderValue::from_str(&cookie).map_err(|e| FetchError::InvalidHeader {
            name: COOKIE.to_string(),
            reason: e.to_string(),
        })?;
        map.insert(COOKIE, value);
    }
    Ok(map)
}
