//! HTTP transport abstraction and its `reqwest` implementation.
//!
//! The fetch layer and the updater only ever see [`HttpTransport`], so tests
//! substitute a scripted fake and no test touches the network.

use crate::config::FetchConfig;
use crate::core::HostError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, RETRY_AFTER};
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::debug;

const USER_AGENT: &str = concat!("hostkeep/", env!("CARGO_PKG_VERSION"));
const GITHUB_API_HOST: &str = "api.github.com";

/// Status, body and rate-limit hint of a metadata response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
    /// Raw `Retry-After` header value.
    pub retry_after: Option<String>,
}

impl HttpResponse {
    #[must_use]
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            retry_after: None,
        }
    }

    #[must_use]
    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: String::new(),
            retry_after: None,
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Issue a metadata GET. `Err` means the request never produced a status.
    async fn get(&self, url: &str) -> Result<HttpResponse, HostError>;

    /// Stream `url` into `dest`, returning the number of bytes written.
    ///
    /// Any non-success status is an error.
    async fn download(&self, url: &str, dest: &Path) -> Result<u64, HostError>;

    /// Whether requests to `url` carry credentials.
    fn has_credentials(&self, url: &str) -> bool;
}

/// Whether `url` targets an upstream with low anonymous rate limits.
#[must_use]
pub fn is_github_api(url: &str) -> bool {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.eq_ignore_ascii_case(GITHUB_API_HOST)))
        .unwrap_or(false)
}

/// Map a non-success download status onto the error taxonomy.
#[must_use]
pub fn status_error(url: &str, status: u16, retry_after: Option<&str>) -> HostError {
    match status {
        401 | 403 => HostError::AuthDenied {
            url: url.to_string(),
            status,
        },
        429 => HostError::RateLimited {
            url: url.to_string(),
            retry_after_secs: retry_after.and_then(|v| v.trim().parse().ok()),
        },
        _ => HostError::TransientNetwork {
            url: url.to_string(),
            reason: format!("HTTP {status}"),
        },
    }
}

/// `reqwest`-backed transport with separate metadata and download timeouts.
pub struct ReqwestTransport {
    metadata: Client,
    downloads: Client,
    github_token: Option<String>,
}

impl ReqwestTransport {
    pub fn new(config: &FetchConfig, github_token: Option<String>) -> Result<Self> {
        let metadata = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.metadata_timeout())
            .build()
            .context("Failed to build HTTP client")?;
        let downloads = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.download_timeout())
            .build()
            .context("Failed to build download client")?;

        Ok(Self {
            metadata,
            downloads,
            github_token,
        })
    }

    fn request(&self, client: &Client, url: &str) -> reqwest::RequestBuilder {
        let builder = client.get(url);
        match &self.github_token {
            Some(token) if is_github_api(url) => {
                builder.header(AUTHORIZATION, format!("Bearer {token}"))
            }
            _ => builder,
        }
    }
}

fn network_error(url: &str, error: &reqwest::Error) -> HostError {
    HostError::TransientNetwork {
        url: url.to_string(),
        reason: error.to_string(),
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse, HostError> {
        let response = self
            .request(&self.metadata, url)
            .send()
            .await
            .map_err(|e| network_error(url, &e))?;

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await.map_err(|e| network_error(url, &e))?;

        Ok(HttpResponse {
            status,
            body,
            retry_after,
        })
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<u64, HostError> {
        let response = self
            .request(&self.downloads, url)
            .send()
            .await
            .map_err(|e| network_error(url, &e))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            return Err(status_error(url, status.as_u16(), retry_after.as_deref()));
        }

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut written = 0u64;
        {
            let mut file = tokio::fs::File::create(dest).await?;
            let mut stream = response.bytes_stream();
            while let Some(chunk) = stream.next().await {
                let chunk = chunk.map_err(|e| network_error(url, &e))?;
                file.write_all(&chunk).await?;
                written += chunk.len() as u64;
            }
            file.flush().await?;
        }

        debug!("Downloaded {} bytes: {} -> {}", written, url, dest.display());
        Ok(written)
    }

    fn has_credentials(&self, url: &str) -> bool {
        self.github_token.is_some() && is_github_api(url)
    }
}
