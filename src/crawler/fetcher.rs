//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with the configured user agent and timeouts
//! - GET requests for book and catalog pages
//! - Downloading text and image assets to disk
//! - Redirect detection (the site redirects requests for missing resources)
//! - Error classification

use crate::config::HttpConfig;
use crate::url::sanitize_filename;
use crate::HarvestError;
use reqwest::{redirect::Policy, Client, Response};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Builds an HTTP client with proper configuration
///
/// Redirects are never followed. The library site answers requests for
/// books, pages and files that do not exist with a redirect, so the first
/// 3xx response is all the fetcher needs to see.
///
/// # Example
///
/// ```no_run
/// use library_harvest::config::HttpConfig;
/// use library_harvest::crawler::build_http_client;
///
/// let client = build_http_client(&HttpConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .redirect(Policy::none())
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches pages and assets from the library site
///
/// Cloning is cheap: clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a fetcher with a client configured from `config`
    pub fn from_config(config: &HttpConfig) -> Result<Self, HarvestError> {
        let client = build_http_client(config).map_err(|e| HarvestError::Http {
            url: String::new(),
            source: e,
        })?;
        Ok(Self::new(client))
    }

    /// Fetches an HTML page and returns its body
    ///
    /// # Errors
    ///
    /// | Condition | Error |
    /// |-----------|-------|
    /// | Any 3xx response | `RedirectDetected` |
    /// | HTTP 4xx / 5xx | `HttpStatus` |
    /// | Refused, unreachable, timeout, reset | `Connection` |
    pub async fn fetch_page(&self, url: &Url) -> Result<String, HarvestError> {
        let response = self.get(url).await?;
        response
            .text()
            .await
            .map_err(|e| HarvestError::from_reqwest(url.as_str(), e))
    }

    /// Downloads `url` into `dest_dir` and returns the filename actually used
    ///
    /// `preferred_filename` is sanitized before use. The directory (and its
    /// parents) is created when missing and an existing file with the same
    /// name is overwritten, so fetching the same asset twice leaves one
    /// identical file. The body is written byte for byte.
    pub async fn fetch_asset(
        &self,
        url: &Url,
        dest_dir: &Path,
        preferred_filename: &str,
    ) -> Result<String, HarvestError> {
        let response = self.get(url).await?;
        let body = response
            .bytes()
            .await
            .map_err(|e| HarvestError::from_reqwest(url.as_str(), e))?;

        let filename = sanitize_filename(preferred_filename);
        tokio::fs::create_dir_all(dest_dir).await?;
        tokio::fs::write(dest_dir.join(&filename), &body).await?;

        tracing::debug!(
            "Saved {} ({} bytes) as {}",
            url,
            body.len(),
            dest_dir.join(&filename).display()
        );
        Ok(filename)
    }

    /// Sends a GET request and rejects redirects and error statuses
    async fn get(&self, url: &Url) -> Result<Response, HarvestError> {
        tracing::trace!("GET {}", url);
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| HarvestError::from_reqwest(url.as_str(), e))?;

        check_response(url, &response)?;
        Ok(response)
    }
}

/// Classifies a response by its status
///
/// A redirect is reported as `RedirectDetected` whatever its target would
/// have answered; redirects are checked before error statuses.
fn check_response(url: &Url, response: &Response) -> Result<(), HarvestError> {
    let status = response.status();

    if status.is_redirection() {
        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        tracing::debug!("{} redirected ({}) to '{}'", url, status, location);
        return Err(HarvestError::RedirectDetected {
            url: url.to_string(),
        });
    }

    if status.is_client_error() || status.is_server_error() {
        return Err(HarvestError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    Ok(())
}
