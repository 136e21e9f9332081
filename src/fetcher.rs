use std::time::Duration;

use log::debug;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, USER_AGENT};
use thiserror::Error;

use crate::error::ConfigError;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// A page as returned by the upstream site, whatever its status.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub status: u16,
    pub body: String,
}

impl FetchedPage {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("timed out fetching {url}")]
    Timeout { url: String },

    #[error("could not connect to {url}: {message}")]
    Connect { url: String, message: String },

    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },
}

impl FetchError {
    /// Whether another attempt may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Timeout { .. } | FetchError::Connect { .. })
    }

    fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        let url = url.to_string();
        if err.is_timeout() {
            FetchError::Timeout { url }
        } else if err.is_connect() {
            FetchError::Connect { url, message: err.to_string() }
        } else {
            FetchError::Request { url, message: err.to_string() }
        }
    }
}

/// Source of listing pages. `page` is appended as the `page` query parameter when set.
pub trait PageFetcher {
    fn fetch(&self, url: &str, page: Option<u32>) -> Result<FetchedPage, FetchError>;
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, ConfigError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("fr-FR,fr;q=0.9,en;q=0.8"));

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .cookie_store(true)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(HttpFetcher { client })
    }
}

impl PageFetcher for HttpFetcher {
    fn fetch(&self, url: &str, page: Option<u32>) -> Result<FetchedPage, FetchError> {
        let mut request = self.client.get(url);
        if let Some(page) = page {
            request = request.query(&[("page", page)]);
        }

        let resp = request.send().map_err(|e| FetchError::from_reqwest(url, e))?;
        let status = resp.status().as_u16();
        // Rejected pages end the walk; their body is never read.
        if !resp.status().is_success() {
            debug!("{} answered with status {}", url, status);
            return Ok(FetchedPage { status, body: String::new() });
        }
        let body = resp.text().map_err(|e| FetchError::from_reqwest(url, e))?;
        debug!("Fetched {} bytes from {} (status {})", body.len(), url, status);

        Ok(FetchedPage { status, body })
    }
}
