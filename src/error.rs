//! Typed errors for configuration and persistence.
//!
//! Fetch failures live in [`crate::fetcher::FetchError`] since the driver
//! consumes them and never lets them escape.

use thiserror::Error;

/// Fatal problems detected before any network activity.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("FIREBASE_SERVICE_ACCOUNT is required")]
    MissingCredential,

    #[error("invalid service account: {0}")]
    InvalidCredential(String),

    #[error("invalid cutoff date {0:?}, expected e.g. \"15 Janvier 2026\"")]
    InvalidCutoff(String),

    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("could not build HTTP client: {0}")]
    HttpClient(String),
}

/// Errors raised while writing records to a sink.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("record has no id: {title}")]
    MissingId { title: String },

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
