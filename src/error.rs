//! Error types for the search service

use std::io;

use axum::http::StatusCode;
use thiserror::Error;

/// Result type alias for the search service
pub type Result<T> = std::result::Result<T, Error>;

/// Search service errors
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Request failed validation
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Search provider failure (transport error or non-success status)
    #[error("Search provider error: {0}")]
    SearchProvider(String),

    /// LLM filtering failure (transport, API, or response-parse error)
    #[error("Filter error: {0}")]
    Filter(String),

    /// The provider returned zero results for the query
    #[error("No results found")]
    NoResults,

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to the HTTP status returned to the caller.
    ///
    /// Provider and filter failures surface as 502 (the upstream service is
    /// unavailable, not this one); an empty provider result is 404; bad
    /// input is 422; everything else is an internal 500.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NoResults => StatusCode::NOT_FOUND,
            Self::SearchProvider(_) | Self::Filter(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The detail string exposed to the caller.
    ///
    /// Upstream failures are reported generically; the underlying provider
    /// message goes to the log, not the response body.
    #[must_use]
    pub fn public_detail(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::NoResults => "No results found".to_string(),
            Self::SearchProvider(_) => "Search service unavailable".to_string(),
            Self::Filter(_) => "Filtering service unavailable".to_string(),
            _ => "Internal server error".to_string(),
        }
    }
}
