//! HTTP client for the menu analysis endpoints
//!
//! Fetches a menu analysis into an `AnalysisSession` and posts per-level results back,
//! carrying the Django session cookie and the `X-CSRFToken` header.

pub mod api;
pub mod csrf;
pub mod wire;

use thiserror::Error;

use crate::models::SessionError;

pub use api::ApiClient;
pub use wire::{AnalysisResponse, SaveLevelRequest, SaveLevelResponse, ServerEnvelope};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Server rejected the request: {0}")]
    Rejected(String),

    #[error("CSRF token not found in cookie 'csrftoken' or form field 'csrfmiddlewaretoken'")]
    MissingCsrfToken,

    #[error(transparent)]
    Session(#[from] SessionError),
}

pub type ClientResult<T> = Result<T, ClientError>;
