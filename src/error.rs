//! Error types for the token manager, preview extractor and gift client

use reqwest::StatusCode;
use std::sync::Arc;
use thiserror::Error;

/// Failure reading or writing stored credentials
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("credential store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("credential store is corrupt: {0}")]
    Format(#[from] serde_json::Error),
}

/// Why a refresh attempt failed.
///
/// Cloneable: one outcome is handed to every caller waiting on the same
/// in-flight refresh.
#[derive(Debug, Clone, Error)]
pub enum RefreshCause {
    #[error("refresh endpoint returned {0}")]
    Rejected(StatusCode),
    #[error("refresh request failed: {0}")]
    Transport(#[source] Arc<reqwest::Error>),
    #[error("refresh response was malformed: {0}")]
    Malformed(#[source] Arc<reqwest::Error>),
    #[error("could not persist refreshed credentials: {0}")]
    Store(#[source] Arc<StoreError>),
    #[error("refresh task was interrupted")]
    Interrupted,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no access token stored, sign in first")]
    MissingAccessToken,
    #[error("no refresh token stored, sign in first")]
    MissingRefreshToken,
    #[error("token refresh failed: {0}")]
    RefreshFailed(#[source] RefreshCause),
    #[error("auth service rejected the request ({status}): {message}")]
    Rejected { status: StatusCode, message: String },
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("invalid request URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("stored token is not a valid header value")]
    InvalidToken(#[from] reqwest::header::InvalidHeaderValue),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Preview failures. All of them mean "no preview", never a hard failure.
#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("failed to fetch URL: {0}")]
    FetchFailed(String),
    #[error("preview unavailable: {0}")]
    PreviewUnavailable(String),
}

/// Errors from the gift API client
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("gift API returned {status}: {message}")]
    Status { status: StatusCode, message: String },
    #[error("gift API request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl From<url::ParseError> for ApiError {
    fn from(e: url::ParseError) -> Self {
        ApiError::Auth(AuthError::InvalidUrl(e))
    }
}
