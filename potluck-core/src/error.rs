use thiserror::Error;

use crate::form::ValidationError;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP request failed: {0}")]
    Network(String),

    #[error("Server returned {status}: {message}")]
    Status { status: u16, message: String },
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        TransportError::Network(e.to_string())
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid stored value: {0}")]
    Corrupt(String),
}

/// Everything that can go wrong between an edited form and the server.
///
/// None of these are fatal: each is recoverable by the user re-submitting or
/// re-authenticating.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Session expired, sign in again")]
    SessionExpired,

    #[error("Not signed in: {0}")]
    Unauthorized(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Unexpected response body: {0}")]
    Decode(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<serde_json::Error> for SyncError {
    fn from(e: serde_json::Error) -> Self {
        SyncError::Decode(e.to_string())
    }
}
