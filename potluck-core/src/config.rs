//! Client configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::error::TransportError;
use crate::http::ReqwestTransport;
use crate::store::FileStore;

/// Default recipe service URL.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: String, value: String },
}

/// Recipe client configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Base URL of the recipe service.
    pub api_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// File the signed-in session is persisted to.
    pub session_file: PathBuf,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Optional:
    /// - `POTLUCK_API_URL`: Service base URL (default: "http://localhost:8000")
    /// - `POTLUCK_HTTP_TIMEOUT_SECS`: Request timeout (default: 30)
    /// - `POTLUCK_SESSION_FILE`: Session file (default: "~/.potluck/session.json")
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_url = lookup("POTLUCK_API_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let timeout_secs = match lookup("POTLUCK_HTTP_TIMEOUT_SECS") {
            Some(v) => v
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::InvalidValue {
                    name: "POTLUCK_HTTP_TIMEOUT_SECS".to_string(),
                    value: v,
                })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        let session_file = lookup("POTLUCK_SESSION_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(FileStore::default_path);

        Ok(Self {
            api_url,
            timeout: Duration::from_secs(timeout_secs),
            session_file,
        })
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// Build the production transport for this configuration.
    pub fn transport(&self) -> Result<ReqwestTransport, TransportError> {
        ReqwestTransport::builder(self.api_url.clone())
            .timeout(self.timeout)
            .build()
    }

    pub fn session_store(&self) -> FileStore {
        FileStore::new(self.session_file.clone())
    }
}
