//! # Configuration
//!
//! Client settings, read from the environment (and an optional `.env` file)
//! with defaults for anything unset.

use serde::{Deserialize, Serialize};
use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{ClientError, Result};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_AUTOSAVE_DEBOUNCE_MS: u64 = 1000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_ATTACHMENTS: usize = 5;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Root of the backend, without the `/api` prefix.
    pub base_url: String,
    /// Sent as a bearer token when set.
    pub api_token: Option<String>,
    pub autosave_debounce_ms: u64,
    pub request_timeout_secs: u64,
    /// Files allowed per builder message.
    pub max_attachments: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_token: None,
            autosave_debounce_ms: DEFAULT_AUTOSAVE_DEBOUNCE_MS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            max_attachments: DEFAULT_MAX_ATTACHMENTS,
        }
    }
}

impl ClientConfig {
    /// Loads `.env` if present, then reads `STUDIO_*` variables over the defaults.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let mut config = Self::default();
        if let Ok(url) = env::var("STUDIO_API_URL") {
            config.base_url = url;
        }
        config.api_token = env::var("STUDIO_API_TOKEN").ok().filter(|t| !t.is_empty());
        if let Some(ms) = parse_var("STUDIO_AUTOSAVE_DEBOUNCE_MS")? {
            config.autosave_debounce_ms = ms;
        }
        if let Some(secs) = parse_var("STUDIO_REQUEST_TIMEOUT_SECS")? {
            config.request_timeout_secs = secs;
        }
        if let Some(max) = parse_var("STUDIO_MAX_ATTACHMENTS")? {
            config.max_attachments = max;
        }

        tracing::debug!(
            base_url = %config.base_url,
            has_token = config.api_token.is_some(),
            "Loaded client configuration"
        );
        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    pub fn with_autosave_debounce(mut self, debounce: Duration) -> Self {
        self.autosave_debounce_ms = debounce.as_millis() as u64;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_secs = timeout.as_secs();
        self
    }

    pub fn with_max_attachments(mut self, max: usize) -> Self {
        self.max_attachments = max;
        self
    }

    pub fn autosave_debounce(&self) -> Duration {
        Duration::from_millis(self.autosave_debounce_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_var<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| ClientError::Config(format!("{name}={raw:?}: {e}"))),
        Err(_) => Ok(None),
    }
}
