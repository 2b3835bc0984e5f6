//! Provider configuration
//!
//! Settings are read from the environment and may be overridden by the
//! caller (the CLI maps its flags onto the same fields).

use std::fmt;
use std::time::Duration;

use clumio_core::poll::PollConfig;
use thiserror::Error;
use url::Url;

pub const ENV_BASE_URL: &str = "CLUMIO_API_BASE_URL";
pub const ENV_API_TOKEN: &str = "CLUMIO_API_TOKEN";
pub const ENV_ORGANIZATIONAL_UNIT: &str = "CLUMIO_ORGANIZATIONAL_UNIT_CONTEXT";
pub const ENV_POLL_INTERVAL: &str = "CLUMIO_POLL_INTERVAL_SECS";
pub const ENV_POLL_TIMEOUT: &str = "CLUMIO_POLL_TIMEOUT_SECS";

/// Errors that can occur while building the configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Invalid base URL {url}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("Invalid value for {name}: {value}")]
    InvalidNumber { name: &'static str, value: String },

    #[error("Invalid poll settings: {0}")]
    InvalidPoll(String),
}

/// Connection settings for the Clumio API
#[derive(Clone, PartialEq, Eq)]
pub struct ClumioConfig {
    pub base_url: String,
    pub api_token: String,
    /// Organizational unit every request runs under, unless a call is
    /// explicitly scoped to another one
    pub organizational_unit_context: Option<String>,
    pub poll: PollConfig,
}

impl fmt::Debug for ClumioConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClumioConfig")
            .field("base_url", &self.base_url)
            .field("api_token", &"<redacted>")
            .field(
                "organizational_unit_context",
                &self.organizational_unit_context,
            )
            .field("poll", &self.poll)
            .finish()
    }
}

impl ClumioConfig {
    pub fn new(base_url: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_token: api_token.into(),
            organizational_unit_context: None,
            poll: PollConfig::default(),
        }
    }

    pub fn with_organizational_unit(mut self, organizational_unit_id: impl Into<String>) -> Self {
        self.organizational_unit_context = Some(organizational_unit_id.into());
        self
    }

    pub fn with_poll(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Load the configuration through a lookup keyed by environment variable name
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let base_url = get(ENV_BASE_URL).ok_or(ConfigError::Missing(ENV_BASE_URL))?;
        let api_token = get(ENV_API_TOKEN).ok_or(ConfigError::Missing(ENV_API_TOKEN))?;

        let mut poll = PollConfig::default();
        if let Some(value) = get(ENV_POLL_INTERVAL) {
            poll.interval = parse_secs(ENV_POLL_INTERVAL, &value)?;
        }
        if let Some(value) = get(ENV_POLL_TIMEOUT) {
            poll.timeout = parse_secs(ENV_POLL_TIMEOUT, &value)?;
        }

        let config = Self {
            base_url,
            api_token,
            organizational_unit_context: get(ENV_ORGANIZATIONAL_UNIT),
            poll,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_token.trim().is_empty() {
            return Err(ConfigError::Missing(ENV_API_TOKEN));
        }
        self.parsed_base_url()?;
        if self.poll.interval.is_zero() || self.poll.timeout.is_zero() {
            return Err(ConfigError::InvalidPoll(
                "interval and timeout must be greater than zero".to_string(),
            ));
        }
        if self.poll.interval > self.poll.timeout {
            return Err(ConfigError::InvalidPoll(format!(
                "interval {:?} exceeds timeout {:?}",
                self.poll.interval, self.poll.timeout
            )));
        }
        Ok(())
    }

    /// Base URL with a trailing slash, so relative API paths join under it
    pub fn parsed_base_url(&self) -> Result<Url, ConfigError> {
        let raw = self.base_url.trim();
        let raw = if raw.contains("://") {
            raw.to_string()
        } else {
            format!("https://{}", raw)
        };
        let mut url = Url::parse(&raw).map_err(|e| ConfigError::InvalidBaseUrl {
            url: self.base_url.clone(),
            reason: e.to_string(),
        })?;
        if url.scheme() != "https" && url.scheme() != "http" {
            return Err(ConfigError::InvalidBaseUrl {
                url: self.base_url.clone(),
                reason: format!("unsupported scheme {}", url.scheme()),
            });
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }
}

fn parse_secs(name: &'static str, value: &str) -> Result<Duration, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| ConfigError::InvalidNumber {
            name,
            value: value.to_string(),
        })
}
