//! Connection settings for the remote stage services.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Environment variable holding the service base URL.
pub const API_URL_ENV: &str = "DXFLOW_API_URL";

/// Environment variable holding the request timeout in seconds.
pub const TIMEOUT_ENV: &str = "DXFLOW_TIMEOUT_SECONDS";

/// Errors raised by configuration validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// The base URL is empty.
    #[error("API base URL cannot be empty")]
    EmptyBaseUrl,

    /// The base URL is not http(s).
    #[error("API base URL must start with http:// or https://, got '{0}'")]
    InvalidBaseUrl(String),

    /// The timeout is zero, negative, or not a number.
    #[error("Timeout must be a positive number of seconds, got {0}")]
    InvalidTimeout(String),

    /// A configured header name or value is not valid HTTP.
    #[error("Invalid header '{0}'")]
    InvalidHeader(String),

    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),
}

/// Configuration for the HTTP stage client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL all stage endpoints are relative to.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: f64,
    /// User agent string.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Additional headers sent with every request.
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout() -> f64 {
    // OCR and note assembly on long documents routinely take minutes.
    120.0
}

fn default_user_agent() -> String {
    concat!("dxflow/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout(),
            user_agent: default_user_agent(),
            headers: HashMap::new(),
        }
    }
}

impl ClientConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a configuration from `DXFLOW_API_URL` and
    /// `DXFLOW_TIMEOUT_SECONDS`, falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the timeout variable is set but not a number, or
    /// if the resulting configuration does not validate.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(url) = lookup(API_URL_ENV) {
            config.base_url = url;
        }
        if let Some(raw) = lookup(TIMEOUT_ENV) {
            config.timeout_seconds = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidTimeout(raw.clone()))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Sets the base URL.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the timeout.
    #[must_use]
    pub fn with_timeout(mut self, seconds: f64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Sets the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Gets timeout as Duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_seconds)
    }

    /// Joins an endpoint path onto the base URL.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.base_url.trim();
        if url.is_empty() {
            return Err(ConfigError::EmptyBaseUrl);
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidBaseUrl(url.to_string()));
        }
        if !self.timeout_seconds.is_finite() || self.timeout_seconds <= 0.0 {
            return Err(ConfigError::InvalidTimeout(self.timeout_seconds.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:8000");
        assert_eq!(config.timeout(), Duration::from_secs(120));
        assert!(config.user_agent.starts_with("dxflow/"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_endpoint_joining() {
        let config = ClientConfig::new().with_base_url("https://api.example.com/v1/");
        assert_eq!(config.endpoint("/ocr"), "https://api.example.com/v1/ocr");
        assert_eq!(config.endpoint("new_run"), "https://api.example.com/v1/new_run");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert_eq!(
            ClientConfig::new().with_base_url("  ").validate(),
            Err(ConfigError::EmptyBaseUrl)
        );
        assert!(matches!(
            ClientConfig::new().with_base_url("ftp://x").validate(),
            Err(ConfigError::InvalidBaseUrl(_))
        ));
        assert!(matches!(
            ClientConfig::new().with_timeout(0.0).validate(),
            Err(ConfigError::InvalidTimeout(_))
        ));
    }

    #[test]
    fn test_from_lookup() {
        let config = ClientConfig::from_lookup(|key| match key {
            API_URL_ENV => Some("https://coding.example.org".to_string()),
            TIMEOUT_ENV => Some(" 30 ".to_string()),
            _ => None,
        })
        .unwrap();

        assert_eq!(config.base_url, "https://coding.example.org");
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_from_lookup_bad_timeout() {
        let err = ClientConfig::from_lookup(|key| (key == TIMEOUT_ENV).then(|| "soon".to_string()))
            .unwrap_err();
        assert_eq!(err, ConfigError::InvalidTimeout("soon".to_string()));
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"base_url": "https://x.example"}"#).unwrap();
        assert_eq!(config.timeout_seconds, 120.0);
        assert!(config.headers.is_empty());
    }
}
