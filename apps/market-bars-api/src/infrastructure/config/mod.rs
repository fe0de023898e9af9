//! Query Service Configuration
//!
//! Loaded from environment variables.
//!
//! # Environment Variables
//!
//! - `ALPACA_KEY` / `ALPACA_SECRET` (required)
//! - `ALPACA_DATA_URL`: market data base URL (default: <https://data.alpaca.markets>)
//! - `ALPACA_FEED`: `sip` or `iex` (default: account default)
//! - `BARS_API_PORT`: listener port (default: 8000)

use std::time::Duration;

/// Default market data base URL.
pub const DEFAULT_DATA_URL: &str = "https://data.alpaca.markets";

/// Alpaca API credentials.
#[derive(Clone)]
pub struct Credentials {
    api_key: String,
    api_secret: String,
}

impl Credentials {
    /// Create credentials.
    #[must_use]
    pub const fn new(api_key: String, api_secret: String) -> Self {
        Self {
            api_key,
            api_secret,
        }
    }

    /// API key.
    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// API secret.
    #[must_use]
    pub fn api_secret(&self) -> &str {
        &self.api_secret
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"[REDACTED]")
            .field("api_secret", &"[REDACTED]")
            .finish()
    }
}

/// Historical data client settings.
#[derive(Debug, Clone)]
pub struct DataApiSettings {
    /// Base URL without trailing slash.
    pub base_url: String,
    /// Optional data feed.
    pub feed: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Page size requested per call.
    pub page_limit: u32,
}

impl Default for DataApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_DATA_URL.to_string(),
            feed: None,
            timeout: Duration::from_secs(30),
            page_limit: 10_000,
        }
    }
}

/// Query service configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// API credentials.
    pub credentials: Credentials,
    /// Data API client settings.
    pub data_api: DataApiSettings,
    /// HTTP listener port.
    pub port: u16,
}

impl ApiConfig {
    /// Default listener port.
    pub const DEFAULT_PORT: u16 = 8000;

    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = required_env("ALPACA_KEY")?;
        let api_secret = required_env("ALPACA_SECRET")?;

        let defaults = DataApiSettings::default();
        let data_api = DataApiSettings {
            base_url: optional_env("ALPACA_DATA_URL")
                .map_or(defaults.base_url, |url| url.trim_end_matches('/').to_string()),
            feed: optional_env("ALPACA_FEED"),
            ..defaults
        };

        Ok(Self {
            credentials: Credentials::new(api_key, api_secret),
            data_api,
            port: parse_env("BARS_API_PORT", Self::DEFAULT_PORT),
        })
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
}

fn required_env(key: &str) -> Result<String, ConfigError> {
    let value = std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))?;
    if value.is_empty() {
        return Err(ConfigError::EmptyValue(key.to_string()));
    }
    Ok(value)
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
