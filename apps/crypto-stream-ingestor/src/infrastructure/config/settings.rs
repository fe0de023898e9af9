//! Ingestor Configuration Settings
//!
//! Loaded from environment variables. Store organization, host and database
//! are fixed in code; only the token comes from the environment.

use std::time::Duration;

use crate::application::services::backoff::BackoffConfig;

/// Default crypto stream endpoint.
pub const DEFAULT_CRYPTO_STREAM_URL: &str = "wss://stream.data.alpaca.markets/v1beta3/crypto/us";

/// Symbol subscribed for both quotes and bars.
pub const DEFAULT_SYMBOL: &str = "BTC/USD";

/// InfluxDB organization.
pub const INFLUX_ORG: &str = "Dev";

/// InfluxDB host.
pub const INFLUX_HOST: &str = "https://us-east-1-1.aws.cloud2.influxdata.com";

/// InfluxDB database (bucket).
pub const INFLUX_DATABASE: &str = "Bitcoin";

/// Alpaca API credentials.
#[derive(Clone)]
pub struct Credentials {
    api_key: String,
    api_secret: String,
}

impl Credentials {
    /// Create new credentials.
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

/// InfluxDB write target.
#[derive(Clone)]
pub struct InfluxSettings {
    /// Base URL.
    pub host: String,
    /// Organization.
    pub org: String,
    /// Database (bucket).
    pub database: String,
    token: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl InfluxSettings {
    /// Settings for the fixed cloud target.
    #[must_use]
    pub fn new(token: String) -> Self {
        Self {
            host: INFLUX_HOST.to_string(),
            org: INFLUX_ORG.to_string(),
            database: INFLUX_DATABASE.to_string(),
            token,
            timeout: Duration::from_secs(10),
        }
    }

    /// Point at a different host.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// API token.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl std::fmt::Debug for InfluxSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InfluxSettings")
            .field("host", &self.host)
            .field("org", &self.org)
            .field("database", &self.database)
            .field("token", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// WebSocket connection settings.
#[derive(Debug, Clone)]
pub struct WebSocketSettings {
    /// Stream URL.
    pub url: String,
    /// Ping interval.
    pub heartbeat_interval: Duration,
    /// Silence allowed before the connection is considered dead.
    pub heartbeat_timeout: Duration,
    /// Reconnect backoff.
    pub reconnect: BackoffConfig,
}

impl Default for WebSocketSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_CRYPTO_STREAM_URL.to_string(),
            heartbeat_interval: Duration::from_secs(20),
            heartbeat_timeout: Duration::from_secs(20),
            reconnect: BackoffConfig::default(),
        }
    }
}

/// Ingest queue and write retry settings.
#[derive(Debug, Clone)]
pub struct IngestSettings {
    /// Bounded queue capacity between feed and worker.
    pub queue_capacity: usize,
    /// Write retry backoff (`max_attempts` 0 = unlimited).
    pub write_retry: BackoffConfig,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
            write_retry: BackoffConfig::new(
                Duration::from_millis(500),
                Duration::from_secs(30),
                2.0,
                0.1,
                0,
            ),
        }
    }
}

/// Complete ingestor configuration.
#[derive(Debug, Clone)]
pub struct IngestorConfig {
    /// Alpaca credentials.
    pub credentials: Credentials,
    /// Subscribed symbol.
    pub symbol: String,
    /// InfluxDB target.
    pub influx: InfluxSettings,
    /// WebSocket settings.
    pub websocket: WebSocketSettings,
    /// Queue and retry settings.
    pub ingest: IngestSettings,
    /// Health server port.
    pub health_port: u16,
}

impl IngestorConfig {
    /// Default health server port.
    pub const DEFAULT_HEALTH_PORT: u16 = 8083;

    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = required_env("ALPACA_KEY")?;
        let api_secret = required_env("ALPACA_SECRET")?;
        let influx_token = required_env("INFLUXDB_TOKEN")?;

        let ws_defaults = WebSocketSettings::default();
        let reconnect = BackoffConfig {
            initial_delay: parse_env_duration_millis(
                "INGESTOR_RECONNECT_DELAY_INITIAL_MS",
                ws_defaults.reconnect.initial_delay,
            ),
            max_delay: parse_env_duration_secs(
                "INGESTOR_RECONNECT_DELAY_MAX_SECS",
                ws_defaults.reconnect.max_delay,
            ),
            max_attempts: parse_env("INGESTOR_RECONNECT_MAX_ATTEMPTS", 0),
            ..ws_defaults.reconnect
        };
        let websocket = WebSocketSettings {
            url: std::env::var("ALPACA_CRYPTO_STREAM_URL")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or(ws_defaults.url),
            heartbeat_interval: parse_env_duration_secs(
                "INGESTOR_HEARTBEAT_INTERVAL_SECS",
                ws_defaults.heartbeat_interval,
            ),
            heartbeat_timeout: parse_env_duration_secs(
                "INGESTOR_HEARTBEAT_TIMEOUT_SECS",
                ws_defaults.heartbeat_timeout,
            ),
            reconnect,
        };

        let ingest_defaults = IngestSettings::default();
        let ingest = IngestSettings {
            queue_capacity: parse_env("INGESTOR_QUEUE_CAPACITY", ingest_defaults.queue_capacity)
                .max(1),
            write_retry: BackoffConfig {
                max_attempts: parse_env("INGESTOR_WRITE_MAX_ATTEMPTS", 0),
                ..ingest_defaults.write_retry
            },
        };

        Ok(Self {
            credentials: Credentials::new(api_key, api_secret),
            symbol: DEFAULT_SYMBOL.to_string(),
            influx: InfluxSettings::new(influx_token),
            websocket,
            ingest,
            health_port: parse_env("INGESTOR_HEALTH_PORT", Self::DEFAULT_HEALTH_PORT),
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

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_env_duration_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map_or(default, Duration::from_secs)
}

fn parse_env_duration_millis(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map_or(default, Duration::from_millis)
}
