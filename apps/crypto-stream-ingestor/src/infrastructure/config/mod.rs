//! Configuration Module
//!
//! Environment-driven configuration for the ingestor.

mod settings;

pub use settings::{
    ConfigError, Credentials, DEFAULT_CRYPTO_STREAM_URL, DEFAULT_SYMBOL, INFLUX_DATABASE,
    INFLUX_HOST, INFLUX_ORG, IngestSettings, IngestorConfig, InfluxSettings, WebSocketSettings,
};
