//! Infrastructure Layer
//!
//! Adapters for the crypto feed, InfluxDB, configuration and observability.

pub mod alpaca;
pub mod config;
pub mod health;
pub mod influx;
pub mod metrics;
pub mod pipeline;
pub mod telemetry;
