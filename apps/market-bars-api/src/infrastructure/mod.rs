//! Infrastructure Layer
//!
//! Alpaca REST adapter, HTTP surface, configuration and telemetry.

pub mod alpaca;
pub mod config;
pub mod http;
pub mod telemetry;
