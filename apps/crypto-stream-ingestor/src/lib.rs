#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::items_after_statements,
        clippy::panic
    )
)]

//! Crypto Stream Ingestor
//!
//! Subscribes to Alpaca's crypto WebSocket feed for one symbol and writes
//! every quote and bar to InfluxDB as a line-protocol point.
//!
//! # Layers (inside to outside)
//!
//! - **Domain**: records and points
//!   - `market_data`: `Quote`, `Bar`, and their point mappings
//!   - `point`: `Point` and line protocol encoding
//!
//! - **Application**: ports and services
//!   - `ports`: `PointSink`, `StreamEvent`
//!   - `services`: ordered ingest worker, feed state, backoff
//!
//! - **Infrastructure**: adapters
//!   - `alpaca`: crypto WebSocket client
//!   - `influx`: HTTP write adapter
//!   - `config`, `telemetry`, `metrics`, `health`
//!
//! # Data Flow
//!
//! ```text
//! Alpaca crypto WS -> CryptoStreamClient -> mpsc queue -> IngestWorker -> InfluxWriter
//!                                                              |
//!                                                          FeedState -> /health
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

/// Domain layer - records and points, no I/O.
pub mod domain;

/// Application layer - ports and the ingest pipeline.
pub mod application;

/// Infrastructure layer - feed, store and observability adapters.
pub mod infrastructure;

pub use application::ports::{PointSink, SinkError, StreamEvent};
pub use application::services::{
    BackoffConfig, BackoffPolicy, ConnectionState, FeedState, IngestCounters, IngestWorker,
    WriteOutcome,
};
pub use domain::market_data::{Bar, MarketRecord, Quote};
pub use domain::point::{LineProtocolError, Point};
pub use infrastructure::alpaca::{CryptoStreamClient, CryptoStreamConfig, StreamClientError};
pub use infrastructure::config::{ConfigError, Credentials, IngestorConfig, InfluxSettings};
pub use infrastructure::health::{HealthServer, HealthServerError, HealthServerState};
pub use infrastructure::influx::InfluxWriter;
pub use infrastructure::metrics::init_metrics;
pub use infrastructure::pipeline::{IngestPipeline, PipelineError};
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
