#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::too_many_lines,
        clippy::panic
    )
)]

//! Market Bars API
//!
//! HTTP query service for historical stock bars. A request names symbols,
//! a timeframe such as `15Min` and an epoch-millisecond window; the service
//! fetches every page from Alpaca's market data API and returns compact
//! `{t,o,h,l,c}` rows.
//!
//! # Layers (inside to outside)
//!
//! - **Domain**: timeframe and epoch parsing, bar normalization
//! - **Application**: `HistoricalBarsPort`, `BarsQueryService`
//! - **Infrastructure**: Alpaca REST client, axum router, config, telemetry
//!
//! # Data Flow
//!
//! ```text
//! GET /stocks/bars -> BarsQueryService -> AlpacaBarsClient (paged) -> normalize_bars -> JSON
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

/// Domain layer - parsing and normalization, no I/O.
pub mod domain;

/// Application layer - data source port and query service.
pub mod application;

/// Infrastructure layer - adapters and the HTTP surface.
pub mod infrastructure;

pub use application::ports::{BarsRequest, HistoricalBarsPort, HistoricalDataError};
pub use application::services::{BarsQuery, BarsQueryService, QueryError};
pub use domain::bars::{BarPoint, BarRow, BarTable, Cell, NormalizeError, TimestampCell};
pub use domain::epoch::{EpochError, parse_epoch_millis};
pub use domain::timeframe::{TimeFrame, TimeFrameUnit, TimeframeError};
pub use infrastructure::alpaca::AlpacaBarsClient;
pub use infrastructure::config::{ApiConfig, ConfigError, Credentials, DataApiSettings};
pub use infrastructure::http::{ApiError, ApiServer, AppState, ServerError, router};
