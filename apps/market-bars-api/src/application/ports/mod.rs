//! Port Interfaces
//!
//! The historical bars data source the query service depends on.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::bars::BarTable;
use crate::domain::timeframe::TimeFrame;

/// Historical bars request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarsRequest {
    /// Symbols, at least one.
    pub symbols: Vec<String>,
    /// Aggregation timeframe.
    pub timeframe: TimeFrame,
    /// Inclusive start.
    pub start: DateTime<Utc>,
    /// Inclusive end.
    pub end: DateTime<Utc>,
}

/// Historical data source failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HistoricalDataError {
    /// Request could not be sent or the response not read.
    #[error("request failed: {0}")]
    Transport(String),
    /// Non-success HTTP status.
    #[error("request failed with status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },
    /// Response body could not be decoded.
    #[error("invalid response body: {0}")]
    Decode(String),
}

/// Source of historical bars.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HistoricalBarsPort: Send + Sync {
    /// Fetch every bar matching the request, all pages merged.
    async fn get_bars(&self, request: &BarsRequest) -> Result<BarTable, HistoricalDataError>;
}
