//! Historical Bars Query
//!
//! Validates query parameters, calls the data source once and normalizes
//! the result. No caching, no retry.

use std::sync::Arc;

use crate::application::ports::{BarsRequest, HistoricalBarsPort, HistoricalDataError};
use crate::domain::bars::{BarPoint, NormalizeError, normalize_bars};
use crate::domain::epoch::{EpochError, parse_epoch_millis};
use crate::domain::timeframe::{TimeFrame, TimeframeError};

/// Raw query parameters after HTTP extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarsQuery {
    /// Symbols.
    pub symbols: Vec<String>,
    /// Timeframe string, e.g. `1Day`.
    pub timeframe: String,
    /// Start in epoch milliseconds.
    pub start: i64,
    /// End in epoch milliseconds.
    pub end: i64,
}

/// Query failure.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// Unparsable timeframe.
    #[error(transparent)]
    Timeframe(#[from] TimeframeError),
    /// Unrepresentable start or end.
    #[error(transparent)]
    Epoch(#[from] EpochError),
    /// Data source failed.
    #[error(transparent)]
    Upstream(#[from] HistoricalDataError),
    /// Result could not be normalized.
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
}

/// Historical bars query service.
pub struct BarsQueryService<P: HistoricalBarsPort + ?Sized> {
    source: Arc<P>,
}

impl<P: HistoricalBarsPort + ?Sized> BarsQueryService<P> {
    /// Create a service over a data source.
    #[must_use]
    pub const fn new(source: Arc<P>) -> Self {
        Self { source }
    }

    /// Run one query.
    ///
    /// # Errors
    ///
    /// Returns `QueryError` if a parameter is invalid, the data source
    /// fails, or a returned row cannot be normalized.
    pub async fn query_bars(&self, query: BarsQuery) -> Result<Vec<BarPoint>, QueryError> {
        let timeframe = TimeFrame::parse(&query.timeframe)?;
        let start = parse_epoch_millis(query.start)?;
        let end = parse_epoch_millis(query.end)?;

        let request = BarsRequest {
            symbols: query.symbols,
            timeframe,
            start,
            end,
        };

        tracing::debug!(
            symbols = ?request.symbols,
            timeframe = %request.timeframe,
            start = %request.start,
            end = %request.end,
            "Fetching historical bars"
        );

        let table = self.source.get_bars(&request).await.map_err(|e| {
            tracing::warn!(error = %e, symbols = ?request.symbols, "Historical bars request failed");
            e
        })?;

        let points = normalize_bars(&table).map_err(|e| {
            tracing::error!(error = %e, "Failed to normalize bars");
            e
        })?;

        tracing::info!(
            symbols = ?request.symbols,
            timeframe = %request.timeframe,
            rows = points.len(),
            "Historical bars served"
        );
        Ok(points)
    }
}

#[cfg(test)]
mod tests {
    use mockall::predicate;

    use super::*;
    use crate::application::ports::MockHistoricalBarsPort;
    use crate::domain::bars::{BarRow, BarTable, Cell, TimestampCell};
    use crate::domain::timeframe::TimeFrameUnit;

    fn query(timeframe: &str) -> BarsQuery {
        BarsQuery {
            symbols: vec!["AAPL".to_string()],
            timeframe: timeframe.to_string(),
            start: 1_704_067_200_000,
            end: 1_704_153_600_000,
        }
    }

    fn table() -> BarTable {
        BarTable::new(vec![BarRow {
            symbol: "AAPL".to_string(),
            timestamp: TimestampCell::from_text("2024-01-01T00:00:00Z"),
            open: Cell::from(100.0),
            high: Cell::from(101.5),
            low: Cell::from(99.0),
            close: Cell::from(100.8),
            volume: Cell::from(10.0),
            trade_count: Cell::Null,
            vwap: Cell::Null,
        }])
    }

    #[tokio::test]
    async fn builds_request_and_normalizes() {
        let mut source = MockHistoricalBarsPort::new();
        source
            .expect_get_bars()
            .with(predicate::function(|r: &BarsRequest| {
                r.symbols == vec!["AAPL".to_string()]
                    && r.timeframe == TimeFrame::new(1, TimeFrameUnit::Day)
                    && r.start.timestamp_millis() == 1_704_067_200_000
                    && r.end.timestamp_millis() == 1_704_153_600_000
            }))
            .times(1)
            .returning(|_| Ok(table()));

        let service = BarsQueryService::new(Arc::new(source));
        let points = service.query_bars(query("1Day")).await.unwrap();

        assert_eq!(points.len(), 1);
        assert_eq!(points[0].t, 1_704_067_200_000);
    }

    #[tokio::test]
    async fn bad_timeframe_skips_data_source() {
        let mut source = MockHistoricalBarsPort::new();
        source.expect_get_bars().never();

        let service = BarsQueryService::new(Arc::new(source));
        let err = service.query_bars(query("bogus")).await.unwrap_err();
        assert!(matches!(err, QueryError::Timeframe(_)));
    }

    #[tokio::test]
    async fn bad_epoch_skips_data_source() {
        let mut source = MockHistoricalBarsPort::new();
        source.expect_get_bars().never();

        let service = BarsQueryService::new(Arc::new(source));
        let mut q = query("1Day");
        q.end = i64::MAX;
        let err = service.query_bars(q).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("Invalid epoch milliseconds: {}", i64::MAX)
        );
    }

    #[tokio::test]
    async fn upstream_error_passes_through() {
        let mut source = MockHistoricalBarsPort::new();
        source.expect_get_bars().returning(|_| {
            Err(HistoricalDataError::Status {
                status: 403,
                body: "forbidden".to_string(),
            })
        });

        let service = BarsQueryService::new(Arc::new(source));
        let err = service.query_bars(query("1Day")).await.unwrap_err();
        assert_eq!(err.to_string(), "request failed with status 403: forbidden");
    }

    #[tokio::test]
    async fn empty_table_is_empty_result() {
        let mut source = MockHistoricalBarsPort::new();
        source.expect_get_bars().returning(|_| Ok(BarTable::default()));

        let service = BarsQueryService::new(Arc::new(source));
        assert!(service.query_bars(query("15Min")).await.unwrap().is_empty());
    }
}
