//! Normalized Market Data Records
//!
//! Flat quote and bar records built from inbound feed events. Each record is
//! transient: it is converted into a [`Point`] and written once.

use chrono::{DateTime, Utc};

use crate::domain::point::Point;

/// Measurement holding quote points.
pub const QUOTES_MEASUREMENT: &str = "btc_quotes";

/// Measurement holding bar points.
pub const BARS_MEASUREMENT: &str = "btc_bars";

/// Tag key carrying the instrument symbol.
pub const SYMBOL_TAG: &str = "symbol";

/// Best bid/ask snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    /// Instrument symbol (e.g. "BTC/USD").
    pub symbol: String,
    /// Event timestamp.
    pub timestamp: DateTime<Utc>,
    /// Best bid price.
    pub bid_price: f64,
    /// Size available at the bid.
    pub bid_size: f64,
    /// Best ask price.
    pub ask_price: f64,
    /// Size available at the ask.
    pub ask_size: f64,
}

impl Quote {
    /// Convert into a `btc_quotes` point tagged by symbol.
    #[must_use]
    pub fn to_point(&self) -> Point {
        Point::new(QUOTES_MEASUREMENT)
            .tag(SYMBOL_TAG, self.symbol.as_str())
            .field("bid_price", self.bid_price)
            .field("bid_size", self.bid_size)
            .field("ask_price", self.ask_price)
            .field("ask_size", self.ask_size)
            .time(self.timestamp)
    }
}

/// Aggregated OHLCV candle.
///
/// `trade_count` and `vwap` are optional on the wire; an absent value becomes
/// an absent field on the point.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    /// Instrument symbol (e.g. "BTC/USD").
    pub symbol: String,
    /// Bar start timestamp.
    pub timestamp: DateTime<Utc>,
    /// Open price.
    pub open: f64,
    /// High price.
    pub high: f64,
    /// Low price.
    pub low: f64,
    /// Close price.
    pub close: f64,
    /// Traded volume.
    pub volume: f64,
    /// Number of trades in the bar.
    pub trade_count: Option<f64>,
    /// Volume-weighted average price.
    pub vwap: Option<f64>,
}

impl Bar {
    /// Convert into a `btc_bars` point tagged by symbol.
    #[must_use]
    pub fn to_point(&self) -> Point {
        Point::new(BARS_MEASUREMENT)
            .tag(SYMBOL_TAG, self.symbol.as_str())
            .field("open", self.open)
            .field("high", self.high)
            .field("low", self.low)
            .field("close", self.close)
            .field("volume", self.volume)
            .field_opt("trade_count", self.trade_count)
            .field_opt("vwap", self.vwap)
            .time(self.timestamp)
    }
}

/// A normalized record of either kind.
#[derive(Debug, Clone, PartialEq)]
pub enum MarketRecord {
    /// Quote record.
    Quote(Quote),
    /// Bar record.
    Bar(Bar),
}

impl MarketRecord {
    /// Convert into a storage point.
    #[must_use]
    pub fn to_point(&self) -> Point {
        match self {
            Self::Quote(q) => q.to_point(),
            Self::Bar(b) => b.to_point(),
        }
    }

    /// Short kind label used in logs and metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Quote(_) => "quote",
            Self::Bar(_) => "bar",
        }
    }

    /// Instrument symbol.
    #[must_use]
    pub fn symbol(&self) -> &str {
        match self {
            Self::Quote(q) => &q.symbol,
            Self::Bar(b) => &b.symbol,
        }
    }

    /// Event timestamp.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::Quote(q) => q.timestamp,
            Self::Bar(b) => b.timestamp,
        }
    }
}
