//! Alpaca Crypto Stream Message Types
//!
//! Wire types for the `v1beta3/crypto` WebSocket feed. Every inbound message
//! carries a `T` discriminator.
//!
//! ## Control
//! - `success`: `{"T":"success","msg":"connected"|"authenticated"}`
//! - `error`: `{"T":"error","code":402,"msg":"auth failed"}`
//! - `subscription`: active channel lists
//!
//! ## Market data
//! - `q`: quote
//! - `b`, `d`, `u`: minute, daily and updated bars
//! - `t`, `o`: trades and orderbooks (not ingested)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::market_data::{Bar, MarketRecord, Quote};

/// Connection or authentication success.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SuccessMessage {
    /// "connected" or "authenticated".
    pub msg: SuccessKind,
}

/// Kind of success message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuccessKind {
    /// Socket accepted.
    Connected,
    /// Credentials accepted.
    Authenticated,
}

/// Error frame.
///
/// Codes: 400 invalid syntax, 401 not authenticated, 402 auth failed,
/// 403 already authenticated, 404 auth timeout, 405 symbol limit,
/// 406 connection limit, 407 slow client, 409 insufficient subscription,
/// 500 internal.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ErrorMessage {
    /// Error code.
    pub code: i32,
    /// Error text.
    pub msg: String,
}

/// Subscription confirmation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SubscriptionMessage {
    /// Trade symbols.
    #[serde(default)]
    pub trades: Vec<String>,
    /// Quote symbols.
    #[serde(default)]
    pub quotes: Vec<String>,
    /// Minute bar symbols.
    #[serde(default)]
    pub bars: Vec<String>,
    /// Daily bar symbols.
    #[serde(default, rename = "dailyBars")]
    pub daily_bars: Vec<String>,
    /// Updated bar symbols.
    #[serde(default, rename = "updatedBars")]
    pub updated_bars: Vec<String>,
}

/// Crypto quote.
///
/// ```json
/// {"T":"q","S":"BTC/USD","bp":67134.1,"bs":0.5,"ap":67140.2,"as":0.25,"t":"2024-03-12T11:59:38.897261568Z"}
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CryptoQuoteMessage {
    /// Symbol, e.g. "BTC/USD".
    #[serde(rename = "S")]
    pub symbol: String,
    /// Bid price.
    #[serde(rename = "bp")]
    pub bid_price: f64,
    /// Bid size.
    #[serde(rename = "bs")]
    pub bid_size: f64,
    /// Ask price.
    #[serde(rename = "ap")]
    pub ask_price: f64,
    /// Ask size.
    #[serde(rename = "as")]
    pub ask_size: f64,
    /// Quote timestamp.
    #[serde(rename = "t")]
    pub timestamp: DateTime<Utc>,
}

/// Crypto bar (minute, daily or updated).
///
/// ```json
/// {"T":"b","S":"BTC/USD","o":71856.1,"h":71856.1,"l":71856.1,"c":71856.1,"v":0,"t":"2024-03-12T12:00:00Z","n":0,"vw":0}
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CryptoBarMessage {
    /// Symbol.
    #[serde(rename = "S")]
    pub symbol: String,
    /// Open price.
    #[serde(rename = "o")]
    pub open: f64,
    /// High price.
    #[serde(rename = "h")]
    pub high: f64,
    /// Low price.
    #[serde(rename = "l")]
    pub low: f64,
    /// Close price.
    #[serde(rename = "c")]
    pub close: f64,
    /// Volume.
    #[serde(rename = "v")]
    pub volume: f64,
    /// Trade count.
    #[serde(rename = "n", default)]
    pub trade_count: Option<f64>,
    /// Volume-weighted average price.
    #[serde(rename = "vw", default)]
    pub vwap: Option<f64>,
    /// Bar start.
    #[serde(rename = "t")]
    pub timestamp: DateTime<Utc>,
}

/// Inbound crypto stream message.
#[derive(Debug, Clone, PartialEq)]
pub enum AlpacaMessage {
    /// Success frame.
    Success(SuccessMessage),
    /// Error frame.
    Error(ErrorMessage),
    /// Subscription confirmation.
    Subscription(SubscriptionMessage),
    /// Quote.
    Quote(CryptoQuoteMessage),
    /// Bar of any flavor.
    Bar(CryptoBarMessage),
    /// Recognized but not ingested (trades, orderbooks).
    Ignored(String),
}

impl From<CryptoQuoteMessage> for Quote {
    fn from(msg: CryptoQuoteMessage) -> Self {
        Self {
            symbol: msg.symbol,
            timestamp: msg.timestamp,
            bid_price: msg.bid_price,
            bid_size: msg.bid_size,
            ask_price: msg.ask_price,
            ask_size: msg.ask_size,
        }
    }
}

impl From<CryptoBarMessage> for Bar {
    fn from(msg: CryptoBarMessage) -> Self {
        Self {
            symbol: msg.symbol,
            timestamp: msg.timestamp,
            open: msg.open,
            high: msg.high,
            low: msg.low,
            close: msg.close,
            volume: msg.volume,
            trade_count: msg.trade_count,
            vwap: msg.vwap,
        }
    }
}

impl From<CryptoQuoteMessage> for MarketRecord {
    fn from(msg: CryptoQuoteMessage) -> Self {
        Self::Quote(msg.into())
    }
}

impl From<CryptoBarMessage> for MarketRecord {
    fn from(msg: CryptoBarMessage) -> Self {
        Self::Bar(msg.into())
    }
}

/// Authentication request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthRequest {
    /// Always "auth".
    pub action: &'static str,
    /// API key.
    pub key: String,
    /// API secret.
    pub secret: String,
}

impl AuthRequest {
    /// Create an authentication request.
    #[must_use]
    pub const fn new(key: String, secret: String) -> Self {
        Self {
            action: "auth",
            key,
            secret,
        }
    }
}

/// Subscribe or unsubscribe request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SubscriptionRequest {
    /// "subscribe" or "unsubscribe".
    pub action: String,
    /// Quote symbols.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub quotes: Vec<String>,
    /// Bar symbols.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub bars: Vec<String>,
}

impl SubscriptionRequest {
    /// Subscribe request.
    #[must_use]
    pub fn subscribe() -> Self {
        Self {
            action: "subscribe".to_string(),
            ..Default::default()
        }
    }

    /// Set quote symbols.
    #[must_use]
    pub fn with_quotes(mut self, symbols: Vec<String>) -> Self {
        self.quotes = symbols;
        self
    }

    /// Set bar symbols.
    #[must_use]
    pub fn with_bars(mut self, symbols: Vec<String>) -> Self {
        self.bars = symbols;
        self
    }
}
