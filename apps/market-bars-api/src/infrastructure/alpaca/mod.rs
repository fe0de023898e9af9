//! Alpaca Market Data Adapter
//!
//! REST client for `GET /v2/stocks/bars`, following page tokens until the
//! result set is exhausted.

pub mod client;

pub use client::AlpacaBarsClient;
