//! Domain Layer - Normalized records and time-series points.
//!
//! This layer contains the record shapes produced at ingestion time and the
//! point encoding consumed by the time-series sink. No I/O happens here.

/// Quote and bar records and their point mappings.
pub mod market_data;

/// Time-series points and line protocol encoding.
pub mod point;
