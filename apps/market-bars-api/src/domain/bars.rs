//! Bar Tables and Row Normalization
//!
//! A [`BarTable`] is the merged result of a historical bars query. Cells
//! keep whatever shape the data source produced; [`normalize_bars`] turns
//! the table into compact `{t,o,h,l,c}` rows with epoch-millisecond times.

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde::Serialize;

/// Timestamp cell of a bar row.
#[derive(Debug, Clone, PartialEq)]
pub enum TimestampCell {
    /// Instant with a UTC offset.
    Zoned(DateTime<FixedOffset>),
    /// Calendar datetime without zone, read as UTC.
    Naive(NaiveDateTime),
    /// Nanoseconds since the Unix epoch.
    Nanos(i64),
    /// Anything else; read as seconds when numeric.
    Other(Cell),
}

impl TimestampCell {
    /// Classify a raw string timestamp.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            return Self::Zoned(dt);
        }
        for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
            if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
                return Self::Naive(dt);
            }
        }
        Self::Other(Cell::Text(text.to_string()))
    }

    /// Epoch milliseconds, truncated toward zero.
    fn epoch_millis(&self) -> Option<i64> {
        match self {
            Self::Zoned(dt) => Some(dt.timestamp_millis()),
            Self::Naive(dt) => Some(dt.and_utc().timestamp_millis()),
            Self::Nanos(nanos) => Some(nanos / 1_000_000),
            Self::Other(cell) => {
                let millis = (cell.as_f64()? * 1000.0).trunc();
                #[allow(clippy::cast_precision_loss)]
                let in_range = millis >= i64::MIN as f64 && millis < i64::MAX as f64;
                #[allow(clippy::cast_possible_truncation)]
                let millis = millis as i64;
                in_range.then_some(millis)
            }
        }
    }
}

impl fmt::Display for TimestampCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Zoned(dt) => write!(f, "{}", dt.to_rfc3339()),
            Self::Naive(dt) => write!(f, "{dt}"),
            Self::Nanos(nanos) => write!(f, "{nanos}"),
            Self::Other(cell) => write!(f, "{cell}"),
        }
    }
}

/// Scalar table cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// Missing value.
    Null,
    /// Number.
    Number(f64),
    /// Text, parsed when a number is needed.
    Text(String),
}

impl Cell {
    /// Numeric value, parsing text. Non-finite values are rejected.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            Self::Null => return None,
            Self::Number(n) => *n,
            Self::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        value.is_finite().then_some(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&serde_json::Value> for Cell {
    fn from(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Number(n) => n.as_f64().map_or(Self::Null, Self::Number),
            serde_json::Value::String(s) => Self::Text(s.clone()),
            other => Self::Text(other.to_string()),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("None"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// One historical bar as returned by the data source.
#[derive(Debug, Clone, PartialEq)]
pub struct BarRow {
    /// Ticker symbol.
    pub symbol: String,
    /// Bar start time.
    pub timestamp: TimestampCell,
    /// Open price.
    pub open: Cell,
    /// High price.
    pub high: Cell,
    /// Low price.
    pub low: Cell,
    /// Close price.
    pub close: Cell,
    /// Volume.
    pub volume: Cell,
    /// Number of trades.
    pub trade_count: Cell,
    /// Volume-weighted average price.
    pub vwap: Cell,
}

/// Merged bars, ordered by symbol then time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BarTable {
    rows: Vec<BarRow>,
}

impl BarTable {
    /// Wrap rows that are already ordered.
    #[must_use]
    pub const fn new(rows: Vec<BarRow>) -> Self {
        Self { rows }
    }

    /// Rows in table order.
    #[must_use]
    pub fn rows(&self) -> &[BarRow] {
        &self.rows
    }

    /// Whether the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

/// Compact bar row returned to HTTP callers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BarPoint {
    /// Epoch milliseconds.
    pub t: i64,
    /// Open.
    pub o: f64,
    /// High.
    pub h: f64,
    /// Low.
    pub l: f64,
    /// Close.
    pub c: f64,
}

/// A cell could not be converted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    /// No timestamp strategy applied.
    #[error("Unable to convert timestamp: {0}")]
    Timestamp(String),
    /// Price cell is not numeric.
    #[error("Unable to convert {column}: {value}")]
    Column {
        /// Column name.
        column: &'static str,
        /// Offending value.
        value: String,
    },
}

/// Normalize a bar table into `{t,o,h,l,c}` rows, preserving order.
///
/// # Errors
///
/// Returns `NormalizeError` on the first cell that cannot be converted.
pub fn normalize_bars(table: &BarTable) -> Result<Vec<BarPoint>, NormalizeError> {
    table.rows().iter().map(normalize_row).collect()
}

fn normalize_row(row: &BarRow) -> Result<BarPoint, NormalizeError> {
    let t = row
        .timestamp
        .epoch_millis()
        .ok_or_else(|| NormalizeError::Timestamp(row.timestamp.to_string()))?;

    Ok(BarPoint {
        t,
        o: numeric("open", &row.open)?,
        h: numeric("high", &row.high)?,
        l: numeric("low", &row.low)?,
        c: numeric("close", &row.close)?,
    })
}

fn numeric(column: &'static str, cell: &Cell) -> Result<f64, NormalizeError> {
    cell.as_f64().ok_or_else(|| NormalizeError::Column {
        column,
        value: cell.to_string(),
    })
}
