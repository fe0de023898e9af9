//! Time-Series Points
//!
//! A point is one timestamped, tagged, multi-field record destined for the
//! time-series store. Points are built with a small fluent builder and encoded
//! as InfluxDB line protocol with nanosecond precision.
//!
//! # Line Protocol
//!
//! ```text
//! btc_quotes,symbol=BTC/USD bid_price=42000.5,bid_size=0.25 1704067200000000000
//! ```

use std::fmt::Write as _;

use chrono::{DateTime, Utc};

/// Errors raised while encoding a point.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LineProtocolError {
    /// Measurement name is empty.
    #[error("measurement name cannot be empty")]
    EmptyMeasurement,

    /// Point carries no fields.
    #[error("point in measurement {0} has no fields")]
    NoFields(String),

    /// Field value is NaN or infinite.
    #[error("field {field} has a non-finite value")]
    NonFiniteField {
        /// Field key.
        field: String,
    },

    /// Timestamp does not fit in signed 64-bit nanoseconds.
    #[error("timestamp {0} is outside the nanosecond range")]
    TimestampOutOfRange(DateTime<Utc>),
}

/// A single time-series point.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    measurement: String,
    tags: Vec<(String, String)>,
    fields: Vec<(String, f64)>,
    timestamp: Option<DateTime<Utc>>,
}

impl Point {
    /// Start a point in the given measurement.
    #[must_use]
    pub fn new(measurement: impl Into<String>) -> Self {
        Self {
            measurement: measurement.into(),
            tags: Vec::new(),
            fields: Vec::new(),
            timestamp: None,
        }
    }

    /// Add a tag.
    #[must_use]
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.push((key.into(), value.into()));
        self
    }

    /// Add a float field.
    #[must_use]
    pub fn field(mut self, key: impl Into<String>, value: f64) -> Self {
        self.fields.push((key.into(), value));
        self
    }

    /// Add a field only when a value is present.
    #[must_use]
    pub fn field_opt(self, key: impl Into<String>, value: Option<f64>) -> Self {
        match value {
            Some(v) => self.field(key, v),
            None => self,
        }
    }

    /// Set the point timestamp.
    #[must_use]
    pub const fn time(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Measurement name.
    #[must_use]
    pub fn measurement(&self) -> &str {
        &self.measurement
    }

    /// Tags in insertion order.
    #[must_use]
    pub fn tags(&self) -> &[(String, String)] {
        &self.tags
    }

    /// Look up a tag value by key.
    #[must_use]
    pub fn tag_value(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Fields in insertion order.
    #[must_use]
    pub fn fields(&self) -> &[(String, f64)] {
        &self.fields
    }

    /// Look up a field value by key.
    #[must_use]
    pub fn field_value(&self, key: &str) -> Option<f64> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| *v)
    }

    /// Point timestamp, if set.
    #[must_use]
    pub const fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    /// Encode the point as one line of InfluxDB line protocol.
    ///
    /// Points without a timestamp are encoded without one, leaving the
    /// server to assign its receive time.
    ///
    /// # Errors
    ///
    /// Returns an error if the measurement is empty, no fields are present,
    /// a field is not finite, or the timestamp overflows nanoseconds.
    pub fn to_line_protocol(&self) -> Result<String, LineProtocolError> {
        if self.measurement.is_empty() {
            return Err(LineProtocolError::EmptyMeasurement);
        }
        if self.fields.is_empty() {
            return Err(LineProtocolError::NoFields(self.measurement.clone()));
        }

        let mut line = escape_measurement(&self.measurement);

        for (key, value) in &self.tags {
            // Empty tag values are not representable
            if value.is_empty() {
                continue;
            }
            line.push(',');
            line.push_str(&escape_key(key));
            line.push('=');
            line.push_str(&escape_key(value));
        }

        line.push(' ');
        for (i, (key, value)) in self.fields.iter().enumerate() {
            if !value.is_finite() {
                return Err(LineProtocolError::NonFiniteField { field: key.clone() });
            }
            if i > 0 {
                line.push(',');
            }
            line.push_str(&escape_key(key));
            line.push('=');
            let _ = write!(line, "{value}");
        }

        if let Some(ts) = self.timestamp {
            let nanos = ts
                .timestamp_nanos_opt()
                .ok_or(LineProtocolError::TimestampOutOfRange(ts))?;
            let _ = write!(line, " {nanos}");
        }

        Ok(line)
    }
}

fn escape_measurement(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, ',' | ' ') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn escape_key(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, ',' | '=' | ' ') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
