//! Bar Timeframes
//!
//! Parses user strings such as `1Day`, `15Min` or `2 hours` into a
//! [`TimeFrame`] and renders the market data API's wire form.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

/// Message returned for any timeframe that cannot be parsed.
pub const TIMEFRAME_FORMAT_MESSAGE: &str = "timeframe must look like '1Day', '1Hour', or '15Min'.";

/// Timeframe unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeFrameUnit {
    /// Minutes.
    Minute,
    /// Hours.
    Hour,
    /// Days.
    Day,
    /// Weeks.
    Week,
}

impl TimeFrameUnit {
    /// Suffix used on the wire.
    #[must_use]
    pub const fn wire_suffix(self) -> &'static str {
        match self {
            Self::Minute => "Min",
            Self::Hour => "Hour",
            Self::Day => "Day",
            Self::Week => "Week",
        }
    }

    /// Resolve a lowercase unit word by substring, minute first.
    fn from_word(word: &str) -> Self {
        if word.contains("min") {
            Self::Minute
        } else if word.contains("hour") {
            Self::Hour
        } else if word.contains("day") {
            Self::Day
        } else {
            Self::Week
        }
    }
}

/// Bar aggregation period, e.g. 15 minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeFrame {
    /// Number of units.
    pub amount: u32,
    /// Unit.
    pub unit: TimeFrameUnit,
}

impl TimeFrame {
    /// Create a timeframe.
    #[must_use]
    pub const fn new(amount: u32, unit: TimeFrameUnit) -> Self {
        Self { amount, unit }
    }

    /// Parse `<integer><unit>` with optional whitespace, case-insensitive.
    ///
    /// # Errors
    ///
    /// Returns `TimeframeError` if the whole string does not match or the
    /// amount does not fit in a `u32`.
    pub fn parse(value: &str) -> Result<Self, TimeframeError> {
        let caps = timeframe_regex()
            .captures(value)
            .ok_or(TimeframeError)?;

        let amount = caps
            .get(1)
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .ok_or(TimeframeError)?;
        let unit = caps
            .get(2)
            .map(|m| TimeFrameUnit::from_word(&m.as_str().to_ascii_lowercase()))
            .ok_or(TimeframeError)?;

        Ok(Self { amount, unit })
    }

    /// Wire form, e.g. `15Min`.
    #[must_use]
    pub fn wire(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for TimeFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.unit.wire_suffix())
    }
}

impl FromStr for TimeFrame {
    type Err = TimeframeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Timeframe string did not match the accepted shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("timeframe must look like '1Day', '1Hour', or '15Min'.")]
pub struct TimeframeError;

#[allow(clippy::expect_used)] // Pattern is a literal; compilation cannot fail
fn timeframe_regex() -> &'static Regex {
    static TIMEFRAME_REGEX: OnceLock<Regex> = OnceLock::new();
    TIMEFRAME_REGEX.get_or_init(|| {
        Regex::new(r"(?i)^(\d+)\s*(min|minute|minutes|hour|hours|day|days|week|weeks)$")
            .expect("timeframe regex is valid")
    })
}
