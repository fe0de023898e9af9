//! Epoch millisecond parameters.

use chrono::{DateTime, Datelike, Utc};

/// Calendar years accepted for query instants.
const YEAR_RANGE: std::ops::RangeInclusive<i32> = 1..=9999;

/// Epoch value outside the supported calendar range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Invalid epoch milliseconds: {0}")]
pub struct EpochError(pub i64);

/// Convert milliseconds since the Unix epoch to a UTC instant.
///
/// # Errors
///
/// Returns `EpochError` if the instant falls outside years 1 through 9999.
pub fn parse_epoch_millis(epoch_ms: i64) -> Result<DateTime<Utc>, EpochError> {
    DateTime::from_timestamp_millis(epoch_ms)
        .filter(|dt| YEAR_RANGE.contains(&dt.year()))
        .ok_or(EpochError(epoch_ms))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn new_year_2024() {
        let dt = parse_epoch_millis(1_704_067_200_000).unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-01-01T00:00:00+00:00");
    }

    #[test]
    fn pre_epoch_is_allowed() {
        let dt = parse_epoch_millis(-1_000).unwrap();
        assert_eq!(dt.timestamp(), -1);
    }

    #[test]
    fn out_of_range_is_rejected() {
        let err = parse_epoch_millis(i64::MAX).unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("Invalid epoch milliseconds: {}", i64::MAX)
        );
    }

    #[test]
    fn last_millisecond_of_year_9999_is_accepted() {
        let dt = parse_epoch_millis(253_402_300_799_999).unwrap();
        assert_eq!(dt.year(), 9999);
    }

    #[test]
    fn year_10000_is_rejected() {
        let err = parse_epoch_millis(253_402_300_800_000).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid epoch milliseconds: 253402300800000"
        );
    }

    #[test]
    fn year_zero_is_rejected() {
        assert!(parse_epoch_millis(-62_135_596_800_001).is_err());
        assert!(parse_epoch_millis(-62_135_596_800_000).is_ok());
    }

    proptest! {
        #[test]
        fn millis_round_trip(ms in -8_000_000_000_000i64..8_000_000_000_000i64) {
            let dt = parse_epoch_millis(ms).unwrap();
            prop_assert_eq!(dt.timestamp_millis(), ms);
        }
    }
}
