//! Database value parsing utilities
//!
//! Provides error-safe parsing of stored values.

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::Error as SqlError;

use crate::models::PollOption;

fn conversion_error(
    column: usize,
    e: impl std::error::Error + Send + Sync + 'static,
) -> SqlError {
    SqlError::FromSqlConversionFailure(column, Type::Text, Box::new(e))
}

/// Parse a DateTime from an RFC3339 string
pub fn parse_datetime(column: usize, s: &str) -> Result<DateTime<Utc>, SqlError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(column, e))
}

/// Parse an optional DateTime from an RFC3339 string
pub fn parse_datetime_opt(
    column: usize,
    s: Option<String>,
) -> Result<Option<DateTime<Utc>>, SqlError> {
    s.map(|s| parse_datetime(column, &s)).transpose()
}

/// Parse the JSON-encoded option list of a poll row
pub fn parse_options(column: usize, s: &str) -> Result<Vec<PollOption>, SqlError> {
    serde_json::from_str(s).map_err(|e| conversion_error(column, e))
}

/// Read a non-negative counter stored as INTEGER
pub fn parse_count(column: usize, value: i64) -> Result<u64, SqlError> {
    u64::try_from(value).map_err(|_| SqlError::IntegralValueOutOfRange(column, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_datetime_is_conversion_failure() {
        assert!(matches!(
            parse_datetime(3, "yesterday"),
            Err(SqlError::FromSqlConversionFailure(3, _, _))
        ));
    }

    #[test]
    fn test_negative_count_rejected() {
        assert!(parse_count(4, -1).is_err());
        assert_eq!(parse_count(4, 7).unwrap(), 7);
    }
}
