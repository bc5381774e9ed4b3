// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting.

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
///
/// This is also the storage format, so stored timestamps sort lexically.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse an RFC3339 timestamp (any offset) into UTC.
pub fn parse_utc_rfc3339(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Date as shown in the activity table, e.g. `Sat 05 Jan 2019`.
pub fn format_table_date(date: DateTime<Utc>) -> String {
    date.format("%a %d %b %Y").to_string()
}

/// Clock time, e.g. `08:14`.
pub fn format_clock(date: DateTime<Utc>) -> String {
    date.format("%H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_normalizes_offset() {
        let parsed = parse_utc_rfc3339("2019-01-05T09:14:03+01:00").unwrap();
        assert_eq!(format_utc_rfc3339(parsed), "2019-01-05T08:14:03.000Z");
    }

    #[test]
    fn test_table_formats() {
        let date = parse_utc_rfc3339("2019-01-05T08:14:03Z").unwrap();
        assert_eq!(format_table_date(date), "Sat 05 Jan 2019");
        assert_eq!(format_clock(date), "08:14");
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(parse_utc_rfc3339("yesterday").is_none());
    }
}
