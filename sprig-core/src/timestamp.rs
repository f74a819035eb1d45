//! Lenient `sent_at` parsing.
//!
//! Backends disagree on how they render timestamps (RFC 3339 with or without
//! fractional seconds, Postgres' `+00` offsets, bare dates, epoch numbers).
//! Ordering only needs a comparable instant, so every form we recognise maps
//! to epoch milliseconds and everything else maps to zero.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::identity::EpochMillis;

/// Offset-carrying layouts that RFC 3339 rejects (hour-only offsets, space separator).
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%#z",
    "%Y-%m-%dT%H:%M:%S%.f%#z",
    "%Y-%m-%d %H:%M:%S%#z",
    "%Y-%m-%dT%H:%M:%S%#z",
];

/// Offset-less layouts, read as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse a `sent_at` string into epoch milliseconds.
///
/// Never fails: empty, malformed or out-of-range input yields `0`, so such
/// messages sort as if sent at the epoch.
pub fn parse_sent_at(raw: &str) -> EpochMillis {
    try_parse_sent_at(raw).unwrap_or(0)
}

/// Parse a `sent_at` string, returning `None` when no known layout matches.
pub fn try_parse_sent_at(raw: &str) -> Option<EpochMillis> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp_millis());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.timestamp_millis());
    }
    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(raw, format) {
            return Some(dt.timestamp_millis());
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc().timestamp_millis());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|naive| naive.and_utc().timestamp_millis());
    }

    // Epoch milliseconds as a plain integer
    raw.parse::<i64>().ok()
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use chrono::{SecondsFormat, TimeZone, Utc};
    use proptest::prelude::*;

    proptest! {
        /// Property: any RFC 3339 rendering parses back to its own instant.
        #[test]
        fn prop_rfc3339_roundtrip(millis in 0i64..4_102_444_800_000i64) {
            let dt = Utc.timestamp_millis_opt(millis).single().expect("in range");
            let rendered = dt.to_rfc3339_opts(SecondsFormat::Millis, true);
            prop_assert_eq!(parse_sent_at(&rendered), millis);
        }

        /// Property: parsing never panics on arbitrary input.
        #[test]
        fn prop_arbitrary_input_never_panics(raw in ".*") {
            let _ = parse_sent_at(&raw);
        }
    }
}
