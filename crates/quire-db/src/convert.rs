//! Column conversion helpers shared by the repositories.
//!
//! SQLite has no native UUID or timestamp types; identifiers are stored as
//! hyphenated text and timestamps as fixed-width RFC 3339 text (microsecond
//! precision, `Z` suffix) so lexicographic ordering matches chronological
//! ordering.

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use quire_core::{Error, Result};

/// Format a timestamp for storage.
pub(crate) fn fmt_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp.
pub(crate) fn parse_ts(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Serialization(format!("Invalid timestamp '{}': {}", s, e)))
}

/// Parse an optional stored timestamp.
pub(crate) fn parse_ts_opt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
    s.map(|v| parse_ts(&v)).transpose()
}

/// Parse a stored UUID.
pub(crate) fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| Error::Serialization(format!("Invalid UUID '{}': {}", s, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ts_round_trip() {
        let now = Utc::now();
        let stored = fmt_ts(&now);
        let parsed = parse_ts(&stored).expect("parse");
        // Microsecond precision survives the round trip
        assert_eq!(now.timestamp_micros(), parsed.timestamp_micros());
    }

    #[test]
    fn test_ts_fixed_width_ordering() {
        let a = parse_ts("2026-08-07T12:00:05.250000Z").unwrap();
        let b = parse_ts("2026-08-07T12:00:05.300000Z").unwrap();
        assert!(a < b);
        // Lexicographic ordering of the stored form matches
        assert!(fmt_ts(&a) < fmt_ts(&b));
    }

    #[test]
    fn test_parse_ts_rejects_garbage() {
        assert!(parse_ts("not a timestamp").is_err());
    }

    #[test]
    fn test_uuid_round_trip() {
        let id = Uuid::new_v4();
        let parsed = parse_uuid(&id.to_string()).expect("parse");
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_parse_uuid_rejects_garbage() {
        assert!(parse_uuid("xyz").is_err());
    }

    #[test]
    fn test_parse_ts_opt() {
        assert_eq!(parse_ts_opt(None).unwrap(), None);
        let now = Utc::now();
        let parsed = parse_ts_opt(Some(fmt_ts(&now))).unwrap().unwrap();
        assert_eq!(now.timestamp_micros(), parsed.timestamp_micros());
    }
}
