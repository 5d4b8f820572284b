//! Shared utility functions used across multiple modules.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};

/// Normalize optional text by trimming whitespace and removing empties.
///
/// Returns `None` when the input is `None` or the trimmed value is empty.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    let value = value?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Check if a string starts with `http://` or `https://`.
pub fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

/// Truncate text to at most 180 characters for error messages.
pub fn compact_text(value: &str) -> String {
    value.trim().chars().take(180).collect()
}

/// Current Unix timestamp in seconds.
pub fn unix_timestamp_now() -> i64 {
    Utc::now().timestamp()
}

/// Current time at the millisecond precision timestamps are stored with.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Format a timestamp as ISO-8601 with millisecond precision (`2024-05-01T12:00:00.000Z`).
pub fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse an ISO-8601 / RFC 3339 timestamp into UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_option_rejects_empty() {
        assert_eq!(normalize_text_option(None), None);
        assert_eq!(normalize_text_option(Some("   ".to_string())), None);
    }

    #[test]
    fn normalize_text_option_trims_value() {
        assert_eq!(
            normalize_text_option(Some(" https://example.com ".to_string())),
            Some("https://example.com".to_string())
        );
    }

    #[test]
    fn is_http_url_accepts_valid_schemes() {
        assert!(is_http_url("http://localhost"));
        assert!(is_http_url("https://example.com"));
        assert!(!is_http_url("ftp://example.com"));
        assert!(!is_http_url("example.com"));
    }

    #[test]
    fn timestamps_use_iso_8601_with_millis() {
        let parsed = parse_timestamp("2024-05-01T12:30:00.250Z").unwrap();
        assert_eq!(format_timestamp(&parsed), "2024-05-01T12:30:00.250Z");
    }

    #[test]
    fn now_roundtrips_through_storage_format() {
        let value = now();
        assert_eq!(parse_timestamp(&format_timestamp(&value)), Some(value));
    }

    #[test]
    fn parse_timestamp_normalizes_offsets_to_utc() {
        let parsed = parse_timestamp("2024-05-01T09:30:00-03:00").unwrap();
        assert_eq!(format_timestamp(&parsed), "2024-05-01T12:30:00.000Z");
        assert!(parse_timestamp("yesterday").is_none());
    }
}
