//! Timestamp formatting for provenance markers.

use chrono::{DateTime, FixedOffset};

/// Wall-clock timestamp carried into markers.
pub type Timestamp = DateTime<FixedOffset>;

/// Format of the timestamp embedded in every marker.
pub const MARKER_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Formats a timestamp for a marker, in the timestamp's own offset.
///
/// # Examples
///
/// ```
/// use docflow::utils::format_marker_timestamp;
///
/// let ts = chrono::DateTime::parse_from_rfc3339("2024-05-01T12:30:05+02:00").unwrap();
/// assert_eq!(format_marker_timestamp(&ts), "2024-05-01 12:30:05");
/// ```
#[must_use]
pub fn format_marker_timestamp(ts: &Timestamp) -> String {
    ts.format(MARKER_TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_uses_seconds_precision() {
        let ts = DateTime::parse_from_rfc3339("2023-10-05T14:30:00.987654+00:00").unwrap();
        assert_eq!(format_marker_timestamp(&ts), "2023-10-05 14:30:00");
    }

    #[test]
    fn test_format_keeps_local_offset() {
        let ts = DateTime::parse_from_rfc3339("2023-10-05T23:59:59-07:00").unwrap();
        assert_eq!(format_marker_timestamp(&ts), "2023-10-05 23:59:59");
    }
}
