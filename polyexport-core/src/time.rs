//! Display formatting for API timestamps

use crate::error::{ExportError, ExportResult};
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};

/// Offset applied to exported timestamps (UTC+8)
pub const DISPLAY_OFFSET_SECS: i32 = 8 * 3600;

const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Convert an ISO-8601 UTC timestamp to `YYYY-MM-DD HH:mm:ss.sss` at UTC+8
///
/// Accepts RFC 3339 (`2024-01-01T00:00:00.000Z`) and the space separated
/// variant with an explicit offset. A timestamp without any zone marker is
/// read as UTC.
pub fn to_local_display(utc_timestamp: &str) -> ExportResult<String> {
    let parsed = parse_timestamp(utc_timestamp.trim()).ok_or_else(|| {
        ExportError::format(format!("Unparseable timestamp: {:?}", utc_timestamp))
    })?;

    let offset = FixedOffset::east_opt(DISPLAY_OFFSET_SECS)
        .ok_or_else(|| ExportError::internal("invalid display offset"))?;

    Ok(parsed.with_timezone(&offset).format(DISPLAY_FORMAT).to_string())
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_year_midnight() {
        assert_eq!(
            to_local_display("2024-01-01T00:00:00.000Z").unwrap(),
            "2024-01-01 08:00:00.000"
        );
    }

    #[test]
    fn test_crosses_day_boundary() {
        assert_eq!(
            to_local_display("2024-02-28T20:15:30.5Z").unwrap(),
            "2024-02-29 04:15:30.500"
        );
    }

    #[test]
    fn test_microseconds_truncated() {
        assert_eq!(
            to_local_display("2025-10-17T12:34:56.789123Z").unwrap(),
            "2025-10-17 20:34:56.789"
        );
    }

    #[test]
    fn test_explicit_offset() {
        assert_eq!(
            to_local_display("2024-06-01 10:00:00+00").unwrap(),
            "2024-06-01 18:00:00.000"
        );
    }

    #[test]
    fn test_malformed() {
        assert!(matches!(
            to_local_display("not a date"),
            Err(ExportError::Format(_))
        ));
        assert!(to_local_display("").is_err());
    }
}
