use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Returns the current time in the configured timezone.
pub fn now_in_timezone(tz: &Tz) -> DateTime<Tz> {
    Utc::now().with_timezone(tz)
}

/// Current instant as Unix seconds.
pub fn now_unix() -> i64 {
    Utc::now().timestamp()
}

/// Current instant as an ISO-8601 string, the format every store write
/// stamps into `updatedAt`.
pub fn now_iso() -> String {
    Utc::now().to_rfc3339()
}

/// Converts Unix seconds into the configured local timezone.
pub fn unix_to_local(ts: i64, tz: &Tz) -> DateTime<Tz> {
    tz.timestamp_opt(ts, 0)
        .single()
        .unwrap_or_else(|| Utc.timestamp_opt(ts, 0).unwrap().with_timezone(tz))
}

/// ISO rendering of a Unix timestamp, used by the cursor and index metadata.
pub fn unix_to_iso(ts: i64) -> String {
    Utc.timestamp_opt(ts, 0)
        .single()
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unix_to_local_respects_timezone() {
        let tz = chrono_tz::Asia::Shanghai;
        // 2026-01-01 00:00 UTC+8
        let dt = unix_to_local(1_767_196_800, &tz);
        assert_eq!(dt.to_rfc3339(), "2026-01-01T00:00:00+08:00");
    }

    #[test]
    fn unix_to_iso_renders_utc() {
        assert_eq!(unix_to_iso(0), "1970-01-01T00:00:00+00:00");
    }

    #[test]
    fn now_unix_close_to_now_iso() {
        let unix = now_unix();
        let iso = now_iso();
        let parsed = DateTime::parse_from_rfc3339(&iso).expect("parse iso");
        assert!((parsed.timestamp() - unix).abs() < 2);
    }
}
