//! Formatting and parsing helpers shared across the core and the CLI.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

/// Format a timestamp relative to `now` (e.g., "2m ago").
pub fn format_relative_time(ts: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let duration = now.signed_duration_since(ts);

    if duration.num_seconds() < 0 {
        "just now".to_string()
    } else if duration.num_seconds() < 60 {
        format!("{}s ago", duration.num_seconds())
    } else if duration.num_minutes() < 60 {
        format!("{}m ago", duration.num_minutes())
    } else if duration.num_hours() < 24 {
        format!("{}h ago", duration.num_hours())
    } else if duration.num_days() < 7 {
        format!("{}d ago", duration.num_days())
    } else {
        ts.format("%b %d").to_string()
    }
}

/// Format an optional timestamp as relative time, or a dash if missing.
pub fn format_relative_time_opt(ts: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    match ts {
        Some(ts) => format_relative_time(ts, now),
        None => "-".to_string(),
    }
}

/// Fixed-width RFC3339 UTC form used for storage.
///
/// Every stored timestamp has the same width and offset suffix, so SQLite's
/// text comparison orders them chronologically.
pub fn storage_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse RFC3339 or SQLite `YYYY-MM-DD HH:MM:SS` (assumed UTC).
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Fractional days from `then` to `now`, floored at zero.
pub fn days_between(then: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let secs = now.signed_duration_since(then).num_milliseconds() as f64 / 1000.0;
    (secs / 86_400.0).max(0.0)
}

/// Truncate to at most `max_chars` characters, respecting char boundaries.
pub fn truncate_chars(value: &str, max_chars: usize) -> &str {
    match value.char_indices().nth(max_chars) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_relative_time() {
        let now = Utc::now();
        assert_eq!(format_relative_time(now - Duration::minutes(5), now), "5m ago");
        assert_eq!(format_relative_time(now - Duration::hours(3), now), "3h ago");
        assert_eq!(format_relative_time(now + Duration::hours(1), now), "just now");
        assert_eq!(format_relative_time_opt(None, now), "-");
    }

    #[test]
    fn test_storage_timestamp_orders_lexically() {
        let a = parse_timestamp("2026-03-01T09:00:00Z").unwrap();
        let b = a + Duration::milliseconds(1500);
        let c = a + Duration::days(40);
        let (sa, sb, sc) = (storage_timestamp(a), storage_timestamp(b), storage_timestamp(c));
        assert_eq!(sa.len(), sb.len());
        assert!(sa < sb && sb < sc);
        assert_eq!(parse_timestamp(&sb), Some(b));
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert!(parse_timestamp("2026-03-01T09:00:00+02:00").is_some());
        assert!(parse_timestamp("2026-03-01 09:00:00").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_days_between() {
        let now = Utc::now();
        assert!((days_between(now - Duration::days(14), now) - 14.0).abs() < 1e-9);
        assert_eq!(days_between(now + Duration::days(1), now), 0.0);
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 3), "hel");
        assert_eq!(truncate_chars("héllo wörld", 4), "héll");
        assert_eq!(truncate_chars(&"x".repeat(250), 200).chars().count(), 200);
    }
}
