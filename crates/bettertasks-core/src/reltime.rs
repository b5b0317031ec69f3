//! Relative labels for task creation timestamps ("5m ago", "Mar 3").

use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use regex::Regex;
use tracing::{debug, warn};

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

fn offset_suffix() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[+-]\d{2}:\d{2}$").ok())
        .as_ref()
}

/// Parses a backend timestamp. Strings carrying `Z` or an explicit offset are
/// taken as-is; the backend stores UTC and sometimes drops the marker, so a
/// bare date-time is read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if raw.ends_with('Z') || offset_suffix().is_some_and(|re| re.is_match(raw)) {
        return DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc));
    }

    if raw.contains('T') || raw.contains(' ') {
        return NAIVE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
            .map(|naive| Utc.from_utc_datetime(&naive));
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Formats `raw` relative to `now`. Unparseable input yields an empty label;
/// timestamps in the future (clock skew) read as "Just now". Dates older than
/// a week are shown in `tz`.
pub fn format_relative(raw: &str, now: DateTime<Utc>, tz: &Tz) -> String {
    let Some(created) = parse_timestamp(raw) else {
        warn!(timestamp = %raw, "unparseable task timestamp");
        return String::new();
    };

    let elapsed = now.signed_duration_since(created);
    if elapsed < chrono::Duration::zero() {
        debug!(timestamp = %raw, skew_ms = -elapsed.num_milliseconds(), "timestamp is ahead of local clock");
        return "Just now".to_string();
    }

    let secs = elapsed.num_seconds();
    if secs < 60 {
        return "Just now".to_string();
    }
    let mins = elapsed.num_minutes();
    if mins < 60 {
        return format!("{mins}m ago");
    }
    let hours = elapsed.num_hours();
    if hours < 24 {
        return format!("{hours}h ago");
    }
    let days = elapsed.num_days();
    if days < 7 {
        return format!("{days}d ago");
    }

    let local = created.with_timezone(tz);
    // Year-old timestamps show their real date, never "Just now".
    if days >= 365 {
        local.format("%b %-d, %Y").to_string()
    } else {
        local.format("%b %-d").to_string()
    }
}
