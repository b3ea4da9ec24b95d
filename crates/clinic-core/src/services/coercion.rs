//! Lenient date and amount parsing for webhook fields. Anything that does not
//! parse is treated as absent.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

pub fn parse_date(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

pub fn parse_amount(raw: Option<&str>) -> Option<f64> {
    let raw = raw?.trim();
    let raw = raw.strip_prefix('$').unwrap_or(raw).trim();
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}
