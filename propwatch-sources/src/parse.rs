//! Lenient scalar parsing shared by the adapters
//!
//! Feeds disagree on whether numbers are JSON numbers or strings, and on
//! timestamp layout. These helpers accept the variants seen in practice.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// A number, or a string holding one
pub fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// RFC 3339, or a zone-less timestamp taken as UTC
pub fn parse_utc(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_number() {
        assert_eq!(number(&json!(2.33)), Some(2.33));
        assert_eq!(number(&json!(" 148 ")), Some(148.0));
        assert_eq!(number(&json!("n/a")), None);
        assert_eq!(number(&json!(null)), None);
    }

    #[test]
    fn test_parse_utc() {
        let expected = Utc.with_ymd_and_hms(2026, 10, 18, 20, 15, 1).unwrap();
        assert_eq!(parse_utc("2026-10-18T20:15:01"), Some(expected));
        assert_eq!(parse_utc("2026-10-18 20:15:01.000"), Some(expected));
        assert_eq!(parse_utc("2026-10-18T20:15:01Z"), Some(expected));
        assert_eq!(parse_utc("2026-10-18T22:15:01+02:00"), Some(expected));
        assert_eq!(parse_utc("yesterday"), None);
    }
}
