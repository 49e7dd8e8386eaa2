use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

/// Epoch values above this magnitude are taken as milliseconds.
const EPOCH_MILLIS_THRESHOLD: f64 = 1e12;

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Handles parsing timestamps from various formats used in Claude usage data
pub struct TimestampParser;

impl TimestampParser {
    /// Parse a timestamp string into a DateTime<Utc>.
    ///
    /// A missing offset is UTC, never local time. Unparseable input yields `None`.
    pub fn parse(timestamp_str: &str) -> Option<DateTime<Utc>> {
        let trimmed = timestamp_str.trim();
        if trimmed.is_empty() {
            return None;
        }

        // Handle both Z suffix and timezone info
        let timestamp = match trimmed.strip_suffix('Z').or_else(|| trimmed.strip_suffix('z')) {
            Some(stripped) => format!("{}+00:00", stripped),
            None => trimmed.to_string(),
        };

        if let Ok(dt) = DateTime::parse_from_rfc3339(&timestamp) {
            return Some(dt.with_timezone(&Utc));
        }

        // RFC 3339 with a space separator
        if let Ok(dt) = DateTime::parse_from_str(&timestamp, "%Y-%m-%d %H:%M:%S%.f%:z") {
            return Some(dt.with_timezone(&Utc));
        }

        for format in NAIVE_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(&timestamp, format) {
                return Some(Utc.from_utc_datetime(&naive));
            }
        }

        NaiveDate::parse_from_str(&timestamp, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| Utc.from_utc_datetime(&naive))
    }

    /// Parse a raw JSON timestamp: an ISO-8601 string or a numeric epoch.
    pub fn parse_value(value: &Value) -> Option<DateTime<Utc>> {
        match value {
            Value::String(s) => Self::parse(s),
            Value::Number(n) => n.as_f64().and_then(Self::from_epoch),
            _ => None,
        }
    }

    fn from_epoch(raw: f64) -> Option<DateTime<Utc>> {
        if !raw.is_finite() || raw < 0.0 {
            return None;
        }
        let millis = if raw > EPOCH_MILLIS_THRESHOLD {
            raw
        } else {
            raw * 1000.0
        };
        DateTime::from_timestamp_millis(millis as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use serde_json::json;

    #[test]
    fn test_parse_z_suffix() {
        let result = TimestampParser::parse("2024-01-01T12:00:00.000Z").unwrap();
        assert_eq!(result.hour(), 12);
    }

    #[test]
    fn test_parse_timezone() {
        let result = TimestampParser::parse("2024-01-01T12:00:00.000+02:00").unwrap();
        assert_eq!(result.hour(), 10);
    }

    #[test]
    fn test_parse_naive_is_utc() {
        let result = TimestampParser::parse("2024-01-01T12:00:00.000").unwrap();
        assert_eq!(result, Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_space_separator() {
        assert!(TimestampParser::parse("2024-01-01 12:00:00").is_some());
        assert!(TimestampParser::parse("2024-01-01 12:00:00+00:00").is_some());
    }

    #[test]
    fn test_parse_date_only() {
        let result = TimestampParser::parse("2024-03-05").unwrap();
        assert_eq!(result, Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_invalid() {
        assert!(TimestampParser::parse("invalid").is_none());
        assert!(TimestampParser::parse("").is_none());
        assert!(TimestampParser::parse("2024-13-45T99:00:00Z").is_none());
    }

    #[test]
    fn test_parse_value_epoch() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(TimestampParser::parse_value(&json!(1704067200)), Some(expected));
        assert_eq!(TimestampParser::parse_value(&json!(1704067200000u64)), Some(expected));
        assert!(TimestampParser::parse_value(&json!(null)).is_none());
        assert!(TimestampParser::parse_value(&json!(-5)).is_none());
    }
}
