use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::{OffsetDateTime, UtcOffset};

const NANOS_PER_MILLI: i128 = 1_000_000;
const NANOS_PER_SECOND: f64 = 1_000_000_000.0;
const MAX_EPOCH_MILLIS: i128 = 100_000_000_000_000;

/// A raw vendor creation instant, kept as-received so messages can be
/// ordered numerically before any of them is canonicalized.
#[derive(Debug, Clone, PartialEq)]
pub enum RawTimestamp {
    /// Unix epoch seconds, fractional allowed.
    Seconds(f64),
    /// A vendor-supplied string, usually already ISO-8601.
    Text(String),
}

impl RawTimestamp {
    /// Lifts a JSON value into a raw instant. Null, booleans, and empty
    /// strings carry no instant.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(number) => number.as_f64().map(Self::Seconds),
            Value::String(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(Self::Text(trimmed.to_string()))
                }
            }
            _ => None,
        }
    }

    /// The instant as Unix epoch seconds, for numeric ordering. `None` when
    /// the raw value cannot be interpreted as an instant at all.
    #[must_use]
    pub fn epoch_seconds(&self) -> Option<f64> {
        match self {
            Self::Seconds(seconds) => Some(*seconds),
            Self::Text(text) => to_epoch_seconds(text),
        }
    }

    /// Canonicalizes the instant to fixed-width ISO-8601 UTC milliseconds
    /// (`YYYY-MM-DDTHH:MM:SS.mmmZ`).
    ///
    /// Date-like strings pass through unchanged: they are assumed already
    /// canonical and rewriting them would invent precision the vendor never
    /// claimed. Numeric strings are treated as epoch seconds. Anything else
    /// yields `None`; normalization failure is never fatal.
    #[must_use]
    pub fn normalize(&self) -> Option<String> {
        match self {
            Self::Seconds(seconds) => format_epoch_seconds(*seconds),
            Self::Text(text) => {
                if looks_like_datetime(text) {
                    Some(text.clone())
                } else {
                    text.parse::<f64>().ok().and_then(format_epoch_seconds)
                }
            }
        }
    }
}

#[must_use]
pub fn looks_like_datetime(candidate: &str) -> bool {
    candidate.contains('T') || candidate.ends_with('Z')
}

/// Formats Unix epoch seconds as ISO-8601 UTC with millisecond precision
/// and a literal `Z` suffix. Instants before 1970 or beyond the supported
/// millisecond range yield `None`.
#[must_use]
pub fn format_epoch_seconds(seconds: f64) -> Option<String> {
    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }

    let epoch_ms = (seconds * 1_000.0) as i128;
    if epoch_ms >= MAX_EPOCH_MILLIS {
        return None;
    }

    let dt = OffsetDateTime::from_unix_timestamp_nanos(epoch_ms * NANOS_PER_MILLI)
        .ok()?
        .to_offset(UtcOffset::UTC);
    Some(format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:03}Z",
        dt.year(),
        u8::from(dt.month()),
        dt.day(),
        dt.hour(),
        dt.minute(),
        dt.second(),
        dt.millisecond()
    ))
}

/// Inverse of normalization, used wherever two canonical timestamps must be
/// compared numerically. Lexical comparison of ISO strings is only sound
/// for the fixed-width format this module produces itself, not for
/// pass-through vendor strings of unknown precision.
#[must_use]
pub fn to_epoch_seconds(candidate: &str) -> Option<f64> {
    let trimmed = candidate.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(parsed) = OffsetDateTime::parse(trimmed, &Rfc3339) {
        return Some(parsed.unix_timestamp_nanos() as f64 / NANOS_PER_SECOND);
    }

    trimmed.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{RawTimestamp, format_epoch_seconds, to_epoch_seconds};

    #[test]
    fn formats_epoch_seconds_to_millisecond_utc() {
        assert_eq!(
            format_epoch_seconds(1_000.0).expect("epoch should format"),
            "1970-01-01T00:16:40.000Z"
        );
        assert_eq!(
            format_epoch_seconds(1_704_067_200.5).expect("fractional epoch should format"),
            "2024-01-01T00:00:00.500Z"
        );
    }

    #[test]
    fn rejects_negative_and_non_finite_epochs() {
        assert_eq!(format_epoch_seconds(-1.0), None);
        assert_eq!(format_epoch_seconds(f64::NAN), None);
        assert_eq!(format_epoch_seconds(f64::INFINITY), None);
    }

    #[test]
    fn normalizes_numeric_value() {
        let raw = RawTimestamp::from_value(&json!(1_704_067_200)).expect("number should lift");
        assert_eq!(raw.normalize().as_deref(), Some("2024-01-01T00:00:00.000Z"));
        assert_eq!(raw.epoch_seconds(), Some(1_704_067_200.0));
    }

    #[test]
    fn passes_datetime_strings_through_unchanged() {
        let raw = RawTimestamp::Text("2024-01-01T00:00:00Z".to_string());
        assert_eq!(raw.normalize().as_deref(), Some("2024-01-01T00:00:00Z"));
        assert_eq!(raw.epoch_seconds(), Some(1_704_067_200.0));
    }

    #[test]
    fn parses_numeric_strings_as_epoch_seconds() {
        let raw = RawTimestamp::Text("1704067200".to_string());
        assert_eq!(raw.normalize().as_deref(), Some("2024-01-01T00:00:00.000Z"));
    }

    #[test]
    fn unparseable_strings_normalize_to_none() {
        let raw = RawTimestamp::Text("next friday".to_string());
        assert_eq!(raw.normalize(), None);
        assert_eq!(raw.epoch_seconds(), None);
    }

    #[test]
    fn null_and_empty_values_carry_no_instant() {
        assert_eq!(RawTimestamp::from_value(&serde_json::Value::Null), None);
        assert_eq!(RawTimestamp::from_value(&json!("   ")), None);
        assert_eq!(RawTimestamp::from_value(&json!(true)), None);
    }

    #[test]
    fn inverse_recovers_fractional_seconds() {
        let seconds = to_epoch_seconds("2024-01-01T00:00:00.500Z").expect("iso should parse");
        assert!((seconds - 1_704_067_200.5).abs() < 1e-6);
        assert_eq!(to_epoch_seconds("not a time"), None);
        assert_eq!(to_epoch_seconds("1000"), Some(1_000.0));
    }
}
