//! Kind-tagged field formatting.
//!
//! Every field kind goes through [`format_field`]; the time heuristics live
//! here so they can be tested apart from JSON extraction.

use super::level::classify_level;
use crate::config::types::{FieldKind, FieldSpec};
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::HashMap;
use std::fmt::Write;

/// Shown for fields that have no value.
pub const PLACEHOLDER: &str = "-";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Seconds,
    Millis,
    Micros,
}

impl TimeUnit {
    fn per_second(self) -> f64 {
        match self {
            TimeUnit::Seconds => 1.0,
            TimeUnit::Millis => 1e3,
            TimeUnit::Micros => 1e6,
        }
    }

    /// Unit implied by the digit count of an epoch value's integer part
    pub fn from_digits(digits: usize) -> Option<Self> {
        match digits {
            1..=10 => Some(TimeUnit::Seconds),
            11..=13 => Some(TimeUnit::Millis),
            14..=16 => Some(TimeUnit::Micros),
            _ => None,
        }
    }
}

/// Format the raw text found for a field according to its kind.
pub fn format_field(value: &str, spec: &FieldSpec, mapping: &HashMap<String, String>) -> String {
    let value = value.trim();
    let layout = spec.time_format.as_deref();

    match spec.kind {
        FieldKind::Message | FieldKind::Any | FieldKind::Time => sanitize(value),
        FieldKind::Level => classify_level(&sanitize(value), mapping),
        FieldKind::NumericTime => sanitize(&format_numeric_time(value, layout)),
        FieldKind::SecondTime => sanitize(&format_unit_time(value, TimeUnit::Seconds, layout)),
        FieldKind::MilliTime => sanitize(&format_unit_time(value, TimeUnit::Millis, layout)),
        FieldKind::MicroTime => sanitize(&format_unit_time(value, TimeUnit::Micros, layout)),
    }
}

/// Keep a record on one line: escape newlines and tabs, drop other control characters.
pub fn sanitize(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}

/// Epoch value with the unit guessed from its digit count.
///
/// Values that are not plain decimal numbers, or whose integer part is
/// longer than 16 digits, are treated as already formatted and returned
/// unchanged.
pub fn format_numeric_time(value: &str, layout: Option<&str>) -> String {
    let Some(digits) = integer_digits(value) else {
        return value.to_string();
    };
    let Some(unit) = TimeUnit::from_digits(digits) else {
        return value.to_string();
    };

    match instant_from(value, unit) {
        Some(instant) => render_time(instant, layout),
        None => value.to_string(),
    }
}

/// Epoch value in an explicit unit; anything unparseable passes through.
pub fn format_unit_time(value: &str, unit: TimeUnit, layout: Option<&str>) -> String {
    match instant_from(value, unit) {
        Some(instant) => render_time(instant, layout),
        None => value.to_string(),
    }
}

/// Render with the strftime `layout`, RFC 3339 when absent or invalid
pub fn render_time(instant: DateTime<Utc>, layout: Option<&str>) -> String {
    if let Some(layout) = layout {
        let mut out = String::new();
        if write!(out, "{}", instant.format(layout)).is_ok() {
            return out;
        }
    }
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Digit count of the integer part of a plain decimal number
fn integer_digits(value: &str) -> Option<usize> {
    let unsigned = value.strip_prefix('-').unwrap_or(value);
    let (integer, fraction) = match unsigned.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (unsigned, None),
    };

    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(integer) || !fraction.map_or(true, all_digits) {
        return None;
    }
    Some(integer.len())
}

fn instant_from(value: &str, unit: TimeUnit) -> Option<DateTime<Utc>> {
    if let Ok(whole) = value.parse::<i64>() {
        return match unit {
            TimeUnit::Seconds => DateTime::from_timestamp(whole, 0),
            TimeUnit::Millis => DateTime::from_timestamp_millis(whole),
            TimeUnit::Micros => DateTime::from_timestamp_micros(whole),
        };
    }

    let number: f64 = value.parse().ok()?;
    if !number.is_finite() {
        return None;
    }
    let seconds = number / unit.per_second();
    let whole = seconds.floor();
    let nanos = ((seconds - whole) * 1e9).round().min(999_999_999.0) as u32;
    if whole < i64::MIN as f64 || whole > i64::MAX as f64 {
        return None;
    }
    DateTime::from_timestamp(whole as i64, nanos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::default_level_mapping;

    fn spec(kind: FieldKind) -> FieldSpec {
        FieldSpec::new("Field", kind, &["$.f"], 0)
    }

    #[test]
    fn test_numeric_time_units_agree() {
        // 1, 13 and 16 digits: seconds, milliseconds, microseconds
        for value in ["1", "0000000001000", "0000000001000000"] {
            assert_eq!(
                format_numeric_time(value, None),
                "1970-01-01T00:00:01Z",
                "value {}",
                value
            );
        }
    }

    #[test]
    fn test_numeric_time_digit_ranges() {
        // 10 digits: seconds
        assert_eq!(
            format_numeric_time("1700000000", None),
            "2023-11-14T22:13:20Z"
        );
        // 11 digits: milliseconds
        assert_eq!(
            format_numeric_time("12345678900", None),
            "1970-05-23T21:21:18Z"
        );
        // 13 digits: milliseconds
        assert_eq!(
            format_numeric_time("1700000000000", None),
            "2023-11-14T22:13:20Z"
        );
        // 16 digits: microseconds
        assert_eq!(
            format_numeric_time("1700000000000000", None),
            "2023-11-14T22:13:20Z"
        );
        // 17 digits: left alone
        assert_eq!(
            format_numeric_time("17000000000000000", None),
            "17000000000000000"
        );
    }

    #[test]
    fn test_numeric_time_fraction() {
        assert_eq!(format_numeric_time("1.5", None), "1970-01-01T00:00:01Z");
        assert_eq!(
            format_numeric_time("1.5", Some("%S%.3f")),
            "01.500"
        );
        assert_eq!(
            format_numeric_time("1700000000000.0", None),
            "2023-11-14T22:13:20Z"
        );
    }

    #[test]
    fn test_numeric_time_passes_text_through() {
        for value in ["-", "2023-10-08 20:00:00", "2023-10-08T20:00:00Z", "", "1e9", "12ab"] {
            assert_eq!(format_numeric_time(value, None), value);
        }
    }

    #[test]
    fn test_numeric_time_layout() {
        assert_eq!(
            format_numeric_time("1700000000", Some("%Y-%m-%d %H:%M:%S")),
            "2023-11-14 22:13:20"
        );
    }

    #[test]
    fn test_invalid_layout_falls_back() {
        assert_eq!(
            format_numeric_time("1", Some("%Q")),
            "1970-01-01T00:00:01Z"
        );
    }

    #[test]
    fn test_unit_time_kinds() {
        assert_eq!(
            format_unit_time("1", TimeUnit::Seconds, None),
            "1970-01-01T00:00:01Z"
        );
        assert_eq!(
            format_unit_time("1000", TimeUnit::Millis, None),
            "1970-01-01T00:00:01Z"
        );
        assert_eq!(
            format_unit_time("1000000", TimeUnit::Micros, None),
            "1970-01-01T00:00:01Z"
        );
        assert_eq!(
            format_unit_time("1500.5", TimeUnit::Millis, Some("%S%.3f")),
            "01.500"
        );
    }

    #[test]
    fn test_unit_time_passes_garbage_through() {
        assert_eq!(format_unit_time("soon", TimeUnit::Seconds, None), "soon");
        assert_eq!(format_unit_time("NaN", TimeUnit::Millis, None), "NaN");
        assert_eq!(format_unit_time("", TimeUnit::Micros, None), "");
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("a\nb\tc"), "a\\nb\\tc");
        assert_eq!(sanitize("bell\u{7}\r"), "bell");
        assert_eq!(sanitize("ünïcode ✓"), "ünïcode ✓");
    }

    #[test]
    fn test_format_field_dispatch() {
        let mapping = default_level_mapping();

        assert_eq!(
            format_field(" hello\nworld ", &spec(FieldKind::Message), &mapping),
            "hello\\nworld"
        );
        assert_eq!(format_field("WARNING", &spec(FieldKind::Level), &mapping), "warn");
        assert_eq!(format_field("40", &spec(FieldKind::Level), &mapping), "warn");
        assert_eq!(format_field("", &spec(FieldKind::Level), &mapping), "none");
        assert_eq!(
            format_field("1", &spec(FieldKind::NumericTime), &mapping),
            "1970-01-01T00:00:01Z"
        );
        assert_eq!(
            format_field("1", &spec(FieldKind::Time), &mapping),
            "1"
        );
        assert_eq!(
            format_field("1000", &spec(FieldKind::MilliTime), &mapping),
            "1970-01-01T00:00:01Z"
        );
    }

    #[test]
    fn test_time_format_from_field() {
        let mut time = spec(FieldKind::SecondTime);
        time.time_format = Some("%H:%M".to_string());

        assert_eq!(format_field("3600", &time, &HashMap::new()), "01:00");
    }
}
