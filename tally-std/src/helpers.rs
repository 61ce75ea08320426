//! Helper functions shared by the standard hooks
//!
//! Common utilities for reading loosely typed record values.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use tally_core::{parse_numeric_text, RecordValue};

/// Number stored either as a number or as numeric text
pub fn numeric(value: &RecordValue) -> Option<f64> {
    match value {
        RecordValue::Number(n) => Some(*n),
        RecordValue::Text(s) => parse_numeric_text(s),
        _ => None,
    }
}

/// Timestamp from a stored timestamp, RFC 3339 text, `YYYY-MM-DD` text,
/// or epoch milliseconds
pub fn timestamp(value: &RecordValue) -> Option<DateTime<Utc>> {
    match value {
        RecordValue::Timestamp(t) => Some(*t),
        RecordValue::Text(s) => parse_timestamp_text(s),
        RecordValue::Number(ms) if ms.is_finite() => Utc.timestamp_millis_opt(*ms as i64).single(),
        _ => None,
    }
}

pub fn parse_timestamp_text(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| Utc.from_utc_datetime(&dt))
}

/// Separators and symbol placement for a locale
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberStyle {
    pub group: char,
    pub decimal: char,
    pub symbol_first: bool,
}

const EN: NumberStyle = NumberStyle { group: ',', decimal: '.', symbol_first: true };
const EURO: NumberStyle = NumberStyle { group: '.', decimal: ',', symbol_first: false };
const FR: NumberStyle = NumberStyle { group: ' ', decimal: ',', symbol_first: false };
const CH: NumberStyle = NumberStyle { group: '\'', decimal: '.', symbol_first: true };

/// Unknown locales format like `en-US`
pub fn number_style(locale: &str) -> NumberStyle {
    let language = locale.split(['-', '_']).next().unwrap_or("en").to_ascii_lowercase();
    match (language.as_str(), locale) {
        (_, "de-CH") => CH,
        ("de" | "es" | "it" | "nl" | "pt" | "da" | "id" | "tr", _) => EURO,
        ("fr" | "sv" | "nb" | "fi" | "pl" | "cs" | "ru", _) => FR,
        _ => EN,
    }
}

/// Decimal places honoured when formatting; larger requests are clamped
pub const MAX_PRECISION: u32 = 20;

/// Fixed-point rendering with grouped thousands, e.g. `1234567.891` → `1,234,567.89`
pub fn group_digits(value: f64, precision: u32, style: NumberStyle) -> String {
    let precision = precision.min(MAX_PRECISION);
    let fixed = format!("{:.*}", precision as usize, value.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i.to_string(), Some(f.to_string())),
        None => (fixed.clone(), None),
    };

    let digits: Vec<char> = int_part.chars().collect();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(style.group);
        }
        grouped.push(*c);
    }

    if let Some(frac) = frac_part {
        grouped.push(style.decimal);
        grouped.push_str(&frac);
    }
    grouped
}

/// Sign handling shared by currency and number formatting: `-0.00` prints as `0.00`
pub fn is_negative_after_rounding(value: f64, precision: u32) -> bool {
    let scale = 10f64.powi(precision.min(MAX_PRECISION) as i32);
    (value * scale).round() < 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_digits() {
        assert_eq!(group_digits(1234567.891, 2, EN), "1,234,567.89");
        assert_eq!(group_digits(999.0, 0, EN), "999");
        assert_eq!(group_digits(1000.5, 2, EURO), "1.000,50");
        assert_eq!(group_digits(0.0, 2, EN), "0.00");
    }

    #[test]
    fn test_precision_is_clamped() {
        let expected = format!("1.{}", "0".repeat(MAX_PRECISION as usize));
        assert_eq!(group_digits(1.0, 70_000, EN), expected);
        assert_eq!(group_digits(1.0, u32::MAX, EN), expected);
        assert!(is_negative_after_rounding(-1.0, u32::MAX));
    }

    #[test]
    fn test_number_style() {
        assert_eq!(number_style("en-US"), EN);
        assert_eq!(number_style("de-DE"), EURO);
        assert_eq!(number_style("fr-FR"), FR);
        assert_eq!(number_style("de-CH"), CH);
        assert_eq!(number_style("xx"), EN);
    }

    #[test]
    fn test_timestamp_sources() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 9, 0, 0, 0).unwrap();
        assert_eq!(timestamp(&RecordValue::from("2024-03-09")), Some(expected));
        assert_eq!(timestamp(&RecordValue::from("2024-03-09T00:00:00Z")), Some(expected));
        assert_eq!(timestamp(&RecordValue::Number(expected.timestamp_millis() as f64)), Some(expected));
        assert_eq!(timestamp(&RecordValue::from("next tuesday")), None);
    }

    #[test]
    fn test_negative_rounding() {
        assert!(!is_negative_after_rounding(-0.001, 2));
        assert!(is_negative_after_rounding(-0.01, 2));
    }
}
