//! Display formatters

use crate::helpers::{group_digits, is_negative_after_rounding, number_style, numeric, timestamp};
use chrono::SecondsFormat;
use tally_fields::prelude::*;

const DEFAULT_LOCALE: &str = "en-US";
const DEFAULT_CURRENCY: &str = "USD";
const DEFAULT_CURRENCY_PRECISION: u32 = 2;

// ============================================================================
// currency
// ============================================================================

pub struct CurrencyFormatter;

static CURRENCY_TYPES: [FieldType; 1] = [FieldType::Currency];

fn currency_symbol(code: &str) -> Option<&'static str> {
    let symbol = match code.to_ascii_uppercase().as_str() {
        "USD" => "$",
        "EUR" => "€",
        "GBP" => "£",
        "JPY" | "CNY" => "¥",
        "INR" => "₹",
        "KRW" => "₩",
        "BRL" => "R$",
        "CAD" => "CA$",
        "AUD" => "A$",
        _ => return None,
    };
    Some(symbol)
}

impl ValueFormatter for CurrencyFormatter {
    fn meta(&self) -> HookMeta {
        HookMeta {
            name: "currency",
            description: "Locale-aware currency with symbol and fixed precision",
            field_types: &CURRENCY_TYPES,
        }
    }

    fn format(&self, value: &RecordValue, options: &FieldOptions) -> String {
        let n = match numeric(value) {
            Some(n) if n.is_finite() => n,
            _ => return value.to_string(),
        };
        let precision = options.precision.unwrap_or(DEFAULT_CURRENCY_PRECISION);
        let style = number_style(options.locale.as_deref().unwrap_or(DEFAULT_LOCALE));
        let code = options.currency.as_deref().unwrap_or(DEFAULT_CURRENCY);
        let body = group_digits(n, precision, style);
        let sign = if is_negative_after_rounding(n, precision) { "-" } else { "" };

        match (currency_symbol(code), style.symbol_first) {
            (Some(symbol), true) => format!("{}{}{}", sign, symbol, body),
            (Some(symbol), false) => format!("{}{} {}", sign, body, symbol),
            // Unknown codes print the code itself, separated by a space
            (None, true) => format!("{}{} {}", sign, code.to_ascii_uppercase(), body),
            (None, false) => format!("{}{} {}", sign, body, code.to_ascii_uppercase()),
        }
    }
}

// ============================================================================
// number / percent / rollup
// ============================================================================

pub struct NumberFormatter;

static NUMBER_TYPES: [FieldType; 2] = [FieldType::Number, FieldType::Rollup];

fn format_number(n: f64, options: &FieldOptions) -> String {
    match options.precision {
        Some(precision) => {
            let style = number_style(options.locale.as_deref().unwrap_or(DEFAULT_LOCALE));
            let sign = if is_negative_after_rounding(n, precision) { "-" } else { "" };
            format!("{}{}", sign, group_digits(n, precision, style))
        }
        None => n.to_string(),
    }
}

impl ValueFormatter for NumberFormatter {
    fn meta(&self) -> HookMeta {
        HookMeta {
            name: "number",
            description: "Grouped digits when a precision is set, plain otherwise",
            field_types: &NUMBER_TYPES,
        }
    }

    fn format(&self, value: &RecordValue, options: &FieldOptions) -> String {
        match numeric(value) {
            Some(n) if n.is_finite() => format_number(n, options),
            _ => value.to_string(),
        }
    }
}

pub struct PercentFormatter;

static PERCENT_TYPES: [FieldType; 1] = [FieldType::Percent];

impl ValueFormatter for PercentFormatter {
    fn meta(&self) -> HookMeta {
        HookMeta {
            name: "percent",
            description: "Stored value followed by a percent sign (12.5 → 12.5%)",
            field_types: &PERCENT_TYPES,
        }
    }

    fn format(&self, value: &RecordValue, options: &FieldOptions) -> String {
        match numeric(value) {
            Some(n) if n.is_finite() => format!("{}%", format_number(n, options)),
            _ => value.to_string(),
        }
    }
}

// ============================================================================
// date / dateTime / createdTime / modifiedTime
// ============================================================================

pub struct DateFormatter;

static DATE_TYPES: [FieldType; 4] = [
    FieldType::Date,
    FieldType::DateTime,
    FieldType::CreatedTime,
    FieldType::ModifiedTime,
];

/// User-facing format strings that may be stored on a field, and their
/// strftime equivalents. Nothing outside this list reaches chrono.
static DATE_FORMATS: [(&str, &str); 6] = [
    ("YYYY-MM-DD", "%Y-%m-%d"),
    ("MM/DD/YYYY", "%m/%d/%Y"),
    ("DD/MM/YYYY", "%d/%m/%Y"),
    ("MMM D, YYYY", "%b %-d, %Y"),
    ("D MMM YYYY", "%-d %b %Y"),
    ("YYYY-MM-DD HH:mm", "%Y-%m-%d %H:%M"),
];

pub fn strftime_for(format: &str) -> Option<&'static str> {
    DATE_FORMATS
        .iter()
        .find(|(name, _)| *name == format)
        .map(|(_, pattern)| *pattern)
}

impl ValueFormatter for DateFormatter {
    fn meta(&self) -> HookMeta {
        HookMeta {
            name: "date",
            description: "Whitelisted date formats, ISO 8601 otherwise",
            field_types: &DATE_TYPES,
        }
    }

    fn format(&self, value: &RecordValue, options: &FieldOptions) -> String {
        let t = match timestamp(value) {
            Some(t) => t,
            None => return value.to_string(),
        };
        match options.date_format.as_deref().and_then(strftime_for) {
            Some(pattern) => t.format(pattern).to_string(),
            None => t.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_currency_en_us() {
        let opts = FieldOptions::default();
        assert_eq!(CurrencyFormatter.format(&RecordValue::Number(1234.5), &opts), "$1,234.50");
        assert_eq!(CurrencyFormatter.format(&RecordValue::Number(-3.0), &opts), "-$3.00");
        assert_eq!(CurrencyFormatter.format(&RecordValue::Number(-0.001), &opts), "$0.00");
    }

    #[test]
    fn test_currency_locales() {
        let de = FieldOptions::default().with_currency("EUR", "de-DE");
        assert_eq!(CurrencyFormatter.format(&RecordValue::Number(1234.5), &de), "1.234,50 €");
        let jp = FieldOptions::default().with_currency("JPY", "ja-JP").with_precision(0);
        assert_eq!(CurrencyFormatter.format(&RecordValue::Number(1500.0), &jp), "¥1,500");
        let odd = FieldOptions::default().with_currency("chf", "en-US");
        assert_eq!(CurrencyFormatter.format(&RecordValue::Number(10.0), &odd), "CHF 10.00");
    }

    #[test]
    fn test_huge_precision_does_not_panic() {
        let opts = FieldOptions::default().with_precision(50_000_000);
        let text = CurrencyFormatter.format(&RecordValue::Number(1.0), &opts);
        assert_eq!(text, format!("$1.{}", "0".repeat(20)));
        let pct = PercentFormatter.format(&RecordValue::Number(-2.5), &opts);
        assert!(pct.starts_with("-2.5") && pct.ends_with('%'));
    }

    #[test]
    fn test_currency_non_numeric_passthrough() {
        let opts = FieldOptions::default();
        assert_eq!(CurrencyFormatter.format(&RecordValue::from("n/a"), &opts), "n/a");
    }

    #[test]
    fn test_number_and_percent() {
        let plain = FieldOptions::default();
        assert_eq!(NumberFormatter.format(&RecordValue::Number(0.5), &plain), "0.5");
        let fixed = FieldOptions::default().with_precision(1);
        assert_eq!(NumberFormatter.format(&RecordValue::Number(12345.67), &fixed), "12,345.7");
        assert_eq!(PercentFormatter.format(&RecordValue::Number(12.5), &plain), "12.5%");
    }

    #[test]
    fn test_date_whitelist() {
        let t = RecordValue::Timestamp(Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 0).unwrap());
        let fmt = |f: &str| DateFormatter.format(&t, &FieldOptions::default().with_date_format(f));
        assert_eq!(fmt("YYYY-MM-DD"), "2024-03-05");
        assert_eq!(fmt("MM/DD/YYYY"), "03/05/2024");
        assert_eq!(fmt("DD/MM/YYYY"), "05/03/2024");
        assert_eq!(fmt("MMM D, YYYY"), "Mar 5, 2024");
        assert_eq!(fmt("D MMM YYYY"), "5 Mar 2024");
        assert_eq!(fmt("YYYY-MM-DD HH:mm"), "2024-03-05 14:07");
        // strftime directives are not accepted verbatim
        assert_eq!(fmt("%s"), "2024-03-05T14:07:00Z");
        assert_eq!(DateFormatter.format(&t, &FieldOptions::default()), "2024-03-05T14:07:00Z");
    }
}
