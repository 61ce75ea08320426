//! Value validators

use crate::helpers::{numeric, timestamp};
use regex::Regex;
use std::sync::OnceLock;
use tally_fields::prelude::*;

// ============================================================================
// number / currency / percent: numeric and within min/max
// ============================================================================

pub struct NumberRange;

static NUMBER_TYPES: [FieldType; 3] = [FieldType::Number, FieldType::Currency, FieldType::Percent];

impl ValueValidator for NumberRange {
    fn meta(&self) -> HookMeta {
        HookMeta {
            name: "number_range",
            description: "Value must be numeric and within the field's min/max",
            field_types: &NUMBER_TYPES,
        }
    }

    fn validate(&self, value: &RecordValue, options: &FieldOptions) -> FieldValidation {
        let n = match numeric(value) {
            Some(n) if n.is_finite() => n,
            _ => return FieldValidation::invalid(format!("'{}' is not a number", value)),
        };
        if let Some(min) = options.min {
            if n < min {
                return FieldValidation::invalid(format!("Value {} is below the minimum of {}", n, min));
            }
        }
        if let Some(max) = options.max {
            if n > max {
                return FieldValidation::invalid(format!("Value {} exceeds the maximum of {}", n, max));
            }
        }
        FieldValidation::ok()
    }
}

// ============================================================================
// rating: whole number in 0..=max_rating
// ============================================================================

pub struct RatingRange;

static RATING_TYPES: [FieldType; 1] = [FieldType::Rating];
const DEFAULT_MAX_RATING: u32 = 5;

impl ValueValidator for RatingRange {
    fn meta(&self) -> HookMeta {
        HookMeta {
            name: "rating_range",
            description: "Rating must be a whole number between 0 and the maximum (default 5)",
            field_types: &RATING_TYPES,
        }
    }

    fn validate(&self, value: &RecordValue, options: &FieldOptions) -> FieldValidation {
        let max = options.max_rating.unwrap_or(DEFAULT_MAX_RATING);
        match numeric(value) {
            Some(n) if n.fract() == 0.0 && n >= 0.0 && n <= max as f64 => FieldValidation::ok(),
            _ => FieldValidation::invalid(format!("Rating must be a whole number from 0 to {}", max)),
        }
    }
}

// ============================================================================
// email / url / phone: shape checks
// ============================================================================

fn email_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$").ok()
    })
    .as_ref()
}

fn url_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        // Host labels, optional port, then path/query/fragment without spaces, quotes or angle brackets
        Regex::new(r#"^https?://[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*(:[0-9]{1,5})?([/?#][^\s<>"]*)?$"#).ok()
    })
    .as_ref()
}

fn phone_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\+?[0-9 ().-]{7,20}$").ok())
        .as_ref()
}

fn matches(re: Option<&Regex>, text: &str) -> bool {
    re.is_some_and(|re| re.is_match(text))
}

pub struct EmailFormat;

static EMAIL_TYPES: [FieldType; 1] = [FieldType::Email];

impl ValueValidator for EmailFormat {
    fn meta(&self) -> HookMeta {
        HookMeta {
            name: "email_format",
            description: "Value must look like local@domain.tld",
            field_types: &EMAIL_TYPES,
        }
    }

    fn validate(&self, value: &RecordValue, _options: &FieldOptions) -> FieldValidation {
        let s = value.to_string();
        let s = s.trim();
        if matches(email_regex(), s) {
            FieldValidation::ok()
        } else {
            FieldValidation::invalid(format!("'{}' is not a valid email address", s))
        }
    }
}

pub struct UrlFormat;

static URL_TYPES: [FieldType; 1] = [FieldType::Url];

impl ValueValidator for UrlFormat {
    fn meta(&self) -> HookMeta {
        HookMeta {
            name: "url_format",
            description: "Value must be an http(s) URL with a host",
            field_types: &URL_TYPES,
        }
    }

    fn validate(&self, value: &RecordValue, _options: &FieldOptions) -> FieldValidation {
        let s = value.to_string();
        if matches(url_regex(), &s) {
            FieldValidation::ok()
        } else {
            FieldValidation::invalid(format!("'{}' is not a valid URL", s))
        }
    }
}

pub struct PhoneFormat;

static PHONE_TYPES: [FieldType; 1] = [FieldType::Phone];
const MIN_PHONE_DIGITS: usize = 7;

impl ValueValidator for PhoneFormat {
    fn meta(&self) -> HookMeta {
        HookMeta {
            name: "phone_format",
            description: "Digits with optional +, spaces, dashes, dots and parentheses",
            field_types: &PHONE_TYPES,
        }
    }

    fn validate(&self, value: &RecordValue, _options: &FieldOptions) -> FieldValidation {
        let s = value.to_string();
        let digits = s.chars().filter(|c| c.is_ascii_digit()).count();
        if matches(phone_regex(), &s) && digits >= MIN_PHONE_DIGITS {
            FieldValidation::ok()
        } else {
            FieldValidation::invalid(format!("'{}' is not a valid phone number", s))
        }
    }
}

// ============================================================================
// singleSelect / multiSelect: values drawn from the choice list
// ============================================================================

pub struct ChoiceMembership;

static CHOICE_TYPES: [FieldType; 2] = [FieldType::SingleSelect, FieldType::MultiSelect];

impl ValueValidator for ChoiceMembership {
    fn meta(&self) -> HookMeta {
        HookMeta {
            name: "choice_membership",
            description: "Selected values must be among the field's choices",
            field_types: &CHOICE_TYPES,
        }
    }

    /// A field without choices accepts anything
    fn validate(&self, value: &RecordValue, options: &FieldOptions) -> FieldValidation {
        if options.choices.is_empty() {
            return FieldValidation::ok();
        }
        let selected: Vec<String> = match value {
            RecordValue::List(items) => items.iter().map(|v| v.to_string()).collect(),
            other => vec![other.to_string()],
        };
        match selected.iter().find(|s| !options.choices.contains(s)) {
            Some(bad) => FieldValidation::invalid(format!("'{}' is not one of the allowed choices", bad)),
            None => FieldValidation::ok(),
        }
    }
}

// ============================================================================
// date / dateTime: parseable
// ============================================================================

pub struct DateValue;

static DATE_TYPES: [FieldType; 2] = [FieldType::Date, FieldType::DateTime];

impl ValueValidator for DateValue {
    fn meta(&self) -> HookMeta {
        HookMeta {
            name: "date_value",
            description: "Value must be a timestamp, RFC 3339 text or YYYY-MM-DD",
            field_types: &DATE_TYPES,
        }
    }

    fn validate(&self, value: &RecordValue, _options: &FieldOptions) -> FieldValidation {
        match timestamp(value) {
            Some(_) => FieldValidation::ok(),
            None => FieldValidation::invalid(format!("'{}' is not a valid date", value)),
        }
    }
}
