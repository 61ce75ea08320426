//! Runtime values in Tally formulas
//!
//! A formula only ever sees four kinds of value. Every operator states
//! explicitly how it coerces them; nothing relies on host-language coercion.

use crate::FormulaError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Value produced or consumed by a formula
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum FormulaValue {
    Number(f64),
    Text(String),
    Bool(bool),
    Null,
}

impl FormulaValue {
    // ========== Safe Accessors (never panic) ==========

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FormulaValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FormulaValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FormulaValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FormulaValue::Null)
    }

    /// Type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FormulaValue::Number(_) => "Number",
            FormulaValue::Text(_) => "Text",
            FormulaValue::Bool(_) => "Bool",
            FormulaValue::Null => "Null",
        }
    }

    // ========== Type Coercion ==========

    /// Arithmetic coercion: numeric text parses, booleans are 1/0, null is 0.
    pub fn to_number(&self) -> Result<f64, FormulaError> {
        match self {
            FormulaValue::Number(n) => Ok(*n),
            FormulaValue::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            FormulaValue::Null => Ok(0.0),
            FormulaValue::Text(s) => parse_numeric_text(s)
                .ok_or_else(|| FormulaError::type_error("Number", &format!("Text \"{}\"", s))),
        }
    }

    /// Truthiness: `0`, `NaN`, `""`, `null` and `false` are falsy
    pub fn is_truthy(&self) -> bool {
        match self {
            FormulaValue::Number(n) => *n != 0.0 && !n.is_nan(),
            FormulaValue::Text(s) => !s.is_empty(),
            FormulaValue::Bool(b) => *b,
            FormulaValue::Null => false,
        }
    }

    /// Strict equality: same kind and same value, no coercion
    pub fn strict_eq(&self, other: &FormulaValue) -> bool {
        match (self, other) {
            (FormulaValue::Number(a), FormulaValue::Number(b)) => a == b,
            (FormulaValue::Text(a), FormulaValue::Text(b)) => a == b,
            (FormulaValue::Bool(a), FormulaValue::Bool(b)) => a == b,
            (FormulaValue::Null, FormulaValue::Null) => true,
            _ => false,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            FormulaValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            FormulaValue::Text(s) => serde_json::Value::String(s.clone()),
            FormulaValue::Bool(b) => serde_json::Value::Bool(*b),
            FormulaValue::Null => serde_json::Value::Null,
        }
    }
}

/// Parse text the way arithmetic sees it. Surrounding whitespace is ignored;
/// empty text is not a number.
pub fn parse_numeric_text(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    // f64::from_str accepts "inf" and "NaN"; numeric text in a record never means those
    if trimmed.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') {
        return None;
    }
    trimmed.parse::<f64>().ok()
}

impl fmt::Display for FormulaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormulaValue::Number(n) => write!(f, "{}", n),
            FormulaValue::Text(s) => write!(f, "{}", s),
            FormulaValue::Bool(b) => write!(f, "{}", b),
            FormulaValue::Null => write!(f, "null"),
        }
    }
}

impl Default for FormulaValue {
    fn default() -> Self {
        FormulaValue::Null
    }
}

// From implementations for convenience
impl From<f64> for FormulaValue {
    fn from(n: f64) -> Self {
        FormulaValue::Number(n)
    }
}

impl From<i64> for FormulaValue {
    fn from(n: i64) -> Self {
        FormulaValue::Number(n as f64)
    }
}

impl From<&str> for FormulaValue {
    fn from(s: &str) -> Self {
        FormulaValue::Text(s.to_string())
    }
}

impl From<String> for FormulaValue {
    fn from(s: String) -> Self {
        FormulaValue::Text(s)
    }
}

impl From<bool> for FormulaValue {
    fn from(b: bool) -> Self {
        FormulaValue::Bool(b)
    }
}
