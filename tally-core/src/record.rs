//! Record data as stored by the collection layer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A record's field values, keyed by field name
pub type RecordData = HashMap<String, RecordValue>;

/// One stored cell of a record
///
/// Deserialization is untagged: JSON strings always land in `Text`;
/// `Timestamp` is only produced by the system (auto fields, date inputs).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
    List(Vec<RecordValue>),
}

impl RecordValue {
    pub fn is_null(&self) -> bool {
        matches!(self, RecordValue::Null)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            RecordValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            RecordValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<&DateTime<Utc>> {
        match self {
            RecordValue::Timestamp(t) => Some(t),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            RecordValue::Null => "Null",
            RecordValue::Bool(_) => "Bool",
            RecordValue::Number(_) => "Number",
            RecordValue::Text(_) => "Text",
            RecordValue::Timestamp(_) => "Timestamp",
            RecordValue::List(_) => "List",
        }
    }

    /// Convert loosely typed JSON; nested objects are kept as their JSON text
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => RecordValue::Null,
            serde_json::Value::Bool(b) => RecordValue::Bool(*b),
            serde_json::Value::Number(n) => n.as_f64().map(RecordValue::Number).unwrap_or(RecordValue::Null),
            serde_json::Value::String(s) => RecordValue::Text(s.clone()),
            serde_json::Value::Array(items) => RecordValue::List(items.iter().map(RecordValue::from_json).collect()),
            serde_json::Value::Object(_) => RecordValue::Text(json.to_string()),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl fmt::Display for RecordValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordValue::Null => write!(f, ""),
            RecordValue::Bool(b) => write!(f, "{}", b),
            RecordValue::Number(n) => write!(f, "{}", n),
            RecordValue::Text(s) => write!(f, "{}", s),
            RecordValue::Timestamp(t) => write!(f, "{}", t.to_rfc3339()),
            RecordValue::List(items) => {
                let parts: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "{}", parts.join(", "))
            }
        }
    }
}

impl Default for RecordValue {
    fn default() -> Self {
        RecordValue::Null
    }
}

impl From<f64> for RecordValue {
    fn from(n: f64) -> Self {
        RecordValue::Number(n)
    }
}

impl From<i64> for RecordValue {
    fn from(n: i64) -> Self {
        RecordValue::Number(n as f64)
    }
}

impl From<&str> for RecordValue {
    fn from(s: &str) -> Self {
        RecordValue::Text(s.to_string())
    }
}

impl From<String> for RecordValue {
    fn from(s: String) -> Self {
        RecordValue::Text(s)
    }
}

impl From<bool> for RecordValue {
    fn from(b: bool) -> Self {
        RecordValue::Bool(b)
    }
}

impl From<DateTime<Utc>> for RecordValue {
    fn from(t: DateTime<Utc>) -> Self {
        RecordValue::Timestamp(t)
    }
}
