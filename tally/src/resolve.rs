//! Field reference resolution
//!
//! Turns `{field}` references plus a record into evaluation bindings. Also
//! carries the textual substitution used to validate a formula against
//! placeholder values.

use crate::eval::Scope;
use crate::lexer::{field_ref_end, string_end};
use tally_core::{FormulaValue, RecordData, RecordValue};
use tally_fields::{FieldRef, FieldType};

/// Ordered, de-duplicated names of well-formed `{…}` references.
/// String literals are skipped.
pub fn field_references(formula: &str) -> Vec<String> {
    let mut names = Vec::new();
    scan_references(formula, |name, _, _| {
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    });
    names
}

/// Calls `visit(name, open, close)` for every reference, `open`/`close`
/// being the byte offsets of the braces
fn scan_references(formula: &str, mut visit: impl FnMut(&str, usize, usize)) {
    let mut i = 0;
    while i < formula.len() {
        let Some(c) = formula[i..].chars().next() else { break };
        match c {
            '"' => {
                i = string_end(formula, i).unwrap_or(formula.len());
                continue;
            }
            '{' => {
                if let Some(close) = field_ref_end(formula, i) {
                    let name = formula[i + 1..close].trim();
                    if !name.is_empty() {
                        visit(name, i, close);
                    }
                    i = close + 1;
                    continue;
                }
            }
            _ => {}
        }
        i += c.len_utf8();
    }
}

/// Record cell → formula value. Missing and null read as `0`, booleans as
/// `1`/`0`, timestamps as epoch milliseconds, lists as their items joined
/// with `", "`.
pub fn resolve_value(value: Option<&RecordValue>) -> FormulaValue {
    match value {
        None | Some(RecordValue::Null) => FormulaValue::Number(0.0),
        Some(RecordValue::Bool(b)) => FormulaValue::Number(if *b { 1.0 } else { 0.0 }),
        Some(RecordValue::Number(n)) => FormulaValue::Number(*n),
        Some(RecordValue::Text(s)) => FormulaValue::Text(s.clone()),
        Some(RecordValue::Timestamp(t)) => FormulaValue::Number(t.timestamp_millis() as f64),
        Some(list @ RecordValue::List(_)) => FormulaValue::Text(list.to_string()),
    }
}

/// Bind every name to its resolved record value
pub fn build_scope<'a>(names: impl IntoIterator<Item = &'a String>, data: &RecordData) -> Scope {
    names
        .into_iter()
        .map(|name| (name.clone(), resolve_value(data.get(name))))
        .collect()
}

/// Formula source text for a value
pub fn literal(value: &FormulaValue) -> String {
    match value {
        FormulaValue::Number(n) if !n.is_finite() => "0".to_string(),
        FormulaValue::Number(n) if *n < 0.0 => format!("({})", n),
        FormulaValue::Number(n) => n.to_string(),
        FormulaValue::Text(s) => format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
        FormulaValue::Bool(b) => b.to_string(),
        FormulaValue::Null => "0".to_string(),
    }
}

/// Replace every reference with the literal of its resolved value.
/// Malformed braces are left in place for the tokenizer to report.
pub fn substitute(formula: &str, data: &RecordData) -> String {
    let mut out = String::with_capacity(formula.len());
    let mut copied = 0;
    scan_references(formula, |name, open, close| {
        out.push_str(&formula[copied..open]);
        out.push_str(&literal(&resolve_value(data.get(name))));
        copied = close + 1;
    });
    out.push_str(&formula[copied..]);
    out
}

/// Placeholder a field of this type contributes during validation
pub fn placeholder(field_type: FieldType) -> RecordValue {
    match field_type {
        FieldType::Number
        | FieldType::Currency
        | FieldType::Percent
        | FieldType::Rating
        | FieldType::AutoIncrement
        | FieldType::Rollup
        | FieldType::Date
        | FieldType::DateTime
        | FieldType::CreatedTime
        | FieldType::ModifiedTime => RecordValue::Number(1.0),
        FieldType::Checkbox => RecordValue::Bool(true),
        _ => RecordValue::Text("text".to_string()),
    }
}

/// Placeholder record for a set of available fields
pub fn placeholder_record(fields: &[FieldRef]) -> RecordData {
    fields
        .iter()
        .map(|f| (f.name.clone(), placeholder(f.field_type)))
        .collect()
}
