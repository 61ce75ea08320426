//! Collection schema types consumed by the engine

use crate::FieldType;
use serde::{Deserialize, Serialize};

/// Per-field options; which ones matter depends on the field type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FieldOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Decimal places used when formatting
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    /// ISO 4217 code, e.g. "USD"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    /// BCP 47 tag, e.g. "en-US"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_format: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_rating: Option<u32>,
}

impl FieldOptions {
    pub fn with_formula(mut self, formula: impl Into<String>) -> Self {
        self.formula = Some(formula.into());
        self
    }

    pub fn with_bounds(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>, locale: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self.locale = Some(locale.into());
        self
    }

    pub fn with_precision(mut self, precision: u32) -> Self {
        self.precision = Some(precision);
        self
    }

    pub fn with_date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = Some(format.into());
        self
    }

    pub fn with_choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.choices = choices.into_iter().map(Into::into).collect();
        self
    }
}

/// A field as defined on a collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub options: FieldOptions,
    #[serde(default)]
    pub required: bool,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            options: FieldOptions::default(),
            required: false,
        }
    }

    /// Shorthand for a formula field
    pub fn formula(name: impl Into<String>, formula: impl Into<String>) -> Self {
        Self::new(name, FieldType::Formula).with_options(FieldOptions::default().with_formula(formula))
    }

    pub fn with_options(mut self, options: FieldOptions) -> Self {
        self.options = options;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// The expression, if this is a formula field that has one
    pub fn formula_text(&self) -> Option<&str> {
        if self.field_type.can_hold_formula() {
            self.options.formula.as_deref()
        } else {
            None
        }
    }

    pub fn to_field_ref(&self) -> FieldRef {
        FieldRef {
            name: self.name.clone(),
            field_type: self.field_type,
        }
    }
}

/// What the schema editor knows about a field when validating a formula
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldRef {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

impl FieldRef {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definition_from_schema_json() {
        let def: FieldDefinition = serde_json::from_str(
            r#"{"name": "total", "type": "formula", "options": {"formula": "{a} + {b}"}}"#,
        )
        .unwrap();
        assert_eq!(def.field_type, FieldType::Formula);
        assert_eq!(def.formula_text(), Some("{a} + {b}"));
        assert!(!def.required);
    }

    #[test]
    fn test_formula_text_ignored_on_other_types() {
        let def = FieldDefinition::new("n", FieldType::Number)
            .with_options(FieldOptions::default().with_formula("1 + 1"));
        assert_eq!(def.formula_text(), None);
    }

    #[test]
    fn test_options_skip_empty() {
        let json = serde_json::to_value(FieldOptions::default().with_precision(2)).unwrap();
        assert_eq!(json, serde_json::json!({"precision": 2}));
    }
}
