//! Hook traits

use crate::{FieldOptions, FieldType, ProcessContext};
use serde::{Deserialize, Serialize};
use tally_core::RecordValue;

/// Metadata shared by every hook
#[derive(Debug, Clone, Serialize)]
pub struct HookMeta {
    pub name: &'static str,
    pub description: &'static str,
    /// Field types this hook is registered for
    pub field_types: &'static [FieldType],
}

/// Outcome of validating a single value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldValidation {
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FieldValidation {
    pub fn ok() -> Self {
        Self { is_valid: true, error: None }
    }

    pub fn invalid(error: impl Into<String>) -> Self {
        Self { is_valid: false, error: Some(error.into()) }
    }
}

/// Transforms a raw value before it is stored (may stamp system values)
pub trait ValueProcessor: Send + Sync {
    fn meta(&self) -> HookMeta;
    fn process(&self, raw: &RecordValue, ctx: &mut ProcessContext) -> RecordValue;
}

/// Checks a user-supplied value against the field's options
pub trait ValueValidator: Send + Sync {
    fn meta(&self) -> HookMeta;
    fn validate(&self, value: &RecordValue, options: &FieldOptions) -> FieldValidation;
}

/// Produces the value used when a new record leaves the field empty
pub trait DefaultValueGenerator: Send + Sync {
    fn meta(&self) -> HookMeta;
    fn generate(&self, options: &FieldOptions, ctx: &ProcessContext) -> RecordValue;
}

/// Renders a stored value for display
pub trait ValueFormatter: Send + Sync {
    fn meta(&self) -> HookMeta;
    fn format(&self, value: &RecordValue, options: &FieldOptions) -> String;
}
