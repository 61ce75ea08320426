//! Field Type Registry

use crate::capability::{self, is_auto_generated_field, is_refreshed_on_update};
use crate::{
    DefaultValueGenerator, FieldDefinition, FieldOptions, FieldType, FieldTypeCapability,
    FieldValidation, ProcessContext, ValueFormatter, ValueProcessor, ValueValidator, WriteMode,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tally_core::{RecordData, RecordValue, ValidationResult};
use tracing::debug;

/// Hooks registered for one field type, by name
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HookSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processor: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validator: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatter: Option<&'static str>,
}

/// Central registry: static capabilities plus pluggable per-type hooks
///
/// A missing hook is not an error; the generic default applies.
/// Built once at startup and shared behind an `Arc`.
pub struct FieldTypeRegistry {
    processors: HashMap<FieldType, Arc<dyn ValueProcessor>>,
    validators: HashMap<FieldType, Arc<dyn ValueValidator>>,
    defaults: HashMap<FieldType, Arc<dyn DefaultValueGenerator>>,
    formatters: HashMap<FieldType, Arc<dyn ValueFormatter>>,
}

impl FieldTypeRegistry {
    pub fn new() -> Self {
        Self {
            processors: HashMap::new(),
            validators: HashMap::new(),
            defaults: HashMap::new(),
            formatters: HashMap::new(),
        }
    }

    pub fn with_processor<P: ValueProcessor + 'static>(mut self, p: P) -> Self {
        let p: Arc<dyn ValueProcessor> = Arc::new(p);
        for t in p.meta().field_types {
            self.processors.insert(*t, p.clone());
        }
        self
    }

    pub fn with_validator<V: ValueValidator + 'static>(mut self, v: V) -> Self {
        let v: Arc<dyn ValueValidator> = Arc::new(v);
        for t in v.meta().field_types {
            self.validators.insert(*t, v.clone());
        }
        self
    }

    pub fn with_default<D: DefaultValueGenerator + 'static>(mut self, d: D) -> Self {
        let d: Arc<dyn DefaultValueGenerator> = Arc::new(d);
        for t in d.meta().field_types {
            self.defaults.insert(*t, d.clone());
        }
        self
    }

    pub fn with_formatter<F: ValueFormatter + 'static>(mut self, f: F) -> Self {
        let f: Arc<dyn ValueFormatter> = Arc::new(f);
        for t in f.meta().field_types {
            self.formatters.insert(*t, f.clone());
        }
        self
    }

    pub fn capability(&self, field_type: FieldType) -> &'static FieldTypeCapability {
        capability::capability(field_type)
    }

    pub fn capabilities(&self) -> &'static [FieldTypeCapability] {
        &capability::CAPABILITIES
    }

    pub fn get_processor(&self, field_type: FieldType) -> Option<&dyn ValueProcessor> {
        self.processors.get(&field_type).map(|p| p.as_ref())
    }

    pub fn get_validator(&self, field_type: FieldType) -> Option<&dyn ValueValidator> {
        self.validators.get(&field_type).map(|v| v.as_ref())
    }

    pub fn get_default(&self, field_type: FieldType) -> Option<&dyn DefaultValueGenerator> {
        self.defaults.get(&field_type).map(|d| d.as_ref())
    }

    pub fn get_formatter(&self, field_type: FieldType) -> Option<&dyn ValueFormatter> {
        self.formatters.get(&field_type).map(|f| f.as_ref())
    }

    pub fn hooks_for(&self, field_type: FieldType) -> HookSet {
        HookSet {
            processor: self.get_processor(field_type).map(|h| h.meta().name),
            validator: self.get_validator(field_type).map(|h| h.meta().name),
            default_value: self.get_default(field_type).map(|h| h.meta().name),
            formatter: self.get_formatter(field_type).map(|h| h.meta().name),
        }
    }

    // ========== Per-value operations ==========

    /// Run the type's processor; values pass through untouched without one
    pub fn process_value(&self, field_type: FieldType, raw: &RecordValue, ctx: &mut ProcessContext) -> RecordValue {
        match self.get_processor(field_type) {
            Some(p) => p.process(raw, ctx),
            None => raw.clone(),
        }
    }

    /// Empty values are always valid here; `required` is a record-level check
    pub fn validate_value(&self, field_type: FieldType, value: &RecordValue, options: &FieldOptions) -> FieldValidation {
        if !self.capability(field_type).supports_validation || is_empty(value) {
            return FieldValidation::ok();
        }
        match self.get_validator(field_type) {
            Some(v) => v.validate(value, options),
            None => FieldValidation::ok(),
        }
    }

    pub fn generate_default_value(
        &self,
        field_type: FieldType,
        options: &FieldOptions,
        ctx: &ProcessContext,
    ) -> Option<RecordValue> {
        if !self.capability(field_type).supports_default_value {
            return None;
        }
        self.get_default(field_type).map(|d| d.generate(options, ctx))
    }

    pub fn format_value(&self, field_type: FieldType, value: &RecordValue, options: &FieldOptions) -> String {
        if value.is_null() {
            return String::new();
        }
        match self.get_formatter(field_type) {
            Some(f) => f.format(value, options),
            None => value.to_string(),
        }
    }

    // ========== Record-level operations ==========

    /// Check required fields and per-type rules for user-editable fields
    pub fn validate_record(&self, record: &RecordData, fields: &[FieldDefinition]) -> ValidationResult {
        let mut result = ValidationResult::valid();
        for field in fields {
            if self.capability(field.field_type).is_computed {
                continue;
            }
            let value = record.get(&field.name).unwrap_or(&RecordValue::Null);
            if field.required && is_empty(value) {
                result.push(format!("Field '{}' is required", field.name));
                continue;
            }
            let outcome = self.validate_value(field.field_type, value, &field.options);
            if let Some(error) = outcome.error {
                result.push(format!("Field '{}': {}", field.name, error));
            }
        }
        result
    }

    /// Apply the auto-field hook set to a batch of records.
    ///
    /// On create every auto-generated field is stamped and empty fields get
    /// their default. On update only `modifiedTime`/`modifiedBy` are
    /// refreshed; creation stamps and sequence numbers are left alone.
    /// Formula, lookup and rollup fields are not touched here.
    pub fn process_records(
        &self,
        records: &mut [RecordData],
        fields: &[FieldDefinition],
        mode: WriteMode,
        ctx: &mut ProcessContext,
    ) {
        for record in records.iter_mut() {
            for field in fields {
                let t = field.field_type;
                if is_auto_generated_field(t) {
                    if mode == WriteMode::Update && !is_refreshed_on_update(t) {
                        continue;
                    }
                    let raw = record.get(&field.name).cloned().unwrap_or_default();
                    let stamped = self.process_value(t, &raw, ctx);
                    record.insert(field.name.clone(), stamped);
                    continue;
                }

                let cap = self.capability(t);
                if cap.is_computed {
                    continue;
                }

                let current = record.get(&field.name).cloned().unwrap_or_default();
                if is_empty(&current) {
                    if mode == WriteMode::Create {
                        if let Some(default) = self.generate_default_value(t, &field.options, ctx) {
                            record.insert(field.name.clone(), default);
                        }
                    }
                    continue;
                }

                if cap.requires_processing {
                    let processed = self.process_value(t, &current, ctx);
                    record.insert(field.name.clone(), processed);
                }
            }
        }
        debug!(records = records.len(), fields = fields.len(), ?mode, "processed auto fields");
    }
}

fn is_empty(value: &RecordValue) -> bool {
    match value {
        RecordValue::Null => true,
        RecordValue::Text(s) => s.trim().is_empty(),
        RecordValue::List(items) => items.is_empty(),
        _ => false,
    }
}

impl Default for FieldTypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
