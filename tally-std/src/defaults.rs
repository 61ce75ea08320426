//! Default value generators

use tally_fields::prelude::*;

pub struct NowDefault;

static NOW_TYPES: [FieldType; 2] = [FieldType::CreatedTime, FieldType::ModifiedTime];

impl DefaultValueGenerator for NowDefault {
    fn meta(&self) -> HookMeta {
        HookMeta {
            name: "now",
            description: "Current time of the write",
            field_types: &NOW_TYPES,
        }
    }

    fn generate(&self, _options: &FieldOptions, ctx: &ProcessContext) -> RecordValue {
        RecordValue::Timestamp(ctx.now)
    }
}

pub struct UncheckedDefault;

static CHECKBOX_TYPES: [FieldType; 1] = [FieldType::Checkbox];

impl DefaultValueGenerator for UncheckedDefault {
    fn meta(&self) -> HookMeta {
        HookMeta {
            name: "unchecked",
            description: "New checkboxes start unchecked",
            field_types: &CHECKBOX_TYPES,
        }
    }

    fn generate(&self, _options: &FieldOptions, _ctx: &ProcessContext) -> RecordValue {
        RecordValue::Bool(false)
    }
}
