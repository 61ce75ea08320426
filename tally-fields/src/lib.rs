//! Tally Field Types
//!
//! Provides the per-field-type capability table and the hook system used by
//! the schema layer:
//! - Processors (stamp or normalize a value before storage)
//! - Validators (check a value against field options)
//! - Default value generators
//! - Formatters (display strings)

mod capability;
mod schema;
mod traits;
mod registry;
mod context;

pub use capability::{
    capability, is_auto_generated_field, is_refreshed_on_update,
    FieldCategory, FieldType, FieldTypeCapability, CAPABILITIES,
};
pub use schema::{FieldDefinition, FieldOptions, FieldRef};
pub use traits::{
    DefaultValueGenerator, FieldValidation, HookMeta,
    ValueFormatter, ValueProcessor, ValueValidator,
};
pub use registry::{FieldTypeRegistry, HookSet};
pub use context::{ProcessContext, WriteMode};

/// Re-export core types for hook authors
pub mod prelude {
    pub use crate::{
        DefaultValueGenerator, FieldDefinition, FieldOptions, FieldType, FieldTypeRegistry,
        FieldValidation, HookMeta, ProcessContext, ValueFormatter, ValueProcessor,
        ValueValidator, WriteMode,
    };
    pub use tally_core::prelude::*;
}
