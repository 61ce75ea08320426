//! Tally Core - Fundamental types
//!
//! This crate provides the core types used throughout Tally:
//! - `FormulaValue`: the four kinds of value a formula computes with
//! - `RecordValue` / `RecordData`: what the collection layer stores
//! - `FormulaError`: structured errors with machine-readable codes
//! - `ValidationResult`: collected validation messages

mod value;
mod record;
mod error;

pub use value::{FormulaValue, parse_numeric_text};
pub use record::{RecordValue, RecordData};
pub use error::{FormulaError, ErrorReport, ValidationResult, codes};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{FormulaValue, RecordValue, RecordData, FormulaError, ValidationResult};
    pub use crate::error::codes;
}
