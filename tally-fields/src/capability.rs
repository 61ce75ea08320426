//! Static capability table
//!
//! One row per field type. The table is plain `static` data, so it can be
//! read from any thread without locking.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Every field type a collection schema can use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldType {
    Text,
    LongText,
    Number,
    Currency,
    Percent,
    Rating,
    Checkbox,
    Date,
    DateTime,
    Email,
    Url,
    Phone,
    SingleSelect,
    MultiSelect,
    Attachment,
    Link,
    Lookup,
    Rollup,
    Formula,
    CreatedTime,
    ModifiedTime,
    CreatedBy,
    ModifiedBy,
    AutoIncrement,
}

impl FieldType {
    pub const ALL: [FieldType; 24] = [
        FieldType::Text,
        FieldType::LongText,
        FieldType::Number,
        FieldType::Currency,
        FieldType::Percent,
        FieldType::Rating,
        FieldType::Checkbox,
        FieldType::Date,
        FieldType::DateTime,
        FieldType::Email,
        FieldType::Url,
        FieldType::Phone,
        FieldType::SingleSelect,
        FieldType::MultiSelect,
        FieldType::Attachment,
        FieldType::Link,
        FieldType::Lookup,
        FieldType::Rollup,
        FieldType::Formula,
        FieldType::CreatedTime,
        FieldType::ModifiedTime,
        FieldType::CreatedBy,
        FieldType::ModifiedBy,
        FieldType::AutoIncrement,
    ];

    /// Wire name, as used in schema documents
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::LongText => "longText",
            FieldType::Number => "number",
            FieldType::Currency => "currency",
            FieldType::Percent => "percent",
            FieldType::Rating => "rating",
            FieldType::Checkbox => "checkbox",
            FieldType::Date => "date",
            FieldType::DateTime => "dateTime",
            FieldType::Email => "email",
            FieldType::Url => "url",
            FieldType::Phone => "phone",
            FieldType::SingleSelect => "singleSelect",
            FieldType::MultiSelect => "multiSelect",
            FieldType::Attachment => "attachment",
            FieldType::Link => "link",
            FieldType::Lookup => "lookup",
            FieldType::Rollup => "rollup",
            FieldType::Formula => "formula",
            FieldType::CreatedTime => "createdTime",
            FieldType::ModifiedTime => "modifiedTime",
            FieldType::CreatedBy => "createdBy",
            FieldType::ModifiedBy => "modifiedBy",
            FieldType::AutoIncrement => "autoIncrement",
        }
    }

    pub fn capability(&self) -> &'static FieldTypeCapability {
        capability(*self)
    }

    pub fn category(&self) -> FieldCategory {
        self.capability().category
    }

    /// Only formula fields carry an expression
    pub fn can_hold_formula(&self) -> bool {
        matches!(self, FieldType::Formula)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown field type: {}", s))
    }
}

/// Coarse grouping used by the schema editor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldCategory {
    Basic,
    Computed,
    Relationship,
    Selection,
    File,
}

/// Static metadata for one field type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldTypeCapability {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub supports_validation: bool,
    pub supports_default_value: bool,
    pub is_computed: bool,
    pub requires_processing: bool,
    pub category: FieldCategory,
}

const fn row(
    field_type: FieldType,
    supports_validation: bool,
    supports_default_value: bool,
    is_computed: bool,
    requires_processing: bool,
    category: FieldCategory,
) -> FieldTypeCapability {
    FieldTypeCapability {
        field_type,
        supports_validation,
        supports_default_value,
        is_computed,
        requires_processing,
        category,
    }
}

use FieldCategory::{Basic, Computed, File, Relationship, Selection};

/// Indexed in the same order as [`FieldType::ALL`]
pub static CAPABILITIES: [FieldTypeCapability; 24] = [
    row(FieldType::Text, true, true, false, false, Basic),
    row(FieldType::LongText, true, true, false, false, Basic),
    row(FieldType::Number, true, true, false, false, Basic),
    row(FieldType::Currency, true, true, false, false, Basic),
    row(FieldType::Percent, true, true, false, false, Basic),
    row(FieldType::Rating, true, true, false, false, Basic),
    row(FieldType::Checkbox, false, true, false, false, Basic),
    row(FieldType::Date, true, true, false, true, Basic),
    row(FieldType::DateTime, true, true, false, true, Basic),
    row(FieldType::Email, true, true, false, false, Basic),
    row(FieldType::Url, true, true, false, false, Basic),
    row(FieldType::Phone, true, true, false, false, Basic),
    row(FieldType::SingleSelect, true, true, false, false, Selection),
    row(FieldType::MultiSelect, true, true, false, false, Selection),
    row(FieldType::Attachment, false, false, false, false, File),
    row(FieldType::Link, false, false, false, false, Relationship),
    row(FieldType::Lookup, false, false, true, true, Relationship),
    row(FieldType::Rollup, false, false, true, true, Relationship),
    row(FieldType::Formula, false, false, true, true, Computed),
    row(FieldType::CreatedTime, false, true, true, true, Computed),
    row(FieldType::ModifiedTime, false, true, true, true, Computed),
    row(FieldType::CreatedBy, false, false, true, true, Computed),
    row(FieldType::ModifiedBy, false, false, true, true, Computed),
    row(FieldType::AutoIncrement, false, false, true, true, Computed),
];

pub fn capability(field_type: FieldType) -> &'static FieldTypeCapability {
    // `ALL` and `CAPABILITIES` share ordering; the enum discriminant is the index
    &CAPABILITIES[field_type as usize]
}

/// Field types whose value the system fills in, never the user
pub fn is_auto_generated_field(field_type: FieldType) -> bool {
    matches!(
        field_type,
        FieldType::CreatedTime
            | FieldType::ModifiedTime
            | FieldType::CreatedBy
            | FieldType::ModifiedBy
            | FieldType::AutoIncrement
    )
}

/// Auto-generated types refreshed on every update
pub fn is_refreshed_on_update(field_type: FieldType) -> bool {
    matches!(field_type, FieldType::ModifiedTime | FieldType::ModifiedBy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_matches_enum_order() {
        for (i, t) in FieldType::ALL.iter().enumerate() {
            assert_eq!(CAPABILITIES[i].field_type, *t, "row {} out of order", i);
            assert_eq!(capability(*t).field_type, *t);
        }
    }

    #[test]
    fn test_auto_generated_are_computed() {
        for t in FieldType::ALL {
            if is_auto_generated_field(t) {
                assert!(t.capability().is_computed, "{} should be computed", t);
                assert_eq!(t.category(), FieldCategory::Computed);
            }
        }
    }

    #[test]
    fn test_formula_is_computed_but_not_auto_generated() {
        assert!(FieldType::Formula.capability().is_computed);
        assert!(!is_auto_generated_field(FieldType::Formula));
        assert!(FieldType::Formula.can_hold_formula());
        assert!(!FieldType::Number.can_hold_formula());
    }

    #[test]
    fn test_update_refresh_set() {
        assert!(is_refreshed_on_update(FieldType::ModifiedTime));
        assert!(is_refreshed_on_update(FieldType::ModifiedBy));
        assert!(!is_refreshed_on_update(FieldType::CreatedTime));
        assert!(!is_refreshed_on_update(FieldType::CreatedBy));
        assert!(!is_refreshed_on_update(FieldType::AutoIncrement));
    }

    #[test]
    fn test_wire_names_round_trip() {
        for t in FieldType::ALL {
            assert_eq!(t.as_str().parse::<FieldType>(), Ok(t));
            let json = serde_json::to_value(t).unwrap();
            assert_eq!(json, serde_json::Value::String(t.as_str().to_string()));
        }
        assert!("spreadsheet".parse::<FieldType>().is_err());
    }

    #[test]
    fn test_categories() {
        assert_eq!(FieldType::MultiSelect.category(), FieldCategory::Selection);
        assert_eq!(FieldType::Attachment.category(), FieldCategory::File);
        assert_eq!(FieldType::Link.category(), FieldCategory::Relationship);
        assert_eq!(FieldType::Currency.category(), FieldCategory::Basic);
    }

    #[test]
    fn test_capability_serializes_camel_case() {
        let json = serde_json::to_value(FieldType::CreatedTime.capability()).unwrap();
        assert_eq!(json["type"], "createdTime");
        assert_eq!(json["isComputed"], true);
        assert_eq!(json["category"], "computed");
    }
}
