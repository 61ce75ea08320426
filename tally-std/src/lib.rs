//! Tally Standard Field Hooks

pub mod helpers;
pub mod processors;
pub mod validators;
pub mod defaults;
pub mod formatters;

use tally_fields::FieldTypeRegistry;

/// Load the standard hooks into a registry
pub fn load_standard_hooks(registry: FieldTypeRegistry) -> FieldTypeRegistry {
    registry
        // Auto fields
        .with_processor(processors::TimestampStamp)
        .with_processor(processors::UserStamp)
        .with_processor(processors::SequenceStamp)
        .with_processor(processors::DateNormalizer)
        .with_validator(validators::NumberRange)
        .with_validator(validators::RatingRange)
        .with_validator(validators::EmailFormat)
        .with_validator(validators::UrlFormat)
        .with_validator(validators::PhoneFormat)
        .with_validator(validators::ChoiceMembership)
        .with_validator(validators::DateValue)
        .with_default(defaults::NowDefault)
        .with_default(defaults::UncheckedDefault)
        .with_formatter(formatters::CurrencyFormatter)
        .with_formatter(formatters::NumberFormatter)
        .with_formatter(formatters::PercentFormatter)
        .with_formatter(formatters::DateFormatter)
}

/// Create a registry with the standard hooks
pub fn standard_registry() -> FieldTypeRegistry {
    load_standard_hooks(FieldTypeRegistry::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tally_fields::prelude::*;

    fn schema() -> Vec<FieldDefinition> {
        vec![
            FieldDefinition::new("title", FieldType::Text).required(),
            FieldDefinition::new("done", FieldType::Checkbox),
            FieldDefinition::new("due", FieldType::Date),
            FieldDefinition::new("n", FieldType::AutoIncrement),
            FieldDefinition::new("created", FieldType::CreatedTime),
            FieldDefinition::new("created_by", FieldType::CreatedBy),
            FieldDefinition::new("modified", FieldType::ModifiedTime),
            FieldDefinition::new("modified_by", FieldType::ModifiedBy),
            FieldDefinition::formula("label", "{title}"),
        ]
    }

    fn record(title: &str) -> RecordData {
        RecordData::from([
            ("title".to_string(), RecordValue::from(title)),
            ("due".to_string(), RecordValue::from("2024-07-04")),
        ])
    }

    #[test]
    fn test_bulk_create_stamps_every_record() {
        let registry = standard_registry();
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
        let mut ctx = ProcessContext::new(now).with_user("u_1").with_sequence_start(100);
        let mut records = vec![record("a"), record("b")];

        registry.process_records(&mut records, &schema(), WriteMode::Create, &mut ctx);

        for (i, r) in records.iter().enumerate() {
            assert_eq!(r["created"], RecordValue::Timestamp(now));
            assert_eq!(r["modified"], RecordValue::Timestamp(now));
            assert_eq!(r["created_by"], RecordValue::from("u_1"));
            assert_eq!(r["n"], RecordValue::Number(100.0 + i as f64));
            assert_eq!(r["done"], RecordValue::Bool(false));
            assert_eq!(
                r["due"],
                RecordValue::Timestamp(Utc.with_ymd_and_hms(2024, 7, 4, 0, 0, 0).unwrap())
            );
            assert!(!r.contains_key("label"));
        }
    }

    #[test]
    fn test_bulk_update_refreshes_modified_only() {
        let registry = standard_registry();
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut first = ProcessContext::new(created).with_user("u_1");
        let mut records = vec![record("a")];
        registry.process_records(&mut records, &schema(), WriteMode::Create, &mut first);

        let later = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let mut second = ProcessContext::new(later).with_user("u_2").with_sequence_start(500);
        registry.process_records(&mut records, &schema(), WriteMode::Update, &mut second);

        let r = &records[0];
        assert_eq!(r["created"], RecordValue::Timestamp(created));
        assert_eq!(r["created_by"], RecordValue::from("u_1"));
        assert_eq!(r["n"], RecordValue::Number(1.0));
        assert_eq!(r["modified"], RecordValue::Timestamp(later));
        assert_eq!(r["modified_by"], RecordValue::from("u_2"));
    }

    #[test]
    fn test_standard_validation() {
        let registry = standard_registry();
        let fields = vec![
            FieldDefinition::new("price", FieldType::Currency)
                .with_options(FieldOptions::default().with_bounds(Some(0.0), None)),
            FieldDefinition::new("contact", FieldType::Email),
        ];
        let record = RecordData::from([
            ("price".to_string(), RecordValue::Number(-2.0)),
            ("contact".to_string(), RecordValue::from("nobody")),
        ]);
        let result = registry.validate_record(&record, &fields);
        assert_eq!(
            result.errors,
            vec![
                "Field 'price': Value -2 is below the minimum of 0".to_string(),
                "Field 'contact': 'nobody' is not a valid email address".to_string(),
            ]
        );
    }

    #[test]
    fn test_hooks_listing() {
        let registry = standard_registry();
        let hooks = registry.hooks_for(FieldType::Currency);
        assert_eq!(hooks.validator, Some("number_range"));
        assert_eq!(hooks.formatter, Some("currency"));
        assert_eq!(hooks.processor, None);
        let json = serde_json::to_value(registry.hooks_for(FieldType::Checkbox)).unwrap();
        assert_eq!(json, serde_json::json!({ "defaultValue": "unchecked" }));
    }

    #[test]
    fn test_format_through_registry() {
        let registry = standard_registry();
        let opts = FieldOptions::default();
        assert_eq!(registry.format_value(FieldType::Currency, &RecordValue::Number(5.0), &opts), "$5.00");
        assert_eq!(registry.format_value(FieldType::Text, &RecordValue::from("hi"), &opts), "hi");
        assert_eq!(registry.format_value(FieldType::Currency, &RecordValue::Null, &opts), "");
    }
}
