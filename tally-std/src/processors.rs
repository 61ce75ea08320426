//! Value processors: auto-field stamps and date normalization

use crate::helpers::timestamp;
use tally_fields::prelude::*;

// ============================================================================
// createdTime / modifiedTime → now
// ============================================================================

pub struct TimestampStamp;

static TIMESTAMP_TYPES: [FieldType; 2] = [FieldType::CreatedTime, FieldType::ModifiedTime];

impl ValueProcessor for TimestampStamp {
    fn meta(&self) -> HookMeta {
        HookMeta {
            name: "timestamp_stamp",
            description: "Stamp the write time of the batch",
            field_types: &TIMESTAMP_TYPES,
        }
    }

    fn process(&self, _raw: &RecordValue, ctx: &mut ProcessContext) -> RecordValue {
        RecordValue::Timestamp(ctx.now)
    }
}

// ============================================================================
// createdBy / modifiedBy → acting user
// ============================================================================

pub struct UserStamp;

static USER_TYPES: [FieldType; 2] = [FieldType::CreatedBy, FieldType::ModifiedBy];

impl ValueProcessor for UserStamp {
    fn meta(&self) -> HookMeta {
        HookMeta {
            name: "user_stamp",
            description: "Stamp the id of the user performing the write",
            field_types: &USER_TYPES,
        }
    }

    fn process(&self, _raw: &RecordValue, ctx: &mut ProcessContext) -> RecordValue {
        match &ctx.user_id {
            Some(id) => RecordValue::Text(id.clone()),
            None => RecordValue::Null,
        }
    }
}

// ============================================================================
// autoIncrement → next sequence number
// ============================================================================

pub struct SequenceStamp;

static SEQUENCE_TYPES: [FieldType; 1] = [FieldType::AutoIncrement];

impl ValueProcessor for SequenceStamp {
    fn meta(&self) -> HookMeta {
        HookMeta {
            name: "sequence_stamp",
            description: "Assign the next number of the collection sequence",
            field_types: &SEQUENCE_TYPES,
        }
    }

    fn process(&self, _raw: &RecordValue, ctx: &mut ProcessContext) -> RecordValue {
        RecordValue::Number(ctx.take_sequence() as f64)
    }
}

// ============================================================================
// date / dateTime → Timestamp
// ============================================================================

pub struct DateNormalizer;

static DATE_TYPES: [FieldType; 2] = [FieldType::Date, FieldType::DateTime];

impl ValueProcessor for DateNormalizer {
    fn meta(&self) -> HookMeta {
        HookMeta {
            name: "date_normalizer",
            description: "Store date input (RFC 3339, YYYY-MM-DD, epoch ms) as a timestamp",
            field_types: &DATE_TYPES,
        }
    }

    /// Unparseable input is kept as-is; the validator reports it
    fn process(&self, raw: &RecordValue, _ctx: &mut ProcessContext) -> RecordValue {
        match timestamp(raw) {
            Some(t) => RecordValue::Timestamp(t),
            None => raw.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn ctx() -> ProcessContext {
        ProcessContext::new(Utc.with_ymd_and_hms(2024, 6, 1, 8, 30, 0).unwrap())
    }

    #[test]
    fn test_timestamp_stamp_ignores_input() {
        let mut c = ctx();
        let out = TimestampStamp.process(&RecordValue::from("user typed this"), &mut c);
        assert_eq!(out, RecordValue::Timestamp(c.now));
    }

    #[test]
    fn test_user_stamp() {
        let mut c = ctx().with_user("u_42");
        assert_eq!(UserStamp.process(&RecordValue::Null, &mut c), RecordValue::from("u_42"));
        let mut anonymous = ctx();
        assert_eq!(UserStamp.process(&RecordValue::Null, &mut anonymous), RecordValue::Null);
    }

    #[test]
    fn test_sequence_advances() {
        let mut c = ctx().with_sequence_start(10);
        assert_eq!(SequenceStamp.process(&RecordValue::Null, &mut c), RecordValue::Number(10.0));
        assert_eq!(SequenceStamp.process(&RecordValue::Null, &mut c), RecordValue::Number(11.0));
        assert_eq!(c.peek_sequence(), 12);
    }

    #[test]
    fn test_date_normalizer() {
        let mut c = ctx();
        let out = DateNormalizer.process(&RecordValue::from("2024-01-31"), &mut c);
        assert_eq!(out, RecordValue::Timestamp(Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap()));
        let junk = RecordValue::from("soon");
        assert_eq!(DateNormalizer.process(&junk, &mut c), junk);
    }
}
