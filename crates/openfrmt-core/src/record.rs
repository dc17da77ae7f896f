//! # Record Builder
//!
//! Turns one layout plus one bag of named values into one fixed-width line.
//!
//! ```text
//!   RecordData { "record_serial": 3, "vat_number": "12345", ... }
//!        │
//!        ▼  walk fields_of(C100) in order
//!   ┌────┬─────────┬─────────┬───┬─────
//!   │C100│000000003│000012345│400│ ...      len == width_of(C100) or abort
//!   └────┴─────────┴─────────┴───┴─────
//! ```
//!
//! Fields absent from the bag take their neutral default. Names in the bag
//! that the layout does not know are an error, so a typo cannot silently
//! blank a field.

use std::collections::BTreeMap;

use crate::error::{CoreError, CoreResult};
use crate::field::{format_field, FieldValue};
use crate::schema::{RecordType, SchemaRegistry, RECORD_CODE_FIELD};

// =============================================================================
// Record Data
// =============================================================================

/// Named field values for one record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordData {
    values: BTreeMap<&'static str, FieldValue>,
}

impl RecordData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter.
    pub fn with(mut self, field: &'static str, value: impl Into<FieldValue>) -> Self {
        self.set(field, value);
        self
    }

    /// Like [`RecordData::with`], leaving the field at its default for `None`.
    pub fn with_opt<V: Into<FieldValue>>(mut self, field: &'static str, value: Option<V>) -> Self {
        if let Some(value) = value {
            self.set(field, value);
        }
        self
    }

    pub fn set(&mut self, field: &'static str, value: impl Into<FieldValue>) {
        self.values.insert(field, value.into());
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.values.get(field)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builds record lines against a registry.
#[derive(Debug, Clone, Copy)]
pub struct RecordBuilder<'r> {
    registry: &'r SchemaRegistry,
}

impl<'r> RecordBuilder<'r> {
    pub fn new(registry: &'r SchemaRegistry) -> Self {
        RecordBuilder { registry }
    }

    pub fn registry(&self) -> &'r SchemaRegistry {
        self.registry
    }

    /// Builds one line. The record code is filled in from `record_type`.
    ///
    /// ## Errors
    /// - `UnknownField` if `data` names a field the layout lacks
    /// - `InvalidFieldValue` if a value cannot fill its field
    /// - `SchemaViolation` if the line width is off (a layout defect)
    pub fn build(&self, record_type: RecordType, data: &RecordData) -> CoreResult<String> {
        let schema = self.registry.schema(record_type)?;

        if let Some(unknown) = data
            .values
            .keys()
            .find(|name| schema.field(name).is_none())
        {
            return Err(CoreError::UnknownField {
                record_type,
                field: unknown.to_string(),
            });
        }

        let code = FieldValue::from(record_type.code());
        let mut line = String::with_capacity(record_type.declared_width());
        for spec in schema.fields {
            let value = if spec.name == RECORD_CODE_FIELD {
                Some(&code)
            } else {
                data.get(spec.name)
            };
            let rendered =
                format_field(&spec.kind, value).map_err(|err| CoreError::InvalidFieldValue {
                    record_type,
                    field: spec.name.to_string(),
                    reason: err.to_string(),
                })?;
            line.push_str(&rendered);
        }

        let actual = line.chars().count();
        let expected = schema.width();
        if actual != expected {
            return Err(CoreError::SchemaViolation {
                record_type,
                expected,
                actual,
            });
        }
        Ok(line)
    }

    /// Reads a field back out of a built line.
    pub fn extract(&self, record_type: RecordType, line: &str, field: &str) -> CoreResult<String> {
        let range = self.registry.field_range(record_type, field)?;
        Ok(line
            .chars()
            .skip(range.start)
            .take(range.end - range.start)
            .collect())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{FieldSpec, SignMode};
    use crate::money::Money;
    use crate::schema::RecordSchema;

    fn registry() -> SchemaRegistry {
        SchemaRegistry::standard().unwrap()
    }

    #[test]
    fn test_every_type_builds_to_declared_width() {
        let registry = registry();
        let builder = RecordBuilder::new(&registry);
        for record_type in RecordType::ALL {
            let line = builder.build(record_type, &RecordData::new()).unwrap();
            assert_eq!(line.chars().count(), record_type.declared_width());
            assert!(line.starts_with(record_type.code()));
        }
    }

    #[test]
    fn test_values_land_in_their_columns() {
        let registry = registry();
        let builder = RecordBuilder::new(&registry);
        let data = RecordData::new()
            .with("record_serial", 3u64)
            .with("vat_number", "12345")
            .with("document_type", 400i64)
            .with("document_number", "R-0001")
            .with("document_discount", Money::from_agorot(-1000));
        let line = builder.build(RecordType::C100, &data).unwrap();

        assert_eq!(&line[0..4], "C100");
        assert_eq!(&line[4..13], "000000003");
        assert_eq!(&line[13..22], "000012345");
        assert_eq!(&line[22..25], "400");
        assert_eq!(
            builder
                .extract(RecordType::C100, &line, "document_discount")
                .unwrap(),
            "00000000001000-"
        );
    }

    #[test]
    fn test_unicode_text_keeps_character_width() {
        let registry = registry();
        let builder = RecordBuilder::new(&registry);
        let data = RecordData::new().with("description", "קפה הפוך גדול עם חלב שקדים ועוגה");
        let line = builder.build(RecordType::D110, &data).unwrap();
        assert_eq!(line.chars().count(), 339);
        assert_eq!(
            builder.extract(RecordType::D110, &line, "description").unwrap(),
            "קפה הפוך גדול עם חלב שקדים ועו"
        );
    }

    #[test]
    fn test_unknown_field_rejected() {
        let registry = registry();
        let builder = RecordBuilder::new(&registry);
        let data = RecordData::new().with("vat_numbr", "1");
        assert!(matches!(
            builder.build(RecordType::A100, &data),
            Err(CoreError::UnknownField { field, .. }) if field == "vat_numbr"
        ));
    }

    #[test]
    fn test_invalid_value_names_field() {
        let registry = registry();
        let builder = RecordBuilder::new(&registry);
        let data = RecordData::new().with("vat_number", "51-471");
        let err = builder.build(RecordType::A100, &data).unwrap_err();
        assert!(matches!(
            &err,
            CoreError::InvalidFieldValue { record_type: RecordType::A100, field, .. }
                if field == "vat_number"
        ));
    }

    #[test]
    fn test_with_opt_skips_none() {
        let data = RecordData::new()
            .with_opt("branch_id", None::<String>)
            .with_opt("customer_key", Some("K1"));
        assert_eq!(data.len(), 1);
        assert!(data.get("branch_id").is_none());
    }

    #[test]
    fn test_registry_layouts_drive_output() {
        const TINY: &[FieldSpec] = &[
            FieldSpec::alpha(RECORD_CODE_FIELD, 4),
            FieldSpec::numeric("record_serial", 9),
            FieldSpec::decimal("reserved", 79, 2, SignMode::None),
            FieldSpec::numeric("vat_number", 1),
        ];
        let registry =
            SchemaRegistry::from_schemas([RecordSchema::new(RecordType::A100, TINY)]).unwrap();
        let builder = RecordBuilder::new(&registry);
        let line = builder
            .build(RecordType::A100, &RecordData::new().with("vat_number", 7i64))
            .unwrap();
        assert_eq!(line.len(), 95);
        assert!(line.ends_with('7'));
    }
}
