//! # Record Schema Registry
//!
//! Declarative layouts for every Open Format record type.
//!
//! ## Layout Walk
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  C100 (444)                                                             │
//! │                                                                         │
//! │  col 1    5     14    23   26                   46       54   58 ...   │
//! │  ┌────┬─────────┬─────────┬───┬────────────────────┬────────┬────┬──┐  │
//! │  │C100│ serial  │  vat    │305│  document_number   │ date   │time│..│  │
//! │  └────┴─────────┴─────────┴───┴────────────────────┴────────┴────┴──┘  │
//! │                                                                         │
//! │  Start columns are never written down. They fall out of the ordered    │
//! │  field list, so there is one source of truth per layout.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every layout is checked once, when the registry is built: field widths
//! must add up to the record's declared width and field names must be
//! unique. A registry that exists is a registry that is consistent.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::field::{FieldKind, FieldSpec, SignMode, MAX_DECIMAL_PLACES};

/// Software identification string written to A000/A100/Z900.
pub const SYSTEM_CODE: &str = "&OF1.31&";

/// Width of an INI summary line: 4-char type code + 15-digit count.
pub const SUMMARY_LINE_WIDTH: usize = 19;

/// Name of the first field of every layout; the builder fills it.
pub const RECORD_CODE_FIELD: &str = "record_code";

// =============================================================================
// Record Types
// =============================================================================

/// Closed set of record types.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub enum RecordType {
    /// INI.TXT header.
    A000,
    /// BKMVDATA opening.
    A100,
    /// Ledger account.
    B110,
    /// Document header.
    C100,
    /// Document line.
    D110,
    /// Payment line.
    D120,
    /// Inventory item.
    M100,
    /// BKMVDATA closing.
    Z900,
}

impl RecordType {
    pub const ALL: [RecordType; 8] = [
        RecordType::A000,
        RecordType::A100,
        RecordType::B110,
        RecordType::C100,
        RecordType::D110,
        RecordType::D120,
        RecordType::M100,
        RecordType::Z900,
    ];

    /// The four-character code that opens every line of this type.
    pub const fn code(&self) -> &'static str {
        match self {
            RecordType::A000 => "A000",
            RecordType::A100 => "A100",
            RecordType::B110 => "B110",
            RecordType::C100 => "C100",
            RecordType::D110 => "D110",
            RecordType::D120 => "D120",
            RecordType::M100 => "M100",
            RecordType::Z900 => "Z900",
        }
    }

    /// Total line width mandated for this type.
    pub const fn declared_width(&self) -> usize {
        match self {
            RecordType::A000 => 466,
            RecordType::A100 => 95,
            RecordType::B110 => 376,
            RecordType::C100 => 444,
            RecordType::D110 => 339,
            RecordType::D120 => 222,
            RecordType::M100 => 298,
            RecordType::Z900 => 110,
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// =============================================================================
// Layout Tables
// =============================================================================

const T: SignMode = SignMode::Trailing;

const A000_FIELDS: &[FieldSpec] = &[
    FieldSpec::alpha(RECORD_CODE_FIELD, 4),
    FieldSpec::alpha("reserved_1", 5),
    FieldSpec::numeric("total_records", 15),
    FieldSpec::numeric("vat_number", 9),
    FieldSpec::numeric("unique_file_id", 15),
    FieldSpec::alpha("system_code", 8),
    FieldSpec::numeric("software_registration", 8),
    FieldSpec::alpha("software_name", 20),
    FieldSpec::alpha("software_version", 20),
    FieldSpec::numeric("manufacturer_vat", 9),
    FieldSpec::alpha("manufacturer_name", 20),
    FieldSpec::numeric("software_type", 1),
    FieldSpec::alpha("output_path", 50),
    FieldSpec::numeric("accounting_type", 1),
    FieldSpec::numeric("balancing_required", 1),
    FieldSpec::numeric("company_id", 9),
    FieldSpec::numeric("withholding_file_number", 9),
    FieldSpec::alpha("reserved_2", 10),
    FieldSpec::alpha("company_name", 50),
    FieldSpec::alpha("address_street", 50),
    FieldSpec::alpha("address_number", 10),
    FieldSpec::alpha("address_city", 30),
    FieldSpec::alpha("address_zip", 8),
    FieldSpec::numeric("fiscal_year", 4),
    FieldSpec::numeric("range_start", 8),
    FieldSpec::numeric("range_end", 8),
    FieldSpec::numeric("process_date", 8),
    FieldSpec::numeric("process_time", 4),
    FieldSpec::numeric("language_code", 1),
    FieldSpec::numeric("charset", 1),
    FieldSpec::alpha("compression_software", 20),
    FieldSpec::alpha("default_currency", 3),
    FieldSpec::numeric("has_branches", 1),
    FieldSpec::alpha("reserved_3", 46),
];

const A100_FIELDS: &[FieldSpec] = &[
    FieldSpec::alpha(RECORD_CODE_FIELD, 4),
    FieldSpec::numeric("record_serial", 9),
    FieldSpec::numeric("vat_number", 9),
    FieldSpec::numeric("unique_file_id", 15),
    FieldSpec::alpha("system_code", 8),
    FieldSpec::alpha("reserved", 50),
];

const Z900_FIELDS: &[FieldSpec] = &[
    FieldSpec::alpha(RECORD_CODE_FIELD, 4),
    FieldSpec::numeric("record_serial", 9),
    FieldSpec::numeric("vat_number", 9),
    FieldSpec::numeric("unique_file_id", 15),
    FieldSpec::alpha("system_code", 8),
    FieldSpec::numeric("total_records", 15),
    FieldSpec::alpha("reserved", 50),
];

const C100_FIELDS: &[FieldSpec] = &[
    FieldSpec::alpha(RECORD_CODE_FIELD, 4),
    FieldSpec::numeric("record_serial", 9),
    FieldSpec::numeric("vat_number", 9),
    FieldSpec::numeric("document_type", 3),
    FieldSpec::alpha("document_number", 20),
    FieldSpec::numeric("production_date", 8),
    FieldSpec::numeric("production_time", 4),
    FieldSpec::alpha("customer_name", 50),
    FieldSpec::alpha("customer_street", 50),
    FieldSpec::alpha("customer_house_number", 10),
    FieldSpec::alpha("customer_city", 30),
    FieldSpec::alpha("customer_zip", 8),
    FieldSpec::alpha("customer_country", 30),
    FieldSpec::alpha("country_code", 2),
    FieldSpec::alpha("customer_phone", 15),
    FieldSpec::numeric("customer_vat", 9),
    FieldSpec::numeric("value_date", 8),
    FieldSpec::decimal("foreign_amount", 12, 2, T),
    FieldSpec::alpha("currency_code", 3),
    FieldSpec::decimal("amount_before_discount", 12, 2, T),
    FieldSpec::decimal("document_discount", 12, 2, T),
    FieldSpec::decimal("amount_after_discount", 12, 2, T),
    FieldSpec::decimal("vat_amount", 12, 2, T),
    FieldSpec::decimal("total_amount", 12, 2, T),
    FieldSpec::decimal("withholding", 9, 2, T),
    FieldSpec::alpha("customer_key", 15),
    FieldSpec::alpha("matching_field", 10),
    FieldSpec::alpha("cancelled", 1),
    FieldSpec::numeric("document_date", 8),
    FieldSpec::alpha("branch_id", 7),
    FieldSpec::alpha("operator", 9),
    FieldSpec::numeric("link_field", 7),
    FieldSpec::alpha("reserved", 13),
];

const D110_FIELDS: &[FieldSpec] = &[
    FieldSpec::alpha(RECORD_CODE_FIELD, 4),
    FieldSpec::numeric("record_serial", 9),
    FieldSpec::numeric("vat_number", 9),
    FieldSpec::numeric("document_type", 3),
    FieldSpec::alpha("document_number", 20),
    FieldSpec::numeric("line_number", 4),
    FieldSpec::numeric("base_document_type", 3),
    FieldSpec::alpha("base_document_number", 20),
    FieldSpec::numeric("transaction_type", 1),
    FieldSpec::alpha("internal_sku", 20),
    FieldSpec::alpha("description", 30),
    FieldSpec::alpha("manufacturer_name", 50),
    FieldSpec::alpha("manufacturer_serial", 30),
    FieldSpec::alpha("unit_description", 20),
    FieldSpec::decimal("quantity", 12, 4, T),
    FieldSpec::decimal("unit_price", 12, 2, T),
    FieldSpec::decimal("line_discount", 12, 2, T),
    FieldSpec::decimal("line_total", 12, 2, T),
    FieldSpec::decimal("vat_rate", 2, 2, SignMode::None),
    FieldSpec::alpha("branch_id", 7),
    FieldSpec::numeric("document_date", 8),
    FieldSpec::numeric("link_field", 7),
    FieldSpec::alpha("reserved", 28),
];

const D120_FIELDS: &[FieldSpec] = &[
    FieldSpec::alpha(RECORD_CODE_FIELD, 4),
    FieldSpec::numeric("record_serial", 9),
    FieldSpec::numeric("vat_number", 9),
    FieldSpec::numeric("document_type", 3),
    FieldSpec::alpha("document_number", 20),
    FieldSpec::numeric("line_number", 4),
    FieldSpec::numeric("payment_type", 1),
    FieldSpec::numeric("bank_number", 10),
    FieldSpec::numeric("bank_branch", 10),
    FieldSpec::numeric("account_number", 15),
    FieldSpec::numeric("check_number", 10),
    FieldSpec::numeric("due_date", 8),
    FieldSpec::decimal("amount", 12, 2, T),
    FieldSpec::numeric("acquirer_code", 1),
    FieldSpec::alpha("card_name", 20),
    FieldSpec::numeric("credit_transaction_type", 1),
    FieldSpec::alpha("branch_id", 7),
    FieldSpec::numeric("document_date", 8),
    FieldSpec::numeric("link_field", 7),
    FieldSpec::alpha("reserved", 60),
];

const B110_FIELDS: &[FieldSpec] = &[
    FieldSpec::alpha(RECORD_CODE_FIELD, 4),
    FieldSpec::numeric("record_serial", 9),
    FieldSpec::numeric("vat_number", 9),
    FieldSpec::alpha("account_key", 15),
    FieldSpec::alpha("account_name", 50),
    FieldSpec::alpha("trial_balance_code", 15),
    FieldSpec::alpha("trial_balance_description", 30),
    FieldSpec::alpha("street", 50),
    FieldSpec::alpha("house_number", 10),
    FieldSpec::alpha("city", 30),
    FieldSpec::alpha("zip", 8),
    FieldSpec::alpha("country", 30),
    FieldSpec::alpha("country_code", 2),
    FieldSpec::alpha("parent_account", 15),
    FieldSpec::decimal("opening_balance", 12, 2, T),
    FieldSpec::decimal("total_debit", 12, 2, T),
    FieldSpec::decimal("total_credit", 12, 2, T),
    FieldSpec::numeric("classification_code", 4),
    FieldSpec::numeric("supplier_customer_vat", 9),
    FieldSpec::alpha("branch_id", 7),
    FieldSpec::decimal("foreign_opening_balance", 12, 2, T),
    FieldSpec::alpha("foreign_currency", 3),
    FieldSpec::alpha("reserved", 16),
];

const M100_FIELDS: &[FieldSpec] = &[
    FieldSpec::alpha(RECORD_CODE_FIELD, 4),
    FieldSpec::numeric("record_serial", 9),
    FieldSpec::numeric("vat_number", 9),
    FieldSpec::alpha("universal_code", 20),
    FieldSpec::alpha("supplier_code", 20),
    FieldSpec::alpha("internal_code", 20),
    FieldSpec::alpha("item_name", 50),
    FieldSpec::alpha("category_code", 10),
    FieldSpec::alpha("category_description", 30),
    FieldSpec::alpha("unit_description", 20),
    FieldSpec::decimal("opening_stock", 9, 2, T),
    FieldSpec::decimal("total_in", 9, 2, T),
    FieldSpec::decimal("total_out", 9, 2, T),
    FieldSpec::decimal("closing_cost_out_of_customs", 8, 2, T),
    FieldSpec::decimal("closing_cost_in_customs", 8, 2, T),
    FieldSpec::alpha("reserved", 48),
];

// =============================================================================
// Record Schema
// =============================================================================

/// One record type and its ordered fields.
#[derive(Debug, Clone, Copy)]
pub struct RecordSchema {
    pub record_type: RecordType,
    pub fields: &'static [FieldSpec],
}

impl RecordSchema {
    pub const fn new(record_type: RecordType, fields: &'static [FieldSpec]) -> Self {
        RecordSchema {
            record_type,
            fields,
        }
    }

    /// Sum of the field widths.
    pub fn width(&self) -> usize {
        self.fields.iter().map(FieldSpec::width).sum()
    }

    /// Zero-based character range of a field within a built line.
    pub fn field_range(&self, name: &str) -> Option<Range<usize>> {
        let mut start = 0;
        for spec in self.fields {
            let end = start + spec.width();
            if spec.name == name {
                return Some(start..end);
            }
            start = end;
        }
        None
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|spec| spec.name == name)
    }

    fn check(&self) -> CoreResult<()> {
        let record_type = self.record_type;

        match self.fields.first() {
            Some(first) if first.name == RECORD_CODE_FIELD && first.width() == 4 => {}
            _ => {
                return Err(CoreError::SchemaDefinition {
                    record_type,
                    reason: format!("first field must be a 4-character '{RECORD_CODE_FIELD}'"),
                })
            }
        }

        let mut seen = std::collections::BTreeSet::new();
        for spec in self.fields {
            if spec.width() == 0 {
                return Err(CoreError::SchemaDefinition {
                    record_type,
                    reason: format!("field '{}' has zero width", spec.name),
                });
            }
            if let FieldKind::Decimal { dec_len, .. } = spec.kind {
                if dec_len > MAX_DECIMAL_PLACES {
                    return Err(CoreError::SchemaDefinition {
                        record_type,
                        reason: format!(
                            "field '{}' declares {dec_len} decimal places, at most {MAX_DECIMAL_PLACES} are supported",
                            spec.name
                        ),
                    });
                }
            }
            if !seen.insert(spec.name) {
                return Err(CoreError::SchemaDefinition {
                    record_type,
                    reason: format!("field '{}' appears twice", spec.name),
                });
            }
        }

        let actual = self.width();
        let declared = record_type.declared_width();
        if actual != declared {
            return Err(CoreError::SchemaDefinition {
                record_type,
                reason: format!("fields add up to {actual}, declared width is {declared}"),
            });
        }
        Ok(())
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Validated, read-only map from record type to layout.
///
/// Build it once at startup and share it by reference.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    schemas: BTreeMap<RecordType, RecordSchema>,
}

impl SchemaRegistry {
    /// The standard layouts of every record type.
    pub fn standard() -> CoreResult<Self> {
        Self::from_schemas([
            RecordSchema::new(RecordType::A000, A000_FIELDS),
            RecordSchema::new(RecordType::A100, A100_FIELDS),
            RecordSchema::new(RecordType::B110, B110_FIELDS),
            RecordSchema::new(RecordType::C100, C100_FIELDS),
            RecordSchema::new(RecordType::D110, D110_FIELDS),
            RecordSchema::new(RecordType::D120, D120_FIELDS),
            RecordSchema::new(RecordType::M100, M100_FIELDS),
            RecordSchema::new(RecordType::Z900, Z900_FIELDS),
        ])
    }

    /// Builds a registry from explicit layouts, rejecting any that is
    /// inconsistent or registered twice.
    pub fn from_schemas(schemas: impl IntoIterator<Item = RecordSchema>) -> CoreResult<Self> {
        let mut map = BTreeMap::new();
        for schema in schemas {
            schema.check()?;
            if map.insert(schema.record_type, schema).is_some() {
                return Err(CoreError::SchemaDefinition {
                    record_type: schema.record_type,
                    reason: "registered twice".to_string(),
                });
            }
        }
        tracing::debug!(record_types = map.len(), "Schema registry built");
        Ok(SchemaRegistry { schemas: map })
    }

    pub fn schema(&self, record_type: RecordType) -> CoreResult<&RecordSchema> {
        self.schemas
            .get(&record_type)
            .ok_or_else(|| CoreError::SchemaDefinition {
                record_type,
                reason: "no layout registered".to_string(),
            })
    }

    pub fn width_of(&self, record_type: RecordType) -> CoreResult<usize> {
        Ok(self.schema(record_type)?.width())
    }

    pub fn fields_of(&self, record_type: RecordType) -> CoreResult<&'static [FieldSpec]> {
        Ok(self.schema(record_type)?.fields)
    }

    pub fn field_range(&self, record_type: RecordType, field: &str) -> CoreResult<Range<usize>> {
        self.schema(record_type)?
            .field_range(field)
            .ok_or_else(|| CoreError::UnknownField {
                record_type,
                field: field.to_string(),
            })
    }

    /// Registered layouts in record-type order.
    pub fn iter(&self) -> impl Iterator<Item = &RecordSchema> {
        self.schemas.values()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
