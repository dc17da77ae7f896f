//! # Error Types
//!
//! Domain-specific error types for openfrmt-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  openfrmt-core errors (this file)                                      │
//! │  ├── CoreError        - Generation failures                            │
//! │  └── ValidationError  - Caller-supplied configuration is unusable      │
//! │                                                                         │
//! │  openfrmt-export errors (separate crate)                               │
//! │  └── ExportError      - Encoding, file and zip failures                │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ExportError → caller              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Severity
//! `Configuration` is the caller's problem and is raised before any record is
//! built. Everything else except `Cancelled` means the record tables or the
//! assembler are wrong: the export is aborted, never written half-correct.

use thiserror::Error;

use crate::schema::RecordType;

// =============================================================================
// Core Error
// =============================================================================

/// Errors raised while generating an export in memory.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Business/software/report configuration or date selection is invalid.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ValidationError),

    /// A record layout does not add up to its declared width.
    ///
    /// ## When This Occurs
    /// Only at `SchemaRegistry` construction. The standard tables are
    /// covered by tests, so seeing this in production means a layout edit
    /// was shipped without running them.
    #[error("{record_type} layout is invalid: {reason}")]
    SchemaDefinition {
        record_type: RecordType,
        reason: String,
    },

    /// A built line does not have the width its schema declares.
    #[error("{record_type} record built with width {actual}, expected {expected}")]
    SchemaViolation {
        record_type: RecordType,
        expected: usize,
        actual: usize,
    },

    /// A data bag names a field that the layout does not contain.
    #[error("{record_type} has no field named '{field}'")]
    UnknownField {
        record_type: RecordType,
        field: String,
    },

    /// A value cannot be rendered in the kind of field it was given to.
    #[error("{record_type}.{field}: {reason}")]
    InvalidFieldValue {
        record_type: RecordType,
        field: String,
        reason: String,
    },

    /// Record counters disagree with the emitted stream.
    ///
    /// ## Cross-Check
    /// ```text
    /// Σ counts_by_type ──┬── == BKMVDATA line count
    ///                    ├── == Z900.total_records
    ///                    └── == A000.total_records
    /// ```
    #[error("Record count mismatch in {what}: expected {expected}, found {actual}")]
    CountMismatch {
        what: String,
        expected: u64,
        actual: u64,
    },

    /// The caller asked generation to stop.
    #[error("Export cancelled after {processed} transactions")]
    Cancelled { processed: usize },
}

impl CoreError {
    /// Returns true if the error points at a defect in this crate rather
    /// than at the caller's input.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            CoreError::SchemaDefinition { .. }
                | CoreError::SchemaViolation { .. }
                | CoreError::UnknownField { .. }
                | CoreError::CountMismatch { .. }
        )
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised by [`crate::validation`] before the assembler touches a record.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long for its slot in the file.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format (e.g. letters in a VAT number).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// A start/end pair is reversed.
    #[error("{field}: start {start} is after end {end}")]
    InvalidRange {
        field: String,
        start: String,
        end: String,
    },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::SchemaViolation {
            record_type: RecordType::C100,
            expected: 444,
            actual: 447,
        };
        assert_eq!(
            err.to_string(),
            "C100 record built with width 447, expected 444"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "vat_number".to_string(),
        };
        assert_eq!(err.to_string(), "vat_number is required");

        let err = ValidationError::InvalidRange {
            field: "date range".to_string(),
            start: "2025-02-01".to_string(),
            end: "2025-01-01".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "date range: start 2025-02-01 is after end 2025-01-01"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "company_name".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Configuration(_)));
        assert!(!core_err.is_internal());
    }

    #[test]
    fn test_internal_classification() {
        let err = CoreError::CountMismatch {
            what: "Z900.total_records".to_string(),
            expected: 4,
            actual: 5,
        };
        assert!(err.is_internal());
        assert!(!CoreError::Cancelled { processed: 3 }.is_internal());
    }
}
