//! # Validation Module
//!
//! Checks caller-supplied configuration before any record is built.
//!
//! ## Where Validation Happens
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Config loading (CLI)                                         │
//! │  ├── TOML/JSON shape (deserialization)                                 │
//! │  └── Encoding name                                                     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Identity fields present and digit-only where numeric              │
//! │  └── Date selector sane                                                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Field formatter                                              │
//! │  └── Rejects text that cannot fill its field kind                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use openfrmt_core::validation::{validate_vat_number, validate_year};
//!
//! validate_vat_number("vat_number", "514713288").unwrap();
//! assert!(validate_year(1999).is_err());
//! ```

use chrono::NaiveDate;

use crate::business::{BusinessInfo, SoftwareInfo, TaxReportConfig};
use crate::error::ValidationError;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Earliest and latest fiscal year accepted.
pub const MIN_YEAR: i32 = 2000;
pub const MAX_YEAR: i32 = 2100;

// =============================================================================
// Field Validators
// =============================================================================

/// Requires a non-blank value.
pub fn validate_required(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Rejects values longer than `max` characters.
pub fn validate_max_len(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    if value.trim().chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(())
}

/// Requires an ASCII digit string of at most `max` digits.
///
/// Blank values pass; pair with [`validate_required`] when the field is
/// mandatory.
pub fn validate_digits(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();
    if !value.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must contain digits only".to_string(),
        });
    }
    validate_max_len(field, value, max)
}

/// Validates a VAT / company number.
///
/// ## Rules
/// - Must not be empty
/// - Digits only, at most 9
pub fn validate_vat_number(field: &str, value: &str) -> ValidationResult<()> {
    validate_required(field, value)?;
    validate_digits(field, value, 9)
}

// =============================================================================
// Date Validators
// =============================================================================

pub fn validate_year(year: i32) -> ValidationResult<()> {
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return Err(ValidationError::OutOfRange {
            field: "year".to_string(),
            min: i64::from(MIN_YEAR),
            max: i64::from(MAX_YEAR),
        });
    }
    Ok(())
}

/// Requires `start <= end`. A single-day range is fine.
pub fn validate_date_range(start: NaiveDate, end: NaiveDate) -> ValidationResult<()> {
    if start > end {
        return Err(ValidationError::InvalidRange {
            field: "date range".to_string(),
            start: start.to_string(),
            end: end.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Configuration Validators
// =============================================================================

/// Validates the reporting business.
///
/// ## Rules
/// - VAT number: required, digits, at most 9
/// - Company name and street address: required
/// - Registrar and withholding file numbers: digits, at most 9
/// - Branch id: at most 7 characters, required when `has_branches`
pub fn validate_business(info: &BusinessInfo) -> ValidationResult<()> {
    validate_vat_number("vat_number", &info.vat_number)?;
    validate_required("company_name", &info.company_name)?;
    validate_required("company_address", &info.company_address)?;

    if let Some(reg) = &info.company_reg_number {
        validate_digits("company_reg_number", reg, 9)?;
    }
    if let Some(file) = &info.withholding_file_number {
        validate_digits("withholding_file_number", file, 9)?;
    }

    match &info.branch_id {
        Some(branch) => validate_max_len("branch_id", branch, 7)?,
        None if info.has_branches => {
            return Err(ValidationError::Required {
                field: "branch_id".to_string(),
            })
        }
        None => {}
    }
    Ok(())
}

/// Validates the software registration block.
pub fn validate_software(info: &SoftwareInfo) -> ValidationResult<()> {
    validate_required("registration_number", &info.registration_number)?;
    validate_digits("registration_number", &info.registration_number, 8)?;
    validate_required("software_name", &info.name)?;
    validate_vat_number("manufacturer_id", &info.manufacturer_id)?;
    Ok(())
}

/// Validates the file-level codes.
pub fn validate_report_config(config: &TaxReportConfig) -> ValidationResult<()> {
    if config.accounting_type > 2 {
        return Err(ValidationError::OutOfRange {
            field: "accounting_type".to_string(),
            min: 0,
            max: 2,
        });
    }
    if config.charset > 9 {
        return Err(ValidationError::OutOfRange {
            field: "charset".to_string(),
            min: 0,
            max: 9,
        });
    }
    validate_required("default_currency", &config.default_currency)?;
    validate_max_len("default_currency", &config.default_currency, 3)?;
    validate_required("system_code", &config.system_code)?;
    validate_max_len("system_code", &config.system_code, 8)?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
