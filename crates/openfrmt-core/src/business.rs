//! # Export Run Inputs
//!
//! Caller-supplied identity and settings for one export run, the date
//! selector and the unique file id.
//!
//! ```text
//! ┌──────────────────┐  ┌──────────────────┐  ┌──────────────────┐
//! │  BusinessInfo    │  │  SoftwareInfo    │  │ TaxReportConfig  │
//! │  who reports     │  │  who generated   │  │ file-level codes │
//! └────────┬─────────┘  └────────┬─────────┘  └────────┬─────────┘
//!          └────────────┬────────┴─────────────────────┘
//!                       ▼
//!              ExportRequest (assembler)  ◄── DateSelector, UniqueFileId
//! ```

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::schema::SYSTEM_CODE;
use crate::types::Transaction;
use crate::validation::{validate_date_range, validate_year, ValidationResult};

// =============================================================================
// Business Identity
// =============================================================================

/// The reporting business.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BusinessInfo {
    /// Up to 9 digits.
    pub vat_number: String,
    pub company_name: String,
    /// Street name.
    pub company_address: String,
    #[serde(default)]
    pub company_address_number: String,
    #[serde(default)]
    pub company_city: String,
    #[serde(default)]
    pub company_zip: String,
    /// Companies registrar number. A000 falls back to the VAT number.
    #[serde(default)]
    pub company_reg_number: Option<String>,
    #[serde(default)]
    pub withholding_file_number: Option<String>,
    #[serde(default)]
    pub has_branches: bool,
    /// Branch written on records whose transaction carries none.
    #[serde(default)]
    pub branch_id: Option<String>,
}

impl BusinessInfo {
    pub fn company_id(&self) -> &str {
        self.company_reg_number
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or(&self.vat_number)
    }
}

/// Licensing model of the generating software (A000 field 1013).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SoftwareType {
    #[default]
    SingleYear,
    MultiYear,
}

impl SoftwareType {
    pub const fn code(&self) -> i64 {
        match self {
            SoftwareType::SingleYear => 1,
            SoftwareType::MultiYear => 2,
        }
    }
}

/// The generating software, as registered with the tax authority.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoftwareInfo {
    /// 8-digit registration number.
    pub registration_number: String,
    pub name: String,
    pub version: String,
    /// Manufacturer VAT number, 9 digits.
    pub manufacturer_id: String,
    pub manufacturer_name: String,
    #[serde(default)]
    pub software_type: SoftwareType,
}

impl Default for SoftwareInfo {
    fn default() -> Self {
        SoftwareInfo {
            registration_number: String::new(),
            name: "Titan POS".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            manufacturer_id: String::new(),
            manufacturer_name: String::new(),
            software_type: SoftwareType::SingleYear,
        }
    }
}

// =============================================================================
// Report Settings
// =============================================================================

/// Language of the text fields (A000 field 1032).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LanguageCode {
    #[default]
    Hebrew,
    Arabic,
    Other,
}

impl LanguageCode {
    pub const fn code(&self) -> i64 {
        match self {
            LanguageCode::Hebrew => 0,
            LanguageCode::Arabic => 1,
            LanguageCode::Other => 2,
        }
    }
}

/// File-level codes written into A000.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaxReportConfig {
    /// 0 none, 1 single-entry, 2 double-entry.
    pub accounting_type: u8,
    pub balancing_required: bool,
    pub language_code: LanguageCode,
    /// Character set code declared in A000.
    pub charset: u8,
    pub default_currency: String,
    pub compression_software: String,
    pub system_code: String,
}

impl Default for TaxReportConfig {
    fn default() -> Self {
        TaxReportConfig {
            accounting_type: 1,
            balancing_required: true,
            language_code: LanguageCode::Hebrew,
            charset: 1,
            default_currency: "ILS".to_string(),
            compression_software: "zip".to_string(),
            system_code: SYSTEM_CODE.to_string(),
        }
    }
}

// =============================================================================
// Date Selector
// =============================================================================

/// The reporting period: an explicit inclusive range or a calendar year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateSelector {
    Range { start: NaiveDate, end: NaiveDate },
    Year(i32),
}

impl DateSelector {
    /// Rejects a reversed range or a year outside 2000-2100.
    pub fn validate(&self) -> ValidationResult<()> {
        match *self {
            DateSelector::Range { start, end } => {
                validate_year(start.year())?;
                validate_year(end.year())?;
                validate_date_range(start, end)
            }
            DateSelector::Year(year) => validate_year(year),
        }
    }

    /// First day of the period. A year expands to January 1.
    pub fn start(&self) -> NaiveDate {
        match *self {
            DateSelector::Range { start, .. } => start,
            DateSelector::Year(year) => {
                NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or(NaiveDate::MIN)
            }
        }
    }

    /// Last day of the period. A year expands to December 31.
    pub fn end(&self) -> NaiveDate {
        match *self {
            DateSelector::Range { end, .. } => end,
            DateSelector::Year(year) => {
                NaiveDate::from_ymd_opt(year, 12, 31).unwrap_or(NaiveDate::MAX)
            }
        }
    }

    /// The fiscal year the report belongs to: the year of the period start.
    pub fn fiscal_year(&self) -> i32 {
        self.start().year()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start() <= date && date <= self.end()
    }
}

impl fmt::Display for DateSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateSelector::Range { start, end } => write!(f, "{start}..={end}"),
            DateSelector::Year(year) => write!(f, "{year}"),
        }
    }
}

/// Keeps the transactions produced inside the selected period, in input
/// order.
pub fn select_transactions<'a>(
    transactions: &'a [Transaction],
    selector: &DateSelector,
) -> Vec<&'a Transaction> {
    transactions
        .iter()
        .filter(|tx| selector.contains(tx.produced_at.date()))
        .collect()
}

// =============================================================================
// Unique File Id
// =============================================================================

/// 15-digit identifier shared by A000, A100 and Z900 of one export.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UniqueFileId(String);

impl UniqueFileId {
    pub const LEN: usize = 15;

    /// Uses the 15 low-order digits of `value`.
    pub fn new(value: u64) -> Self {
        UniqueFileId(format!("{:015}", value % 10u64.pow(Self::LEN as u32)))
    }

    /// Derives an id from a random UUID v4.
    pub fn generate() -> Self {
        let raw = uuid::Uuid::new_v4().as_u128() % 10u128.pow(Self::LEN as u32);
        UniqueFileId(format!("{raw:015}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UniqueFileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for UniqueFileId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != Self::LEN || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ValidationError::InvalidFormat {
                field: "unique_file_id".to_string(),
                reason: format!("must be exactly {} digits", Self::LEN),
            });
        }
        Ok(UniqueFileId(s.to_string()))
    }
}

impl TryFrom<String> for UniqueFileId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<UniqueFileId> for String {
    fn from(id: UniqueFileId) -> Self {
        id.0
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DocumentType;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn tx_on(id: &str, day: NaiveDate) -> Transaction {
        Transaction {
            id: id.to_string(),
            document_number: id.to_string(),
            document_type: DocumentType::Receipt,
            produced_at: day.and_hms_opt(12, 0, 0).unwrap(),
            created_at: None,
            items: vec![],
            payments: vec![],
            document_discount: None,
            withholding: None,
            branch_id: None,
        }
    }

    #[test]
    fn test_year_selector_expands() {
        let sel = DateSelector::Year(2025);
        assert_eq!(sel.start(), date(2025, 1, 1));
        assert_eq!(sel.end(), date(2025, 12, 31));
        assert_eq!(sel.fiscal_year(), 2025);
        assert!(sel.validate().is_ok());
        assert!(DateSelector::Year(1999).validate().is_err());
    }

    #[test]
    fn test_reversed_range_rejected() {
        let sel = DateSelector::Range {
            start: date(2025, 2, 1),
            end: date(2025, 1, 1),
        };
        assert!(matches!(
            sel.validate(),
            Err(ValidationError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_select_transactions_keeps_order() {
        let txs = vec![
            tx_on("3", date(2025, 3, 1)),
            tx_on("1", date(2024, 12, 31)),
            tx_on("2", date(2025, 1, 1)),
            tx_on("4", date(2025, 3, 2)),
        ];
        let sel = DateSelector::Range {
            start: date(2025, 1, 1),
            end: date(2025, 3, 1),
        };
        let ids: Vec<&str> = select_transactions(&txs, &sel)
            .iter()
            .map(|tx| tx.id.as_str())
            .collect();
        assert_eq!(ids, ["3", "2"]);
    }

    #[test]
    fn test_unique_file_id() {
        assert_eq!(UniqueFileId::new(42).as_str(), "000000000000042");
        assert_eq!(
            UniqueFileId::new(1_234_567_890_123_456_789).as_str(),
            "567890123456789"
        );
        assert!("12345".parse::<UniqueFileId>().is_err());
        assert!("12345678901234a".parse::<UniqueFileId>().is_err());

        let generated = UniqueFileId::generate();
        assert_eq!(generated.as_str().len(), UniqueFileId::LEN);
        assert!(generated.as_str().bytes().all(|b| b.is_ascii_digit()));
    }

    #[test]
    fn test_company_id_falls_back_to_vat() {
        let mut info = BusinessInfo {
            vat_number: "123456789".to_string(),
            ..BusinessInfo::default()
        };
        assert_eq!(info.company_id(), "123456789");
        info.company_reg_number = Some("515151515".to_string());
        assert_eq!(info.company_id(), "515151515");
    }

    #[test]
    fn test_config_defaults() {
        let config = TaxReportConfig::default();
        assert_eq!(config.system_code, "&OF1.31&");
        assert_eq!(config.default_currency, "ILS");
        assert_eq!(config.language_code.code(), 0);
        assert_eq!(SoftwareType::MultiYear.code(), 2);
    }
}
