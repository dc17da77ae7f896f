//! # Domain Types
//!
//! Completed-sale entities consumed by the export.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  Transaction    │──►│    CartItem     │──►│   ProductRef    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  document_type  │   │  quantity       │   │  sku, name      │       │
//! │  │  document_number│   │  unit_price     │   │  tax_rate_bps   │       │
//! │  │  produced_at    │   │  line_total     │   └─────────────────┘       │
//! │  └────────┬────────┘   └─────────────────┘                             │
//! │           │            ┌─────────────────┐                              │
//! │           └───────────►│ PaymentDetail   │   one per D120 line          │
//! │                        └─────────────────┘                              │
//! │                                                                         │
//! │  Optional extensions: LedgerAccount (B110), InventoryItem (M100)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The export never mutates these; they are owned by the caller.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// 1 basis point = 0.01%, so 1700 bps = 17% VAT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as an exact percentage (1700 bps → 17.00).
    #[inline]
    pub fn percent(&self) -> Decimal {
        Decimal::new(i64::from(self.0), 2)
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate(0)
    }
}

// =============================================================================
// Codes
// =============================================================================

/// Document type of a sale (field 1203 / 1253).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    /// Tax invoice.
    Invoice,
    /// Receipt.
    Receipt,
}

impl DocumentType {
    /// Returns the statutory three-digit code.
    pub const fn code(&self) -> i64 {
        match self {
            DocumentType::Invoice => 305,
            DocumentType::Receipt => 400,
        }
    }
}

/// What a cart line represents (field 1258).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Service,
    #[default]
    Sale,
    Mixed,
}

impl TransactionType {
    pub const fn code(&self) -> i64 {
        match self {
            TransactionType::Service => 1,
            TransactionType::Sale => 2,
            TransactionType::Mixed => 3,
        }
    }
}

/// Tender used for a payment line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Check,
    Card,
    /// Bank transfer or wallet app.
    Digital,
    GiftCard,
}

impl PaymentMethod {
    /// Returns the payment-type code of field 1306.
    ///
    /// ```text
    /// cash → 1   check → 2   card → 3   digital → 4   anything else → 9
    /// ```
    pub const fn code(&self) -> i64 {
        match self {
            PaymentMethod::Cash => 1,
            PaymentMethod::Check => 2,
            PaymentMethod::Card => 3,
            PaymentMethod::Digital => 4,
            PaymentMethod::GiftCard => 9,
        }
    }
}

/// Credit card deal type (field 1315), card payments only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditTransactionType {
    Regular,
    Installments,
    Credit,
    DeferredCharge,
}

impl CreditTransactionType {
    pub const fn code(&self) -> i64 {
        match self {
            CreditTransactionType::Regular => 1,
            CreditTransactionType::Installments => 2,
            CreditTransactionType::Credit => 3,
            CreditTransactionType::DeferredCharge => 4,
        }
    }
}

// =============================================================================
// Sale Entities
// =============================================================================

/// Product data frozen on the cart line at time of sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductRef {
    pub id: String,
    #[serde(default)]
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub tax_rate_bps: Option<u32>,
}

impl ProductRef {
    /// Returns the product tax rate, zero when none was recorded.
    pub fn tax_rate(&self) -> TaxRate {
        self.tax_rate_bps.map(TaxRate::from_bps).unwrap_or_default()
    }
}

/// A line of a completed sale. One D110 record each.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    pub product: ProductRef,
    /// Units sold; fractional for weighed goods.
    pub quantity: Decimal,
    pub unit_price: Money,
    /// Line total as charged (after line discount).
    pub line_total: Money,
    #[serde(default)]
    pub line_discount: Option<Money>,
    #[serde(default)]
    pub transaction_type: Option<TransactionType>,
}

/// How one part of a sale was paid. One D120 record each.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentDetail {
    pub method: PaymentMethod,
    pub amount: Money,
    /// Drawee bank, checks only.
    #[serde(default)]
    pub bank_number: Option<String>,
    #[serde(default)]
    pub credit_transaction_type: Option<CreditTransactionType>,
}

/// A completed sale document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    /// Sequential document number printed on the receipt.
    pub document_number: String,
    pub document_type: DocumentType,
    /// When the document was produced; set by the system, never edited.
    pub produced_at: NaiveDateTime,
    /// Document date (field 1230). Defaults to `produced_at` when absent.
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
    pub items: Vec<CartItem>,
    pub payments: Vec<PaymentDetail>,
    #[serde(default)]
    pub document_discount: Option<Money>,
    /// Withholding tax deducted at source, receipts only.
    #[serde(default)]
    pub withholding: Option<Money>,
    #[serde(default)]
    pub branch_id: Option<String>,
}

impl Transaction {
    /// Document date used in C100/D110/D120.
    pub fn document_date(&self) -> NaiveDateTime {
        self.created_at.unwrap_or(self.produced_at)
    }

    /// Sum of line totals before the document discount.
    pub fn gross_amount(&self) -> Money {
        self.items.iter().map(|item| item.line_total).sum()
    }

    /// Amount due after the document discount.
    pub fn net_amount(&self) -> Money {
        self.gross_amount() - self.document_discount.map(|d| d.abs()).unwrap_or_default()
    }
}

// =============================================================================
// Extension Entities
// =============================================================================

/// A ledger account summary, emitted as B110.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerAccount {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub trial_balance_code: String,
    #[serde(default)]
    pub trial_balance_description: String,
    #[serde(default)]
    pub opening_balance: Money,
    #[serde(default)]
    pub total_debit: Money,
    #[serde(default)]
    pub total_credit: Money,
    #[serde(default)]
    pub classification_code: Option<u16>,
    #[serde(default)]
    pub branch_id: Option<String>,
}

/// A stock item summary, emitted as M100.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryItem {
    pub internal_code: String,
    pub name: String,
    #[serde(default)]
    pub universal_code: String,
    #[serde(default)]
    pub supplier_code: String,
    #[serde(default)]
    pub category_code: String,
    #[serde(default)]
    pub category_description: String,
    #[serde(default)]
    pub unit_description: String,
    #[serde(default)]
    pub opening_stock: Decimal,
    #[serde(default)]
    pub total_in: Decimal,
    #[serde(default)]
    pub total_out: Decimal,
    #[serde(default)]
    pub closing_cost: Money,
}

// =============================================================================
// Unit Tests
// =============================================================================
