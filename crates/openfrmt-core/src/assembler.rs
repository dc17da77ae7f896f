//! # Document Assembler
//!
//! Walks the selected transactions and produces the BKMVDATA record stream
//! and the INI header/summary stream for one export run.
//!
//! ## Record Stream
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BKMVDATA.TXT                        serial                             │
//! │  ──────────────────────────────────  ──────                             │
//! │  A100  opening                          1                               │
//! │  C100  transaction 1 header             2                               │
//! │  D110    line 1                         3                               │
//! │  D110    line 2                         4                               │
//! │  D120    payment 1                      5                               │
//! │  C100  transaction 2 header             6                               │
//! │  ...                                                                    │
//! │  B110  ledger accounts (optional)                                       │
//! │  M100  inventory items (optional)                                       │
//! │  Z900  closing, total_records = own serial = line count                 │
//! │                                                                         │
//! │  INI.TXT                                                                │
//! │  ──────────────────────────────────                                     │
//! │  A000  header, total_records = same total                               │
//! │  A100000000000000001   one summary line per type emitted                │
//! │  C100000000000000042                                                    │
//! │  ...                                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Generation is pure and happens entirely in memory. A run either returns
//! a complete, cross-checked [`ExportDocument`] or an error; there is no
//! partial result.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::NaiveDateTime;
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{debug, info, warn};

use crate::business::{BusinessInfo, DateSelector, SoftwareInfo, TaxReportConfig, UniqueFileId};
use crate::error::{CoreError, CoreResult};
use crate::record::{RecordBuilder, RecordData};
use crate::schema::{RecordType, SchemaRegistry, SUMMARY_LINE_WIDTH};
use crate::types::{InventoryItem, LedgerAccount, PaymentMethod, Transaction};
use crate::validation::{validate_business, validate_report_config, validate_software};

// =============================================================================
// Inputs and Outputs
// =============================================================================

/// Everything one export run is generated from.
///
/// The run timestamp and the unique file id are injected so that the same
/// request always yields the same bytes.
#[derive(Debug, Clone)]
pub struct ExportRequest<'a> {
    /// Selected transactions, already in emission order.
    pub transactions: &'a [Transaction],
    /// Ledger accounts for B110. Empty for POS-only exports.
    pub accounts: &'a [LedgerAccount],
    /// Stock items for M100. Empty for POS-only exports.
    pub inventory: &'a [InventoryItem],
    pub business: &'a BusinessInfo,
    pub software: &'a SoftwareInfo,
    pub config: &'a TaxReportConfig,
    pub dates: DateSelector,
    pub processed_at: NaiveDateTime,
    pub unique_file_id: UniqueFileId,
}

impl ExportRequest<'_> {
    /// Runs every configuration check. Called before any record is built.
    pub fn validate(&self) -> CoreResult<()> {
        validate_business(self.business)?;
        validate_software(self.software)?;
        validate_report_config(self.config)?;
        self.dates.validate()?;
        Ok(())
    }
}

/// Generated content of one export run, not yet encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDocument {
    pub ini_lines: Vec<String>,
    pub bkmv_lines: Vec<String>,
    /// Emitted BKMVDATA records per type. Types never emitted are absent.
    pub counts: BTreeMap<RecordType, u64>,
    /// BKMVDATA line count, as written to Z900 and A000.
    pub total_records: u64,
    pub unique_file_id: UniqueFileId,
}

// =============================================================================
// Record Counters
// =============================================================================

/// Per-run serial and per-type counts. Never shared between runs.
#[derive(Debug, Clone)]
pub struct RecordCounters {
    next_serial: u64,
    counts: BTreeMap<RecordType, u64>,
}

impl RecordCounters {
    pub fn new() -> Self {
        RecordCounters {
            next_serial: 1,
            counts: BTreeMap::new(),
        }
    }

    /// Serial the next record will carry.
    pub fn next_serial(&self) -> u64 {
        self.next_serial
    }

    /// Claims the next serial for a record of `record_type`.
    pub fn claim(&mut self, record_type: RecordType) -> u64 {
        let serial = self.next_serial;
        self.next_serial += 1;
        *self.counts.entry(record_type).or_insert(0) += 1;
        serial
    }

    pub fn count(&self, record_type: RecordType) -> u64 {
        self.counts.get(&record_type).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn into_counts(self) -> BTreeMap<RecordType, u64> {
        self.counts
    }
}

impl Default for RecordCounters {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Record Stream
// =============================================================================

/// Stamps serial and VAT number on each BKMVDATA record and appends it.
struct RecordStream<'b> {
    builder: RecordBuilder<'b>,
    vat_number: &'b str,
    counters: RecordCounters,
    lines: Vec<String>,
}

impl<'b> RecordStream<'b> {
    fn emit(&mut self, record_type: RecordType, data: RecordData) -> CoreResult<()> {
        let serial = self.counters.next_serial();
        let data = data
            .with("record_serial", serial)
            .with("vat_number", self.vat_number);
        let line = self.builder.build(record_type, &data)?;
        self.counters.claim(record_type);
        self.lines.push(line);
        Ok(())
    }
}

// =============================================================================
// Assembler
// =============================================================================

/// Builds [`ExportDocument`]s against a schema registry.
#[derive(Debug, Clone, Copy)]
pub struct DocumentAssembler<'r> {
    builder: RecordBuilder<'r>,
}

impl<'r> DocumentAssembler<'r> {
    pub fn new(registry: &'r SchemaRegistry) -> Self {
        DocumentAssembler {
            builder: RecordBuilder::new(registry),
        }
    }

    /// Generates both streams. `output_path` is the value of the A000
    /// output-path field.
    pub fn assemble(&self, request: &ExportRequest<'_>, output_path: &str) -> CoreResult<ExportDocument> {
        self.assemble_with_cancel(request, output_path, &AtomicBool::new(false))
    }

    /// Like [`DocumentAssembler::assemble`], checking `cancel` once before
    /// each transaction.
    pub fn assemble_with_cancel(
        &self,
        request: &ExportRequest<'_>,
        output_path: &str,
        cancel: &AtomicBool,
    ) -> CoreResult<ExportDocument> {
        request.validate()?;

        info!(
            unique_file_id = %request.unique_file_id,
            transactions = request.transactions.len(),
            period = %request.dates,
            "Assembling Open Format export"
        );

        let business = request.business;
        let system_code = request.config.system_code.as_str();
        let mut stream = RecordStream {
            builder: self.builder,
            vat_number: &business.vat_number,
            counters: RecordCounters::new(),
            lines: Vec::new(),
        };

        stream.emit(
            RecordType::A100,
            RecordData::new()
                .with("unique_file_id", request.unique_file_id.as_str())
                .with("system_code", system_code),
        )?;

        for (processed, tx) in request.transactions.iter().enumerate() {
            if cancel.load(Ordering::Relaxed) {
                warn!(processed, "Export cancelled");
                return Err(CoreError::Cancelled { processed });
            }
            self.emit_transaction(&mut stream, request, tx)?;
        }
        debug!(
            documents = stream.counters.count(RecordType::C100),
            lines = stream.counters.count(RecordType::D110),
            payments = stream.counters.count(RecordType::D120),
            "Transaction records emitted"
        );

        for account in request.accounts {
            stream.emit(RecordType::B110, account_data(account))?;
        }
        for item in request.inventory {
            stream.emit(RecordType::M100, inventory_data(item))?;
        }
        if !request.accounts.is_empty() || !request.inventory.is_empty() {
            debug!(
                accounts = request.accounts.len(),
                inventory = request.inventory.len(),
                "Extension records emitted"
            );
        }

        // Z900 counts itself: its own serial is the line total.
        let total_records = stream.counters.next_serial();
        stream.emit(
            RecordType::Z900,
            RecordData::new()
                .with("unique_file_id", request.unique_file_id.as_str())
                .with("system_code", system_code)
                .with("total_records", total_records),
        )?;

        let RecordStream {
            counters, lines, ..
        } = stream;
        let counts = counters.into_counts();

        let mut ini_lines = Vec::with_capacity(counts.len() + 1);
        ini_lines.push(self.builder.build(
            RecordType::A000,
            &header_data(request, output_path, total_records),
        )?);
        for (record_type, count) in &counts {
            ini_lines.push(format!("{}{count:015}", record_type.code()));
        }

        let document = ExportDocument {
            ini_lines,
            bkmv_lines: lines,
            counts,
            total_records,
            unique_file_id: request.unique_file_id.clone(),
        };
        self.cross_check(&document)?;

        info!(
            unique_file_id = %document.unique_file_id,
            total_records = document.total_records,
            "Open Format export assembled"
        );
        Ok(document)
    }

    fn emit_transaction(
        &self,
        stream: &mut RecordStream<'_>,
        request: &ExportRequest<'_>,
        tx: &Transaction,
    ) -> CoreResult<()> {
        let business = request.business;
        let branch_id = tx.branch_id.as_ref().or(business.branch_id.as_ref());
        let document_date = tx.document_date().date();
        let document_type = tx.document_type.code();

        let gross = tx.gross_amount();
        let net = tx.net_amount();
        stream.emit(
            RecordType::C100,
            RecordData::new()
                .with("document_type", document_type)
                .with("document_number", &tx.document_number)
                .with("production_date", tx.produced_at.date())
                .with("production_time", tx.produced_at.format("%H%M").to_string())
                .with("currency_code", &request.config.default_currency)
                .with("amount_before_discount", gross)
                .with_opt("document_discount", tx.document_discount.map(|d| -d.abs()))
                .with("amount_after_discount", net)
                .with("vat_amount", included_vat(tx))
                .with("total_amount", net)
                .with_opt("withholding", tx.withholding)
                .with("document_date", document_date)
                .with_opt("branch_id", branch_id),
        )?;

        for (index, item) in tx.items.iter().enumerate() {
            stream.emit(
                RecordType::D110,
                RecordData::new()
                    .with("document_type", document_type)
                    .with("document_number", &tx.document_number)
                    .with("line_number", index + 1)
                    .with(
                        "transaction_type",
                        item.transaction_type.unwrap_or_default().code(),
                    )
                    .with("internal_sku", &item.product.sku)
                    .with("description", &item.product.name)
                    .with("quantity", item.quantity)
                    .with("unit_price", item.unit_price)
                    .with_opt("line_discount", item.line_discount.map(|d| -d.abs()))
                    .with("line_total", item.line_total)
                    .with("vat_rate", item.product.tax_rate().percent())
                    .with_opt("branch_id", branch_id)
                    .with("document_date", document_date),
            )?;
        }

        for (index, payment) in tx.payments.iter().enumerate() {
            let bank_number = match payment.method {
                PaymentMethod::Check => payment.bank_number.as_deref().map(digits_only),
                _ => None,
            };
            let credit_type = match payment.method {
                PaymentMethod::Card => payment.credit_transaction_type.map(|t| t.code()),
                _ => None,
            };
            stream.emit(
                RecordType::D120,
                RecordData::new()
                    .with("document_type", document_type)
                    .with("document_number", &tx.document_number)
                    .with("line_number", index + 1)
                    .with("payment_type", payment.method.code())
                    .with_opt("bank_number", bank_number)
                    .with("amount", payment.amount)
                    .with_opt("credit_transaction_type", credit_type)
                    .with_opt("branch_id", branch_id)
                    .with("document_date", document_date),
            )?;
        }

        Ok(())
    }

    /// Recomputes the total from the per-type counts and compares it with
    /// the stream length and with the total written into Z900 and A000.
    fn cross_check(&self, document: &ExportDocument) -> CoreResult<()> {
        let expected: u64 = document.counts.values().sum();

        let mismatch = |what: &str, actual: u64| CoreError::CountMismatch {
            what: what.to_string(),
            expected,
            actual,
        };

        let lines = document.bkmv_lines.len() as u64;
        if lines != expected {
            return Err(mismatch("BKMVDATA line count", lines));
        }

        let z900 = document
            .bkmv_lines
            .last()
            .ok_or_else(|| mismatch("Z900 presence", 0))?;
        let z900_total = self.read_total(RecordType::Z900, z900)?;
        if z900_total != expected {
            return Err(mismatch("Z900.total_records", z900_total));
        }

        let a000 = document
            .ini_lines
            .first()
            .ok_or_else(|| mismatch("A000 presence", 0))?;
        let a000_total = self.read_total(RecordType::A000, a000)?;
        if a000_total != expected {
            return Err(mismatch("A000.total_records", a000_total));
        }

        if document.total_records != expected {
            return Err(mismatch("final serial", document.total_records));
        }

        for summary in &document.ini_lines[1..] {
            if summary.len() != SUMMARY_LINE_WIDTH {
                return Err(CoreError::SchemaViolation {
                    record_type: RecordType::A000,
                    expected: SUMMARY_LINE_WIDTH,
                    actual: summary.len(),
                });
            }
        }
        Ok(())
    }

    fn read_total(&self, record_type: RecordType, line: &str) -> CoreResult<u64> {
        let raw = self.builder.extract(record_type, line, "total_records")?;
        raw.parse().map_err(|_| CoreError::InvalidFieldValue {
            record_type,
            field: "total_records".to_string(),
            reason: format!("'{raw}' is not a count"),
        })
    }
}

// =============================================================================
// Record Data Helpers
// =============================================================================

fn header_data(request: &ExportRequest<'_>, output_path: &str, total_records: u64) -> RecordData {
    let business = request.business;
    let software = request.software;
    let config = request.config;

    RecordData::new()
        .with("total_records", total_records)
        .with("vat_number", &business.vat_number)
        .with("unique_file_id", request.unique_file_id.as_str())
        .with("system_code", &config.system_code)
        .with("software_registration", &software.registration_number)
        .with("software_name", &software.name)
        .with("software_version", &software.version)
        .with("manufacturer_vat", &software.manufacturer_id)
        .with("manufacturer_name", &software.manufacturer_name)
        .with("software_type", software.software_type.code())
        .with("output_path", output_path)
        .with("accounting_type", u32::from(config.accounting_type))
        .with("balancing_required", config.balancing_required)
        .with("company_id", business.company_id())
        .with_opt("withholding_file_number", business.withholding_file_number.as_ref())
        .with("company_name", &business.company_name)
        .with("address_street", &business.company_address)
        .with("address_number", &business.company_address_number)
        .with("address_city", &business.company_city)
        .with("address_zip", &business.company_zip)
        .with("fiscal_year", request.dates.fiscal_year())
        .with("range_start", request.dates.start())
        .with("range_end", request.dates.end())
        .with("process_date", request.processed_at.date())
        .with("process_time", request.processed_at.format("%H%M").to_string())
        .with("language_code", config.language_code.code())
        .with("charset", u32::from(config.charset))
        .with("compression_software", &config.compression_software)
        .with("default_currency", &config.default_currency)
        .with("has_branches", business.has_branches)
}

fn account_data(account: &LedgerAccount) -> RecordData {
    RecordData::new()
        .with("account_key", &account.key)
        .with("account_name", &account.name)
        .with("trial_balance_code", &account.trial_balance_code)
        .with("trial_balance_description", &account.trial_balance_description)
        .with("opening_balance", account.opening_balance)
        .with("total_debit", account.total_debit)
        .with("total_credit", account.total_credit)
        .with_opt("classification_code", account.classification_code.map(u32::from))
        .with_opt("branch_id", account.branch_id.as_ref())
}

fn inventory_data(item: &InventoryItem) -> RecordData {
    RecordData::new()
        .with("universal_code", &item.universal_code)
        .with("supplier_code", &item.supplier_code)
        .with("internal_code", &item.internal_code)
        .with("item_name", &item.name)
        .with("category_code", &item.category_code)
        .with("category_description", &item.category_description)
        .with("unit_description", &item.unit_description)
        .with("opening_stock", item.opening_stock)
        .with("total_in", item.total_in)
        .with("total_out", item.total_out)
        .with("closing_cost_out_of_customs", item.closing_cost)
}

/// VAT contained in the amount due. Shelf prices include VAT, so each line
/// carries `total * rate / (100 + rate)`; a document discount shrinks the
/// sum proportionally.
fn included_vat(tx: &Transaction) -> Decimal {
    let gross = tx.gross_amount().to_decimal();
    if gross.is_zero() {
        return Decimal::ZERO;
    }
    let line_vat: Decimal = tx
        .items
        .iter()
        .map(|item| {
            let rate = item.product.tax_rate().percent();
            item.line_total.to_decimal() * rate / (Decimal::ONE_HUNDRED + rate)
        })
        .sum();
    (line_vat * tx.net_amount().to_decimal() / gross)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn digits_only(text: &str) -> String {
    text.chars().filter(char::is_ascii_digit).collect()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;
    use crate::types::{
        CartItem, CreditTransactionType, DocumentType, PaymentDetail, ProductRef,
    };
    use chrono::NaiveDate;
    use proptest::prelude::*;

    // -------------------------------------------------------------------------
    // Fixtures
    // -------------------------------------------------------------------------

    fn business() -> BusinessInfo {
        BusinessInfo {
            vat_number: "514713288".to_string(),
            company_name: "Titan Cafe".to_string(),
            company_address: "Herzl".to_string(),
            company_address_number: "12".to_string(),
            company_city: "Tel Aviv".to_string(),
            company_zip: "6100000".to_string(),
            ..BusinessInfo::default()
        }
    }

    fn software() -> SoftwareInfo {
        SoftwareInfo {
            registration_number: "12345678".to_string(),
            name: "Titan POS".to_string(),
            version: "1.0.0".to_string(),
            manufacturer_id: "987654321".to_string(),
            manufacturer_name: "Titan Labs".to_string(),
            ..SoftwareInfo::default()
        }
    }

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 9, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn item(name: &str, total: i64) -> CartItem {
        CartItem {
            product: ProductRef {
                id: name.to_string(),
                sku: format!("SKU-{name}"),
                name: name.to_string(),
                tax_rate_bps: Some(1800),
            },
            quantity: Decimal::ONE,
            unit_price: Money::from_agorot(total),
            line_total: Money::from_agorot(total),
            line_discount: None,
            transaction_type: None,
        }
    }

    fn cash(amount: i64) -> PaymentDetail {
        PaymentDetail {
            method: PaymentMethod::Cash,
            amount: Money::from_agorot(amount),
            bank_number: None,
            credit_transaction_type: None,
        }
    }

    fn receipt(number: &str, items: Vec<CartItem>, payments: Vec<PaymentDetail>) -> Transaction {
        Transaction {
            id: number.to_string(),
            document_number: number.to_string(),
            document_type: DocumentType::Receipt,
            produced_at: at(11, 10, 25),
            created_at: None,
            items,
            payments,
            document_discount: None,
            withholding: None,
            branch_id: None,
        }
    }

    struct Fixture {
        registry: SchemaRegistry,
        business: BusinessInfo,
        software: SoftwareInfo,
        config: TaxReportConfig,
    }

    impl Fixture {
        fn new() -> Self {
            Fixture {
                registry: SchemaRegistry::standard().unwrap(),
                business: business(),
                software: software(),
                config: TaxReportConfig::default(),
            }
        }

        fn request<'a>(&'a self, transactions: &'a [Transaction]) -> ExportRequest<'a> {
            ExportRequest {
                transactions,
                accounts: &[],
                inventory: &[],
                business: &self.business,
                software: &self.software,
                config: &self.config,
                dates: DateSelector::Year(2025),
                processed_at: at(18, 14, 30),
                unique_file_id: UniqueFileId::new(123_456_789_012_345),
            }
        }

        fn assemble(&self, transactions: &[Transaction]) -> CoreResult<ExportDocument> {
            DocumentAssembler::new(&self.registry)
                .assemble(&self.request(transactions), "OPENFRMT\\51471328.25\\09181430")
        }

        fn field(&self, record_type: RecordType, line: &str, name: &str) -> String {
            RecordBuilder::new(&self.registry)
                .extract(record_type, line, name)
                .unwrap()
        }
    }

    fn codes(document: &ExportDocument) -> Vec<&str> {
        document.bkmv_lines.iter().map(|line| &line[..4]).collect()
    }

    // -------------------------------------------------------------------------
    // Scenarios
    // -------------------------------------------------------------------------

    #[test]
    fn test_empty_export_has_opening_and_closing() {
        let fx = Fixture::new();
        let doc = fx.assemble(&[]).unwrap();

        assert_eq!(codes(&doc), ["A100", "Z900"]);
        assert_eq!(doc.total_records, 2);
        assert_eq!(
            doc.counts,
            BTreeMap::from([(RecordType::A100, 1), (RecordType::Z900, 1)])
        );
        assert_eq!(
            &doc.ini_lines[1..],
            ["A100000000000000001", "Z900000000000000001"]
        );
    }

    #[test]
    fn test_single_receipt_record_order() {
        let fx = Fixture::new();
        let txs = vec![receipt(
            "1001",
            vec![item("Coffee", 1200), item("Cake", 1800)],
            vec![cash(3000)],
        )];
        let doc = fx.assemble(&txs).unwrap();

        assert_eq!(codes(&doc), ["A100", "C100", "D110", "D110", "D120", "Z900"]);
        assert_eq!(fx.field(RecordType::D110, &doc.bkmv_lines[2], "line_number"), "0001");
        assert_eq!(fx.field(RecordType::D110, &doc.bkmv_lines[3], "line_number"), "0002");
        assert_eq!(fx.field(RecordType::C100, &doc.bkmv_lines[1], "document_type"), "400");
        assert_eq!(fx.field(RecordType::D120, &doc.bkmv_lines[4], "payment_type"), "1");
        assert_eq!(
            fx.field(RecordType::D120, &doc.bkmv_lines[4], "amount"),
            "00000000003000+"
        );
    }

    #[test]
    fn test_serials_are_contiguous_and_lines_restart() {
        let fx = Fixture::new();
        let txs = vec![
            receipt("1", vec![item("a", 100), item("b", 200)], vec![cash(300)]),
            receipt("2", vec![item("c", 100)], vec![cash(60), cash(40)]),
        ];
        let doc = fx.assemble(&txs).unwrap();

        for (index, line) in doc.bkmv_lines.iter().enumerate() {
            let record_type = RecordType::ALL
                .into_iter()
                .find(|rt| line.starts_with(rt.code()))
                .unwrap();
            let serial = fx.field(record_type, line, "record_serial");
            assert_eq!(serial.parse::<usize>().unwrap(), index + 1);
            assert_eq!(line.chars().count(), record_type.declared_width());
        }

        // second transaction's D110 starts at line 1 again
        assert_eq!(&doc.bkmv_lines[6][..4], "D110");
        assert_eq!(fx.field(RecordType::D110, &doc.bkmv_lines[6], "line_number"), "0001");
        assert_eq!(fx.field(RecordType::D120, &doc.bkmv_lines[8], "line_number"), "0002");
    }

    #[test]
    fn test_totals_agree_everywhere() {
        let fx = Fixture::new();
        let txs = vec![
            receipt("1", vec![item("a", 100)], vec![cash(100)]),
            receipt("2", vec![item("b", 100), item("c", 1)], vec![cash(101)]),
        ];
        let doc = fx.assemble(&txs).unwrap();

        assert_eq!(doc.total_records, 9);
        let z900 = doc.bkmv_lines.last().unwrap();
        assert_eq!(fx.field(RecordType::Z900, z900, "total_records"), "000000000000009");
        assert_eq!(fx.field(RecordType::Z900, z900, "record_serial"), "000000009");
        assert_eq!(
            fx.field(RecordType::A000, &doc.ini_lines[0], "total_records"),
            "000000000000009"
        );
        assert_eq!(
            &doc.ini_lines[1..],
            [
                "A100000000000000001",
                "C100000000000000002",
                "D110000000000000003",
                "D120000000000000002",
                "Z900000000000000001",
            ]
        );
    }

    #[test]
    fn test_header_fields() {
        let fx = Fixture::new();
        let doc = fx.assemble(&[]).unwrap();
        let a000 = &doc.ini_lines[0];

        assert_eq!(a000.chars().count(), 466);
        assert_eq!(fx.field(RecordType::A000, a000, "unique_file_id"), "123456789012345");
        assert_eq!(fx.field(RecordType::A000, a000, "system_code"), "&OF1.31&");
        assert_eq!(fx.field(RecordType::A000, a000, "fiscal_year"), "2025");
        assert_eq!(fx.field(RecordType::A000, a000, "range_start"), "20250101");
        assert_eq!(fx.field(RecordType::A000, a000, "range_end"), "20251231");
        assert_eq!(fx.field(RecordType::A000, a000, "process_date"), "20250918");
        assert_eq!(fx.field(RecordType::A000, a000, "process_time"), "1430");
        assert_eq!(fx.field(RecordType::A000, a000, "company_id"), "514713288");
        assert!(fx
            .field(RecordType::A000, a000, "output_path")
            .starts_with("OPENFRMT\\51471328.25\\09181430"));

        let a100 = &doc.bkmv_lines[0];
        assert_eq!(fx.field(RecordType::A100, a100, "unique_file_id"), "123456789012345");
    }

    #[test]
    fn test_document_amounts_and_discount_sign() {
        let fx = Fixture::new();
        let mut tx = receipt("7", vec![item("a", 11800)], vec![cash(10620)]);
        tx.document_discount = Some(Money::from_agorot(1180));
        tx.withholding = Some(Money::from_agorot(250));
        tx.branch_id = Some("TLV01".to_string());
        let doc = fx.assemble(&[tx]).unwrap();
        let c100 = &doc.bkmv_lines[1];

        assert_eq!(
            fx.field(RecordType::C100, c100, "amount_before_discount"),
            "00000000011800+"
        );
        assert_eq!(
            fx.field(RecordType::C100, c100, "document_discount"),
            "00000000001180-"
        );
        assert_eq!(fx.field(RecordType::C100, c100, "total_amount"), "00000000010620+");
        // 18% VAT included in 106.20
        assert_eq!(fx.field(RecordType::C100, c100, "vat_amount"), "00000000001620+");
        assert_eq!(fx.field(RecordType::C100, c100, "withholding"), "00000000250+");
        assert_eq!(fx.field(RecordType::C100, c100, "branch_id"), "TLV01  ");
        assert_eq!(fx.field(RecordType::C100, c100, "production_time"), "1025");
        assert_eq!(fx.field(RecordType::D110, &doc.bkmv_lines[2], "vat_rate"), "1800");
    }

    #[test]
    fn test_line_discount_is_negative() {
        let fx = Fixture::new();
        let mut discounted = item("a", 1000);
        discounted.line_discount = Some(Money::from_agorot(150));
        let mut refunded = item("b", 500);
        refunded.line_discount = Some(Money::from_agorot(-40));
        let tx = receipt("8", vec![discounted, refunded, item("c", 300)], vec![cash(1800)]);
        let doc = fx.assemble(&[tx]).unwrap();

        let discount = |line: &str| fx.field(RecordType::D110, line, "line_discount");
        assert_eq!(discount(&doc.bkmv_lines[2]), "00000000000150-");
        assert_eq!(discount(&doc.bkmv_lines[3]), "00000000000040-");
        assert_eq!(discount(&doc.bkmv_lines[4]), "00000000000000+");
    }

    #[test]
    fn test_payment_method_details() {
        let fx = Fixture::new();
        let check = PaymentDetail {
            method: PaymentMethod::Check,
            amount: Money::from_agorot(500),
            bank_number: Some("12-3".to_string()),
            credit_transaction_type: Some(CreditTransactionType::Credit),
        };
        let card = PaymentDetail {
            method: PaymentMethod::Card,
            amount: Money::from_agorot(500),
            bank_number: Some("99".to_string()),
            credit_transaction_type: Some(CreditTransactionType::Installments),
        };
        let tx = receipt("8", vec![item("a", 1000)], vec![check, card]);
        let doc = fx.assemble(&[tx]).unwrap();

        let check_line = &doc.bkmv_lines[3];
        assert_eq!(fx.field(RecordType::D120, check_line, "bank_number"), "0000000123");
        assert_eq!(fx.field(RecordType::D120, check_line, "credit_transaction_type"), "0");

        let card_line = &doc.bkmv_lines[4];
        assert_eq!(fx.field(RecordType::D120, card_line, "payment_type"), "3");
        assert_eq!(fx.field(RecordType::D120, card_line, "bank_number"), "0000000000");
        assert_eq!(fx.field(RecordType::D120, card_line, "credit_transaction_type"), "2");
    }

    #[test]
    fn test_extension_records_before_closing() {
        let fx = Fixture::new();
        let txs = vec![receipt("1", vec![item("a", 100)], vec![cash(100)])];
        let accounts = vec![LedgerAccount {
            key: "4000".to_string(),
            name: "Sales".to_string(),
            trial_balance_code: String::new(),
            trial_balance_description: String::new(),
            opening_balance: Money::zero(),
            total_debit: Money::zero(),
            total_credit: Money::from_agorot(100),
            classification_code: Some(400),
            branch_id: None,
        }];
        let inventory = vec![InventoryItem {
            internal_code: "SKU-a".to_string(),
            name: "a".to_string(),
            universal_code: String::new(),
            supplier_code: String::new(),
            category_code: String::new(),
            category_description: String::new(),
            unit_description: "unit".to_string(),
            opening_stock: Decimal::new(10, 0),
            total_in: Decimal::ZERO,
            total_out: Decimal::ONE,
            closing_cost: Money::from_agorot(900),
        }];
        let mut request = fx.request(&txs);
        request.accounts = &accounts[..];
        request.inventory = &inventory[..];

        let doc = DocumentAssembler::new(&fx.registry)
            .assemble(&request, "OPENFRMT")
            .unwrap();
        assert_eq!(
            codes(&doc),
            ["A100", "C100", "D110", "D120", "B110", "M100", "Z900"]
        );
        assert_eq!(doc.counts[&RecordType::B110], 1);
        assert_eq!(doc.counts[&RecordType::M100], 1);
        assert!(doc.ini_lines.contains(&"B110000000000000001".to_string()));
    }

    #[test]
    fn test_configuration_error_before_any_record() {
        let mut fx = Fixture::new();
        fx.business.vat_number = String::new();
        let err = fx.assemble(&[]).unwrap_err();
        assert!(matches!(err, CoreError::Configuration(_)));

        let fx = Fixture::new();
        let mut request = fx.request(&[]);
        request.dates = DateSelector::Range {
            start: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        };
        let err = DocumentAssembler::new(&fx.registry)
            .assemble(&request, "")
            .unwrap_err();
        assert!(matches!(err, CoreError::Configuration(_)));
    }

    #[test]
    fn test_cancellation() {
        let fx = Fixture::new();
        let txs = vec![receipt("1", vec![item("a", 100)], vec![cash(100)])];
        let cancel = AtomicBool::new(true);
        let err = DocumentAssembler::new(&fx.registry)
            .assemble_with_cancel(&fx.request(&txs), "", &cancel)
            .unwrap_err();
        assert!(matches!(err, CoreError::Cancelled { processed: 0 }));
    }

    #[test]
    fn test_deterministic_output() {
        let fx = Fixture::new();
        let txs = vec![
            receipt("1", vec![item("a", 100), item("b", 250)], vec![cash(350)]),
            receipt("2", vec![item("שוקו", 900)], vec![cash(900)]),
        ];
        assert_eq!(fx.assemble(&txs).unwrap(), fx.assemble(&txs).unwrap());
    }

    #[test]
    fn test_counters() {
        let mut counters = RecordCounters::new();
        assert_eq!(counters.claim(RecordType::A100), 1);
        assert_eq!(counters.claim(RecordType::C100), 2);
        assert_eq!(counters.claim(RecordType::C100), 3);
        assert_eq!(counters.next_serial(), 4);
        assert_eq!(counters.count(RecordType::C100), 2);
        assert_eq!(counters.count(RecordType::D110), 0);
        assert_eq!(counters.total(), 3);
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 64, ..ProptestConfig::default() })]

        #[test]
        fn prop_counts_match_stream(shape in prop::collection::vec((0usize..4, 0usize..3), 0..12)) {
            let fx = Fixture::new();
            let txs: Vec<Transaction> = shape
                .iter()
                .enumerate()
                .map(|(n, (items, payments))| {
                    receipt(
                        &n.to_string(),
                        (0..*items).map(|i| item(&i.to_string(), 100)).collect(),
                        (0..*payments).map(|_| cash(100)).collect(),
                    )
                })
                .collect();
            let doc = fx.assemble(&txs).unwrap();

            let expected = 2 + shape.iter().map(|(i, p)| 1 + i + p).sum::<usize>();
            prop_assert_eq!(doc.bkmv_lines.len(), expected);
            prop_assert_eq!(doc.counts.values().sum::<u64>(), expected as u64);
            prop_assert_eq!(doc.total_records, expected as u64);
        }
    }
}
