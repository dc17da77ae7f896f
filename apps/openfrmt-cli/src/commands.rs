//! # Subcommand Handlers
//!
//! Each handler takes already-parsed arguments and returns `anyhow::Result`
//! so failures reach the terminal with their full context chain.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use openfrmt_core::{
    select_transactions, DateSelector, ExportRequest, InventoryItem, LedgerAccount,
    SchemaRegistry, Transaction, UniqueFileId,
};
use openfrmt_export::{ExportSummary, Exporter, LegacyEncoder};
use serde::de::DeserializeOwned;
use tracing::info;

use crate::config::ExportConfig;

// =============================================================================
// export
// =============================================================================

/// Inputs of one `openfrmt export` run.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// JSON array of transactions.
    pub transactions: PathBuf,
    /// JSON array of ledger accounts (B110).
    pub accounts: Option<PathBuf>,
    /// JSON array of inventory items (M100).
    pub inventory: Option<PathBuf>,
    /// Overrides `[output].root`.
    pub root: Option<PathBuf>,
    pub dates: DateSelector,
    pub unique_file_id: Option<UniqueFileId>,
    pub processed_at: NaiveDateTime,
}

/// Builds the reporting period from `--from/--to` or `--year`.
pub fn date_selector(
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    year: Option<i32>,
) -> Result<DateSelector> {
    let selector = match (from, to, year) {
        (Some(start), Some(end), None) => DateSelector::Range { start, end },
        (None, None, Some(year)) => DateSelector::Year(year),
        (None, None, None) => bail!("a reporting period is required: --from/--to or --year"),
        _ => bail!("use either --from together with --to, or --year"),
    };
    selector.validate()?;
    Ok(selector)
}

/// Loads the inputs, selects the period and writes the export.
pub fn export(config: &ExportConfig, options: &ExportOptions) -> Result<ExportSummary> {
    let all: Vec<Transaction> = read_json(&options.transactions)?;
    let accounts: Vec<LedgerAccount> = read_optional_json(options.accounts.as_deref())?;
    let inventory: Vec<InventoryItem> = read_optional_json(options.inventory.as_deref())?;

    let transactions: Vec<Transaction> = select_transactions(&all, &options.dates)
        .into_iter()
        .cloned()
        .collect();
    info!(
        period = %options.dates,
        loaded = all.len(),
        selected = transactions.len(),
        "Transactions selected"
    );

    let request = ExportRequest {
        transactions: &transactions,
        accounts: &accounts,
        inventory: &inventory,
        business: &config.business,
        software: &config.software,
        config: &config.tax_report,
        dates: options.dates,
        processed_at: options.processed_at,
        unique_file_id: options
            .unique_file_id
            .clone()
            .unwrap_or_else(UniqueFileId::generate),
    };

    let root = options.root.as_ref().unwrap_or(&config.output.root);
    let exporter = Exporter::new(config.encoder()?)?;
    let summary = exporter
        .export(&request, root)
        .with_context(|| format!("export under {} failed", root.display()))?;
    Ok(summary)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
}

fn read_optional_json<T: DeserializeOwned>(path: Option<&Path>) -> Result<Vec<T>> {
    match path {
        Some(path) => read_json(path),
        None => Ok(Vec::new()),
    }
}

// =============================================================================
// to-utf8
// =============================================================================

/// Decodes an export file to UTF-8 so it can be read in a normal editor.
pub fn to_utf8(input: &Path, output: &Path, encoding: &str) -> Result<()> {
    let Some(decoder) = LegacyEncoder::for_name(encoding) else {
        bail!("'{encoding}' is not a legacy charset (expected iso-8859-8 or windows-1255)");
    };
    let bytes = std::fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    let text = decoder.decode(&bytes);
    std::fs::write(output, text).with_context(|| format!("writing {}", output.display()))?;
    info!(input = %input.display(), output = %output.display(), "Converted to UTF-8");
    Ok(())
}

// =============================================================================
// layouts
// =============================================================================

/// Renders every record layout as a field table: start column (1-based),
/// width, picture, name.
pub fn describe_layouts(registry: &SchemaRegistry) -> String {
    let mut out = String::new();
    for schema in registry.iter() {
        let _ = writeln!(out, "{} ({} chars)", schema.record_type, schema.width());
        let mut start = 1;
        for field in schema.fields {
            let width = field.kind.width();
            let picture = field.kind.to_string();
            let _ = writeln!(out, "  {start:>4}  {width:>3}  {picture:<12}  {}", field.name);
            start += width;
        }
        out.push('\n');
    }
    out
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputSettings;
    use openfrmt_core::{BusinessInfo, SoftwareInfo};

    fn config(root: &Path) -> ExportConfig {
        ExportConfig {
            business: BusinessInfo {
                vat_number: "514713288".to_string(),
                company_name: "מכולת השכונה".to_string(),
                company_address: "הרצל".to_string(),
                ..BusinessInfo::default()
            },
            software: SoftwareInfo {
                registration_number: "12345678".to_string(),
                manufacturer_id: "123456782".to_string(),
                manufacturer_name: "Titan".to_string(),
                ..SoftwareInfo::default()
            },
            output: OutputSettings {
                root: root.to_path_buf(),
                ..OutputSettings::default()
            },
            ..ExportConfig::default()
        }
    }

    fn processed_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 9, 18)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap()
    }

    #[test]
    fn test_date_selector() {
        let d = |s: &str| s.parse::<NaiveDate>().unwrap();
        assert_eq!(
            date_selector(Some(d("2025-01-01")), Some(d("2025-03-31")), None).unwrap(),
            DateSelector::Range {
                start: d("2025-01-01"),
                end: d("2025-03-31"),
            }
        );
        assert_eq!(
            date_selector(None, None, Some(2024)).unwrap(),
            DateSelector::Year(2024)
        );
        assert!(date_selector(None, None, None).is_err());
        assert!(date_selector(Some(d("2025-01-01")), None, None).is_err());
        assert!(date_selector(Some(d("2025-02-01")), Some(d("2025-01-01")), None).is_err());
        assert!(date_selector(None, None, Some(1999)).is_err());
    }

    #[test]
    fn test_export_empty_period() {
        let dir = tempfile::tempdir().unwrap();
        let transactions = dir.path().join("transactions.json");
        std::fs::write(&transactions, "[]").unwrap();

        let options = ExportOptions {
            transactions,
            accounts: None,
            inventory: None,
            root: None,
            dates: DateSelector::Year(2025),
            unique_file_id: Some(UniqueFileId::new(42)),
            processed_at: processed_at(),
        };
        let summary = export(&config(dir.path()), &options).unwrap();

        assert_eq!(summary.unique_file_id, "000000000000042");
        assert_eq!(summary.total_records, 2);
        assert_eq!(
            summary.output_dir,
            dir.path().join("OPENFRMT").join("51471328.25").join("09181430")
        );
        assert!(summary.output_dir.join("BKMVDATA.zip").exists());
    }

    #[test]
    fn test_export_reports_bad_json() {
        let dir = tempfile::tempdir().unwrap();
        let transactions = dir.path().join("transactions.json");
        std::fs::write(&transactions, "{ not json").unwrap();

        let options = ExportOptions {
            transactions: transactions.clone(),
            accounts: None,
            inventory: None,
            root: None,
            dates: DateSelector::Year(2025),
            unique_file_id: None,
            processed_at: processed_at(),
        };
        let err = export(&config(dir.path()), &options).unwrap_err();
        assert!(format!("{err:#}").contains("transactions.json"));
        assert!(!dir.path().join("OPENFRMT").exists());
    }

    #[test]
    fn test_to_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("BKMVDATA.TXT");
        let output = dir.path().join("BKMVDATA.utf8.txt");
        std::fs::write(&input, [0x41, 0x20, 0xF9, 0xEC, 0xE5, 0xED]).unwrap();

        to_utf8(&input, &output, "iso-8859-8").unwrap();
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "A שלום");

        assert!(to_utf8(&input, &output, "utf-8").is_err());
    }

    #[test]
    fn test_describe_layouts() {
        let registry = SchemaRegistry::standard().unwrap();
        let text = describe_layouts(&registry);
        assert!(text.contains("C100 (444 chars)"));
        assert!(text.contains("Z900 (110 chars)"));
        assert!(text.contains("     1    4  X(4)          record_code"));
    }
}
