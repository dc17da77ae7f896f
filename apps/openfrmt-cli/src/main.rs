//! # openfrmt
//!
//! Produces the tax authority's Open Format export (INI.TXT, BKMVDATA.TXT,
//! BKMVDATA.zip) from transactions exported by the POS.
//!
//! ```text
//! openfrmt export --transactions sales.json --year 2025
//! openfrmt export --transactions sales.json --from 2025-01-01 --to 2025-03-31 --root /mnt/usb
//! openfrmt to-utf8 BKMVDATA.TXT BKMVDATA.utf8.txt
//! openfrmt layouts
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use openfrmt_core::{SchemaRegistry, UniqueFileId};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::ExportOptions;
use config::ExportConfig;

#[derive(Debug, Parser)]
#[command(name = "openfrmt", version, about = "Open Format (OPENFRMT) tax export")]
struct Cli {
    /// Config file (defaults to the platform config directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Write an export for a reporting period.
    Export {
        /// JSON array of transactions.
        #[arg(long)]
        transactions: PathBuf,

        /// JSON array of ledger accounts.
        #[arg(long)]
        accounts: Option<PathBuf>,

        /// JSON array of inventory items.
        #[arg(long)]
        inventory: Option<PathBuf>,

        /// Output root; OPENFRMT/ is created beneath it.
        #[arg(long)]
        root: Option<PathBuf>,

        /// First day of the period (YYYY-MM-DD).
        #[arg(long, requires = "to", conflicts_with = "year")]
        from: Option<NaiveDate>,

        /// Last day of the period, inclusive.
        #[arg(long, requires = "from")]
        to: Option<NaiveDate>,

        /// Whole calendar year.
        #[arg(long)]
        year: Option<i32>,

        /// Fixed 15-digit file id instead of a random one.
        #[arg(long)]
        unique_id: Option<UniqueFileId>,
    },

    /// Decode an export file to UTF-8.
    ToUtf8 {
        input: PathBuf,
        output: PathBuf,

        #[arg(long, default_value = "iso-8859-8")]
        encoding: String,
    },

    /// Print every record layout.
    Layouts,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Export {
            transactions,
            accounts,
            inventory,
            root,
            from,
            to,
            year,
            unique_id,
        } => {
            let config = ExportConfig::load(cli.config).context("loading configuration")?;
            let options = ExportOptions {
                transactions,
                accounts,
                inventory,
                root,
                dates: commands::date_selector(from, to, year)?,
                unique_file_id: unique_id,
                processed_at: chrono::Local::now().naive_local(),
            };
            info!(period = %options.dates, "Starting Open Format export");
            let summary = commands::export(&config, &options)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::ToUtf8 {
            input,
            output,
            encoding,
        } => commands::to_utf8(&input, &output, &encoding)?,
        Command::Layouts => {
            let registry = SchemaRegistry::standard()?;
            print!("{}", commands::describe_layouts(&registry));
        }
    }
    Ok(())
}

/// Logs go to stderr so stdout carries only command output.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,openfrmt=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
