//! # openfrmt-export: Encoding and File Output
//!
//! Runs the assembler, encodes both streams and places the files.
//!
//! ## Export Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  ExportRequest ──► DocumentAssembler ──► join_crlf ──► Encoder          │
//! │   (core)              (core)              (writer)     (encoding)       │
//! │                                                          │              │
//! │                                      in memory ▲         │              │
//! │  ─────────────────────────────────────────────┼─────────┼───────────   │
//! │                                      on disk  ▼         ▼              │
//! │                                                                         │
//! │                              write_export ──► <root>/OPENFRMT/...       │
//! │                                (writer)        INI.TXT                  │
//! │                                                BKMVDATA.TXT             │
//! │                                                BKMVDATA.zip             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing is written unless generation and encoding both succeeded.

pub mod encoding;
pub mod error;
pub mod layout;
pub mod writer;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use openfrmt_core::{DocumentAssembler, ExportRequest, RecordType, SchemaRegistry};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use ts_rs::TS;

pub use encoding::{encoder_for_name, EncodeError, Encoder, LegacyEncoder, PassThroughEncoder};
pub use error::{ExportError, ExportResult};
pub use layout::{OutputLayout, BKMV_FILE_NAME, INI_FILE_NAME, ZIP_FILE_NAME};
pub use writer::{join_crlf, write_export, EncodedExport};

// =============================================================================
// Export Summary
// =============================================================================

/// What an export run produced. Returned to the caller and shown in the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ExportSummary {
    #[ts(as = "String")]
    pub output_dir: PathBuf,
    pub record_counts: BTreeMap<RecordType, u64>,
    pub total_records: u64,
    pub unique_file_id: String,
}

// =============================================================================
// Exporter
// =============================================================================

/// Produces complete Open Format exports.
pub struct Exporter {
    registry: SchemaRegistry,
    encoder: Box<dyn Encoder>,
}

impl Exporter {
    /// Standard layouts with the given encoder.
    pub fn new(encoder: Box<dyn Encoder>) -> ExportResult<Self> {
        Ok(Self::with_registry(SchemaRegistry::standard()?, encoder))
    }

    /// Standard layouts, ISO-8859-8.
    pub fn iso_8859_8() -> ExportResult<Self> {
        Self::new(Box::new(LegacyEncoder::iso_8859_8()))
    }

    pub fn with_registry(registry: SchemaRegistry, encoder: Box<dyn Encoder>) -> Self {
        Exporter { registry, encoder }
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Generates, encodes and writes one export under `root`.
    pub fn export(&self, request: &ExportRequest<'_>, root: &Path) -> ExportResult<ExportSummary> {
        self.export_with_cancel(request, root, &AtomicBool::new(false))
    }

    /// Like [`Exporter::export`]. A raised `cancel` flag stops generation at
    /// the next transaction and nothing is written.
    pub fn export_with_cancel(
        &self,
        request: &ExportRequest<'_>,
        root: &Path,
        cancel: &AtomicBool,
    ) -> ExportResult<ExportSummary> {
        let layout = OutputLayout::new(
            root,
            &request.business.vat_number,
            request.dates.fiscal_year(),
            request.processed_at,
        );

        let (document, content) = self.render(request, &layout, cancel)?;

        // Last chance to stop before touching the disk.
        if cancel.load(Ordering::Relaxed) {
            return Err(openfrmt_core::CoreError::Cancelled {
                processed: request.transactions.len(),
            }
            .into());
        }

        write_export(&layout, &content, request.processed_at)?;

        let summary = ExportSummary {
            output_dir: layout.directory(),
            record_counts: document.counts,
            total_records: document.total_records,
            unique_file_id: document.unique_file_id.to_string(),
        };
        info!(
            output_dir = %summary.output_dir.display(),
            total_records = summary.total_records,
            encoding = self.encoder.name(),
            "Open Format export written"
        );
        Ok(summary)
    }

    /// Generates and encodes both files without writing them.
    pub fn render(
        &self,
        request: &ExportRequest<'_>,
        layout: &OutputLayout,
        cancel: &AtomicBool,
    ) -> ExportResult<(openfrmt_core::ExportDocument, EncodedExport)> {
        let document = DocumentAssembler::new(&self.registry).assemble_with_cancel(
            request,
            &layout.header_path(),
            cancel,
        )?;

        let ini = self.encode(INI_FILE_NAME, &join_crlf(&document.ini_lines))?;
        let bkmv = self.encode(BKMV_FILE_NAME, &join_crlf(&document.bkmv_lines))?;
        debug!(
            ini_bytes = ini.len(),
            bkmv_bytes = bkmv.len(),
            encoding = self.encoder.name(),
            "Export encoded"
        );
        Ok((document, EncodedExport { ini, bkmv }))
    }

    fn encode(&self, file: &'static str, text: &str) -> ExportResult<Vec<u8>> {
        self.encoder.encode(text).map_err(|err| {
            let (line, column) = line_and_column(text, err.position);
            ExportError::Encoding {
                file,
                encoding: err.encoding,
                character: err.character,
                line,
                column,
            }
        })
    }
}

/// 1-based line and column of a character index in CRLF-joined text.
fn line_and_column(text: &str, position: usize) -> (usize, usize) {
    let mut line = 1;
    let mut column = 1;
    for ch in text.chars().take(position) {
        if ch == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }
    (line, column)
}

// =============================================================================
// Unit Tests
// =============================================================================
