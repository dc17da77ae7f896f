//! # openfrmt-core: Pure Open Format Record Generation
//!
//! Turns completed sales into the fixed-width record streams of the tax
//! authority's "Open Format" (OPENFRMT) audit export. Nothing here touches
//! the disk; encoding and file placement live in `openfrmt-export`.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Open Format Export                                 │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │               ★ openfrmt-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   field   │─►│  schema   │─►│  record   │─►│ assembler │  │   │
//! │  │   │ formatter │  │ registry  │  │  builder  │  │ counters  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └─────┬─────┘  │   │
//! │  │                                                      │        │   │
//! │  │   types • business • money • validation             │        │   │
//! │  └──────────────────────────────────────────────────────┼────────┘   │
//! │                                                         │ lines      │
//! │  ┌──────────────────────────────────────────────────────▼────────┐   │
//! │  │              openfrmt-export (encoding, files, zip)            │   │
//! │  └────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`field`] - Field kinds and the formatting functions
//! - [`schema`] - Record types and their validated layouts
//! - [`record`] - One layout + one data bag = one line
//! - [`assembler`] - The full BKMVDATA/INI record streams
//! - [`types`] - Transactions, cart items, payments
//! - [`business`] - Business/software identity, date selector, file id
//! - [`money`] - Integer agorot
//! - [`validation`] - Configuration checks
//! - [`error`] - Error types
//!
//! ## Example Usage
//!
//! ```rust
//! use openfrmt_core::record::{RecordBuilder, RecordData};
//! use openfrmt_core::schema::{RecordType, SchemaRegistry};
//!
//! let registry = SchemaRegistry::standard().unwrap();
//! let builder = RecordBuilder::new(&registry);
//!
//! let line = builder
//!     .build(RecordType::A100, &RecordData::new().with("vat_number", "12345"))
//!     .unwrap();
//! assert_eq!(line.len(), 95);
//! assert_eq!(&line[13..22], "000012345");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod assembler;
pub mod business;
pub mod error;
pub mod field;
pub mod money;
pub mod record;
pub mod schema;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use assembler::{DocumentAssembler, ExportDocument, ExportRequest, RecordCounters};
pub use business::{
    select_transactions, BusinessInfo, DateSelector, LanguageCode, SoftwareInfo, SoftwareType,
    TaxReportConfig, UniqueFileId,
};
pub use error::{CoreError, CoreResult, ValidationError};
pub use field::{FieldKind, FieldSpec, FieldValue, SignMode};
pub use money::Money;
pub use record::{RecordBuilder, RecordData};
pub use schema::{RecordSchema, RecordType, SchemaRegistry, SYSTEM_CODE};
pub use types::*;
