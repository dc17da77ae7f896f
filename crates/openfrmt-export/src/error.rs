//! # Export Error Types
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Export Error Categories                            │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Generation     │  │   Encoding      │  │     File Output         │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  Core(..)       │  │  Encoding       │  │  Io                     │ │
//! │  │                 │  │                 │  │  Zip                    │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  Generation and encoding fail before any file exists.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use openfrmt_core::CoreError;
use thiserror::Error;

/// Result type alias for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

/// Errors raised while producing the export files.
#[derive(Debug, Error)]
pub enum ExportError {
    // =========================================================================
    // Generation Errors
    // =========================================================================
    /// Record generation failed (configuration, layout or cancellation).
    #[error(transparent)]
    Core(#[from] CoreError),

    // =========================================================================
    // Encoding Errors
    // =========================================================================
    /// Text contains a character the target charset cannot represent.
    ///
    /// ## When This Occurs
    /// A product name or company field holds characters outside the legacy
    /// charset (emoji, Cyrillic, typographic quotes). The export is aborted;
    /// the data must be corrected at the source.
    #[error("{file}: character {character:?} at line {line}, column {column} cannot be encoded as {encoding}")]
    Encoding {
        file: &'static str,
        encoding: &'static str,
        character: char,
        line: usize,
        column: usize,
    },

    // =========================================================================
    // File Output Errors
    // =========================================================================
    /// Directory creation, file write or rename failed.
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing BKMVDATA.zip failed.
    #[error("Zip error at {}: {source}", .path.display())]
    Zip {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
}

impl ExportError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ExportError::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns true if the input or configuration must change before a
    /// retry can succeed.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            ExportError::Core(CoreError::Configuration(_)) | ExportError::Encoding { .. }
        )
    }

    /// Returns true if the error points at a defect in the record tables or
    /// the assembler.
    pub fn is_internal(&self) -> bool {
        matches!(self, ExportError::Core(err) if err.is_internal())
    }

    /// Returns true if retrying unchanged may succeed (disk full, locked
    /// file, removed media).
    pub fn is_retryable(&self) -> bool {
        matches!(self, ExportError::Io { .. } | ExportError::Zip { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ExportError::Core(CoreError::Cancelled { .. }))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
