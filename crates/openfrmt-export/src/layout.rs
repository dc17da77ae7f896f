//! # Output Directory Layout
//!
//! ```text
//! <root>/
//! └── OPENFRMT/
//!     └── 51471328.25/          first 8 VAT digits . fiscal year (YY)
//!         └── 09181430/         run time MMDDhhmm
//!             ├── INI.TXT
//!             ├── BKMVDATA.TXT
//!             └── BKMVDATA.zip  (one entry: BKMVDATA.TXT)
//! ```
//!
//! A000 carries the same path relative to the root, backslash-separated.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

pub const ROOT_DIR_NAME: &str = "OPENFRMT";
pub const INI_FILE_NAME: &str = "INI.TXT";
pub const BKMV_FILE_NAME: &str = "BKMVDATA.TXT";
pub const ZIP_FILE_NAME: &str = "BKMVDATA.zip";

/// Where one export run places its files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    root: PathBuf,
    company_dir: String,
    run_dir: String,
}

impl OutputLayout {
    pub fn new(
        root: impl Into<PathBuf>,
        vat_number: &str,
        fiscal_year: i32,
        run_at: NaiveDateTime,
    ) -> Self {
        let vat: String = vat_number.trim().chars().take(8).collect();
        OutputLayout {
            root: root.into(),
            company_dir: format!("{vat:0>8}.{:02}", fiscal_year.rem_euclid(100)),
            run_dir: run_at.format("%m%d%H%M").to_string(),
        }
    }

    /// `<root>/OPENFRMT/<vat8>.<yy>/<MMDDhhmm>`
    pub fn directory(&self) -> PathBuf {
        self.root
            .join(ROOT_DIR_NAME)
            .join(&self.company_dir)
            .join(&self.run_dir)
    }

    /// Root-relative path as written into A000.
    pub fn header_path(&self) -> String {
        format!("{ROOT_DIR_NAME}\\{}\\{}", self.company_dir, self.run_dir)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ini_file(&self) -> PathBuf {
        self.directory().join(INI_FILE_NAME)
    }

    pub fn bkmv_file(&self) -> PathBuf {
        self.directory().join(BKMV_FILE_NAME)
    }

    pub fn zip_file(&self) -> PathBuf {
        self.directory().join(ZIP_FILE_NAME)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
