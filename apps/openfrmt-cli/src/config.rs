//! # Export Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     OPENFRMT_VAT_NUMBER=514713288                                      │
//! │     OPENFRMT_OUTPUT_ROOT=/mnt/usb                                      │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     --config <path>, otherwise                                         │
//! │     ~/.config/pos/openfrmt.toml (Linux)                                │
//! │     ~/Library/Application Support/com.titan.pos/openfrmt.toml (macOS)  │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # openfrmt.toml
//! [business]
//! vat_number = "514713288"
//! company_name = "מכולת השכונה"
//! company_address = "הרצל"
//! company_address_number = "12"
//! company_city = "חיפה"
//! company_zip = "3303112"
//!
//! [software]
//! registration_number = "12345678"
//! name = "Titan POS"
//! version = "0.1.0"
//! manufacturer_id = "123456782"
//! manufacturer_name = "Titan"
//!
//! [tax_report]
//! accounting_type = 1
//!
//! [output]
//! root = "/mnt/usb"
//! encoding = "iso-8859-8"
//! ```

use std::path::PathBuf;

use openfrmt_core::validation::{validate_business, validate_report_config, validate_software};
use openfrmt_core::{BusinessInfo, SoftwareInfo, TaxReportConfig, ValidationError};
use openfrmt_export::{encoder_for_name, Encoder};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

const CONFIG_FILE_NAME: &str = "openfrmt.toml";

/// Errors raised while loading the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] ValidationError),

    #[error("Unknown encoding '{0}' (expected iso-8859-8, windows-1255 or utf-8)")]
    UnknownEncoding(String),
}

// =============================================================================
// Output Settings
// =============================================================================

/// Where and how the files are written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSettings {
    /// Directory that receives `OPENFRMT/`.
    #[serde(default = "default_root")]
    pub root: PathBuf,

    #[serde(default = "default_encoding")]
    pub encoding: String,
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_encoding() -> String {
    "iso-8859-8".to_string()
}

impl Default for OutputSettings {
    fn default() -> Self {
        OutputSettings {
            root: default_root(),
            encoding: default_encoding(),
        }
    }
}

// =============================================================================
// Export Config
// =============================================================================

/// Everything an export needs besides the transactions themselves.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub business: BusinessInfo,
    pub software: SoftwareInfo,
    pub tax_report: TaxReportConfig,
    pub output: OutputSettings,
}

impl ExportConfig {
    /// Loads defaults, then the config file if present, then environment
    /// overrides, and validates the result.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading export config from file");
                let contents = std::fs::read_to_string(&path).map_err(|source| {
                    ConfigError::Read {
                        path: path.clone(),
                        source,
                    }
                })?;
                config = toml::from_str(&contents)
                    .map_err(|source| ConfigError::Parse { path, source })?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Checks business identity, software registration, file-level codes
    /// and the encoding name.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_business(&self.business)?;
        validate_software(&self.software)?;
        validate_report_config(&self.tax_report)?;
        self.encoder()?;
        Ok(())
    }

    /// Encoder named by `[output].encoding`.
    pub fn encoder(&self) -> Result<Box<dyn Encoder>, ConfigError> {
        encoder_for_name(&self.output.encoding)
            .ok_or_else(|| ConfigError::UnknownEncoding(self.output.encoding.clone()))
    }

    /// Applies `OPENFRMT_*` overrides read through `lookup`.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(vat) = lookup("OPENFRMT_VAT_NUMBER") {
            debug!(vat_number = %vat, "Overriding VAT number from environment");
            self.business.vat_number = vat;
        }

        if let Some(name) = lookup("OPENFRMT_COMPANY_NAME") {
            self.business.company_name = name;
        }

        if let Some(branch) = lookup("OPENFRMT_BRANCH_ID") {
            self.business.branch_id = Some(branch);
        }

        if let Some(root) = lookup("OPENFRMT_OUTPUT_ROOT") {
            debug!(root = %root, "Overriding output root from environment");
            self.output.root = PathBuf::from(root);
        }

        if let Some(encoding) = lookup("OPENFRMT_ENCODING") {
            self.output.encoding = encoding;
        }
    }

    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "titan", "pos")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
