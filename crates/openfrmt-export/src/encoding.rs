//! # Character Encoders
//!
//! The export text is built as Rust `String`s and turned into bytes here.
//!
//! ```text
//!   "C100…שלום…\r\n"  ──► Encoder::encode ──► [0x43, 0x31, …, 0xF9, 0xEC, …]
//!                           │
//!                           ├── LegacyEncoder::iso_8859_8()   statutory
//!                           ├── LegacyEncoder::windows_1255() superset
//!                           └── PassThroughEncoder            UTF-8, tests
//! ```
//!
//! ## Policy
//! A character with no mapping in the target charset is an error. Nothing is
//! substituted: a silently altered product name is worse than a failed run.

use encoding_rs::{Encoding, ISO_8859_8, WINDOWS_1255};
use thiserror::Error;
use tracing::warn;

/// A character that the target charset cannot represent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("character {character:?} at position {position} has no mapping in {encoding}")]
pub struct EncodeError {
    pub encoding: &'static str,
    pub character: char,
    /// Zero-based character index in the input text.
    pub position: usize,
}

/// Turns export text into file bytes.
pub trait Encoder: Send + Sync {
    /// Label reported in logs and errors.
    fn name(&self) -> &'static str;

    fn encode(&self, text: &str) -> Result<Vec<u8>, EncodeError>;
}

// =============================================================================
// Legacy Single-Byte Encoder
// =============================================================================

/// Single-byte Hebrew charset backed by `encoding_rs` tables.
#[derive(Debug, Clone, Copy)]
pub struct LegacyEncoder {
    encoding: &'static Encoding,
}

impl LegacyEncoder {
    /// ISO-8859-8, the charset the regulation names.
    pub fn iso_8859_8() -> Self {
        LegacyEncoder {
            encoding: ISO_8859_8,
        }
    }

    /// windows-1255, a superset of ISO-8859-8 with niqqud and symbols.
    pub fn windows_1255() -> Self {
        LegacyEncoder {
            encoding: WINDOWS_1255,
        }
    }

    /// Resolves `iso-8859-8` or `windows-1255`, case-insensitively.
    pub fn for_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "iso-8859-8" | "iso8859-8" | "iso_8859-8" => Some(Self::iso_8859_8()),
            "windows-1255" | "cp1255" => Some(Self::windows_1255()),
            _ => None,
        }
    }

    /// Decodes an export file back to UTF-8 for inspection.
    ///
    /// Bytes without a mapping become U+FFFD and are logged.
    pub fn decode(&self, bytes: &[u8]) -> String {
        let (text, had_errors) = self.encoding.decode_without_bom_handling(bytes);
        if had_errors {
            warn!(encoding = self.encoding.name(), "Input contained unmapped bytes");
        }
        text.into_owned()
    }

    fn first_unmappable(&self, text: &str) -> Option<(usize, char)> {
        let mut buf = [0u8; 4];
        text.chars().enumerate().find(|(_, ch)| {
            let (_, _, unmappable) = self.encoding.encode(ch.encode_utf8(&mut buf));
            unmappable
        })
    }
}

impl Encoder for LegacyEncoder {
    fn name(&self) -> &'static str {
        self.encoding.name()
    }

    fn encode(&self, text: &str) -> Result<Vec<u8>, EncodeError> {
        let (bytes, _, had_errors) = self.encoding.encode(text);
        if had_errors {
            // encoding_rs substitutes numeric character references; locate
            // the first offender instead of shipping them.
            if let Some((position, character)) = self.first_unmappable(text) {
                return Err(EncodeError {
                    encoding: self.name(),
                    character,
                    position,
                });
            }
        }
        Ok(bytes.into_owned())
    }
}

// =============================================================================
// Pass-Through Encoder
// =============================================================================

/// Emits UTF-8 unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThroughEncoder;

impl Encoder for PassThroughEncoder {
    fn name(&self) -> &'static str {
        "UTF-8"
    }

    fn encode(&self, text: &str) -> Result<Vec<u8>, EncodeError> {
        Ok(text.as_bytes().to_vec())
    }
}

// =============================================================================
// Lookup
// =============================================================================

/// Resolves a configured encoding name, case-insensitively.
///
/// Accepts `iso-8859-8`, `windows-1255` and `utf-8`.
pub fn encoder_for_name(name: &str) -> Option<Box<dyn Encoder>> {
    if let Some(legacy) = LegacyEncoder::for_name(name) {
        return Some(Box::new(legacy));
    }
    match name.trim().to_ascii_lowercase().as_str() {
        "utf-8" | "utf8" => Some(Box::new(PassThroughEncoder)),
        _ => None,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
