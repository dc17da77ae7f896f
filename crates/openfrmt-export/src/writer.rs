//! # File Writer
//!
//! Places already-encoded export content on disk.
//!
//! ## Staged Placement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. create_dir_all(<dir>)                      idempotent               │
//! │  2. <dir>/.openfrmt-XXXXXX/                    tempfile staging dir     │
//! │       INI.TXT        write + fsync                                      │
//! │       BKMVDATA.TXT   write + fsync                                      │
//! │       BKMVDATA.zip   deflate + fsync                                    │
//! │  3. rename each into <dir>                     same filesystem          │
//! │  4. staging dir dropped                        also on every error      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A crash before step 3 leaves at most a hidden staging directory, never a
//! file under its final name with partial content.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use chrono::{Datelike, NaiveDateTime, Timelike};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{ExportError, ExportResult};
use crate::layout::{OutputLayout, BKMV_FILE_NAME, INI_FILE_NAME, ZIP_FILE_NAME};

const LINE_TERMINATOR: &str = "\r\n";

/// Joins lines with CRLF, including after the last line.
pub fn join_crlf(lines: &[String]) -> String {
    let capacity = lines.iter().map(|l| l.len() + LINE_TERMINATOR.len()).sum();
    let mut text = String::with_capacity(capacity);
    for line in lines {
        text.push_str(line);
        text.push_str(LINE_TERMINATOR);
    }
    text
}

/// Encoded content of both export files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedExport {
    pub ini: Vec<u8>,
    pub bkmv: Vec<u8>,
}

/// Writes INI.TXT, BKMVDATA.TXT and BKMVDATA.zip into the layout's
/// directory. Zip entry timestamps use `stamp`.
pub fn write_export(
    layout: &OutputLayout,
    content: &EncodedExport,
    stamp: NaiveDateTime,
) -> ExportResult<()> {
    let dir = layout.directory();
    fs::create_dir_all(&dir).map_err(|e| ExportError::io(&dir, e))?;

    let staging = tempfile::Builder::new()
        .prefix(".openfrmt-")
        .tempdir_in(&dir)
        .map_err(|e| ExportError::io(&dir, e))?;

    write_file(&staging.path().join(INI_FILE_NAME), &content.ini)?;
    write_file(&staging.path().join(BKMV_FILE_NAME), &content.bkmv)?;
    write_zip(&staging.path().join(ZIP_FILE_NAME), &content.bkmv, stamp)?;

    for name in [INI_FILE_NAME, BKMV_FILE_NAME, ZIP_FILE_NAME] {
        let target = dir.join(name);
        fs::rename(staging.path().join(name), &target)
            .map_err(|e| ExportError::io(&target, e))?;
        debug!(path = %target.display(), "Export file placed");
    }

    staging.close().map_err(|e| ExportError::io(&dir, e))?;
    Ok(())
}

fn write_file(path: &Path, bytes: &[u8]) -> ExportResult<()> {
    let mut file = File::create(path).map_err(|e| ExportError::io(path, e))?;
    file.write_all(bytes).map_err(|e| ExportError::io(path, e))?;
    file.sync_all().map_err(|e| ExportError::io(path, e))?;
    Ok(())
}

/// Packs `bkmv` as the single entry `BKMVDATA.TXT`.
fn write_zip(path: &Path, bkmv: &[u8], stamp: NaiveDateTime) -> ExportResult<()> {
    let zip_err = |source| ExportError::Zip {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(|e| ExportError::io(path, e))?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip_time(stamp))
        .unix_permissions(0o644);

    zip.start_file(BKMV_FILE_NAME, options).map_err(zip_err)?;
    zip.write_all(bkmv).map_err(|e| ExportError::io(path, e))?;
    let file = zip.finish().map_err(zip_err)?;
    file.sync_all().map_err(|e| ExportError::io(path, e))?;
    Ok(())
}

/// Zip (DOS) timestamps cover 1980-2107; anything else falls back to the
/// format's epoch.
fn zip_time(stamp: NaiveDateTime) -> zip::DateTime {
    let fields = (
        u16::try_from(stamp.year()),
        u8::try_from(stamp.month()),
        u8::try_from(stamp.day()),
        u8::try_from(stamp.hour()),
        u8::try_from(stamp.minute()),
        u8::try_from(stamp.second()),
    );
    match fields {
        (Ok(y), Ok(mo), Ok(d), Ok(h), Ok(mi), Ok(s)) => {
            zip::DateTime::from_date_and_time(y, mo, d, h, mi, s).unwrap_or_default()
        }
        _ => zip::DateTime::default(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::Read;

    fn stamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 9, 18)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap()
    }

    #[test]
    fn test_join_crlf_has_trailing_terminator() {
        let lines = vec!["A100".to_string(), "Z900".to_string()];
        assert_eq!(join_crlf(&lines), "A100\r\nZ900\r\n");
        assert_eq!(join_crlf(&[]), "");
    }

    #[test]
    fn test_write_export_places_all_files() {
        let root = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(root.path(), "514713288", 2025, stamp());
        let content = EncodedExport {
            ini: b"INI\r\n".to_vec(),
            bkmv: b"A100\r\nZ900\r\n".to_vec(),
        };

        write_export(&layout, &content, stamp()).unwrap();

        assert_eq!(fs::read(layout.ini_file()).unwrap(), content.ini);
        assert_eq!(fs::read(layout.bkmv_file()).unwrap(), content.bkmv);

        let mut archive = zip::ZipArchive::new(File::open(layout.zip_file()).unwrap()).unwrap();
        assert_eq!(archive.len(), 1);
        let mut entry = archive.by_index(0).unwrap();
        assert_eq!(entry.name(), "BKMVDATA.TXT");
        let mut unpacked = Vec::new();
        entry.read_to_end(&mut unpacked).unwrap();
        assert_eq!(unpacked, content.bkmv);

        // only the three files remain; the staging dir is gone
        let mut names: Vec<String> = fs::read_dir(layout.directory())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, ["BKMVDATA.TXT", "BKMVDATA.zip", "INI.TXT"]);
    }

    #[test]
    fn test_rewrite_is_idempotent() {
        let root = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(root.path(), "1", 2025, stamp());
        let first = EncodedExport {
            ini: b"one".to_vec(),
            bkmv: b"one".to_vec(),
        };
        let second = EncodedExport {
            ini: b"two".to_vec(),
            bkmv: b"two".to_vec(),
        };
        write_export(&layout, &first, stamp()).unwrap();
        write_export(&layout, &second, stamp()).unwrap();
        assert_eq!(fs::read(layout.ini_file()).unwrap(), b"two");
    }

    #[test]
    fn test_zip_is_byte_stable() {
        let root = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(root.path(), "1", 2025, stamp());
        let content = EncodedExport {
            ini: b"i".to_vec(),
            bkmv: b"A100\r\n".repeat(50),
        };
        write_export(&layout, &content, stamp()).unwrap();
        let first = fs::read(layout.zip_file()).unwrap();
        write_export(&layout, &content, stamp()).unwrap();
        assert_eq!(fs::read(layout.zip_file()).unwrap(), first);
    }

    #[test]
    fn test_io_error_names_path() {
        let root = tempfile::tempdir().unwrap();
        let blocker = root.path().join("OPENFRMT");
        fs::write(&blocker, b"not a directory").unwrap();

        let layout = OutputLayout::new(root.path(), "1", 2025, stamp());
        let content = EncodedExport {
            ini: vec![],
            bkmv: vec![],
        };
        let err = write_export(&layout, &content, stamp()).unwrap_err();
        assert!(matches!(err, ExportError::Io { .. }));
        assert!(err.is_retryable());
    }
}
