//! JSON persistence of the collected record set
//!
//! The renderer reads a JSON array with one object per book, pretty printed
//! with four-space indentation and non-ASCII text left unescaped.

use crate::crawler::BookRecord;
use crate::HarvestError;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes `records` to `path`, replacing any previous file
///
/// Parent directories are created when missing.
pub fn write_records(path: &Path, records: &[BookRecord]) -> Result<(), HarvestError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut writer, formatter);
    records.serialize(&mut serializer)?;
    writer.write_all(b"\n")?;
    writer.flush()?;

    tracing::debug!("Wrote {} records to {}", records.len(), path.display());
    Ok(())
}

/// Reads a record set previously written by [`write_records`]
pub fn read_records(path: &Path) -> Result<Vec<BookRecord>, HarvestError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
