//! Persistence of harvest output.
//!
//! One pretty-printed JSON document per logical collection (a search query,
//! a batch of directly fetched records), written under the configured
//! output directory; plus a tabular CSV export over projected records, and
//! the reverse direction for re-projection: sweeping a directory of JSON
//! documents back into memory.

use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::app::{GleanerError, Result};
use crate::domain::RawItem;
use crate::project::{FieldSpec, ProjectedRecord};

/// Create the output directory if needed; refuse to write past a
/// non-directory.
pub fn ensure_output_dir(dir: &Path) -> Result<()> {
    if dir.exists() && !dir.is_dir() {
        return Err(GleanerError::InvalidInput(format!(
            "output path {} is not a directory",
            dir.display()
        )));
    }
    fs::create_dir_all(dir)?;
    Ok(())
}

/// File-safe collection name: spaces become underscores, matching the
/// one-file-per-query output convention.
pub fn collection_filename(name: &str) -> String {
    format!("{}.json", name.replace(' ', "_"))
}

/// Write one collection as a pretty JSON document, returning its path.
pub fn write_json(dir: &Path, name: &str, data: &impl Serialize) -> Result<PathBuf> {
    ensure_output_dir(dir)?;
    let path = dir.join(collection_filename(name));
    let file = fs::File::create(&path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), data)?;
    Ok(path)
}

/// Write projected records as CSV: header in field-spec order, one row per
/// record. Scalars are written verbatim, nested values as JSON, missing
/// values as empty cells.
pub fn write_csv(path: &Path, records: &[ProjectedRecord], spec: &FieldSpec) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(spec.paths())?;
    for record in records {
        let row: Vec<String> = spec
            .paths()
            .iter()
            .map(|path| cell(record.get(path)))
            .collect();
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

fn cell(value: Option<&serde_json::Value>) -> String {
    match value {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

/// Load every JSON array document in `dir`, keyed by file stem (the
/// collection name). Unreadable or non-array files are logged and skipped
/// rather than failing the sweep.
pub fn read_json_dir(dir: &Path) -> Result<Vec<(String, Vec<RawItem>)>> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("json"))
        .collect();
    entries.sort();

    let mut collections = Vec::new();
    for path in entries {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        let parsed: std::result::Result<Vec<RawItem>, _> =
            fs::read_to_string(&path).map_err(GleanerError::from).and_then(|content| {
                serde_json::from_str(&content).map_err(GleanerError::from)
            });
        match parsed {
            Ok(items) => collections.push((stem, items)),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "skipping unreadable document");
            }
        }
    }
    Ok(collections)
}
