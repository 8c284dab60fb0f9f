//! Field projection: reducing raw source records to a declared field set.
//!
//! Two flavors, matching the two places the pipelines narrow their data:
//! [`whitelist`] keeps a fixed set of top-level keys (applied at scrape
//! time, nested values kept whole), and [`flatten`] resolves dotted field
//! paths into a flat record for tabular export.

use serde_json::Value;

use crate::app::{GleanerError, Result};
use crate::domain::RawItem;

/// An ordered list of field paths. A path addresses nested structure with
/// `.`-separated segments, e.g. `imageInfo.thumbnailUrl`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    paths: Vec<String>,
}

/// A record narrowed to a `FieldSpec`: one entry per declared path, in
/// declaration order, `Null` where the source had nothing.
pub type ProjectedRecord = serde_json::Map<String, Value>;

impl FieldSpec {
    pub fn new(paths: impl IntoIterator<Item = impl Into<String>>) -> Result<Self> {
        let paths: Vec<String> = paths.into_iter().map(Into::into).collect();
        if paths.is_empty() {
            return Err(GleanerError::InvalidInput("empty field spec".into()));
        }
        if let Some(bad) = paths.iter().find(|p| p.trim().is_empty()) {
            return Err(GleanerError::InvalidInput(format!(
                "blank field path in spec: {bad:?}"
            )));
        }
        Ok(Self { paths })
    }

    /// Parse a comma-separated list, the CLI form.
    pub fn parse(spec: &str) -> Result<Self> {
        Self::new(spec.split(',').map(|p| p.trim().to_string()))
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }
}

/// Keep only the named top-level keys of `item`, in the item's own order.
/// Keys the item lacks are simply absent, mirroring the sources' sparse
/// records.
pub fn whitelist(item: &RawItem, fields: &[&str]) -> RawItem {
    item.iter()
        .filter(|(key, _)| fields.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Project `item` onto `spec`: each dotted path becomes one flat key.
/// Missing paths yield `Null` rather than failing.
pub fn flatten(item: &RawItem, spec: &FieldSpec) -> ProjectedRecord {
    let mut record = ProjectedRecord::new();
    for path in spec.paths() {
        let value = lookup(item, path).cloned().unwrap_or(Value::Null);
        record.insert(path.clone(), value);
    }
    record
}

/// Walk a dotted path through nested objects.
pub fn lookup<'a>(item: &'a RawItem, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = item.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}
