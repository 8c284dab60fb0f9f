use serde::Serialize;

/// An untyped record as returned by a source: a JSON object with no
/// identity beyond its content.
pub type RawItem = serde_json::Map<String, serde_json::Value>;

/// One page of a paginated listing collection.
///
/// `total_count` is the source's total-result signal. Only the seed page's
/// value is ever consulted; later pages may report drifting counts and are
/// ignored.
#[derive(Debug, Default)]
pub struct PageResult {
    pub items: Vec<RawItem>,
    pub total_count: Option<u64>,
}

impl PageResult {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// The flattened output of a harvest: items in page order (or arrival
/// order, depending on the configured ordering policy), then within-page
/// order. Append-only; pages are added whole, never interleaved.
#[derive(Debug, Default, Serialize)]
#[serde(transparent)]
pub struct HarvestResult {
    items: Vec<RawItem>,
    #[serde(skip)]
    pages: usize,
}

impl HarvestResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one fully resolved page of items.
    pub fn push_page(&mut self, items: Vec<RawItem>) {
        self.items.extend(items);
        self.pages += 1;
    }

    pub fn items(&self) -> &[RawItem] {
        &self.items
    }

    pub fn into_items(self) -> Vec<RawItem> {
        self.items
    }

    /// Number of pages that contributed items, the seed included.
    pub fn page_count(&self) -> usize {
        self.pages
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
