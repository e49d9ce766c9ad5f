use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use url::Url;

/// A successfully fetched page. Keyed by its URL, immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub body: String,
    pub outlinks: BTreeSet<String>,
}

/// Absolute URL with a non-empty scheme and host.
pub fn is_valid_url(raw: &str) -> bool {
    match Url::parse(raw) {
        Ok(u) => !u.scheme().is_empty() && u.host_str().map_or(false, |h| !h.is_empty()),
        Err(_) => false,
    }
}

/// Canonical key for a URL: parsed, fragment removed. `None` when invalid.
pub fn url_key(raw: &str) -> Option<String> {
    let mut u = Url::parse(raw).ok()?;
    if u.host_str().map_or(true, |h| h.is_empty()) { return None; }
    u.set_fragment(None);
    Some(u.to_string())
}

/// The crawled corpus. Workers insert concurrently, each under its own key.
#[derive(Default)]
pub struct PageStore {
    docs: RwLock<BTreeMap<String, Document>>,
}

impl PageStore {
    pub fn new() -> Self { Self::default() }

    /// Stores `doc` unless its id is already present. Returns whether it was inserted.
    pub fn insert(&self, doc: Document) -> bool {
        let mut docs = self.docs.write();
        if docs.contains_key(&doc.id) { return false; }
        docs.insert(doc.id.clone(), doc);
        true
    }

    pub fn len(&self) -> usize { self.docs.read().len() }

    pub fn is_empty(&self) -> bool { self.docs.read().is_empty() }

    pub fn contains(&self, id: &str) -> bool { self.docs.read().contains_key(id) }

    pub fn get(&self, id: &str) -> Option<Document> { self.docs.read().get(id).cloned() }

    /// Documents in ascending id order.
    pub fn documents(&self) -> Vec<Document> { self.docs.read().values().cloned().collect() }
}

impl FromIterator<Document> for PageStore {
    fn from_iter<I: IntoIterator<Item = Document>>(iter: I) -> Self {
        let store = PageStore::new();
        for doc in iter { store.insert(doc); }
        store
    }
}
