use crate::error::{Error, Result};
use crate::graph::PageRank;
use crate::store::PageStore;
use crate::tokenizer::{Normalizer, StemmingNormalizer};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// `(doc_id, term_frequency)` pairs in document processing order.
pub type Postings = Vec<(String, u32)>;
pub type TermFrequencies = HashMap<String, u32>;

/// Finalized, read-only index state. This is also the persisted snapshot layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchIndex {
    pub(crate) inverted_index: HashMap<String, Postings>,
    pub(crate) document_vectors: HashMap<String, TermFrequencies>,
    pub(crate) idf: HashMap<String, f64>,
    pub(crate) total_documents: usize,
    pub(crate) page_ranks: HashMap<String, f64>,
    pub(crate) average_document_length: f64,
    #[serde(default)]
    pub(crate) document_titles: HashMap<String, String>,
}

impl SearchIndex {
    pub fn total_documents(&self) -> usize { self.total_documents }

    pub fn average_document_length(&self) -> f64 { self.average_document_length }

    pub fn term_count(&self) -> usize { self.inverted_index.len() }

    pub fn idf(&self, term: &str) -> Option<f64> { self.idf.get(term).copied() }

    pub fn postings(&self, term: &str) -> Option<&[(String, u32)]> {
        self.inverted_index.get(term).map(Vec::as_slice)
    }

    pub fn document_vector(&self, doc_id: &str) -> Option<&TermFrequencies> { self.document_vectors.get(doc_id) }

    /// Sum of the document's term frequencies.
    pub fn document_length(&self, doc_id: &str) -> Option<u32> {
        self.document_vectors.get(doc_id).map(|v| v.values().sum())
    }

    pub fn page_rank(&self, doc_id: &str) -> Option<f64> { self.page_ranks.get(doc_id).copied() }

    pub fn title(&self, doc_id: &str) -> Option<&str> { self.document_titles.get(doc_id).map(String::as_str) }
}

/// Batch index builder. Every document is added exactly once, then
/// [`Indexer::finalize`] computes corpus statistics and hands back a [`SearchIndex`].
pub struct Indexer {
    normalizer: Arc<dyn Normalizer>,
    inverted_index: HashMap<String, Postings>,
    document_vectors: HashMap<String, TermFrequencies>,
    page_ranks: HashMap<String, f64>,
    document_titles: HashMap<String, String>,
    total_length: u64,
}

impl Default for Indexer {
    fn default() -> Self { Self::new() }
}

impl Indexer {
    pub fn new() -> Self { Self::with_normalizer(Arc::new(StemmingNormalizer::default())) }

    pub fn with_normalizer(normalizer: Arc<dyn Normalizer>) -> Self {
        Self {
            normalizer,
            inverted_index: HashMap::new(),
            document_vectors: HashMap::new(),
            page_ranks: HashMap::new(),
            document_titles: HashMap::new(),
            total_length: 0,
        }
    }

    pub fn len(&self) -> usize { self.document_vectors.len() }

    pub fn is_empty(&self) -> bool { self.document_vectors.is_empty() }

    pub fn add_document(&mut self, doc_id: &str, title: &str, body: &str, page_rank: f64) -> Result<()> {
        if self.document_vectors.contains_key(doc_id) {
            return Err(Error::DuplicateDocument(doc_id.to_string()));
        }
        let tokens = self.normalizer.normalize(&format!("{title} {body}"));
        let length = tokens.len() as u64;

        // BTreeMap keeps this document's postings appended in term order.
        let mut tf_counts: BTreeMap<String, u32> = BTreeMap::new();
        for token in tokens {
            *tf_counts.entry(token).or_insert(0) += 1;
        }
        for (term, tf) in &tf_counts {
            self.inverted_index.entry(term.clone()).or_default().push((doc_id.to_string(), *tf));
        }

        self.document_vectors.insert(doc_id.to_string(), tf_counts.into_iter().collect());
        self.page_ranks.insert(doc_id.to_string(), page_rank);
        self.document_titles.insert(doc_id.to_string(), title.to_string());
        self.total_length += length;
        tracing::trace!(doc_id, length, "indexed document");
        Ok(())
    }

    /// Adds every stored document with its authority score.
    pub fn add_store(&mut self, store: &PageStore, page_rank: &PageRank) -> Result<()> {
        for doc in store.documents() {
            self.add_document(&doc.id, &doc.title, &doc.body, page_rank.authority(&doc.id))?;
        }
        Ok(())
    }

    pub fn finalize(self) -> Result<SearchIndex> {
        let total_documents = self.document_vectors.len();
        if total_documents == 0 {
            return Err(Error::EmptyCorpus);
        }
        let n = total_documents as f64;
        let average_document_length = self.total_length as f64 / n;
        let idf = self
            .inverted_index
            .iter()
            .map(|(term, postings)| (term.clone(), idf(n, postings.len() as f64)))
            .collect();

        tracing::info!(
            num_docs = total_documents,
            num_terms = self.inverted_index.len(),
            average_document_length,
            "finalized index"
        );
        Ok(SearchIndex {
            inverted_index: self.inverted_index,
            document_vectors: self.document_vectors,
            idf,
            total_documents,
            page_ranks: self.page_ranks,
            average_document_length,
            document_titles: self.document_titles,
        })
    }
}

/// BM25 inverse document frequency, `ln((n - df + 0.5) / (df + 0.5) + 1)`.
pub fn idf(n: f64, df: f64) -> f64 {
    ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario() -> SearchIndex {
        let mut indexer = Indexer::new();
        indexer.add_document("doc1", "", "cat dog cat", 0.2).unwrap();
        indexer.add_document("doc2", "", "dog bird", 0.3).unwrap();
        indexer.add_document("doc3", "", "cat bird bird", 0.5).unwrap();
        indexer.finalize().unwrap()
    }

    #[test]
    fn corpus_statistics() {
        let index = scenario();
        assert_eq!(index.total_documents(), 3);
        assert!((index.average_document_length() - 8.0 / 3.0).abs() < 1e-12);
        assert!((index.idf("cat").unwrap() - 1.6f64.ln()).abs() < 1e-12);
        assert_eq!(index.idf("cat"), index.idf("bird"));
        assert_eq!(index.document_length("doc3"), Some(3));
    }

    #[test]
    fn postings_follow_insertion_order() {
        let index = scenario();
        let cat: Vec<_> = index.postings("cat").unwrap().to_vec();
        assert_eq!(cat, vec![("doc1".to_string(), 2), ("doc3".to_string(), 1)]);
    }

    #[test]
    fn postings_total_matches_token_count() {
        let index = scenario();
        let total: u32 = index.inverted_index.values().flatten().map(|(_, tf)| tf).sum();
        assert_eq!(total, 8);
        for postings in index.inverted_index.values() {
            for (doc, _) in postings {
                assert!(index.document_vector(doc).is_some());
                assert!(index.page_rank(doc).is_some());
            }
        }
    }

    #[test]
    fn idf_decreases_with_document_frequency() {
        let n = 10.0;
        let weights: Vec<f64> = (1..=10).map(|df| idf(n, df as f64)).collect();
        assert!(weights.windows(2).all(|w| w[0] > w[1]));
        assert!(weights.iter().all(|w| *w > 0.0));
    }

    #[test]
    fn empty_corpus_cannot_finalize() {
        assert!(matches!(Indexer::new().finalize(), Err(Error::EmptyCorpus)));
    }

    #[test]
    fn duplicate_document_is_rejected() {
        let mut indexer = Indexer::new();
        indexer.add_document("doc1", "t", "cat", 1.0).unwrap();
        let err = indexer.add_document("doc1", "t", "cat", 1.0).unwrap_err();
        assert!(matches!(err, Error::DuplicateDocument(id) if id == "doc1"));
        assert_eq!(indexer.finalize().unwrap().postings("cat").unwrap().len(), 1);
    }

    #[test]
    fn title_tokens_count_toward_length() {
        let mut indexer = Indexer::new();
        indexer.add_document("doc1", "Birds", "cat", 1.0).unwrap();
        let index = indexer.finalize().unwrap();
        assert_eq!(index.document_length("doc1"), Some(2));
        assert_eq!(index.title("doc1"), Some("Birds"));
    }
}
