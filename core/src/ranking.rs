use crate::error::{Error, Result};
use crate::index::SearchIndex;
use crate::tokenizer::{Normalizer, StemmingNormalizer};
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bm25Params {
    pub k1: f64,
    pub b: f64,
}

impl Default for Bm25Params {
    fn default() -> Self { Self { k1: 1.8, b: 0.75 } }
}

/// Per-field score multipliers.
///
/// Only `body` takes part in scoring today; `title` and `url` are accepted and
/// validated but need per-field term frequencies before they can be applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldBoosts {
    pub title: f64,
    pub body: f64,
    pub url: f64,
}

impl Default for FieldBoosts {
    fn default() -> Self { Self { title: 4.0, body: 3.0, url: 1.0 } }
}

impl FromStr for FieldBoosts {
    type Err = Error;

    /// Parses `title=4,body=3,url=1`; unspecified fields keep their default.
    fn from_str(s: &str) -> Result<Self> {
        let mut boosts = FieldBoosts::default();
        for pair in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| Error::InvalidBoost(format!("expected field=value, got {pair:?}")))?;
            let value: f64 = value
                .trim()
                .parse()
                .map_err(|_| Error::InvalidBoost(format!("{value:?} is not a number")))?;
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidBoost(format!("{key} boost must be a non-negative number")));
            }
            match key.trim() {
                "title" => boosts.title = value,
                "body" => boosts.body = value,
                "url" => boosts.url = value,
                other => return Err(Error::InvalidBoost(format!("unknown field {other:?}"))),
            }
        }
        Ok(boosts)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchOptions {
    pub top_k: usize,
    pub use_page_rank: bool,
    pub field_boosts: FieldBoosts,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self { top_k: 10, use_page_rank: true, field_boosts: FieldBoosts::default() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredDoc {
    pub doc_id: String,
    pub score: f64,
}

/// Query-time scorer over a finalized index. Holds no mutable state, so one
/// engine can serve concurrent queries.
#[derive(Clone)]
pub struct RankingEngine {
    index: Arc<SearchIndex>,
    normalizer: Arc<dyn Normalizer>,
    params: Bm25Params,
}

impl RankingEngine {
    pub fn new(index: Arc<SearchIndex>) -> Self {
        Self::with_normalizer(index, Arc::new(StemmingNormalizer::default()))
    }

    pub fn with_normalizer(index: Arc<SearchIndex>, normalizer: Arc<dyn Normalizer>) -> Self {
        Self { index, normalizer, params: Bm25Params::default() }
    }

    pub fn with_params(mut self, params: Bm25Params) -> Self {
        self.params = params;
        self
    }

    pub fn index(&self) -> &SearchIndex { &self.index }

    /// Query term weights, `tf * idf`. Terms unknown to the corpus are dropped.
    pub fn vectorize_query(&self, query: &str) -> BTreeMap<String, f64> {
        let mut query_tf: BTreeMap<String, u32> = BTreeMap::new();
        for term in self.normalizer.normalize(query) {
            *query_tf.entry(term).or_insert(0) += 1;
        }
        query_tf
            .into_iter()
            .filter_map(|(term, tf)| {
                let idf = self.index.idf(&term)?;
                Some((term, tf as f64 * idf))
            })
            .collect()
    }

    pub fn bm25(&self, doc_id: &str, term: &str) -> Result<f64> {
        let vector = self.index.document_vector(doc_id).ok_or_else(|| Error::MissingEntry {
            kind: "document vector",
            doc_id: doc_id.to_string(),
        })?;
        let Some(&tf) = vector.get(term) else { return Ok(0.0) };
        let idf = self.index.idf(term).ok_or_else(|| Error::UnknownTerm(term.to_string()))?;

        let Bm25Params { k1, b } = self.params;
        let tf = tf as f64;
        let doc_length: u32 = vector.values().sum();
        let norm = doc_length as f64 / self.index.average_document_length();
        Ok(idf * (tf * (k1 + 1.0)) / (tf + k1 * (1.0 - b + b * norm)))
    }

    /// Ranked documents for `query`. Ties are ordered by ascending document id.
    pub fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<ScoredDoc>> {
        let query_vector = self.vectorize_query(query);
        let body_boost = options.field_boosts.body;
        let mut scores: HashMap<&str, f64> = HashMap::new();

        for (term, query_weight) in &query_vector {
            let Some(postings) = self.index.postings(term) else { continue };
            for (doc_id, _) in postings {
                let bm25 = self.bm25(doc_id, term)?;
                let adjusted = if options.use_page_rank {
                    let authority = self.index.page_rank(doc_id).ok_or_else(|| Error::MissingEntry {
                        kind: "authority score",
                        doc_id: doc_id.clone(),
                    })?;
                    bm25 * (1.0 + authority).ln() * body_boost
                } else {
                    bm25 * body_boost
                };
                *scores.entry(doc_id.as_str()).or_insert(0.0) += query_weight * adjusted;
            }
        }

        let mut scored: Vec<ScoredDoc> = scores
            .into_iter()
            .map(|(doc_id, score)| ScoredDoc { doc_id: doc_id.to_string(), score })
            .collect();
        scored.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.doc_id.cmp(&b.doc_id)));
        scored.truncate(options.top_k);
        tracing::debug!(query, terms = query_vector.len(), hits = scored.len(), "search complete");
        Ok(scored)
    }
}
