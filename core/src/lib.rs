pub mod error;
pub mod graph;
pub mod index;
pub mod persist;
pub mod ranking;
pub mod store;
pub mod tokenizer;

pub use error::{Error, Result};
pub use graph::{LinkGraph, PageRank, PageRankConfig, DEFAULT_AUTHORITY};
pub use index::{Indexer, SearchIndex};
pub use ranking::{Bm25Params, FieldBoosts, RankingEngine, ScoredDoc, SearchOptions};
pub use store::{Document, PageStore};
