use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cannot finalize an empty corpus")]
    EmptyCorpus,

    #[error("document already indexed: {0}")]
    DuplicateDocument(String),

    #[error("{kind} not found for document {doc_id}")]
    MissingEntry { kind: &'static str, doc_id: String },

    #[error("no idf weight for term {0}")]
    UnknownTerm(String),

    #[error("snapshot schema mismatch in {path}: {reason}")]
    Schema { path: PathBuf, reason: String },

    #[error("invalid field boost: {0}")]
    InvalidBoost(String),
}
