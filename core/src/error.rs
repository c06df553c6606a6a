//! Error type shared by indexing, ranking and the storage backends.

use crate::DocId;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum IndexError {
    /// No documents, or none with a single word after normalization
    #[error("corpus is empty: no documents with indexable text")]
    EmptyCorpus,
    /// Documents have words but no n-gram in the configured range
    #[error("vocabulary is empty: no n-grams could be extracted")]
    EmptyVocabulary,
    /// Document or term storage failed
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
    /// Two documents in one corpus share an id
    #[error("duplicate document id {0}")]
    DuplicateDocument(DocId),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<sled::Error> for IndexError {
    fn from(err: sled::Error) -> Self {
        IndexError::StorageUnavailable(err.to_string())
    }
}

impl From<bincode::Error> for IndexError {
    fn from(err: bincode::Error) -> Self {
        IndexError::StorageUnavailable(format!("encoding: {err}"))
    }
}

impl From<std::io::Error> for IndexError {
    fn from(err: std::io::Error) -> Self {
        IndexError::StorageUnavailable(err.to_string())
    }
}

impl From<serde_json::Error> for IndexError {
    fn from(err: serde_json::Error) -> Self {
        IndexError::StorageUnavailable(format!("json: {err}"))
    }
}
