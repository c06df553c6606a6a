pub mod config;
pub mod error;
pub mod index;
pub mod matrix;
pub mod persist;
pub mod rank;
pub mod store;
pub mod tokenizer;
pub mod vocabulary;

use serde::{Deserialize, Serialize};

pub use config::{IdfWeighting, IndexConfig};
pub use error::IndexError;
pub use index::Index;
pub use matrix::{SparseVector, TfIdfMatrix};
pub use rank::{rank, RankedDocument};
pub use vocabulary::Vocabulary;

pub type TermId = u32;
pub type DocId = u32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    pub content: String,
}

impl Document {
    pub fn new(id: DocId, content: impl Into<String>) -> Self {
        Self { id, content: content.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    #[serde(rename = "tfidf")]
    pub weight: f64, // normalized tf-idf weight, rounded for storage
}

/// One entry of the materialized inverted index: a vocabulary term with every
/// document it has non-zero weight in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermRecord {
    pub term_id: TermId,
    pub term: String,
    pub column: u32,
    pub postings: Vec<Posting>, // postings in corpus order
}
