//! Storage collaborators for the corpus and the materialized inverted index.
//!
//! Two backends: `MemoryStore` for tests and short-lived drivers, and
//! `SledStore`, an embedded key/value database. Both keep insertion order on
//! scan. Every backend failure surfaces as `IndexError::StorageUnavailable`;
//! nothing here retries.

use crate::{DocId, Document, Index, IndexConfig, IndexError, TermRecord};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sled::transaction::{ConflictableTransactionError, TransactionError};
use std::path::Path;

/// Which document fields a scan returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Projection {
    pub id: bool,
    pub content: bool,
}

impl Projection {
    pub const ALL: Projection = Projection { id: true, content: true };
    pub const CONTENT: Projection = Projection { id: false, content: true };

    fn apply(&self, doc: Document) -> PartialDocument {
        PartialDocument {
            id: self.id.then_some(doc.id),
            content: self.content.then_some(doc.content),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialDocument {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<DocId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

pub trait DocumentStore: Send + Sync {
    /// Clear the corpus and store `documents` in order.
    fn replace_all(&self, documents: &[Document]) -> Result<(), IndexError>;

    fn scan(&self, projection: Projection) -> Result<Vec<PartialDocument>, IndexError>;

    /// Full documents in insertion order.
    fn documents(&self) -> Result<Vec<Document>, IndexError> {
        self.scan(Projection::ALL)?
            .into_iter()
            .map(|p| match (p.id, p.content) {
                (Some(id), Some(content)) => Ok(Document { id, content }),
                _ => Err(IndexError::StorageUnavailable("document record is missing fields".into())),
            })
            .collect()
    }
}

pub trait TermStore: Send + Sync {
    /// Clear the inverted index and store `records` in order.
    fn replace_all(&self, records: &[TermRecord]) -> Result<(), IndexError>;

    fn scan(&self) -> Result<Vec<TermRecord>, IndexError>;
}

/// A fitted index together with the corpus snapshot it was fitted on.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub index: Index,
    pub documents: Vec<Document>,
}

impl Snapshot {
    pub fn document(&self, id: DocId) -> Option<&Document> {
        self.documents.iter().find(|d| d.id == id)
    }
}

/// One fit-and-index cycle: read the corpus, fit, persist the inverted index.
/// On error the term store is left untouched.
pub fn reindex(documents: &dyn DocumentStore, terms: &dyn TermStore, config: IndexConfig) -> Result<Snapshot, IndexError> {
    let docs = documents.documents()?;
    let index = Index::fit(&docs, config)?;
    let records = index.materialize();
    terms.replace_all(&records)?;
    tracing::info!(num_docs = docs.len(), num_terms = records.len(), "reindex complete");
    Ok(Snapshot { index, documents: docs })
}

/// Fit `docs` first and, only when that succeeds, replace the stored corpus
/// and inverted index with them. On error both stores are left untouched.
pub fn replace_corpus(
    documents: &dyn DocumentStore,
    terms: &dyn TermStore,
    docs: Vec<Document>,
    config: IndexConfig,
) -> Result<Snapshot, IndexError> {
    let index = Index::fit(&docs, config)?;
    let records = index.materialize();
    documents.replace_all(&docs)?;
    terms.replace_all(&records)?;
    tracing::info!(num_docs = docs.len(), num_terms = records.len(), "corpus replaced");
    Ok(Snapshot { index, documents: docs })
}

#[derive(Default)]
pub struct MemoryStore {
    documents: RwLock<Vec<Document>>,
    terms: RwLock<Vec<TermRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStore for MemoryStore {
    fn replace_all(&self, documents: &[Document]) -> Result<(), IndexError> {
        *self.documents.write() = documents.to_vec();
        Ok(())
    }

    fn scan(&self, projection: Projection) -> Result<Vec<PartialDocument>, IndexError> {
        Ok(self.documents.read().iter().cloned().map(|d| projection.apply(d)).collect())
    }
}

impl TermStore for MemoryStore {
    fn replace_all(&self, records: &[TermRecord]) -> Result<(), IndexError> {
        *self.terms.write() = records.to_vec();
        Ok(())
    }

    fn scan(&self) -> Result<Vec<TermRecord>, IndexError> {
        Ok(self.terms.read().clone())
    }
}

const DOCUMENTS_TREE: &str = "documents";
const TERMS_TREE: &str = "terms";

/// Sled-backed store. Keys are big-endian sequence numbers so iteration
/// returns records in the order they were written.
pub struct SledStore {
    db: sled::Db,
    documents: sled::Tree,
    terms: sled::Tree,
}

impl SledStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, IndexError> {
        let db = sled::open(path)?;
        let documents = db.open_tree(DOCUMENTS_TREE)?;
        let terms = db.open_tree(TERMS_TREE)?;
        Ok(Self { db, documents, terms })
    }

    /// Swap the tree's contents for `items` in a single transaction, so a
    /// crash leaves either the old or the new records.
    fn replace_tree<T: Serialize>(&self, tree: &sled::Tree, items: &[T]) -> Result<(), IndexError> {
        let stale = tree.iter().keys().collect::<Result<Vec<_>, _>>()?;
        let fresh = items
            .iter()
            .enumerate()
            .map(|(seq, item)| Ok(((seq as u64).to_be_bytes(), bincode::serialize(item)?)))
            .collect::<Result<Vec<_>, IndexError>>()?;

        tree.transaction(|tx| {
            for key in &stale {
                tx.remove(key.clone())?;
            }
            for (key, value) in &fresh {
                tx.insert(&key[..], value.as_slice())?;
            }
            Ok::<_, ConflictableTransactionError<()>>(())
        })
        .map_err(|err| match err {
            TransactionError::Storage(e) => IndexError::from(e),
            TransactionError::Abort(()) => IndexError::StorageUnavailable("transaction aborted".into()),
        })?;
        self.db.flush()?;
        Ok(())
    }

    fn scan_tree<T: for<'de> Deserialize<'de>>(tree: &sled::Tree) -> Result<Vec<T>, IndexError> {
        let mut out = Vec::new();
        for entry in tree.iter() {
            let (_, value) = entry?;
            out.push(bincode::deserialize(&value)?);
        }
        Ok(out)
    }
}

impl DocumentStore for SledStore {
    fn replace_all(&self, documents: &[Document]) -> Result<(), IndexError> {
        self.replace_tree(&self.documents, documents)
    }

    fn scan(&self, projection: Projection) -> Result<Vec<PartialDocument>, IndexError> {
        let docs: Vec<Document> = Self::scan_tree(&self.documents)?;
        Ok(docs.into_iter().map(|d| projection.apply(d)).collect())
    }
}

impl TermStore for SledStore {
    fn replace_all(&self, records: &[TermRecord]) -> Result<(), IndexError> {
        self.replace_tree(&self.terms, records)
    }

    fn scan(&self) -> Result<Vec<TermRecord>, IndexError> {
        Self::scan_tree(&self.terms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projection_omits_fields() {
        let store = MemoryStore::new();
        DocumentStore::replace_all(&store, &[Document::new(1, "hello")]).unwrap();
        let only_content = DocumentStore::scan(&store, Projection::CONTENT).unwrap();
        assert_eq!(only_content, vec![PartialDocument { id: None, content: Some("hello".into()) }]);
    }

    #[test]
    fn documents_requires_full_records() {
        let store = MemoryStore::new();
        DocumentStore::replace_all(&store, &[Document::new(2, "b"), Document::new(1, "a")]).unwrap();
        let docs = store.documents().unwrap();
        assert_eq!(docs, vec![Document::new(2, "b"), Document::new(1, "a")]);
    }

    #[test]
    fn reindex_replaces_terms() {
        let store = MemoryStore::new();
        DocumentStore::replace_all(&store, &[Document::new(1, "one two"), Document::new(2, "two three")]).unwrap();
        let snapshot = reindex(&store, &store, IndexConfig::default()).unwrap();
        let stored = TermStore::scan(&store).unwrap();
        assert_eq!(stored, snapshot.index.materialize());
        assert_eq!(snapshot.document(2).map(|d| d.content.as_str()), Some("two three"));

        DocumentStore::replace_all(&store, &[]).unwrap();
        assert_eq!(reindex(&store, &store, IndexConfig::default()).unwrap_err(), IndexError::EmptyCorpus);
        // a failed cycle leaves the previous index in place
        assert_eq!(TermStore::scan(&store).unwrap().len(), stored.len());
    }

    #[test]
    fn failed_replace_keeps_previous_corpus() {
        let store = MemoryStore::new();
        let docs = vec![Document::new(1, "one two"), Document::new(2, "two three")];
        let snapshot = replace_corpus(&store, &store, docs.clone(), IndexConfig::default()).unwrap();
        let terms = TermStore::scan(&store).unwrap();
        assert_eq!(terms, snapshot.index.materialize());

        let err = replace_corpus(&store, &store, Vec::new(), IndexConfig::default()).unwrap_err();
        assert_eq!(err, IndexError::EmptyCorpus);
        let dup = vec![Document::new(1, "alpha beta"), Document::new(1, "gamma delta")];
        let err = replace_corpus(&store, &store, dup, IndexConfig::default()).unwrap_err();
        assert_eq!(err, IndexError::DuplicateDocument(1));

        assert_eq!(store.documents().unwrap(), docs);
        assert_eq!(TermStore::scan(&store).unwrap(), terms);
    }
}
