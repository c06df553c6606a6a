//! The fitted index: vocabulary, TF-IDF matrix and the document ids of its rows.

use crate::config::round_weight;
use crate::matrix::term_counts;
use crate::tokenizer::tokenize;
use crate::{DocId, Document, IndexConfig, IndexError, Posting, SparseVector, TermRecord, TfIdfMatrix, Vocabulary};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Index {
    config: IndexConfig,
    vocabulary: Vocabulary,
    matrix: TfIdfMatrix,
    doc_ids: Vec<DocId>,
}

impl Index {
    /// Fit vocabulary and matrix over one corpus snapshot. Document ids must be
    /// unique within the snapshot.
    pub fn fit(documents: &[Document], config: IndexConfig) -> Result<Self, IndexError> {
        let mut seen = HashSet::with_capacity(documents.len());
        if let Some(dup) = documents.iter().find(|d| !seen.insert(d.id)) {
            return Err(IndexError::DuplicateDocument(dup.id));
        }
        let vocabulary = Vocabulary::fit(documents, &config)?;
        let matrix = TfIdfMatrix::build(documents, &vocabulary, &config);
        let doc_ids = documents.iter().map(|d| d.id).collect();
        tracing::info!(num_docs = documents.len(), num_terms = vocabulary.len(), "index fitted");
        Ok(Self { config, vocabulary, matrix, doc_ids })
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn matrix(&self) -> &TfIdfMatrix {
        &self.matrix
    }

    pub fn doc_ids(&self) -> &[DocId] {
        &self.doc_ids
    }

    pub fn num_docs(&self) -> usize {
        self.doc_ids.len()
    }

    /// Project a query into the fitted column space: tf over known terms times
    /// the stored idf, L2-normalized. Unknown terms contribute nothing.
    pub fn query_vector(&self, query: &str) -> SparseVector {
        let cfg = &self.config;
        let terms = tokenize(query, cfg.min_ngram, cfg.max_ngram, cfg.min_token_len);
        let entries = term_counts(&terms, &self.vocabulary)
            .into_iter()
            .map(|(col, n)| (col, n as f64 * self.matrix.idf(col).unwrap_or(0.0)))
            .collect();
        let mut v = SparseVector::from_entries(entries);
        v.normalize();
        v
    }

    /// Cosine similarity of the query against every row, in row order.
    pub fn scores(&self, query: &str) -> Vec<f64> {
        let q = self.query_vector(query);
        if q.is_zero() {
            return vec![0.0; self.matrix.num_docs()];
        }
        self.matrix.rows().par_iter().map(|row| q.dot(row)).collect()
    }

    /// The inverted index: one record per vocabulary term in column order, each
    /// listing the documents with a non-zero weight for it.
    pub fn materialize(&self) -> Vec<TermRecord> {
        let mut postings: Vec<Vec<Posting>> = vec![Vec::new(); self.vocabulary.len()];
        for (row, doc_id) in self.matrix.rows().iter().zip(&self.doc_ids) {
            for (col, weight) in row.iter() {
                if weight > 0.0 {
                    postings[col as usize].push(Posting { doc_id: *doc_id, weight: round_weight(weight, self.config.precision) });
                }
            }
        }
        self.vocabulary
            .iter()
            .zip(postings)
            .map(|((col, term), postings)| TermRecord { term_id: col + 1, term: term.to_string(), column: col, postings })
            .collect()
    }

    /// Record for a single term, or `None` when it is not in the vocabulary.
    pub fn term_record(&self, term: &str) -> Option<TermRecord> {
        let col = self.vocabulary.column(term)?;
        let postings = self
            .matrix
            .rows()
            .iter()
            .zip(&self.doc_ids)
            .filter_map(|(row, doc_id)| {
                let w = row.get(col);
                (w > 0.0).then(|| Posting { doc_id: *doc_id, weight: round_weight(w, self.config.precision) })
            })
            .collect();
        Some(TermRecord { term_id: col + 1, term: term.to_string(), column: col, postings })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<Document> {
        vec![
            Document::new(10, "apples and pears"),
            Document::new(20, "pears and plums"),
            Document::new(30, "plums plums plums"),
        ]
    }

    #[test]
    fn materialize_lists_every_nonzero_cell_once() {
        let index = Index::fit(&corpus(), IndexConfig::default()).unwrap();
        let records = index.materialize();
        assert_eq!(records.len(), index.vocabulary().len());
        let nnz: usize = index.matrix().rows().iter().map(SparseVector::nnz).sum();
        let postings: usize = records.iter().map(|r| r.postings.len()).sum();
        assert_eq!(nnz, postings);
        for (i, r) in records.iter().enumerate() {
            assert_eq!(r.column as usize, i);
            assert_eq!(r.term_id, r.column + 1);
        }
    }

    #[test]
    fn term_record_matches_materialized() {
        let index = Index::fit(&corpus(), IndexConfig::default()).unwrap();
        let all = index.materialize();
        let pears = index.term_record("pears").unwrap();
        assert_eq!(all[pears.column as usize], pears);
        let ids: Vec<DocId> = pears.postings.iter().map(|p| p.doc_id).collect();
        assert_eq!(ids, vec![10, 20]);
        assert!(index.term_record("kiwi").is_none());
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let docs = vec![Document::new(1, "alpha beta"), Document::new(1, "gamma delta")];
        assert_eq!(Index::fit(&docs, IndexConfig::default()).unwrap_err(), IndexError::DuplicateDocument(1));
    }

    #[test]
    fn query_vector_ignores_unknown_terms() {
        let index = Index::fit(&corpus(), IndexConfig::default()).unwrap();
        assert!(index.query_vector("kiwi mango").is_zero());
        let q = index.query_vector("kiwi plums");
        assert_eq!(q.nnz(), 1);
        assert!((q.norm() - 1.0).abs() < 1e-9);
    }
}
