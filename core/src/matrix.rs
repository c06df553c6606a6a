//! Sparse document-term matrix with TF-IDF weights.
//!
//! Rows are stored as `(column, weight)` pairs sorted by column. Lookup of a
//! single cell is a binary search, dot products are a merge join over the
//! non-zeros of both operands, so scoring a query against a row costs
//! O(nnz(query) + nnz(row)) regardless of vocabulary size.

use crate::config::round_weight;
use crate::tokenizer::tokenize;
use crate::{DocId, Document, IndexConfig, TermId, TermRecord, Vocabulary};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    entries: Vec<(TermId, f64)>,
}

impl SparseVector {
    /// Build from unordered entries; zero weights are dropped and duplicate
    /// columns summed.
    pub fn from_entries(mut entries: Vec<(TermId, f64)>) -> Self {
        entries.sort_by_key(|(col, _)| *col);
        let mut merged: Vec<(TermId, f64)> = Vec::with_capacity(entries.len());
        for (col, w) in entries {
            match merged.last_mut() {
                Some((last, acc)) if *last == col => *acc += w,
                _ => merged.push((col, w)),
            }
        }
        merged.retain(|(_, w)| *w != 0.0);
        Self { entries: merged }
    }

    pub fn get(&self, column: TermId) -> f64 {
        match self.entries.binary_search_by_key(&column, |(c, _)| *c) {
            Ok(i) => self.entries[i].1,
            Err(_) => 0.0,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (TermId, f64)> + '_ {
        self.entries.iter().copied()
    }

    pub fn nnz(&self) -> usize {
        self.entries.len()
    }

    pub fn is_zero(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn norm(&self) -> f64 {
        self.entries.iter().map(|(_, w)| w * w).sum::<f64>().sqrt()
    }

    /// Scale to unit Euclidean norm. A zero vector stays zero.
    pub fn normalize(&mut self) {
        let norm = self.norm();
        if norm == 0.0 {
            return;
        }
        for (_, w) in self.entries.iter_mut() {
            *w /= norm;
        }
    }

    pub fn dot(&self, other: &SparseVector) -> f64 {
        let (mut i, mut j) = (0, 0);
        let mut sum = 0.0;
        while i < self.entries.len() && j < other.entries.len() {
            let (ca, wa) = self.entries[i];
            let (cb, wb) = other.entries[j];
            match ca.cmp(&cb) {
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
                Ordering::Equal => {
                    sum += wa * wb;
                    i += 1;
                    j += 1;
                }
            }
        }
        sum
    }

    fn rounded(&self, precision: u32) -> SparseVector {
        SparseVector {
            entries: self.entries.iter().map(|(c, w)| (*c, round_weight(*w, precision))).collect(),
        }
    }
}

/// Raw term counts over existing vocabulary columns; unknown terms are skipped.
pub(crate) fn term_counts(terms: &[String], vocabulary: &Vocabulary) -> HashMap<TermId, u32> {
    let mut tf: HashMap<TermId, u32> = HashMap::new();
    for term in terms {
        if let Some(col) = vocabulary.column(term) {
            *tf.entry(col).or_insert(0) += 1;
        }
    }
    tf
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TfIdfMatrix {
    rows: Vec<SparseVector>,
    df: Vec<u32>,
    idf: Vec<f64>,
    num_columns: usize,
}

impl TfIdfMatrix {
    /// One L2-normalized row per document, in the order given.
    pub fn build(documents: &[Document], vocabulary: &Vocabulary, config: &IndexConfig) -> Self {
        let counts: Vec<HashMap<TermId, u32>> = documents
            .par_iter()
            .map(|d| {
                let terms = tokenize(&d.content, config.min_ngram, config.max_ngram, config.min_token_len);
                term_counts(&terms, vocabulary)
            })
            .collect();

        let num_columns = vocabulary.len();
        let mut df = vec![0u32; num_columns];
        for tf in &counts {
            for col in tf.keys() {
                df[*col as usize] += 1;
            }
        }
        let num_docs = documents.len() as u32;
        let idf: Vec<f64> = df.iter().map(|&d| config.idf.idf(num_docs, d)).collect();

        let rows: Vec<SparseVector> = counts
            .into_par_iter()
            .map(|tf| {
                let entries = tf.into_iter().map(|(col, n)| (col, n as f64 * idf[col as usize])).collect();
                let mut row = SparseVector::from_entries(entries);
                row.normalize();
                row
            })
            .collect();

        tracing::debug!(num_docs, num_columns, nnz = rows.iter().map(SparseVector::nnz).sum::<usize>(), "tf-idf matrix built");
        Self { rows, df, idf, num_columns }
    }

    /// Rebuild the (rounded) matrix from materialized term records. Rows follow
    /// `doc_ids`; postings for unknown documents are ignored.
    pub fn from_term_records(records: &[TermRecord], doc_ids: &[DocId], num_columns: usize) -> Self {
        let row_of: HashMap<DocId, usize> = doc_ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        let mut entries: Vec<Vec<(TermId, f64)>> = vec![Vec::new(); doc_ids.len()];
        let mut df = vec![0u32; num_columns];
        for record in records {
            let col = record.column;
            if let Some(slot) = df.get_mut(col as usize) {
                *slot = record.postings.len() as u32;
            }
            for posting in &record.postings {
                if let Some(&row) = row_of.get(&posting.doc_id) {
                    entries[row].push((col, posting.weight));
                }
            }
        }
        let rows = entries.into_iter().map(SparseVector::from_entries).collect();
        Self { rows, df, idf: Vec::new(), num_columns }
    }

    pub fn rows(&self) -> &[SparseVector] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&SparseVector> {
        self.rows.get(index)
    }

    pub fn num_docs(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.num_columns
    }

    pub fn idf(&self, column: TermId) -> Option<f64> {
        self.idf.get(column as usize).copied()
    }

    pub fn document_frequency(&self, column: TermId) -> Option<u32> {
        self.df.get(column as usize).copied()
    }

    /// Cell weights rounded the way they are exported. Zero cells produced by
    /// rounding are dropped, matching what `from_term_records` reads back.
    pub fn rounded(&self, precision: u32) -> Vec<SparseVector> {
        self.rows
            .iter()
            .map(|r| SparseVector::from_entries(r.rounded(precision).entries))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fit(texts: &[&str]) -> (Vocabulary, TfIdfMatrix) {
        let docs: Vec<Document> = texts.iter().enumerate().map(|(i, t)| Document::new(i as u32, *t)).collect();
        let cfg = IndexConfig::default();
        let vocab = Vocabulary::fit(&docs, &cfg).unwrap();
        let matrix = TfIdfMatrix::build(&docs, &vocab, &cfg);
        (vocab, matrix)
    }

    #[test]
    fn rows_are_unit_length() {
        let (_, m) = fit(&["red green blue", "green green", "blue sky"]);
        for row in m.rows() {
            assert!((row.norm() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn document_without_terms_has_zero_row() {
        let (_, m) = fit(&["alpha beta", "!!!"]);
        assert!(m.row(1).unwrap().is_zero());
        assert_eq!(m.row(1).unwrap().norm(), 0.0);
    }

    #[test]
    fn shared_terms_weigh_less() {
        let (vocab, m) = fit(&["common rare", "common other"]);
        let common = vocab.column("common").unwrap();
        let rare = vocab.column("rare").unwrap();
        assert_eq!(m.document_frequency(common), Some(2));
        assert_eq!(m.document_frequency(rare), Some(1));
        assert!(m.idf(common).unwrap() < m.idf(rare).unwrap());
        let row = m.row(0).unwrap();
        assert!(row.get(common) < row.get(rare));
    }

    #[test]
    fn idf_matches_smoothed_formula() {
        let (vocab, m) = fit(&["x y", "x", "z"]);
        let x = vocab.column("x").unwrap();
        let expected = (4.0f64 / 3.0).ln() + 1.0;
        assert!((m.idf(x).unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn sparse_dot_and_lookup() {
        let a = SparseVector::from_entries(vec![(5, 2.0), (1, 1.0), (3, 0.0)]);
        let b = SparseVector::from_entries(vec![(1, 3.0), (5, 0.5), (7, 9.0)]);
        assert_eq!(a.nnz(), 2);
        assert_eq!(a.get(5), 2.0);
        assert_eq!(a.get(3), 0.0);
        assert_eq!(a.dot(&b), 4.0);
    }
}
