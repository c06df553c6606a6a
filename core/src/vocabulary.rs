//! N-gram vocabulary with deterministic column assignment.
//!
//! Columns are handed out in order of first appearance: documents in corpus
//! order, terms in position order within each document. Term extraction runs
//! in parallel per document; the column assignment is a sequential merge so
//! two fits over the same corpus always agree.

use crate::tokenizer::{tokenize, words};
use crate::{Document, IndexConfig, IndexError, TermId};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vocabulary {
    terms: Vec<String>,
    columns: HashMap<String, TermId>,
}

impl Vocabulary {
    pub fn fit(documents: &[Document], config: &IndexConfig) -> Result<Self, IndexError> {
        config.validate()?;
        if documents.is_empty() {
            return Err(IndexError::EmptyCorpus);
        }
        if documents.iter().all(|d| words(&d.content, 1).is_empty()) {
            return Err(IndexError::EmptyCorpus);
        }

        let per_doc: Vec<Vec<String>> = documents
            .par_iter()
            .map(|d| tokenize(&d.content, config.min_ngram, config.max_ngram, config.min_token_len))
            .collect();

        let mut vocab = Vocabulary::default();
        for terms in per_doc {
            for term in terms {
                vocab.insert(term);
            }
        }
        if vocab.is_empty() {
            return Err(IndexError::EmptyVocabulary);
        }
        tracing::debug!(num_terms = vocab.len(), "vocabulary fitted");
        Ok(vocab)
    }

    /// Rebuild from terms listed in column order.
    pub fn from_terms<I: IntoIterator<Item = String>>(terms: I) -> Self {
        let mut vocab = Vocabulary::default();
        for term in terms {
            vocab.insert(term);
        }
        vocab
    }

    fn insert(&mut self, term: String) -> TermId {
        if let Some(&col) = self.columns.get(&term) {
            return col;
        }
        let col = self.terms.len() as TermId;
        self.columns.insert(term.clone(), col);
        self.terms.push(term);
        col
    }

    pub fn column(&self, term: &str) -> Option<TermId> {
        self.columns.get(term).copied()
    }

    pub fn term(&self, column: TermId) -> Option<&str> {
        self.terms.get(column as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// `(column, term)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (TermId, &str)> + '_ {
        self.terms.iter().enumerate().map(|(i, t)| (i as TermId, t.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs(texts: &[&str]) -> Vec<Document> {
        texts.iter().enumerate().map(|(i, t)| Document::new(i as u32 + 1, *t)).collect()
    }

    #[test]
    fn assigns_columns_in_first_seen_order() {
        let vocab = Vocabulary::fit(&docs(&["the cat", "a cat sat"]), &IndexConfig::default()).unwrap();
        let order: Vec<&str> = vocab.iter().map(|(_, t)| t).collect();
        assert_eq!(order, vec!["the", "the cat", "cat", "a", "a cat", "a cat sat", "cat sat", "sat"]);
        assert_eq!(vocab.column("cat"), Some(2));
        assert_eq!(vocab.term(3), Some("a"));
        assert_eq!(vocab.column("dog"), None);
    }

    #[test]
    fn fit_is_deterministic() {
        let corpus = docs(&["one two three four", "four three two one", "two two two"]);
        let a = Vocabulary::fit(&corpus, &IndexConfig::default()).unwrap();
        let b = Vocabulary::fit(&corpus, &IndexConfig::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn empty_corpus_is_rejected() {
        let cfg = IndexConfig::default();
        assert_eq!(Vocabulary::fit(&[], &cfg), Err(IndexError::EmptyCorpus));
        assert_eq!(Vocabulary::fit(&docs(&["", "?!", "   "]), &cfg), Err(IndexError::EmptyCorpus));
    }

    #[test]
    fn no_ngrams_in_range_is_empty_vocabulary() {
        let cfg = IndexConfig { min_ngram: 3, max_ngram: 3, ..Default::default() };
        assert_eq!(Vocabulary::fit(&docs(&["two words", "one"]), &cfg), Err(IndexError::EmptyVocabulary));
    }
}
