use crate::{DocId, Document, Index};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedDocument {
    pub doc_id: DocId,
    pub content: String,
    pub score: f64,
}

/// Rank every document against `query` by cosine similarity, best first.
///
/// `documents` must be the corpus the index was fitted on, in the same order.
/// Equal scores keep corpus order, so a query with no known terms returns the
/// corpus unchanged with all scores at 0.0.
pub fn rank(query: &str, index: &Index, documents: &[Document]) -> Vec<RankedDocument> {
    let scores = index.scores(query);
    if scores.len() != documents.len() {
        tracing::warn!(rows = scores.len(), documents = documents.len(), "documents do not match the fitted index");
    }
    let mut ranked: Vec<RankedDocument> = documents
        .iter()
        .zip(scores)
        .map(|(doc, score)| RankedDocument { doc_id: doc.id, content: doc.content.clone(), score })
        .collect();
    // stable
    ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    tracing::debug!(query, hits = ranked.iter().filter(|r| r.score > 0.0).count(), "ranked");
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::IndexConfig;

    fn corpus() -> Vec<Document> {
        vec![
            Document::new(1, "the quick brown fox"),
            Document::new(2, "the lazy dog"),
            Document::new(3, "quick quick fox jumps"),
        ]
    }

    #[test]
    fn best_match_first() {
        let docs = corpus();
        let index = Index::fit(&docs, IndexConfig::default()).unwrap();
        let ranked = rank("lazy dog", &index, &docs);
        assert_eq!(ranked[0].doc_id, 2);
        assert!(ranked[0].score > 0.5);
        assert_eq!(ranked.len(), 3);
    }

    #[test]
    fn unknown_query_keeps_corpus_order() {
        let docs = corpus();
        let index = Index::fit(&docs, IndexConfig::default()).unwrap();
        let ranked = rank("zebra", &index, &docs);
        let ids: Vec<DocId> = ranked.iter().map(|r| r.doc_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(ranked.iter().all(|r| r.score == 0.0));
    }

    #[test]
    fn ties_keep_corpus_order() {
        let docs = vec![Document::new(7, "same text"), Document::new(8, "same text"), Document::new(9, "other")];
        let index = Index::fit(&docs, IndexConfig::default()).unwrap();
        let ranked = rank("same", &index, &docs);
        let ids: Vec<DocId> = ranked.iter().map(|r| r.doc_id).collect();
        assert_eq!(ids, vec![7, 8, 9]);
        assert_eq!(ranked[0].score, ranked[1].score);
    }
}
