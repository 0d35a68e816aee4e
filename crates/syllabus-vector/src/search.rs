use syllabus_core::error::{Error, Result};
use syllabus_core::traits::DenseRetriever;
use syllabus_core::types::{Origin, Passage, RetrievalResult};

/// Cosine similarity; 0.0 when either vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let (mut dot, mut na, mut nb) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 { return 0.0; }
    dot / (na.sqrt() * nb.sqrt())
}

/// Exact nearest-neighbour scan over the candidate subset. The handbook
/// corpus is a few hundred passages, so a brute-force pass is cheaper than
/// maintaining an ANN structure per category.
///
/// Passages with a similarity of zero or below share nothing with the query
/// and are left out, mirroring the zero-overlap rule of the sparse side.
#[derive(Debug, Default, Clone, Copy)]
pub struct CosineRetriever;

impl DenseRetriever for CosineRetriever {
    fn search_vec(&self, query_vec: &[f32], candidates: &[&Passage], k: usize) -> Result<Vec<RetrievalResult>> {
        if query_vec.is_empty() {
            return Err(Error::RetrievalUnavailable("query embedding is empty".into()));
        }
        if let Some(p) = candidates.iter().find(|p| p.embedding.len() != query_vec.len()) {
            return Err(Error::RetrievalUnavailable(format!(
                "query embedding has {} dims, passage '{}' has {}",
                query_vec.len(),
                p.id,
                p.embedding.len()
            )));
        }
        let mut hits: Vec<RetrievalResult> = candidates
            .iter()
            .map(|p| RetrievalResult { passage_id: p.id.clone(), score: cosine_similarity(query_vec, &p.embedding), origin: Origin::Dense })
            .filter(|hit| hit.score > 0.0)
            .collect();
        // stable: equal similarity keeps insertion order
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(k);
        tracing::debug!(candidates = candidates.len(), hits = hits.len(), "dense search");
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syllabus_core::types::{Category, Postings};

    fn passage(id: &str, embedding: Vec<f32>) -> Passage {
        Passage {
            id: id.into(),
            text: id.into(),
            page: 1,
            category: Category::GeneralInfo,
            source: String::new(),
            embedding,
            term_postings: Postings::new(),
            course_code: None,
            meta: Default::default(),
        }
    }

    #[test]
    fn cosine_basics() {
        assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 3.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn ranks_by_similarity_with_stable_ties() {
        let docs = vec![
            passage("a", vec![0.0, 1.0]),
            passage("b", vec![1.0, 0.0]),
            passage("c", vec![1.0, 1.0]),
            passage("d", vec![2.0, 0.0]),
        ];
        let refs: Vec<&Passage> = docs.iter().collect();
        let hits = CosineRetriever.search_vec(&[1.0, 0.0], &refs, 3).expect("search");
        let ids: Vec<&str> = hits.iter().map(|h| h.passage_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "d", "c"]);
        assert!(hits.iter().all(|h| h.origin == Origin::Dense));
    }

    #[test]
    fn fewer_candidates_than_k_returns_all() {
        let docs = vec![passage("a", vec![1.0])];
        let refs: Vec<&Passage> = docs.iter().collect();
        assert_eq!(CosineRetriever.search_vec(&[1.0], &refs, 8).expect("search").len(), 1);
        assert!(CosineRetriever.search_vec(&[1.0], &[], 8).expect("search").is_empty());
    }

    #[test]
    fn unrelated_passages_are_not_hits() {
        let docs = vec![passage("a", vec![1.0, 0.0, 0.0]), passage("b", vec![0.0, 1.0, 0.0]), passage("c", vec![0.0, -1.0, 1.0])];
        let refs: Vec<&Passage> = docs.iter().collect();
        assert!(CosineRetriever.search_vec(&[0.0, 0.0, 1.0], &refs[..2], 8).expect("search").is_empty());

        let hits = CosineRetriever.search_vec(&[0.0, 1.0, 0.0], &refs, 8).expect("search");
        let ids: Vec<&str> = hits.iter().map(|h| h.passage_id.as_str()).collect();
        assert_eq!(ids, vec!["b"], "orthogonal and opposed passages are dropped");
    }

    #[test]
    fn dimension_mismatch_is_unavailable() {
        let docs = vec![passage("a", vec![1.0, 0.0])];
        let refs: Vec<&Passage> = docs.iter().collect();
        assert!(matches!(CosineRetriever.search_vec(&[1.0, 0.0, 0.0], &refs, 1), Err(Error::RetrievalUnavailable(_))));
        assert!(matches!(CosineRetriever.search_vec(&[], &refs, 1), Err(Error::RetrievalUnavailable(_))));
    }
}
