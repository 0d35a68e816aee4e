use std::collections::HashMap;

use syllabus_core::traits::SparseRetriever;
use syllabus_core::types::{Origin, Passage, RetrievalResult};

/// Okapi BM25 over whatever candidate subset it is handed. Document
/// frequencies and the average length are computed from that subset, so a
/// category filter changes the term weights as well as the candidates.
#[derive(Debug, Clone, Copy)]
pub struct Bm25Retriever {
	k1: f32,
	b: f32,
}

impl Default for Bm25Retriever {
	fn default() -> Self { Self { k1: 1.2, b: 0.75 } }
}

impl Bm25Retriever {
	pub fn new(k1: f32, b: f32) -> Self { Self { k1, b } }

	fn idf(n: usize, df: usize) -> f32 {
		let (n, df) = (n as f32, df as f32);
		(1.0 + (n - df + 0.5) / (df + 0.5)).ln()
	}

	/// BM25 score of every candidate, in candidate order; `None` when no query term occurs.
	pub fn score_all(&self, query_terms: &[String], candidates: &[&Passage]) -> Vec<Option<f32>> {
		if query_terms.is_empty() || candidates.is_empty() { return vec![None; candidates.len()]; }
		let n = candidates.len();
		let total_len: u64 = candidates.iter().map(|p| u64::from(p.token_len())).sum();
		let avgdl = (total_len as f32 / n as f32).max(1.0);
		let idf: HashMap<&str, f32> = query_terms
			.iter()
			.map(|t| {
				let df = candidates.iter().filter(|p| p.term_postings.contains_key(t)).count();
				(t.as_str(), Self::idf(n, df))
			})
			.collect();

		candidates
			.iter()
			.map(|p| {
				let dl = p.token_len() as f32;
				let norm = self.k1 * (1.0 - self.b + self.b * dl / avgdl);
				let mut matched = false;
				let mut score = 0.0f32;
				for term in query_terms {
					let Some(&tf) = p.term_postings.get(term) else { continue };
					if tf == 0 { continue; }
					matched = true;
					let tf = tf as f32;
					score += idf[term.as_str()] * tf * (self.k1 + 1.0) / (tf + norm);
				}
				matched.then_some(score)
			})
			.collect()
	}
}

impl SparseRetriever for Bm25Retriever {
	fn search(&self, query_terms: &[String], candidates: &[&Passage], k: usize) -> Vec<RetrievalResult> {
		let scores = self.score_all(query_terms, candidates);
		let mut hits: Vec<RetrievalResult> = candidates
			.iter()
			.zip(scores)
			.filter_map(|(p, s)| s.map(|score| RetrievalResult { passage_id: p.id.clone(), score, origin: Origin::Sparse }))
			.collect();
		// stable: equal scores keep candidate (insertion) order
		hits.sort_by(|a, b| b.score.total_cmp(&a.score));
		hits.truncate(k);
		tracing::debug!(terms = query_terms.len(), candidates = candidates.len(), hits = hits.len(), "bm25 search");
		hits
	}
}
