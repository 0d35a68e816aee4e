//! Weighted fusion of the dense and sparse rankings.
//!
//! Raw cosine similarities and BM25 scores live on unrelated scales, so each
//! list is first normalized to [0, 1] on its own (min-max or rank based) and
//! only then combined with the configured weights.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use syllabus_core::config::{Normalization, RetrievalConfig};
use syllabus_core::types::{Origin, PassageId, RetrievalResult};

/// `(s - min) / (max - min)`; a list whose scores are all equal maps to 1.0.
pub fn min_max_normalize(scores: &[f32]) -> Vec<f32> {
    let (min, max) = scores.iter().fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &s| (lo.min(s), hi.max(s)));
    let span = max - min;
    if !span.is_finite() || span <= f32::EPSILON {
        return vec![1.0; scores.len()];
    }
    scores.iter().map(|s| ((s - min) / span).clamp(0.0, 1.0)).collect()
}

/// `1 - rank / len` with 0-based ranks: the head of the list gets 1.0.
pub fn rank_normalize(len: usize) -> Vec<f32> {
    (0..len).map(|rank| 1.0 - rank as f32 / len as f32).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusionConfig {
    pub dense_weight: f32,
    pub sparse_weight: f32,
    pub final_cap: usize,
    pub normalization: Normalization,
}

impl Default for FusionConfig {
    fn default() -> Self { Self::from(&RetrievalConfig::default()) }
}

impl From<&RetrievalConfig> for FusionConfig {
    fn from(c: &RetrievalConfig) -> Self {
        Self { dense_weight: c.dense_weight, sparse_weight: c.sparse_weight, final_cap: c.final_cap, normalization: c.normalization }
    }
}

/// One merged candidate with the provenance needed for ordering and attribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedResult {
    pub passage_id: PassageId,
    pub score: f32,
    pub origin: Origin,
    pub dense_rank: Option<usize>,
    pub sparse_rank: Option<usize>,
    pub dense_score: Option<f32>,
    pub sparse_score: Option<f32>,
}

impl FusedResult {
    pub fn as_retrieval_result(&self) -> RetrievalResult {
        RetrievalResult { passage_id: self.passage_id.clone(), score: self.score, origin: self.origin }
    }
}

/// Absent ranks sort after every present rank.
fn rank_key(rank: Option<usize>) -> usize { rank.unwrap_or(usize::MAX) }

fn fused_order(a: &FusedResult, b: &FusedResult) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| rank_key(a.dense_rank).cmp(&rank_key(b.dense_rank)))
        .then_with(|| rank_key(a.sparse_rank).cmp(&rank_key(b.sparse_rank)))
        .then_with(|| a.passage_id.cmp(&b.passage_id))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HybridMerger {
    config: FusionConfig,
}

impl HybridMerger {
    pub fn new(config: FusionConfig) -> Self { Self { config } }

    pub fn config(&self) -> &FusionConfig { &self.config }

    fn normalized(&self, list: &[RetrievalResult]) -> Vec<f32> {
        match self.config.normalization {
            Normalization::MinMax => min_max_normalize(&list.iter().map(|r| r.score).collect::<Vec<_>>()),
            Normalization::Rank => rank_normalize(list.len()),
        }
    }

    /// Fuse two ranked lists into one deduplicated list, best first, at most `final_cap` long.
    /// Within each input only the first entry of a passage counts.
    pub fn merge(&self, dense: &[RetrievalResult], sparse: &[RetrievalResult]) -> Vec<FusedResult> {
        let mut by_id: HashMap<&str, FusedResult> = HashMap::new();

        for (rank, (hit, norm)) in dense.iter().zip(self.normalized(dense)).enumerate() {
            by_id.entry(hit.passage_id.as_str()).or_insert_with(|| FusedResult {
                passage_id: hit.passage_id.clone(),
                score: norm * self.config.dense_weight,
                origin: Origin::Dense,
                dense_rank: Some(rank),
                sparse_rank: None,
                dense_score: Some(hit.score),
                sparse_score: None,
            });
        }

        for (rank, (hit, norm)) in sparse.iter().zip(self.normalized(sparse)).enumerate() {
            let contribution = norm * self.config.sparse_weight;
            match by_id.get_mut(hit.passage_id.as_str()) {
                Some(existing) if existing.sparse_rank.is_some() => {}
                Some(existing) => {
                    existing.score += contribution;
                    existing.origin = Origin::Both;
                    existing.sparse_rank = Some(rank);
                    existing.sparse_score = Some(hit.score);
                }
                None => {
                    by_id.insert(
                        hit.passage_id.as_str(),
                        FusedResult {
                            passage_id: hit.passage_id.clone(),
                            score: contribution,
                            origin: Origin::Sparse,
                            dense_rank: None,
                            sparse_rank: Some(rank),
                            dense_score: None,
                            sparse_score: Some(hit.score),
                        },
                    );
                }
            }
        }

        let mut merged: Vec<FusedResult> = by_id.into_values().collect();
        merged.sort_by(fused_order);
        merged.truncate(self.config.final_cap);
        merged
    }
}
