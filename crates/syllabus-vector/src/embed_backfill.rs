//! Turns ingestion drafts into finished passages: embeddings in batches with
//! a content-hash cache so repeated boilerplate paragraphs are embedded once,
//! and postings from the shared analyzer.
use anyhow::{Result, anyhow};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;

use syllabus_core::data_processor::PassageDraft;
use syllabus_core::traits::{Analyzer, Embedder};
use syllabus_core::types::Passage;

fn hash_content(s: &str) -> String { blake3::hash(s.as_bytes()).to_hex().to_string() }

pub fn backfill_passages(
    drafts: Vec<PassageDraft>,
    embedder: &dyn Embedder,
    analyzer: &dyn Analyzer,
    batch_size: usize,
    show_progress: bool,
) -> Result<Vec<Passage>> {
    if drafts.is_empty() { return Ok(vec![]); }
    let pb = if show_progress { ProgressBar::new(drafts.len() as u64) } else { ProgressBar::hidden() };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} passages ({percent}%) {msg}")?
            .progress_chars("#>-"),
    );

    let mut cache: HashMap<String, Vec<f32>> = HashMap::new();
    let mut passages = Vec::with_capacity(drafts.len());
    for batch in drafts.chunks(batch_size.max(1)) {
        let hashes: Vec<String> = batch.iter().map(|d| hash_content(&d.text)).collect();
        let mut misses: Vec<String> = Vec::new();
        let mut miss_hashes: Vec<&str> = Vec::new();
        for (draft, h) in batch.iter().zip(&hashes) {
            if !cache.contains_key(h) && !miss_hashes.contains(&h.as_str()) {
                misses.push(draft.text.clone());
                miss_hashes.push(h);
            }
        }
        if !misses.is_empty() {
            let embs = embedder.embed_batch(&misses)?;
            if embs.len() != misses.len() { return Err(anyhow!("embedder returned {} vectors for {} texts", embs.len(), misses.len())); }
            for (h, v) in miss_hashes.iter().zip(embs) {
                if v.len() != embedder.dim() { return Err(anyhow!("dim mismatch: got {} expected {}", v.len(), embedder.dim())); }
                cache.insert((*h).to_string(), v);
            }
        }
        for (draft, h) in batch.iter().zip(&hashes) {
            let embedding = cache.get(h).cloned().ok_or_else(|| anyhow!("missing embedding for {}", draft.id))?;
            passages.push(Passage {
                id: draft.id.clone(),
                text: draft.text.clone(),
                page: draft.page,
                category: draft.category,
                source: draft.source.clone(),
                term_postings: postings(analyzer, &draft.text),
                embedding,
                course_code: draft.course_code.clone(),
                meta: draft.meta.clone(),
            });
        }
        pb.inc(batch.len() as u64);
    }
    pb.finish_with_message("embedded");
    tracing::info!(passages = passages.len(), unique_texts = cache.len(), embedder = embedder.embedder_id(), "backfill complete");
    Ok(passages)
}

fn postings(analyzer: &dyn Analyzer, text: &str) -> syllabus_core::types::Postings {
    let mut out = syllabus_core::types::Postings::new();
    for token in analyzer.tokens(text) { *out.entry(token).or_insert(0) += 1; }
    out
}
