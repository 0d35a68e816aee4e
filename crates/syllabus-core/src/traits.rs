use crate::types::{Passage, RetrievalResult};

pub trait Embedder: Send + Sync {
    /// Stable identifier for the model (e.g. `local:bge-m3:d1024`), recorded in corpus artifacts.
    fn embedder_id(&self) -> &str;
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Lexical normalization shared by ingestion (postings) and query time (tokens).
pub trait Analyzer: Send + Sync {
    fn tokens(&self, text: &str) -> Vec<String>;
}

/// Keyword ranking over a candidate subset. `candidates` is in corpus insertion order.
pub trait SparseRetriever: Send + Sync {
    fn search(&self, query_tokens: &[String], candidates: &[&Passage], k: usize) -> Vec<RetrievalResult>;
}

/// Vector-similarity ranking over a candidate subset. `candidates` is in corpus insertion order.
pub trait DenseRetriever: Send + Sync {
    fn search_vec(&self, query_vec: &[f32], candidates: &[&Passage], k: usize) -> crate::error::Result<Vec<RetrievalResult>>;
}
