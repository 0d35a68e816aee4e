//! syllabus-embed
//!
//! Embedding models behind [`syllabus_core::traits::Embedder`]: the local
//! BGE-M3 model (candle) and a deterministic hashing embedder for tests and
//! offline development (`APP_USE_FAKE_EMBEDDINGS=1`).
use anyhow::Result;
use std::sync::Arc;

use syllabus_core::traits::Embedder;

pub mod device;
pub mod hashing;
pub mod local;
pub mod pool;
pub mod tokenize;

pub use hashing::HashingEmbedder;
pub use local::{LocalEmbedder, resolve_model_dir};
pub use pool::masked_mean_l2;

pub const DEFAULT_DIM: usize = 1024;
pub const DEFAULT_MAX_LEN: usize = 256;

pub fn use_fake_embeddings() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS").ok().is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

pub fn get_default_embedder() -> Result<Arc<dyn Embedder>> {
    if use_fake_embeddings() {
        tracing::info!("using hashing embedder");
        return Ok(Arc::new(HashingEmbedder::new(DEFAULT_DIM)));
    }
    let model_dir = resolve_model_dir()?;
    Ok(Arc::new(LocalEmbedder::load(&model_dir, DEFAULT_MAX_LEN)?))
}
