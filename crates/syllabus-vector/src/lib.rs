//! syllabus-vector
//!
//! Dense side of retrieval: cosine ranking over a candidate subset, query
//! embedding under a deadline, and the embedding backfill used to build
//! corpus artifacts.
pub mod embed_backfill;
pub mod query_embed;
pub mod search;

pub use embed_backfill::backfill_passages;
pub use query_embed::QueryEmbedder;
pub use search::{cosine_similarity, CosineRetriever};
