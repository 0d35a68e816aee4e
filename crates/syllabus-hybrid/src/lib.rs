//! syllabus-hybrid
//!
//! The query pipeline: classify, filter, run dense and sparse retrieval
//! concurrently, fuse, and package the result for answer generation.
pub mod context;
pub mod engine;
pub mod fusion;

pub use context::{PromptAssembler, PromptContext};
pub use engine::{Degradation, HybridSearchEngine, RankedPassage, RetrievalOutcome, Signal};
pub use fusion::{FusedResult, FusionConfig, HybridMerger};
