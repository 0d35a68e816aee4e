//! syllabus-core
//!
//! Domain types, configuration, the immutable corpus index and the two
//! pre-retrieval stages of a query: category classification and metadata
//! filtering.

pub mod classifier;
pub mod config;
pub mod corpus;
pub mod data_processor;
pub mod error;
pub mod filter;
pub mod metadata;
pub mod traits;
pub mod types;

pub use classifier::CategoryClassifier;
pub use corpus::{CorpusHandle, CorpusIndex};
pub use error::{Error, Result};
pub use filter::{CandidateSet, FilterScope, MetadataFilter};
