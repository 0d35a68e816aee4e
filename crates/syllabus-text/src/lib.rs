//! syllabus-text
//!
//! Lexical side of retrieval: the tantivy analyzer chain that normalizes
//! handbook text and queries, and the BM25 sparse retriever.
pub mod analyzer;
pub mod bm25;

pub use analyzer::HandbookAnalyzer;
pub use bm25::Bm25Retriever;
