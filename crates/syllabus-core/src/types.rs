//! Domain types shared by the classifier, the retrievers and the merger.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

pub type PassageId = String;
pub type Postings = HashMap<String, u32>;

/// Coarse topical label attached to passages at ingestion and to queries at
/// classification time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    GeneralInfo,
    CoursePrerequisites,
    ProgramDescription,
    TrainingRules,
    Unknown,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::GeneralInfo,
        Category::CoursePrerequisites,
        Category::ProgramDescription,
        Category::TrainingRules,
        Category::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GeneralInfo => "general_info",
            Self::CoursePrerequisites => "course_prerequisites",
            Self::ProgramDescription => "program_description",
            Self::TrainingRules => "training_rules",
            Self::Unknown => "unknown",
        }
    }

    pub fn is_unknown(&self) -> bool { matches!(self, Self::Unknown) }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Category {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| crate::error::Error::InvalidConfig(format!("unknown category '{s}'")))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TrainingType {
    IndustrialTraining,
    SummerTraining,
}

/// Course details pulled from a passage's own text at ingestion.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PassageMeta {
    pub course_title: Option<String>,
    pub credits: Option<u32>,
    /// Course codes listed after a `Prerequisites:` label.
    pub prerequisites: Vec<String>,
    pub training_type: Option<TrainingType>,
}

/// A unit of retrievable text with its page and category metadata.
///
/// - `id`: unique within a corpus
/// - `page`: 1-based handbook page the text was taken from
/// - `source`: file the page was loaded from, used for attribution
/// - `embedding`: dense vector, same dimension for every passage of a corpus
/// - `term_postings`: normalized token -> frequency inside `text`
/// - `course_code`: first course code mentioned in the text, upper-cased
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Passage {
    pub id: PassageId,
    pub text: String,
    pub page: u32,
    pub category: Category,
    pub source: String,
    pub embedding: Vec<f32>,
    pub term_postings: Postings,
    pub course_code: Option<String>,
    #[serde(default)]
    pub meta: PassageMeta,
}

impl Passage {
    /// Document length used by BM25: total token count after normalization.
    pub fn token_len(&self) -> u32 { self.term_postings.values().sum() }
}

/// Which retriever produced a result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Dense,
    Sparse,
    Both,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Dense => "dense",
            Self::Sparse => "sparse",
            Self::Both => "both",
        })
    }
}

/// The minimal surface returned by both retrievers and by the merger.
///
/// `score` is retriever-specific before fusion (cosine similarity or BM25)
/// and the combined weighted score after it. Higher is always better.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievalResult {
    pub passage_id: PassageId,
    pub score: f32,
    pub origin: Origin,
}

/// Signal strength of a classification. Not a calibrated probability.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    None,
    Moderate,
    Strong,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Classification {
    pub category: Category,
    pub confidence: Confidence,
}

impl Classification {
    pub fn unknown() -> Self { Self { category: Category::Unknown, confidence: Confidence::None } }
}

/// Per-query state, built once and passed through every stage.
///
/// `embedding` is filled in by the engine once the embedder answers, so it
/// stays `None` only when the embedding step failed or was skipped. A context
/// that already carries one is retrieved without calling the embedder again.
#[derive(Debug, Clone)]
pub struct QueryContext {
    pub raw_text: String,
    pub normalized_text: String,
    pub tokens: Vec<String>,
    pub classification: Classification,
    pub course_code: Option<String>,
    pub embedding: Option<Vec<f32>>,
}

impl QueryContext {
    pub fn category(&self) -> Category { self.classification.category }
    pub fn has_signal(&self) -> bool { !self.tokens.is_empty() }
}
