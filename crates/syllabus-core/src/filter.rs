//! Category-based narrowing of the candidate set, optionally tightened to the
//! course a query names.

use serde::{Deserialize, Serialize};

use crate::corpus::CorpusIndex;
use crate::types::{Category, Passage};

/// Which candidate set the retrievers actually ran against.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "scope")]
pub enum FilterScope {
    Category { category: Category },
    /// The query category was `unknown`.
    UnfilteredUnknown,
    /// The category matched fewer passages than the configured minimum.
    UnfilteredBelowThreshold { category: Category, matched: usize },
}

impl FilterScope {
    pub fn is_filtered(&self) -> bool { matches!(self, Self::Category { .. }) }
}

#[derive(Debug, Clone)]
pub struct CandidateSet<'a> {
    pub passages: Vec<&'a Passage>,
    pub scope: FilterScope,
    /// Course code the category subset was further narrowed to.
    pub course: Option<String>,
}

impl CandidateSet<'_> {
    pub fn len(&self) -> usize { self.passages.len() }
    pub fn is_empty(&self) -> bool { self.passages.is_empty() }
}

#[derive(Debug, Clone, Copy)]
pub struct MetadataFilter {
    min_filtered_passages: usize,
}

impl MetadataFilter {
    pub fn new(min_filtered_passages: usize) -> Self { Self { min_filtered_passages } }

    /// Either exactly the passages tagged `category` or the whole corpus, both in insertion order.
    pub fn apply<'a>(&self, category: Category, corpus: &'a CorpusIndex) -> CandidateSet<'a> {
        let all = || corpus.passages().iter().collect::<Vec<_>>();
        if category.is_unknown() {
            return CandidateSet { passages: all(), scope: FilterScope::UnfilteredUnknown, course: None };
        }
        let matched: Vec<&Passage> = corpus.passages().iter().filter(|p| p.category == category).collect();
        if matched.len() < self.min_filtered_passages.max(1) {
            tracing::warn!(%category, matched = matched.len(), min = self.min_filtered_passages, "category filter too narrow, searching whole corpus");
            return CandidateSet {
                passages: all(),
                scope: FilterScope::UnfilteredBelowThreshold { category, matched: matched.len() },
                course: None,
            };
        }
        tracing::debug!(%category, matched = matched.len(), total = corpus.len(), "category filter applied");
        CandidateSet { passages: matched, scope: FilterScope::Category { category }, course: None }
    }

    /// [`apply`](Self::apply), then keep only the passages about `course_code`
    /// inside the category subset. Narrowing that would leave fewer than the
    /// minimum passages is skipped and the category subset stands. Whole-corpus
    /// scopes are never narrowed.
    pub fn apply_with_course<'a>(&self, category: Category, course_code: Option<&str>, corpus: &'a CorpusIndex) -> CandidateSet<'a> {
        let mut set = self.apply(category, corpus);
        let Some(code) = course_code else { return set };
        if !set.scope.is_filtered() { return set; }
        let narrowed: Vec<&Passage> = set.passages.iter().copied().filter(|p| p.course_code.as_deref() == Some(code)).collect();
        if narrowed.len() < self.min_filtered_passages.max(1) {
            tracing::debug!(%category, course = code, matched = narrowed.len(), "course filter too narrow, keeping category subset");
            return set;
        }
        tracing::debug!(%category, course = code, matched = narrowed.len(), "course filter applied");
        set.passages = narrowed;
        set.course = Some(code.to_string());
        set
    }
}
