//! Context block handed to the answer-generation step.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use syllabus_core::types::Category;

use crate::engine::{Degradation, RetrievalOutcome, Signal};

const PROGRAM_DESCRIPTION: &str = "You are a course syllabus expert. Answer using ONLY the context provided. \
Focus on course descriptions, content, learning objectives and syllabus details. \
Include specific course codes and detailed descriptions when available.";

const COURSE_PREREQUISITES: &str = "You are an academic requirements expert. Answer using ONLY the context provided. \
Focus on course names, course codes, prerequisites and course relationships. \
List prerequisites clearly and include course codes when available.";

const GENERAL_INFO: &str = "You are a program information expert. Answer using ONLY the context provided. \
Focus on mission, vision, general program information and institutional details.";

const TRAINING_RULES: &str = "You are a training and internship expert. Answer using ONLY the context provided. \
Focus on industrial training rules, summer training requirements and internship procedures. \
Clearly distinguish between industrial training and summer training requirements.";

/// Instruction preamble for a category; `unknown` shares the general one.
pub fn instructions_for(category: Category) -> &'static str {
    match category {
        Category::ProgramDescription => PROGRAM_DESCRIPTION,
        Category::CoursePrerequisites => COURSE_PREREQUISITES,
        Category::TrainingRules => TRAINING_RULES,
        Category::GeneralInfo | Category::Unknown => GENERAL_INFO,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromptContext {
    pub category: Category,
    pub instructions: String,
    pub context: String,
    pub source_pages: Vec<u32>,
    /// True when no passage backs the context; the generator should say so.
    pub insufficient: bool,
}

#[derive(Debug, Clone, Default)]
pub struct PromptAssembler {
    max_chars_per_passage: Option<usize>,
}

impl PromptAssembler {
    pub fn new() -> Self { Self::default() }

    /// Cut each passage body to `limit` characters (on a char boundary).
    pub fn with_passage_limit(mut self, limit: usize) -> Self {
        self.max_chars_per_passage = Some(limit);
        self
    }

    pub fn assemble(&self, outcome: &RetrievalOutcome) -> PromptContext {
        let category = outcome.category();
        let mut context = String::new();
        let _ = writeln!(context, "Category: {category}");
        for d in &outcome.degradations {
            match d {
                Degradation::DenseUnavailable { reason } => {
                    let _ = writeln!(context, "Note: keyword-only retrieval ({reason})");
                }
            }
        }

        let insufficient = outcome.passages.is_empty();
        if insufficient {
            let why = match outcome.signal {
                Signal::NoSignal => "the question contained no searchable terms",
                _ => "no handbook passage matched the question",
            };
            let _ = writeln!(context, "\nInsufficient information: {why}.");
        }

        for (i, p) in outcome.passages.iter().enumerate() {
            let _ = write!(context, "\n[{}] Source: {} | Page {}", i + 1, p.source, p.page);
            if let Some(code) = &p.course_code {
                let _ = write!(context, " | {code}");
            }
            let _ = writeln!(context, " | origin={} score={:.3}", p.origin, p.score);
            let _ = writeln!(context, "{}", self.body(&p.text));
        }

        PromptContext {
            category,
            instructions: instructions_for(category).to_string(),
            context,
            source_pages: outcome.source_pages(),
            insufficient,
        }
    }

    fn body<'a>(&self, text: &'a str) -> &'a str {
        match self.max_chars_per_passage {
            Some(limit) => text.char_indices().nth(limit).map_or(text, |(idx, _)| &text[..idx]),
            None => text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RankedPassage;
    use syllabus_core::filter::FilterScope;
    use syllabus_core::types::{Classification, Confidence, Origin};

    fn outcome(passages: Vec<RankedPassage>, signal: Signal) -> RetrievalOutcome {
        RetrievalOutcome {
            query: "q".into(),
            classification: Classification { category: Category::CoursePrerequisites, confidence: Confidence::Strong },
            course_code: Some("MDPS476".into()),
            scope: FilterScope::Category { category: Category::CoursePrerequisites },
            course_filter: None,
            signal,
            degradations: vec![],
            passages,
            corpus_version: "v".into(),
        }
    }

    fn ranked(id: &str, page: u32, text: &str) -> RankedPassage {
        RankedPassage {
            passage_id: id.into(),
            text: text.into(),
            page,
            category: Category::CoursePrerequisites,
            source: format!("page_{page:03}.txt"),
            course_code: Some("MDPS476".into()),
            meta: Default::default(),
            origin: Origin::Both,
            score: 1.0,
            dense_score: Some(0.9),
            sparse_score: Some(2.1),
        }
    }

    #[test]
    fn lists_passages_with_attribution() {
        let out = outcome(vec![ranked("a", 12, "MDPS476 requires MDPS301."), ranked("b", 9, "Other."), ranked("c", 12, "More.")], Signal::Matched);
        let ctx = PromptAssembler::new().assemble(&out);
        assert!(ctx.context.starts_with("Category: course_prerequisites\n"));
        assert!(ctx.context.contains("[1] Source: page_012.txt | Page 12 | MDPS476 | origin=both score=1.000\nMDPS476 requires MDPS301."));
        assert!(ctx.context.contains("[3] Source: page_012.txt"));
        assert_eq!(ctx.source_pages, vec![9, 12]);
        assert!(!ctx.insufficient);
        assert!(ctx.instructions.contains("prerequisites"));
    }

    #[test]
    fn empty_outcome_is_insufficient() {
        let mut out = outcome(vec![], Signal::NoMatches);
        out.degradations.push(Degradation::DenseUnavailable { reason: "timed out".into() });
        let ctx = PromptAssembler::new().assemble(&out);
        assert!(ctx.insufficient);
        assert!(ctx.context.contains("Insufficient information: no handbook passage matched"));
        assert!(ctx.context.contains("keyword-only retrieval (timed out)"));
        assert!(ctx.source_pages.is_empty());

        let ctx = PromptAssembler::new().assemble(&outcome(vec![], Signal::NoSignal));
        assert!(ctx.context.contains("no searchable terms"));
    }

    #[test]
    fn unknown_uses_general_instructions() {
        assert_eq!(instructions_for(Category::Unknown), instructions_for(Category::GeneralInfo));
        assert_ne!(instructions_for(Category::TrainingRules), instructions_for(Category::GeneralInfo));
    }

    #[test]
    fn passage_limit_respects_char_boundaries() {
        let out = outcome(vec![ranked("a", 1, "çàé long text")], Signal::Matched);
        let ctx = PromptAssembler::new().with_passage_limit(3).assemble(&out);
        assert!(ctx.context.ends_with("\nçàé\n"));
    }
}
