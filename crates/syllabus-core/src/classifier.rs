//! Rule-based query categorization.
//!
//! A query is matched against an ordered list of [`Rule`]s; the highest
//! priority rule whose [`Predicate`] holds decides the category. Course-code
//! rules sit above every vocabulary rule so that a query naming a course is
//! never routed to general program information.

use regex::Regex;
use std::sync::OnceLock;

use crate::types::{Category, Classification, Confidence};

/// Course codes such as `MDPS476`, `MEES281`, `MCTS101`, `ENGN123`.
pub fn course_code_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)\b([A-Z]{3,4}[SN]?\d{3})\b").expect("course code pattern compiles"))
}

/// First course code mentioned in `text`, upper-cased.
pub fn extract_course_code(text: &str) -> Option<String> {
    course_code_pattern().captures(text).map(|c| c[1].to_ascii_uppercase())
}

/// Case-insensitive phrases matched at the start of a word: `vision` does not
/// fire inside `division`, while `prerequisite` still matches `prerequisites`.
#[derive(Debug, Clone)]
pub struct Keywords {
    words: Vec<String>,
    pattern: Option<Regex>,
}

impl Keywords {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let words: Vec<String> = words.into_iter().map(|w| w.into().to_lowercase()).filter(|w| !w.trim().is_empty()).collect();
        let pattern = if words.is_empty() {
            None
        } else {
            let alternation = words.iter().map(|w| regex::escape(w)).collect::<Vec<_>>().join("|");
            match Regex::new(&format!(r"(?i)\b(?:{alternation})")) {
                Ok(re) => Some(re),
                Err(e) => {
                    tracing::warn!(error = %e, "keyword pattern rejected, rule will never match");
                    None
                }
            }
        };
        Self { words, pattern }
    }

    pub fn words(&self) -> &[String] { &self.words }

    pub fn is_match(&self, text: &str) -> bool { self.pattern.as_ref().is_some_and(|re| re.is_match(text)) }
}

impl PartialEq for Keywords {
    fn eq(&self, other: &Self) -> bool { self.words == other.words }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    CourseCode,
    AnyKeyword(Keywords),
    AllOf(Vec<Predicate>),
}

impl Predicate {
    pub fn keywords<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::AnyKeyword(Keywords::new(words))
    }

    fn matches(&self, query: &str) -> bool {
        match self {
            Self::CourseCode => course_code_pattern().is_match(query),
            Self::AnyKeyword(keywords) => keywords.is_match(query),
            Self::AllOf(parts) => parts.iter().all(|p| p.matches(query)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub predicate: Predicate,
    pub category: Category,
    pub priority: u16,
    pub confidence: Confidence,
}

const PREREQUISITE_WORDS: &[&str] = &["prerequisite", "prereq", "pre-requisite", "before taking", "requires", "required for"];
const TRAINING_WORDS: &[&str] = &["industrial training", "summer training", "internship", "training"];
const DESCRIPTION_WORDS: &[&str] = &["description", "syllabus", "covers", "content", "topics", "learning outcomes"];
const GENERAL_WORDS: &[&str] = &["mission", "vision", "admission", "credit hours", "graduation", "objectives", "elective"];

pub fn default_rules() -> Vec<Rule> {
    let rule = |predicate, category, priority, confidence| Rule { predicate, category, priority, confidence };
    vec![
        rule(
            Predicate::AllOf(vec![Predicate::CourseCode, Predicate::keywords(PREREQUISITE_WORDS.iter().copied())]),
            Category::CoursePrerequisites,
            100,
            Confidence::Strong,
        ),
        rule(Predicate::CourseCode, Category::ProgramDescription, 90, Confidence::Strong),
        rule(Predicate::keywords(PREREQUISITE_WORDS.iter().copied()), Category::CoursePrerequisites, 80, Confidence::Moderate),
        rule(Predicate::keywords(TRAINING_WORDS.iter().copied()), Category::TrainingRules, 70, Confidence::Moderate),
        rule(Predicate::keywords(DESCRIPTION_WORDS.iter().copied()), Category::ProgramDescription, 60, Confidence::Moderate),
        rule(Predicate::keywords(GENERAL_WORDS.iter().copied()), Category::GeneralInfo, 50, Confidence::Moderate),
    ]
}

#[derive(Debug, Clone)]
pub struct CategoryClassifier {
    rules: Vec<Rule>,
}

impl Default for CategoryClassifier {
    fn default() -> Self { Self::with_rules(default_rules()) }
}

impl CategoryClassifier {
    pub fn new() -> Self { Self::default() }

    /// Rules are evaluated by descending priority; equal priorities keep the given order.
    pub fn with_rules(mut rules: Vec<Rule>) -> Self {
        rules.sort_by(|a, b| b.priority.cmp(&a.priority));
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule] { &self.rules }

    pub fn classify(&self, query: &str) -> Classification {
        self.rules
            .iter()
            .find(|r| r.predicate.matches(query))
            .map_or_else(Classification::unknown, |r| Classification { category: r.category, confidence: r.confidence })
    }
}
