//! Course details read from passage text at ingestion time.

use regex::Regex;
use std::sync::OnceLock;

use crate::classifier::course_code_pattern;
use crate::types::{Category, PassageMeta, TrainingType};

/// `MDPS476 – Advanced Robotics` and `Course MDPS476 - Advanced Robotics`.
fn title_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)\b[A-Z]{3,4}[SN]?\d{3}\s+[-–]\s+([^\n]+)").expect("title pattern compiles"))
}

fn credits_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)Credit\s+Hours:\s*(\d+)").expect("credits pattern compiles"))
}

fn prerequisites_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)Pre-?requisites?:\s*([^\n]+)").expect("prerequisites pattern compiles"))
}

pub fn extract_metadata(text: &str, category: Category) -> PassageMeta {
    let course_title = title_pattern()
        .captures(text)
        .map(|c| c[1].trim().trim_end_matches('.').trim().to_string())
        .filter(|t| !t.is_empty());
    let credits = credits_pattern().captures(text).and_then(|c| c[1].parse().ok());

    let mut prerequisites: Vec<String> = Vec::new();
    if let Some(c) = prerequisites_pattern().captures(text) {
        for code in course_code_pattern().captures_iter(&c[1]).map(|m| m[1].to_ascii_uppercase()) {
            if !prerequisites.contains(&code) { prerequisites.push(code); }
        }
    }

    let training_type = if category == Category::TrainingRules {
        let lowered = text.to_lowercase();
        if lowered.contains("industrial") {
            Some(TrainingType::IndustrialTraining)
        } else if lowered.contains("summer") {
            Some(TrainingType::SummerTraining)
        } else {
            None
        }
    } else {
        None
    };

    PassageMeta { course_title, credits, prerequisites, training_type }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_course_block() {
        let meta = extract_metadata(
            "Course MDPS476 – Advanced Robotics\nCredit Hours: 3\nPrerequisites: MDPS301, mdps310 and MDPS301",
            Category::CoursePrerequisites,
        );
        assert_eq!(meta.course_title.as_deref(), Some("Advanced Robotics"));
        assert_eq!(meta.credits, Some(3));
        assert_eq!(meta.prerequisites, vec!["MDPS301", "MDPS310"]);
        assert_eq!(meta.training_type, None);
    }

    #[test]
    fn training_type_only_on_training_pages() {
        let text = "Industrial training lasts eight weeks; summer training four.";
        assert_eq!(extract_metadata(text, Category::TrainingRules).training_type, Some(TrainingType::IndustrialTraining));
        assert_eq!(extract_metadata("Summer training lasts four weeks.", Category::TrainingRules).training_type, Some(TrainingType::SummerTraining));
        assert_eq!(extract_metadata(text, Category::GeneralInfo).training_type, None);
    }

    #[test]
    fn plain_text_has_no_metadata() {
        assert_eq!(extract_metadata("Our mission is to educate engineers.", Category::GeneralInfo), PassageMeta::default());
        assert!(extract_metadata("Prerequisite: none", Category::CoursePrerequisites).prerequisites.is_empty());
    }
}
