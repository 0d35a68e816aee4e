use std::fs;

use figment::providers::Format;
use tempfile::TempDir;

use syllabus_core::config::{Config, IngestConfig, PageRange};
use syllabus_core::corpus::{CorpusArtifact, PassageRecord};
use syllabus_core::data_processor::DataProcessor;
use syllabus_core::error::Error;
use syllabus_core::types::{Category, Passage, PassageMeta, Postings, TrainingType};
use syllabus_core::{CorpusIndex, FilterScope, MetadataFilter};

#[test]
fn process_directory_assigns_page_categories() {
    let tmp = TempDir::new().expect("tempdir");
    let dir = tmp.path();
    fs::write(dir.join("page_003.txt"), "Our mission is to educate engineers.").expect("write");
    fs::write(dir.join("page_012.txt"), "MDPS476 Robotics\r\n\r\nPrerequisites: MDPS423").expect("write");
    fs::create_dir(dir.join("training")).expect("mkdir");
    fs::write(dir.join("training").join("page_036.txt"), "Summer training lasts four weeks.").expect("write");
    fs::write(dir.join("readme.txt"), "not a page").expect("write");
    fs::write(dir.join("page_020.md"), "ignored extension").expect("write");

    let drafts = DataProcessor::default().process_directory(dir).expect("process");
    let summary: Vec<(u32, Category, &str)> = drafts.iter().map(|d| (d.page, d.category, d.id.as_str())).collect();
    assert_eq!(
        summary,
        vec![
            (3, Category::GeneralInfo, "p003-0"),
            (12, Category::CoursePrerequisites, "p012-0"),
            (12, Category::CoursePrerequisites, "p012-1"),
            (36, Category::TrainingRules, "p036-0"),
        ]
    );
    assert_eq!(drafts[1].course_code.as_deref(), Some("MDPS476"));
    assert!(drafts[3].source.ends_with("page_036.txt"));
    assert_eq!(drafts[2].meta.prerequisites, vec!["MDPS423"]);
    assert_eq!(drafts[3].meta.training_type, Some(TrainingType::SummerTraining));
    assert_eq!(drafts[0].meta, PassageMeta::default());
}

#[test]
fn process_empty_directory_yields_nothing() {
    let tmp = TempDir::new().expect("tempdir");
    assert!(DataProcessor::default().process_directory(tmp.path()).expect("process").is_empty());
}

#[test]
fn ingest_section_overrides_page_ranges() {
    let tmp = TempDir::new().expect("tempdir");
    let toml = tmp.path().join("config.toml");
    fs::write(
        &toml,
        r#"
[ingest]
max_words_per_passage = 50
page_ranges = [{ start = 1, end = 2, category = "training_rules" }]
"#,
    )
    .expect("write");
    let figment = figment::Figment::new().merge(figment::providers::Toml::file(&toml));
    let ingest: IngestConfig = Config::from_figment(figment).ingest().expect("ingest");
    assert_eq!(ingest.max_words_per_passage, 50);
    assert_eq!(ingest.page_ranges, vec![PageRange { start: 1, end: 2, category: Category::TrainingRules }]);
    assert_eq!(ingest.category_for_page(2), Category::TrainingRules);
    assert_eq!(ingest.category_for_page(3), Category::GeneralInfo);
    assert_eq!(ingest.embed_batch_size, 32, "unset fields keep defaults");
}

fn passage(id: &str, category: Category) -> Passage {
    Passage {
        id: id.into(),
        text: format!("text of {id}"),
        page: 1,
        category,
        source: "page_001.txt".into(),
        embedding: vec![0.5, 0.5],
        term_postings: Postings::from([("text".to_string(), 1)]),
        course_code: None,
        meta: PassageMeta::default(),
    }
}

#[test]
fn artifact_survives_disk_and_rejects_gaps() {
    let tmp = TempDir::new().expect("tempdir");
    let path = tmp.path().join("out").join("corpus.json");
    let passages = vec![passage("a", Category::GeneralInfo), passage("b", Category::TrainingRules)];
    CorpusArtifact::from_passages(&passages, "hash:test", 2).write(&path).expect("write");

    let index = CorpusIndex::load(&path).expect("load");
    assert_eq!(index.len(), 2);
    assert_eq!(index.category_counts(), vec![(Category::GeneralInfo, 1), (Category::TrainingRules, 1)]);

    let mut artifact = CorpusArtifact::read(&path).expect("read");
    artifact.passages[1].term_postings = None;
    let err = CorpusIndex::from_artifact(artifact).expect_err("missing postings");
    assert!(matches!(err, Error::CorpusIncomplete { ref passage, field } if passage == "b" && field == "term postings"));

    let mut artifact = CorpusArtifact::read(&path).expect("read");
    artifact.passages.push(PassageRecord { id: Some("c".into()), ..PassageRecord::default() });
    assert!(matches!(CorpusIndex::from_artifact(artifact), Err(Error::CorpusIncomplete { .. })));
}

#[test]
fn filter_threshold_comes_from_config() {
    let index = CorpusIndex::from_passages(
        vec![passage("a", Category::TrainingRules), passage("b", Category::GeneralInfo), passage("c", Category::GeneralInfo)],
        "hash:test",
    )
    .expect("corpus");
    let strict = MetadataFilter::new(2).apply(Category::TrainingRules, &index);
    assert_eq!(strict.scope, FilterScope::UnfilteredBelowThreshold { category: Category::TrainingRules, matched: 1 });
    assert_eq!(strict.len(), 3);
    let ok = MetadataFilter::new(2).apply(Category::GeneralInfo, &index);
    assert_eq!(ok.scope, FilterScope::Category { category: Category::GeneralInfo });
    assert_eq!(ok.len(), 2);
}
