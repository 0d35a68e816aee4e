use std::path::PathBuf;
use std::sync::Arc;

use syllabus_core::config::RetrievalConfig;
use syllabus_core::corpus::CorpusArtifact;
use syllabus_core::data_processor::DataProcessor;
use syllabus_core::traits::Embedder;
use syllabus_core::types::{Category, Origin};
use syllabus_core::{CorpusHandle, CorpusIndex, FilterScope};
use syllabus_embed::HashingEmbedder;
use syllabus_hybrid::{HybridSearchEngine, PromptAssembler};
use syllabus_text::HandbookAnalyzer;
use syllabus_vector::backfill_passages;

fn pages_dir() -> PathBuf { PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../test_data/pages") }

fn build_index(embedder: &HashingEmbedder) -> CorpusIndex {
    let drafts = DataProcessor::default().process_directory(&pages_dir()).expect("process pages");
    let passages = backfill_passages(drafts, embedder, &HandbookAnalyzer::new(), 4, false).expect("backfill");
    CorpusIndex::from_passages(passages, embedder.embedder_id()).expect("index")
}

#[tokio::test]
async fn ingest_then_query_handbook_pages() {
    let embedder = HashingEmbedder::new(256);
    let index = build_index(&embedder);
    let engine = HybridSearchEngine::from_config(Arc::new(CorpusHandle::new(index)), Some(Arc::new(embedder)), RetrievalConfig::default())
        .expect("engine");

    let outcome = engine.query("What are the prerequisites for MDPS476?").await;
    eprintln!("{:#?}", outcome.passages.iter().map(|p| (&p.passage_id, p.origin, p.score)).collect::<Vec<_>>());
    assert_eq!(outcome.category(), Category::CoursePrerequisites);
    assert_eq!(outcome.scope, FilterScope::Category { category: Category::CoursePrerequisites });
    assert!(outcome.passages.iter().all(|p| p.page == 12));
    let target = outcome.passages.iter().find(|p| p.passage_id == "p012-1").expect("MDPS476 prerequisites passage");
    assert_eq!(target.origin, Origin::Both);
    assert_eq!(target.course_code.as_deref(), Some("MDPS476"));

    let outcome = engine.query("How long is summer training?").await;
    assert_eq!(outcome.category(), Category::TrainingRules);
    assert!(outcome.passages.iter().all(|p| p.category == Category::TrainingRules));

    let prompt = PromptAssembler::new().assemble(&outcome);
    assert!(!prompt.insufficient);
    assert_eq!(prompt.source_pages, vec![36]);
    assert!(prompt.context.contains("Summer training is four weeks"));
}

#[tokio::test]
async fn artifact_round_trip_serves_same_results() {
    let embedder = HashingEmbedder::new(256);
    let index = build_index(&embedder);
    let tmp = tempfile::TempDir::new().expect("tempdir");
    let path = tmp.path().join("corpus.json");
    CorpusArtifact::from_passages(index.passages(), embedder.embedder_id(), embedder.dim()).write(&path).expect("write");
    let loaded = CorpusIndex::load(&path).expect("load");
    assert_eq!(loaded.version(), index.version());

    let shared: Arc<dyn Embedder> = Arc::new(embedder);
    let q = "MDPS301 dynamics course content";
    let a = HybridSearchEngine::from_config(Arc::new(CorpusHandle::new(index)), Some(Arc::clone(&shared)), RetrievalConfig::default())
        .expect("engine")
        .query(q)
        .await;
    let b = HybridSearchEngine::from_config(Arc::new(CorpusHandle::new(loaded)), Some(shared), RetrievalConfig::default())
        .expect("engine")
        .query(q)
        .await;
    assert_eq!(a.results(), b.results());
    assert_eq!(a.category(), Category::ProgramDescription);
}
