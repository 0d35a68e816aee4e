use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use futures::future::join_all;
use tracing_subscriber::EnvFilter;

use syllabus_core::config::{expand_path, Config};
use syllabus_core::corpus::CorpusArtifact;
use syllabus_core::data_processor::DataProcessor;
use syllabus_core::traits::Embedder;
use syllabus_core::{CorpusHandle, CorpusIndex};
use syllabus_embed::get_default_embedder;
use syllabus_hybrid::{HybridSearchEngine, PromptAssembler, RetrievalOutcome, Signal};
use syllabus_text::HandbookAnalyzer;
use syllabus_vector::backfill_passages;

const USAGE: &str = "Usage: syllabus <command> [args...]

Commands:
  ingest [pages_dir] [--out <corpus.json>] [--quiet]
  query [--corpus <corpus.json>] [--json] [--context] [--sparse-only] <query>...
  inspect [--corpus <corpus.json>]";

struct Flags {
    positional: Vec<String>,
    corpus: Option<PathBuf>,
    out: Option<PathBuf>,
    json: bool,
    context: bool,
    sparse_only: bool,
    quiet: bool,
}

fn parse_flags(args: &[String]) -> anyhow::Result<Flags> {
    let mut flags = Flags { positional: Vec::new(), corpus: None, out: None, json: false, context: false, sparse_only: false, quiet: false };
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--corpus" | "-c" => { i += 1; flags.corpus = Some(args.get(i).map(expand_path).ok_or_else(|| anyhow::anyhow!("--corpus requires a path"))?); }
            "--out" | "-o" => { i += 1; flags.out = Some(args.get(i).map(expand_path).ok_or_else(|| anyhow::anyhow!("--out requires a path"))?); }
            "--json" => flags.json = true,
            "--context" => flags.context = true,
            "--sparse-only" => flags.sparse_only = true,
            "--quiet" | "-q" => flags.quiet = true,
            other if other.starts_with('-') => anyhow::bail!("unknown flag: {other}\n\n{USAGE}"),
            other => flags.positional.push(other.to_string()),
        }
        i += 1;
    }
    Ok(flags)
}

fn corpus_path(config: &Config, flags: &Flags) -> anyhow::Result<PathBuf> {
    match &flags.corpus {
        Some(p) => Ok(p.clone()),
        None => Ok(expand_path(config.data()?.corpus_path)),
    }
}

fn ingest(config: &Config, flags: &Flags) -> anyhow::Result<()> {
    let data = config.data()?;
    let ingest = config.ingest()?;
    let pages_dir = flags.positional.first().map(expand_path).unwrap_or_else(|| expand_path(&data.pages_dir));
    let out = flags.out.clone().unwrap_or_else(|| expand_path(&data.corpus_path));
    println!("Ingesting handbook pages from {}", pages_dir.display());

    let batch_size = ingest.embed_batch_size;
    let drafts = DataProcessor::new(ingest).process_directory(&pages_dir)?;
    if drafts.is_empty() { anyhow::bail!("no passages found under {}", pages_dir.display()); }
    println!("📄 {} passages chunked", drafts.len());

    let embedder = get_default_embedder()?;
    let passages = backfill_passages(drafts, embedder.as_ref(), &HandbookAnalyzer::new(), batch_size, !flags.quiet)?;
    let artifact = CorpusArtifact::from_passages(&passages, embedder.embedder_id(), embedder.dim());
    // validate before publishing
    let index = CorpusIndex::from_artifact(artifact.clone())?;
    artifact.write(&out)?;

    println!("\n✅ Corpus {} written to {}", index.version(), out.display());
    for (category, count) in index.category_counts() { println!("  {category}: {count} passages"); }
    Ok(())
}

fn inspect(config: &Config, flags: &Flags) -> anyhow::Result<()> {
    let path = corpus_path(config, flags)?;
    let index = CorpusIndex::load(&path)?;
    println!("Corpus: {}", path.display());
    println!("  version:   {}", index.version());
    println!("  embedder:  {}", index.embedder_id());
    println!("  dim:       {}", index.dim());
    println!("  passages:  {}", index.len());
    for (category, count) in index.category_counts() { println!("  {category}: {count}"); }
    let coded = index.passages().iter().filter(|p| p.course_code.is_some()).count();
    println!("  with course code: {coded}");
    let with_prereqs = index.passages().iter().filter(|p| !p.meta.prerequisites.is_empty()).count();
    println!("  with prerequisites: {with_prereqs}");
    Ok(())
}

async fn query(config: &Config, flags: &Flags) -> anyhow::Result<()> {
    if flags.positional.is_empty() { anyhow::bail!("query needs at least one question\n\n{USAGE}"); }
    let retrieval = config.retrieval()?;
    let index = CorpusIndex::load(&corpus_path(config, flags)?)?;
    let embedder: Option<Arc<dyn Embedder>> = if flags.sparse_only { None } else { Some(get_default_embedder()?) };
    let engine = HybridSearchEngine::from_config(Arc::new(CorpusHandle::new(index)), embedder, retrieval)?;

    let outcomes = join_all(flags.positional.iter().map(|q| engine.query(q))).await;
    if flags.json {
        println!("{}", serde_json::to_string_pretty(&outcomes)?);
        return Ok(());
    }
    let assembler = PromptAssembler::new();
    for outcome in &outcomes {
        print_outcome(outcome);
        if flags.context {
            let prompt = assembler.assemble(outcome);
            println!("\n--- instructions ---\n{}\n--- context ---\n{}", prompt.instructions, prompt.context);
        }
    }
    Ok(())
}

fn print_outcome(outcome: &RetrievalOutcome) {
    println!("\n🔍 {}", outcome.query);
    println!("   category={} confidence={:?} scope={:?}", outcome.category(), outcome.classification.confidence, outcome.scope);
    if let Some(code) = &outcome.course_code { println!("   course code: {code}"); }
    if let Some(code) = &outcome.course_filter { println!("   narrowed to course {code}"); }
    for d in &outcome.degradations { println!("   ⚠️  {d:?}"); }
    match outcome.signal {
        Signal::NoSignal => println!("   (no searchable terms in the question)"),
        Signal::NoMatches => println!("   (no matching passages)"),
        Signal::Matched => {
            for (i, p) in outcome.passages.iter().enumerate() {
                let snippet: String = p.text.chars().take(120).collect();
                println!("  {}. score={:.4} origin={} page={} id={}", i + 1, p.score, p.origin, p.page, p.passage_id);
                println!("     📝 {snippet}");
            }
            println!("   pages: {:?}", outcome.source_pages());
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let mut args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() { eprintln!("{USAGE}"); std::process::exit(1); }
    let cmd = args.remove(0);
    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let flags = parse_flags(&args)?;

    match cmd.as_str() {
        // model loading and embedding are blocking work
        "ingest" => tokio::task::block_in_place(|| ingest(&config, &flags)),
        "query" => query(&config, &flags).await,
        "inspect" => inspect(&config, &flags),
        "help" | "--help" | "-h" => { println!("{USAGE}"); Ok(()) }
        _ => { eprintln!("Unknown command: {cmd}\n\n{USAGE}"); std::process::exit(1); }
    }
}
