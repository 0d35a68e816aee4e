use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use syllabus_core::config::RetrievalConfig;
use syllabus_core::corpus::{CorpusHandle, CorpusIndex};
use syllabus_core::error::{Error, Result};
use syllabus_core::filter::{FilterScope, MetadataFilter};
use syllabus_core::traits::{DenseRetriever, Embedder, SparseRetriever};
use syllabus_core::types::{Category, Classification, Origin, PassageId, PassageMeta, QueryContext, RetrievalResult};
use syllabus_core::{classifier, CategoryClassifier};
use syllabus_text::{Bm25Retriever, HandbookAnalyzer};
use syllabus_vector::{CosineRetriever, QueryEmbedder};

use crate::fusion::{FusedResult, FusionConfig, HybridMerger};

/// Whether the query carried anything to search for and whether it found anything.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Matched,
    /// Tokens were present but neither retriever returned a passage.
    NoMatches,
    /// Nothing left after normalization; no retrieval was attempted.
    NoSignal,
}

/// A degraded path taken while answering a query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Degradation {
    DenseUnavailable { reason: String },
}

/// A fused result resolved against the corpus snapshot it was ranked in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankedPassage {
    pub passage_id: PassageId,
    pub text: String,
    pub page: u32,
    pub category: Category,
    pub source: String,
    pub course_code: Option<String>,
    #[serde(default)]
    pub meta: PassageMeta,
    pub origin: Origin,
    pub score: f32,
    pub dense_score: Option<f32>,
    pub sparse_score: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievalOutcome {
    pub query: String,
    pub classification: Classification,
    pub course_code: Option<String>,
    pub scope: FilterScope,
    /// Set when candidates were narrowed to the course the query names.
    #[serde(default)]
    pub course_filter: Option<String>,
    pub signal: Signal,
    pub degradations: Vec<Degradation>,
    pub passages: Vec<RankedPassage>,
    pub corpus_version: String,
}

impl RetrievalOutcome {
    pub fn category(&self) -> Category { self.classification.category }

    pub fn is_degraded(&self) -> bool { !self.degradations.is_empty() }

    pub fn results(&self) -> Vec<RetrievalResult> {
        self.passages.iter().map(|p| RetrievalResult { passage_id: p.passage_id.clone(), score: p.score, origin: p.origin }).collect()
    }

    /// Distinct pages of the returned passages, ascending.
    pub fn source_pages(&self) -> Vec<u32> {
        let mut pages: Vec<u32> = self.passages.iter().map(|p| p.page).collect();
        pages.sort_unstable();
        pages.dedup();
        pages
    }
}

/// Classifier, metadata filter, the two retrievers and the merger over one
/// swappable corpus. Each query works on the snapshot it captured at its
/// start, so a concurrent `reload` never mixes two corpus versions.
pub struct HybridSearchEngine<D = CosineRetriever, S = Bm25Retriever>
where
    D: DenseRetriever,
    S: SparseRetriever,
{
    corpus: Arc<CorpusHandle>,
    classifier: CategoryClassifier,
    analyzer: HandbookAnalyzer,
    filter: MetadataFilter,
    query_embedder: Option<QueryEmbedder>,
    dense: D,
    sparse: S,
    merger: HybridMerger,
    config: RetrievalConfig,
}

impl HybridSearchEngine<CosineRetriever, Bm25Retriever> {
    /// Default retrievers tuned from `config`. Fails on an invalid config.
    /// Passing no embedder runs every query sparse-only.
    pub fn from_config(corpus: Arc<CorpusHandle>, embedder: Option<Arc<dyn Embedder>>, config: RetrievalConfig) -> Result<Self> {
        let sparse = Bm25Retriever::new(config.bm25_k1, config.bm25_b);
        Self::new(corpus, embedder, CosineRetriever, sparse, config)
    }
}

impl<D, S> HybridSearchEngine<D, S>
where
    D: DenseRetriever,
    S: SparseRetriever,
{
    pub fn new(corpus: Arc<CorpusHandle>, embedder: Option<Arc<dyn Embedder>>, dense: D, sparse: S, config: RetrievalConfig) -> Result<Self> {
        config.validate()?;
        let snapshot = corpus.snapshot();
        if let Some(e) = &embedder {
            if !snapshot.is_empty() && e.dim() != snapshot.dim() {
                tracing::warn!(embedder = e.embedder_id(), embedder_dim = e.dim(), corpus_dim = snapshot.dim(), "embedder and corpus dimensions differ, dense retrieval will be unavailable");
            } else if e.embedder_id() != snapshot.embedder_id() {
                tracing::warn!(embedder = e.embedder_id(), corpus_embedder = snapshot.embedder_id(), "query embedder differs from the one that built the corpus");
            }
        }
        Ok(Self {
            corpus,
            classifier: CategoryClassifier::new(),
            analyzer: HandbookAnalyzer::new(),
            filter: MetadataFilter::new(config.min_filtered_passages),
            query_embedder: embedder.map(|e| QueryEmbedder::new(e, config.embed_timeout()).with_max_in_flight(config.max_inflight_embeds)),
            dense,
            sparse,
            merger: HybridMerger::new(FusionConfig::from(&config)),
            config,
        })
    }

    pub fn with_classifier(mut self, classifier: CategoryClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn config(&self) -> &RetrievalConfig { &self.config }

    pub fn corpus(&self) -> Arc<CorpusIndex> { self.corpus.snapshot() }

    /// Publish a rebuilt corpus. In-flight queries finish on the old one.
    pub fn reload(&self, index: CorpusIndex) -> Arc<CorpusIndex> {
        tracing::info!(version = index.version(), passages = index.len(), "corpus reloaded");
        self.corpus.replace(index)
    }

    /// Classification and normalization. The embedding is added by [`retrieve`](Self::retrieve).
    pub fn query_context(&self, raw: &str) -> QueryContext {
        let tokens = self.analyzer.query_terms(raw);
        QueryContext {
            raw_text: raw.to_string(),
            normalized_text: tokens.join(" "),
            tokens,
            classification: self.classifier.classify(raw),
            course_code: classifier::extract_course_code(raw),
            embedding: None,
        }
    }

    pub async fn query(&self, raw: &str) -> RetrievalOutcome {
        let mut ctx = self.query_context(raw);
        self.retrieve(&mut ctx).await
    }

    /// Like [`query`](Self::query) but reports a query without usable tokens as `EmptyQuery`.
    pub async fn try_query(&self, raw: &str) -> Result<RetrievalOutcome> {
        let mut ctx = self.query_context(raw);
        if !ctx.has_signal() { return Err(Error::EmptyQuery); }
        Ok(self.retrieve(&mut ctx).await)
    }

    /// Run the pipeline for a prepared context. A context that already
    /// carries an embedding skips the embedder; otherwise a freshly computed
    /// one is stored back into `ctx`.
    pub async fn retrieve(&self, ctx: &mut QueryContext) -> RetrievalOutcome {
        let started = Instant::now();
        let snapshot = self.corpus.snapshot();
        let category = ctx.category();
        let course = if self.config.filter_by_course { ctx.course_code.as_deref() } else { None };
        let candidates = self.filter.apply_with_course(category, course, &snapshot);

        let mut outcome = RetrievalOutcome {
            query: ctx.raw_text.clone(),
            classification: ctx.classification,
            course_code: ctx.course_code.clone(),
            scope: candidates.scope,
            course_filter: candidates.course.clone(),
            signal: Signal::NoSignal,
            degradations: Vec::new(),
            passages: Vec::new(),
            corpus_version: snapshot.version().to_string(),
        };

        if !ctx.has_signal() {
            tracing::info!(query = %ctx.raw_text, "query has no searchable tokens");
            return outcome;
        }

        let dense_fut = async {
            if self.config.dense_k == 0 { return Ok::<_, Error>((Vec::new(), None)); }
            match (&ctx.embedding, &self.query_embedder) {
                (Some(v), _) => Ok((self.dense.search_vec(v, &candidates.passages, self.config.dense_k)?, None)),
                (None, Some(embedder)) => {
                    let fresh = embedder.embed(&ctx.raw_text).await?;
                    let hits = self.dense.search_vec(&fresh, &candidates.passages, self.config.dense_k)?;
                    Ok((hits, Some(fresh)))
                }
                (None, None) => Err(Error::RetrievalUnavailable("no query embedder configured".into())),
            }
        };
        let sparse_fut = async { self.sparse.search(&ctx.tokens, &candidates.passages, self.config.sparse_k) };
        let (dense, sparse) = tokio::join!(dense_fut, sparse_fut);

        let dense = match dense {
            Ok((hits, fresh)) => {
                if fresh.is_some() { ctx.embedding = fresh; }
                hits
            }
            Err(e) => {
                tracing::warn!(error = %e, "dense retrieval unavailable, continuing sparse-only");
                outcome.degradations.push(Degradation::DenseUnavailable { reason: e.to_string() });
                Vec::new()
            }
        };

        let merged = self.merger.merge(&dense, &sparse);
        outcome.passages = merged.iter().filter_map(|m| resolve(&snapshot, m)).collect();
        outcome.signal = if outcome.passages.is_empty() { Signal::NoMatches } else { Signal::Matched };

        tracing::debug!(
            %category,
            candidates = candidates.len(),
            dense = dense.len(),
            sparse = sparse.len(),
            merged = outcome.passages.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "query complete"
        );
        outcome
    }
}

fn resolve(snapshot: &CorpusIndex, fused: &FusedResult) -> Option<RankedPassage> {
    let p = snapshot.get(&fused.passage_id)?;
    Some(RankedPassage {
        passage_id: p.id.clone(),
        text: p.text.clone(),
        page: p.page,
        category: p.category,
        source: p.source.clone(),
        course_code: p.course_code.clone(),
        meta: p.meta.clone(),
        origin: fused.origin,
        score: fused.score,
        dense_score: fused.dense_score,
        sparse_score: fused.sparse_score,
    })
}
