//! Immutable corpus index and the snapshot handle queries read it through.
//!
//! A [`CorpusIndex`] is only ever built whole from a [`CorpusArtifact`]; a
//! rebuild produces a new index that [`CorpusHandle::replace`] publishes in a
//! single atomic swap. Queries call [`CorpusHandle::snapshot`] once and keep
//! that `Arc` for their whole lifetime.

use anyhow::Context;
use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::types::{Category, Passage, PassageId, PassageMeta, Postings};

/// Passage as stored in the artifact. Every field is optional on the wire so
/// that a missing one can be reported by name instead of as a parse error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PassageRecord {
    pub id: Option<String>,
    pub text: Option<String>,
    pub page: Option<u32>,
    pub category: Option<Category>,
    pub source: Option<String>,
    pub embedding: Option<Vec<f32>>,
    pub term_postings: Option<Postings>,
    #[serde(default)]
    pub course_code: Option<String>,
    #[serde(default)]
    pub meta: PassageMeta,
}

impl From<&Passage> for PassageRecord {
    fn from(p: &Passage) -> Self {
        Self {
            id: Some(p.id.clone()),
            text: Some(p.text.clone()),
            page: Some(p.page),
            category: Some(p.category),
            source: Some(p.source.clone()),
            embedding: Some(p.embedding.clone()),
            term_postings: Some(p.term_postings.clone()),
            course_code: p.course_code.clone(),
            meta: p.meta.clone(),
        }
    }
}

impl PassageRecord {
    fn into_passage(self, position: usize) -> Result<Passage> {
        let id = self.id.filter(|s| !s.trim().is_empty()).ok_or_else(|| Error::incomplete(format!("#{position}"), "id"))?;
        let text = self.text.filter(|s| !s.trim().is_empty()).ok_or_else(|| Error::incomplete(&id, "text"))?;
        let page = self.page.ok_or_else(|| Error::incomplete(&id, "page"))?;
        let category = self.category.ok_or_else(|| Error::incomplete(&id, "category"))?;
        let embedding = self.embedding.filter(|e| !e.is_empty()).ok_or_else(|| Error::incomplete(&id, "embedding"))?;
        let term_postings = self.term_postings.ok_or_else(|| Error::incomplete(&id, "term postings"))?;
        let source = self.source.unwrap_or_default();
        Ok(Passage { id, text, page, category, source, embedding, term_postings, course_code: self.course_code, meta: self.meta })
    }
}

/// Versioned output of the ingestion pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusArtifact {
    pub version: String,
    pub built_at: DateTime<Utc>,
    pub embedder_id: String,
    pub dim: usize,
    pub passages: Vec<PassageRecord>,
}

impl CorpusArtifact {
    /// Wrap finished passages; the version is a digest of ids, pages and text.
    pub fn from_passages(passages: &[Passage], embedder_id: &str, dim: usize) -> Self {
        Self {
            version: content_version(passages),
            built_at: Utc::now(),
            embedder_id: embedder_id.to_string(),
            dim,
            passages: passages.iter().map(PassageRecord::from).collect(),
        }
    }

    pub fn read(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path).with_context(|| format!("reading corpus artifact {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing corpus artifact {}", path.display()))
    }

    pub fn write(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() { std::fs::create_dir_all(parent)?; }
        }
        let json = serde_json::to_string(self)?;
        std::fs::write(path, json).with_context(|| format!("writing corpus artifact {}", path.display()))
    }
}

fn content_version(passages: &[Passage]) -> String {
    let mut hasher = blake3::Hasher::new();
    for p in passages {
        hasher.update(p.id.as_bytes());
        hasher.update(&p.page.to_le_bytes());
        hasher.update(p.text.as_bytes());
        hasher.update(&[0]);
    }
    hasher.finalize().to_hex().as_str()[..16].to_string()
}

#[derive(Debug)]
pub struct CorpusIndex {
    version: String,
    embedder_id: String,
    dim: usize,
    passages: Vec<Passage>,
    by_id: HashMap<PassageId, usize>,
}

impl CorpusIndex {
    /// Validate and index an artifact. Any missing field, duplicate id or
    /// embedding of the wrong dimension rejects the whole corpus.
    pub fn from_artifact(artifact: CorpusArtifact) -> Result<Self> {
        let CorpusArtifact { version, embedder_id, dim, passages, .. } = artifact;
        let passages = passages
            .into_iter()
            .enumerate()
            .map(|(i, r)| r.into_passage(i))
            .collect::<Result<Vec<_>>>()?;
        Self::build(version, embedder_id, dim, passages)
    }

    pub fn from_passages(passages: Vec<Passage>, embedder_id: &str) -> Result<Self> {
        let dim = passages.first().map_or(0, |p| p.embedding.len());
        let version = content_version(&passages);
        Self::build(version, embedder_id.to_string(), dim, passages)
    }

    fn build(version: String, embedder_id: String, dim: usize, passages: Vec<Passage>) -> Result<Self> {
        let mut by_id = HashMap::with_capacity(passages.len());
        for (i, p) in passages.iter().enumerate() {
            if p.embedding.len() != dim {
                return Err(Error::incomplete(&p.id, "embedding of the corpus dimension"));
            }
            if by_id.insert(p.id.clone(), i).is_some() {
                return Err(Error::incomplete(&p.id, "unique id"));
            }
        }
        tracing::info!(version = %version, passages = passages.len(), dim, "corpus index built");
        Ok(Self { version, embedder_id, dim, passages, by_id })
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let artifact = CorpusArtifact::read(path)?;
        Ok(Self::from_artifact(artifact)?)
    }

    pub fn version(&self) -> &str { &self.version }
    pub fn embedder_id(&self) -> &str { &self.embedder_id }
    pub fn dim(&self) -> usize { self.dim }
    pub fn len(&self) -> usize { self.passages.len() }
    pub fn is_empty(&self) -> bool { self.passages.is_empty() }

    /// All passages in insertion order.
    pub fn passages(&self) -> &[Passage] { &self.passages }

    pub fn get(&self, id: &str) -> Option<&Passage> { self.by_id.get(id).map(|&i| &self.passages[i]) }

    /// Insertion position, used as the stable tie-breaker by both retrievers.
    pub fn position(&self, id: &str) -> Option<usize> { self.by_id.get(id).copied() }

    pub fn category_counts(&self) -> Vec<(Category, usize)> {
        Category::ALL
            .into_iter()
            .map(|c| (c, self.passages.iter().filter(|p| p.category == c).count()))
            .filter(|(_, n)| *n > 0)
            .collect()
    }
}

/// Shared, swappable reference to the current corpus snapshot.
pub struct CorpusHandle {
    current: ArcSwap<CorpusIndex>,
}

impl CorpusHandle {
    pub fn new(index: CorpusIndex) -> Self { Self { current: ArcSwap::from_pointee(index) } }

    pub fn snapshot(&self) -> Arc<CorpusIndex> { self.current.load_full() }

    /// Publish a fully built replacement. In-flight queries keep the snapshot they captured.
    pub fn replace(&self, index: CorpusIndex) -> Arc<CorpusIndex> {
        tracing::info!(version = index.version(), passages = index.len(), "swapping corpus snapshot");
        self.current.swap(Arc::new(index))
    }
}
