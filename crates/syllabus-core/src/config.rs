//! Lightweight configuration loader, typed sections and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (`__` separates nesting, e.g. `APP_RETRIEVAL__DENSE_K=12`). Every numeric
//! knob of the retrieval engine lives in [`RetrievalConfig`] so it can be tuned
//! without code changes.
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::Category;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.validate_for_env(&env_name)?;
        Ok(config)
    }

    /// Wrap an already assembled figment (tests, embedding applications).
    pub fn from_figment(figment: Figment) -> Self { Self { figment } }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Typed section with defaults filled in for any missing field.
    pub fn section<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned + Default,
    {
        if self.figment.contains(key) { self.get(key) } else { Ok(T::default()) }
    }

    pub fn retrieval(&self) -> anyhow::Result<RetrievalConfig> {
        let retrieval: RetrievalConfig = self.section("retrieval")?;
        retrieval.validate()?;
        Ok(retrieval)
    }

    pub fn ingest(&self) -> anyhow::Result<IngestConfig> { self.section("ingest") }

    pub fn data(&self) -> anyhow::Result<DataConfig> { self.section("data") }

    fn validate_for_env(&self, env: &str) -> anyhow::Result<()> {
        if matches!(env, "prod" | "production") {
            // Serving without a corpus location is never intended in production.
            if !self.figment.contains("data.corpus_path") {
                anyhow::bail!("prod config must set data.corpus_path");
            }
        }
        Ok(())
    }
}

/// Score normalization applied to each ranked list before fusion.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    #[default]
    MinMax,
    Rank,
}

/// Flat set of retrieval knobs. Defaults mirror the tuned values of the
/// handbook assistant; none of them has a derivation beyond that tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalConfig {
    pub dense_k: usize,
    pub sparse_k: usize,
    pub final_cap: usize,
    pub dense_weight: f32,
    pub sparse_weight: f32,
    pub bm25_k1: f32,
    pub bm25_b: f32,
    pub min_filtered_passages: usize,
    pub embed_timeout_ms: u64,
    /// Query embeds allowed to run at once, timed-out ones included.
    pub max_inflight_embeds: usize,
    pub normalization: Normalization,
    /// Narrow the category subset to the course a query names.
    pub filter_by_course: bool,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            dense_k: 8,
            sparse_k: 6,
            final_cap: 10,
            dense_weight: 0.6,
            sparse_weight: 0.4,
            bm25_k1: 1.2,
            bm25_b: 0.75,
            min_filtered_passages: 1,
            embed_timeout_ms: 5_000,
            max_inflight_embeds: 4,
            normalization: Normalization::MinMax,
            filter_by_course: true,
        }
    }
}

impl RetrievalConfig {
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| -> Result<()> { Err(Error::InvalidConfig(msg)) };
        if self.final_cap == 0 { return invalid("final_cap must be at least 1".into()); }
        if self.dense_k == 0 && self.sparse_k == 0 { return invalid("dense_k and sparse_k cannot both be 0".into()); }
        for (name, w) in [("dense_weight", self.dense_weight), ("sparse_weight", self.sparse_weight)] {
            if !w.is_finite() || w < 0.0 { return invalid(format!("{name} must be a finite non-negative number, got {w}")); }
        }
        if self.dense_weight + self.sparse_weight <= 0.0 { return invalid("fusion weights cannot both be 0".into()); }
        if !self.bm25_k1.is_finite() || self.bm25_k1 < 0.0 { return invalid(format!("bm25_k1 must be >= 0, got {}", self.bm25_k1)); }
        if !(0.0..=1.0).contains(&self.bm25_b) { return invalid(format!("bm25_b must be within [0, 1], got {}", self.bm25_b)); }
        if self.embed_timeout_ms == 0 { return invalid("embed_timeout_ms must be positive".into()); }
        if self.max_inflight_embeds == 0 { return invalid("max_inflight_embeds must be at least 1".into()); }
        Ok(())
    }

    pub fn embed_timeout(&self) -> std::time::Duration { std::time::Duration::from_millis(self.embed_timeout_ms) }

    /// Figment provider exposing these values under `retrieval`, for layering in tests.
    pub fn provider(&self) -> Serialized<&Self> { Serialized::defaults(self).key("retrieval") }
}

/// Inclusive page range assigned to one category during ingestion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageRange {
    pub start: u32,
    pub end: u32,
    pub category: Category,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IngestConfig {
    pub page_ranges: Vec<PageRange>,
    /// Category for pages outside every range.
    pub default_category: Category,
    pub max_words_per_passage: usize,
    pub overlap_percent: f32,
    pub embed_batch_size: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        let range = |start, end, category| PageRange { start, end, category };
        Self {
            page_ranges: vec![
                range(1, 7, Category::GeneralInfo),
                range(8, 17, Category::CoursePrerequisites),
                range(18, 34, Category::ProgramDescription),
                range(35, 41, Category::TrainingRules),
            ],
            default_category: Category::GeneralInfo,
            max_words_per_passage: 220,
            overlap_percent: 0.15,
            embed_batch_size: 32,
        }
    }
}

impl IngestConfig {
    pub fn category_for_page(&self, page: u32) -> Category {
        self.page_ranges
            .iter()
            .find(|r| (r.start..=r.end).contains(&page))
            .map_or(self.default_category, |r| r.category)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DataConfig {
    pub pages_dir: String,
    pub corpus_path: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self { pages_dir: "../dev_data/pages".to_string(), corpus_path: "../dev_data/corpus.json".to_string() }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = RetrievalConfig::default();
        assert_eq!((c.dense_k, c.sparse_k, c.final_cap), (8, 6, 10));
        assert!((c.dense_weight - 0.6).abs() < f32::EPSILON);
        assert!((c.sparse_weight - 0.4).abs() < f32::EPSILON);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_knobs() {
        let bad_b = RetrievalConfig { bm25_b: 1.5, ..Default::default() };
        assert!(matches!(bad_b.validate(), Err(Error::InvalidConfig(_))));
        let no_cap = RetrievalConfig { final_cap: 0, ..Default::default() };
        assert!(no_cap.validate().is_err());
        let negative = RetrievalConfig { sparse_weight: -0.1, ..Default::default() };
        assert!(negative.validate().is_err());
        let silent = RetrievalConfig { dense_weight: 0.0, sparse_weight: 0.0, ..Default::default() };
        assert!(silent.validate().is_err());
        let stalled = RetrievalConfig { max_inflight_embeds: 0, ..RetrievalConfig::default() };
        assert!(stalled.validate().is_err());
    }

    #[test]
    fn figment_overrides_single_field_and_keeps_defaults() {
        let figment = Figment::new().merge(figment::providers::Toml::string("[retrieval]\nfinal_cap = 4\nnormalization = \"rank\"\n"));
        let config = Config::from_figment(figment);
        let r = config.retrieval().expect("retrieval");
        assert_eq!(r.final_cap, 4);
        assert_eq!(r.normalization, Normalization::Rank);
        assert_eq!(r.dense_k, 8);
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let config = Config::from_figment(Figment::new());
        assert_eq!(config.retrieval().expect("retrieval"), RetrievalConfig::default());
        assert_eq!(config.ingest().expect("ingest"), IngestConfig::default());
    }

    #[test]
    fn page_ranges_follow_handbook_layout() {
        let ingest = IngestConfig::default();
        assert_eq!(ingest.category_for_page(2), Category::GeneralInfo);
        assert_eq!(ingest.category_for_page(12), Category::CoursePrerequisites);
        assert_eq!(ingest.category_for_page(23), Category::ProgramDescription);
        assert_eq!(ingest.category_for_page(40), Category::TrainingRules);
        assert_eq!(ingest.category_for_page(99), Category::GeneralInfo);
    }

    #[test]
    fn resolve_keeps_absolute_paths() {
        let base = Path::new("/srv/syllabus");
        assert_eq!(resolve_with_base(base, "/tmp/corpus.json"), PathBuf::from("/tmp/corpus.json"));
        assert_eq!(resolve_with_base(base, "corpus.json"), PathBuf::from("/srv/syllabus/corpus.json"));
    }
}
