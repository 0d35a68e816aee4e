use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};

use crate::classifier::extract_course_code;
use crate::config::IngestConfig;
use crate::metadata::extract_metadata;
use crate::types::{Category, PassageMeta};

/// A passage before embedding and posting extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct PassageDraft {
    pub id: String,
    pub text: String,
    pub page: u32,
    pub category: Category,
    pub source: String,
    pub course_code: Option<String>,
    pub meta: PassageMeta,
}

/// Splits handbook pages into passages. One `.txt` file per page; the page
/// number is the trailing run of digits in the file stem (`page_012.txt`).
#[derive(Default)]
pub struct DataProcessor {
    config: IngestConfig,
}

impl DataProcessor {
    pub fn new(config: IngestConfig) -> Self { Self { config } }

    pub fn process_directory(&self, pages_dir: &Path) -> Result<Vec<PassageDraft>> {
        let files = self.list_txt_files(pages_dir);
        if files.is_empty() {
            tracing::warn!(dir = %pages_dir.display(), "no .txt pages found");
            return Ok(vec![]);
        }
        let mut drafts = Vec::new();
        for file_path in &files {
            let Some(page) = page_number(file_path) else {
                tracing::warn!(file = %file_path.display(), "skipping file without a page number");
                continue;
            };
            let content = self.read_file_content(file_path)?;
            let source = file_path.strip_prefix(pages_dir).unwrap_or(file_path).to_string_lossy().to_string();
            let page_drafts = self.chunk_page(&content, page, &source);
            tracing::debug!(file = %source, page, passages = page_drafts.len(), "page processed");
            drafts.extend(page_drafts);
        }
        tracing::info!(files = files.len(), passages = drafts.len(), "pages processed");
        Ok(drafts)
    }

    fn read_file_content(&self, file_path: &Path) -> Result<String> {
        match fs::read_to_string(file_path) {
            Ok(content) => Ok(content),
            Err(_) => Ok(String::from_utf8_lossy(&fs::read(file_path)?).to_string()),
        }
    }

    /// Paragraphs become passages; paragraphs above the word limit are split
    /// into overlapping windows. Category comes from the page range.
    pub fn chunk_page(&self, content: &str, page: u32, source: &str) -> Vec<PassageDraft> {
        let category = self.config.category_for_page(page);
        let content = content.replace("\r\n", "\n");
        let mut texts = Vec::new();
        for paragraph in content.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
            if paragraph.split_whitespace().count() <= self.config.max_words_per_passage {
                texts.push(paragraph.to_string());
            } else {
                texts.extend(self.split_paragraph_with_overlap(paragraph));
            }
        }
        texts
            .into_iter()
            .enumerate()
            .map(|(i, text)| PassageDraft {
                id: format!("p{page:03}-{i}"),
                course_code: extract_course_code(&text),
                meta: extract_metadata(&text, category),
                text,
                page,
                category,
                source: source.to_string(),
            })
            .collect()
    }

    fn split_paragraph_with_overlap(&self, paragraph: &str) -> Vec<String> {
        let words: Vec<&str> = paragraph.split_whitespace().collect();
        let window = self.config.max_words_per_passage.max(1);
        let overlap = ((window as f32 * self.config.overlap_percent) as usize).min(window - 1);
        let mut chunks = Vec::new();
        let mut start = 0;
        while start < words.len() {
            let end = (start + window).min(words.len());
            chunks.push(words[start..end].join(" "));
            if end >= words.len() { break; }
            start = end - overlap;
        }
        chunks
    }

    fn list_txt_files(&self, root: &Path) -> Vec<PathBuf> {
        let mut txt_files = Vec::new();
        for entry in walkdir::WalkDir::new(root).into_iter().filter_map(|e| e.ok()).filter(|e| e.file_type().is_file()) {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) == Some("txt") { txt_files.push(path.to_path_buf()); }
        }
        txt_files.sort();
        txt_files
    }
}

fn page_number(path: &Path) -> Option<u32> {
    let stem = path.file_stem()?.to_str()?;
    let digits: String = stem.chars().rev().take_while(char::is_ascii_digit).collect::<Vec<_>>().into_iter().rev().collect();
    digits.parse().ok()
}
