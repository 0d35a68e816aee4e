use tantivy::tokenizer::{Language, LowerCaser, SimpleTokenizer, Stemmer, StopWordFilter, TextAnalyzer, TokenStream};

use syllabus_core::traits::Analyzer;
use syllabus_core::types::Postings;

const STOP_WORDS: &[&str] = &[
	"a","an","and","are","as","at","be","by","for","from","has","he","in","is","it","its","of","on","that","the","to","was","will","with","or","but","not","this","these","they","them","their","there","then","than","so","if","when","where","why","how","what","which","who","whom","whose","can","could","should","would","may","might","must","shall","do","does","did","have","had","having",
	"i","me","my","we","our","you","your","about","tell","please","any","some","something",
];

/// Tokenize, lowercase, drop stop words and stem (English). The same chain
/// produces passage postings at ingestion and query tokens at search time.
#[derive(Clone)]
pub struct HandbookAnalyzer {
	inner: TextAnalyzer,
}

impl Default for HandbookAnalyzer {
	fn default() -> Self {
		let inner = TextAnalyzer::builder(SimpleTokenizer::default())
			.filter(LowerCaser)
			.filter(StopWordFilter::remove(STOP_WORDS.iter().map(|s| s.to_string())))
			.filter(Stemmer::new(Language::English))
			.build();
		Self { inner }
	}
}

impl HandbookAnalyzer {
	pub fn new() -> Self { Self::default() }

	/// Token -> frequency map stored on each passage.
	pub fn postings(&self, text: &str) -> Postings {
		let mut postings = Postings::new();
		for token in self.tokens(text) { *postings.entry(token).or_insert(0) += 1; }
		postings
	}

	/// Query tokens with duplicates removed, first occurrence order kept.
	pub fn query_terms(&self, text: &str) -> Vec<String> {
		let mut terms: Vec<String> = Vec::new();
		for token in self.tokens(text) { if !terms.contains(&token) { terms.push(token); } }
		terms
	}
}

impl Analyzer for HandbookAnalyzer {
	fn tokens(&self, text: &str) -> Vec<String> {
		let mut analyzer = self.inner.clone();
		let mut stream = analyzer.token_stream(text);
		let mut out = Vec::new();
		while stream.advance() { out.push(stream.token().text.clone()); }
		out
	}
}
