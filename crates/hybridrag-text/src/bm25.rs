use std::collections::HashMap;
use tracing::debug;

use hybridrag_core::config::Bm25Params;
use hybridrag_core::types::{Document, SearchHit, SourceKind};

use crate::tokenizer::Tokenizer;

/// Corpus statistics for the terms of one query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TermStatistics {
	pub document_frequency: HashMap<String, usize>,
	pub average_doc_length: f32,
	pub document_count: usize,
}

impl TermStatistics {
	pub fn idf(&self, term: &str) -> f32 {
		idf(self.document_count, self.document_frequency.get(term).copied().unwrap_or(0))
	}
}

/// `ln((N - df + 0.5) / (df + 0.5))`. Goes negative once a term appears in
/// more than half of the corpus; that is kept as is.
pub fn idf(document_count: usize, document_frequency: usize) -> f32 {
	let n = document_count as f32;
	let df = document_frequency as f32;
	((n - df + 0.5) / (df + 0.5)).ln()
}

/// Saturated, length-normalized contribution of one query term.
pub(crate) fn term_score(idf: f32, tf: u32, doc_len: usize, average_doc_length: f32, params: Bm25Params) -> f32 {
	if tf == 0 { return 0.0; }
	let tf = tf as f32;
	let length_ratio = if average_doc_length > 0.0 { doc_len as f32 / average_doc_length } else { 0.0 };
	let numerator = tf * (params.k1 + 1.0);
	let denominator = tf + params.k1 * (1.0 - params.b + params.b * length_ratio);
	idf * (numerator / denominator)
}

pub(crate) struct TokenizedDoc {
	pub(crate) term_freq: HashMap<String, u32>,
	pub(crate) len: usize,
}

impl TokenizedDoc {
	pub(crate) fn new(tokenizer: &Tokenizer, content: &str) -> Self {
		let mut term_freq = HashMap::new();
		let mut len = 0;
		for token in tokenizer.tokens(content) {
			*term_freq.entry(token).or_insert(0) += 1;
			len += 1;
		}
		Self { term_freq, len }
	}

	pub(crate) fn tf(&self, term: &str) -> u32 { self.term_freq.get(term).copied().unwrap_or(0) }
}

/// BM25 over a corpus snapshot. Statistics are derived from scratch on every
/// call, so results always reflect exactly the documents passed in.
#[derive(Debug, Clone, Default)]
pub struct LexicalIndex {
	tokenizer: Tokenizer,
	params: Bm25Params,
}

impl LexicalIndex {
	pub fn new(params: Bm25Params) -> Self { Self { tokenizer: Tokenizer::default(), params } }

	pub fn with_tokenizer(tokenizer: Tokenizer, params: Bm25Params) -> Self { Self { tokenizer, params } }

	pub fn params(&self) -> Bm25Params { self.params }

	pub fn tokenizer(&self) -> &Tokenizer { &self.tokenizer }

	pub fn term_statistics(&self, query_terms: &[String], corpus: &[Document]) -> TermStatistics {
		let docs: Vec<TokenizedDoc> = corpus.iter().map(|d| TokenizedDoc::new(&self.tokenizer, &d.content)).collect();
		statistics(query_terms, &docs)
	}

	/// Score every document against `query` and keep the best `top_k`.
	/// Ties keep corpus order.
	pub fn search(&self, query: &str, corpus: &[Document], top_k: usize) -> Vec<SearchHit> {
		if corpus.is_empty() || top_k == 0 { return Vec::new(); }
		let query_terms = self.tokenizer.tokenize(query);
		let docs: Vec<TokenizedDoc> = corpus.iter().map(|d| TokenizedDoc::new(&self.tokenizer, &d.content)).collect();
		let stats = statistics(&query_terms, &docs);
		let idfs: Vec<f32> = query_terms.iter().map(|t| stats.idf(t)).collect();

		let mut scored: Vec<(usize, f32)> = docs
			.iter()
			.enumerate()
			.map(|(i, doc)| {
				let score = query_terms
					.iter()
					.zip(&idfs)
					.map(|(term, idf)| term_score(*idf, doc.tf(term), doc.len, stats.average_doc_length, self.params))
					.sum();
				(i, score)
			})
			.collect();
		scored.sort_by(|a, b| b.1.total_cmp(&a.1));
		scored.truncate(top_k);
		debug!("BM25 scored {} documents for {} query terms", docs.len(), query_terms.len());

		scored
			.into_iter()
			.map(|(i, score)| SearchHit { content: corpus[i].content.clone(), metadata: corpus[i].metadata.clone(), score, source: SourceKind::Keyword })
			.collect()
	}
}

fn statistics(query_terms: &[String], docs: &[TokenizedDoc]) -> TermStatistics {
	let document_count = docs.len();
	let total_len: usize = docs.iter().map(|d| d.len).sum();
	let average_doc_length = if document_count > 0 { total_len as f32 / document_count as f32 } else { 0.0 };
	let mut document_frequency = HashMap::new();
	for term in query_terms {
		if document_frequency.contains_key(term) { continue; }
		let df = docs.iter().filter(|d| d.term_freq.contains_key(term)).count();
		document_frequency.insert(term.clone(), df);
	}
	TermStatistics { document_frequency, average_doc_length, document_count }
}
