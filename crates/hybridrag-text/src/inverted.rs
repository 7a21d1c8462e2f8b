use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use hybridrag_core::config::Bm25Params;
use hybridrag_core::types::{Document, SearchHit, SourceKind};

use crate::bm25::{term_score, TermStatistics, TokenizedDoc};
use crate::tokenizer::Tokenizer;

struct IndexedDoc {
	document: Document,
	len: usize,
	seq: u64,
}

/// Postings kept up to date on insert/remove, so a query touches only the
/// statistics it needs instead of re-tokenizing the corpus. Scores and tie
/// order match [`crate::LexicalIndex::search`] over the same documents in
/// insertion order.
#[derive(Default)]
pub struct InvertedIndex {
	tokenizer: Tokenizer,
	params: Bm25Params,
	postings: HashMap<String, HashMap<String, u32>>,
	docs: HashMap<String, IndexedDoc>,
	order: BTreeMap<u64, String>,
	total_len: usize,
	next_seq: u64,
}

impl InvertedIndex {
	pub fn new(params: Bm25Params) -> Self { Self { params, ..Self::default() } }

	pub fn with_tokenizer(tokenizer: Tokenizer, params: Bm25Params) -> Self { Self { tokenizer, params, ..Self::default() } }

	pub fn len(&self) -> usize { self.docs.len() }

	pub fn is_empty(&self) -> bool { self.docs.is_empty() }

	pub fn contains(&self, id: &str) -> bool { self.docs.contains_key(id) }

	/// Add `document`, replacing any document with the same id in place.
	pub fn insert(&mut self, document: Document) {
		let seq = match self.detach(&document.id) {
			Some(seq) => seq,
			None => { let seq = self.next_seq; self.next_seq += 1; seq }
		};
		let tokenized = TokenizedDoc::new(&self.tokenizer, &document.content);
		for (term, tf) in tokenized.term_freq {
			self.postings.entry(term).or_default().insert(document.id.clone(), tf);
		}
		self.total_len += tokenized.len;
		self.order.insert(seq, document.id.clone());
		self.docs.insert(document.id.clone(), IndexedDoc { document, len: tokenized.len, seq });
	}

	pub fn extend<I: IntoIterator<Item = Document>>(&mut self, documents: I) {
		for document in documents { self.insert(document); }
	}

	/// Returns whether a document was removed.
	pub fn remove(&mut self, id: &str) -> bool {
		match self.detach(id) {
			Some(seq) => { self.order.remove(&seq); true }
			None => false,
		}
	}

	pub fn clear(&mut self) {
		let (tokenizer, params) = (self.tokenizer.clone(), self.params);
		*self = Self::with_tokenizer(tokenizer, params);
	}

	/// Drop `id` from postings and totals, handing back its sequence number.
	fn detach(&mut self, id: &str) -> Option<u64> {
		let old = self.docs.remove(id)?;
		self.total_len -= old.len;
		for term in self.tokenizer.tokens(&old.document.content) {
			if let Some(posting) = self.postings.get_mut(&term) {
				posting.remove(id);
				if posting.is_empty() { self.postings.remove(&term); }
			}
		}
		Some(old.seq)
	}

	pub fn document_frequency(&self, term: &str) -> usize { self.postings.get(term).map_or(0, HashMap::len) }

	pub fn average_doc_length(&self) -> f32 {
		if self.docs.is_empty() { 0.0 } else { self.total_len as f32 / self.docs.len() as f32 }
	}

	pub fn statistics(&self, query_terms: &[String]) -> TermStatistics {
		let document_frequency = query_terms.iter().map(|t| (t.clone(), self.document_frequency(t))).collect();
		TermStatistics { document_frequency, average_doc_length: self.average_doc_length(), document_count: self.docs.len() }
	}

	/// Documents in insertion order.
	pub fn documents(&self) -> impl Iterator<Item = &Document> + '_ {
		self.order.values().filter_map(|id| self.docs.get(id)).map(|d| &d.document)
	}

	pub fn search(&self, query: &str, top_k: usize) -> Vec<SearchHit> {
		if self.docs.is_empty() || top_k == 0 { return Vec::new(); }
		let query_terms = self.tokenizer.tokenize(query);
		let stats = self.statistics(&query_terms);
		let weighted: Vec<(Option<&HashMap<String, u32>>, f32)> = query_terms.iter().map(|t| (self.postings.get(t), stats.idf(t))).collect();

		let mut scored: Vec<(&IndexedDoc, f32)> = self
			.order
			.values()
			.filter_map(|id| self.docs.get(id))
			.map(|doc| {
				let score = weighted
					.iter()
					.map(|(posting, idf)| {
						let tf = posting.and_then(|p| p.get(&doc.document.id)).copied().unwrap_or(0);
						term_score(*idf, tf, doc.len, stats.average_doc_length, self.params)
					})
					.sum();
				(doc, score)
			})
			.collect();
		scored.sort_by(|a, b| b.1.total_cmp(&a.1));
		scored.truncate(top_k);
		debug!("Inverted index scored {} documents over {} postings", self.docs.len(), self.postings.len());

		scored
			.into_iter()
			.map(|(doc, score)| SearchHit { content: doc.document.content.clone(), metadata: doc.document.metadata.clone(), score, source: SourceKind::Keyword })
			.collect()
	}
}
