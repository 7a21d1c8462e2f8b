//! Hybrid retrieval over a vector index and BM25.
//!
//! Each call fetches `candidate_multiplier * top_k` candidates from both axes
//! concurrently, fuses them (see [`crate::fusion`]) and keeps the best
//! `top_k`. BM25 runs on the blocking pool, either over a fresh corpus
//! snapshot from the vector index or over a shared [`InvertedIndex`].
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info, warn};

use hybridrag_core::config::{RetrievalConfig, Weights};
use hybridrag_core::error::{Error, Result};
use hybridrag_core::types::SearchHit;
use hybridrag_text::{InvertedIndex, LexicalIndex};
use hybridrag_vector::VectorSearchAdapter;

use crate::expander::QueryExpander;
use crate::fusion::fuse;
use crate::types::FusedResult;

/// Where the lexical axis reads its corpus from.
#[derive(Clone)]
pub enum LexicalSource {
	/// Score `VectorIndex::get_all()` fetched per query.
	Snapshot,
	/// Score a maintained inverted index.
	Indexed(Arc<RwLock<InvertedIndex>>),
}

/// Per-call overrides; unset fields fall back to the retriever's defaults.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchOptions {
	pub top_k: Option<usize>,
	pub weights: Option<Weights>,
}

pub struct HybridRetriever {
	vector: VectorSearchAdapter,
	lexical: LexicalIndex,
	source: LexicalSource,
	expander: Option<QueryExpander>,
	weights: Weights,
	top_k: usize,
	candidate_multiplier: usize,
}

impl HybridRetriever {
	pub fn new(vector: VectorSearchAdapter, config: &RetrievalConfig) -> Result<Self> {
		Ok(Self {
			vector,
			lexical: LexicalIndex::new(config.bm25),
			source: LexicalSource::Snapshot,
			expander: None,
			weights: config.weights()?,
			top_k: config.top_k,
			candidate_multiplier: config.candidate_multiplier.max(1),
		})
	}

	pub fn with_lexical_source(mut self, source: LexicalSource) -> Self { self.source = source; self }

	pub fn with_expander(mut self, expander: QueryExpander) -> Self { self.expander = Some(expander); self }

	pub fn weights(&self) -> Weights { self.weights }

	/// Replace the default weights. Exclusive access means no search can be
	/// running against the old pair.
	pub fn set_weights(&mut self, alpha: f32, beta: f32) -> Result<()> {
		self.weights = Weights::new(alpha, beta)?;
		info!("Fusion weights set to alpha={} beta={}", alpha, beta);
		Ok(())
	}

	pub async fn hybrid_search(&self, query: &str, top_k: usize) -> Result<Vec<FusedResult>> {
		self.search(query, SearchOptions { top_k: Some(top_k), weights: None }).await
	}

	pub async fn search(&self, query: &str, options: SearchOptions) -> Result<Vec<FusedResult>> {
		if query.trim().is_empty() { return Err(Error::InvalidArgument("query must not be blank".into())); }
		let top_k = options.top_k.unwrap_or(self.top_k);
		if top_k == 0 { return Err(Error::InvalidArgument("top_k must be > 0".into())); }
		let weights = options.weights.unwrap_or(self.weights);
		let candidates = top_k.saturating_mul(self.candidate_multiplier);

		let (vector_hits, keyword_hits) = tokio::try_join!(self.vector.search(query, candidates), self.lexical_search(query, candidates))?;
		debug!("Fusing {} vector and {} keyword candidates", vector_hits.len(), keyword_hits.len());

		let mut fused = fuse(&vector_hits, &keyword_hits, weights);
		fused.truncate(top_k);
		Ok(fused)
	}

	/// Expand the query first; if expansion fails or no expander is set, the
	/// original query is used.
	pub async fn expanded_hybrid_search(&self, query: &str, top_k: usize) -> Result<Vec<FusedResult>> {
		let expanded = match &self.expander {
			Some(expander) => match expander.expand(query).await {
				Ok(expanded) => { info!("Expanded query: {}", expanded); expanded }
				Err(e) => { warn!("Query expansion failed, using original query: {}", e); query.to_string() }
			},
			None => { debug!("No query expander configured"); query.to_string() }
		};
		self.hybrid_search(&expanded, top_k).await
	}

	async fn lexical_search(&self, query: &str, top_k: usize) -> Result<Vec<SearchHit>> {
		let query = query.to_string();
		let task = match &self.source {
			LexicalSource::Snapshot => {
				let corpus = self.vector.index().get_all().await?;
				let lexical = self.lexical.clone();
				tokio::task::spawn_blocking(move || lexical.search(&query, &corpus, top_k))
			}
			LexicalSource::Indexed(index) => {
				let index = Arc::clone(index);
				tokio::task::spawn_blocking(move || index.read().search(&query, top_k))
			}
		};
		task.await.map_err(|e| Error::Operation(format!("lexical search task failed: {e}")))
	}
}
