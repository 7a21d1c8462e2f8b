use std::sync::Arc;
use tracing::debug;

use hybridrag_core::error::Result;
use hybridrag_core::traits::{EmbeddingProvider, VectorIndex};
use hybridrag_core::types::{SearchHit, SourceKind};

/// `1 / (1 + d)`, with negative distances treated as 0.
pub fn distance_to_similarity(distance: f32) -> f32 {
	1.0 / (1.0 + distance.max(0.0))
}

/// Embeds a query and maps nearest neighbours to similarity-scored hits.
#[derive(Clone)]
pub struct VectorSearchAdapter {
	embedder: Arc<dyn EmbeddingProvider>,
	index: Arc<dyn VectorIndex>,
}

impl VectorSearchAdapter {
	pub fn new(embedder: Arc<dyn EmbeddingProvider>, index: Arc<dyn VectorIndex>) -> Self { Self { embedder, index } }

	pub fn index(&self) -> &Arc<dyn VectorIndex> { &self.index }

	pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> { &self.embedder }

	/// Hits in descending similarity, at most `top_k`.
	pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchHit>> {
		if top_k == 0 { return Ok(Vec::new()); }
		let query_vector = self.embedder.embed(query).await?;
		let matches = self.index.query(&query_vector, top_k).await?;
		debug!("Vector index returned {} matches for top_k={}", matches.len(), top_k);
		Ok(matches
			.into_iter()
			.take(top_k)
			.map(|m| SearchHit { content: m.content, metadata: m.metadata, score: distance_to_similarity(m.distance), source: SourceKind::Vector })
			.collect())
	}
}
