use indicatif::{ProgressBar, ProgressStyle};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use hybridrag_core::config::{Bm25Params, ChunkStrategy, IngestConfig};
use hybridrag_core::error::{Error, Result};
use hybridrag_core::segmenter::SemanticSegmenter;
use hybridrag_core::traits::{EmbeddingProvider, VectorIndex};
use hybridrag_core::types::{Document, VectorRecord};
use hybridrag_text::InvertedIndex;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
	pub documents: usize,
	pub chunks: usize,
	pub failed_chunks: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexStats {
	pub chunk_count: usize,
	pub strategy: ChunkStrategy,
	pub max_chunk_size: usize,
	pub chunk_overlap: usize,
	pub similarity_threshold: f32,
}

/// Segments documents, embeds every chunk and writes them batch by batch to
/// the vector index (and the inverted index, when one is attached). Chunks
/// left over from an earlier ingest of the same document are removed first.
pub struct IngestPipeline {
	segmenter: SemanticSegmenter,
	embedder: Arc<dyn EmbeddingProvider>,
	index: Arc<dyn VectorIndex>,
	inverted: Option<Arc<RwLock<InvertedIndex>>>,
	batch_size: usize,
	show_progress: bool,
}

impl IngestPipeline {
	pub fn new(segmenter: SemanticSegmenter, embedder: Arc<dyn EmbeddingProvider>, index: Arc<dyn VectorIndex>, config: &IngestConfig) -> Self {
		Self { segmenter, embedder, index, inverted: None, batch_size: config.batch_size.max(1), show_progress: false }
	}

	pub fn with_inverted_index(mut self, inverted: Arc<RwLock<InvertedIndex>>) -> Self { self.inverted = Some(inverted); self }

	pub fn with_progress(mut self, show_progress: bool) -> Self { self.show_progress = show_progress; self }

	pub async fn ingest(&self, documents: &[Document]) -> Result<IngestReport> {
		if documents.is_empty() { return Err(Error::InvalidArgument("no documents to ingest".into())); }
		info!("Ingesting {} documents in batches of {}", documents.len(), self.batch_size);
		let pb = if self.show_progress { ProgressBar::new(documents.len() as u64) } else { ProgressBar::hidden() };
		if let Ok(style) = ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} documents ({percent}%) {msg}") {
			pb.set_style(style.progress_chars("#>-"));
		}

		let mut report = IngestReport::default();
		for (batch_no, batch) in documents.chunks(self.batch_size).enumerate() {
			let mut records = Vec::new();
			for document in batch {
				for chunk in self.segmenter.segment(document).await {
					match self.embedder.embed(&chunk.content).await {
						Ok(vector) => records.push(VectorRecord { id: chunk.id, vector, content: chunk.content, metadata: chunk.metadata }),
						Err(e) => { warn!("Skipping chunk {}: {}", chunk.id, e); report.failed_chunks += 1; }
					}
				}
				report.documents += 1;
				pb.inc(1);
			}
			// a re-ingested document may now yield fewer chunks
			let mut stale = Vec::new();
			for document in batch { stale.extend(self.index.delete_source(&document.id).await?); }
			if !stale.is_empty() { debug!("Dropped {} previous chunks of batch {}", stale.len(), batch_no + 1); }
			self.index.upsert(&records).await?;
			if let Some(inverted) = &self.inverted {
				let mut inverted = inverted.write();
				for id in &stale { inverted.remove(id); }
				for r in &records { inverted.insert(Document { id: r.id.clone(), content: r.content.clone(), metadata: r.metadata.clone() }); }
			}
			report.chunks += records.len();
			pb.set_message(format!("batch {} stored {} chunks", batch_no + 1, records.len()));
		}
		pb.finish_with_message("done");
		info!("Ingested {} documents into {} chunks ({} failed)", report.documents, report.chunks, report.failed_chunks);
		Ok(report)
	}

	/// Empty the vector index and the attached inverted index.
	pub async fn reset(&self) -> Result<()> {
		self.index.clear().await?;
		if let Some(inverted) = &self.inverted { inverted.write().clear(); }
		info!("Index reset");
		Ok(())
	}

	pub async fn stats(&self) -> Result<IndexStats> {
		let cfg = self.segmenter.config();
		Ok(IndexStats {
			chunk_count: self.index.count().await?,
			strategy: cfg.strategy,
			max_chunk_size: cfg.max_chunk_size,
			chunk_overlap: cfg.chunk_overlap,
			similarity_threshold: cfg.similarity_threshold,
		})
	}
}

/// Build an inverted index from everything currently in `index`.
pub async fn load_inverted_index(index: &dyn VectorIndex, params: Bm25Params) -> Result<InvertedIndex> {
	let mut inverted = InvertedIndex::new(params);
	inverted.extend(index.get_all().await?);
	info!("Loaded {} documents into the inverted index", inverted.len());
	Ok(inverted)
}
