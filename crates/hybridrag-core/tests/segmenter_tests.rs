use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use hybridrag_core::config::{ChunkStrategy, ChunkingConfig};
use hybridrag_core::error::{Error, Result};
use hybridrag_core::segmenter::SemanticSegmenter;
use hybridrag_core::traits::EmbeddingProvider;
use hybridrag_core::types::Document;

/// Same vector for every input, so every boundary looks perfectly coherent.
#[derive(Default)]
struct UniformEmbedder {
    calls: AtomicUsize,
}

#[async_trait]
impl EmbeddingProvider for UniformEmbedder {
    fn dim(&self) -> usize { 3 }
    fn max_input_chars(&self) -> usize { 8000 }
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![1.0, 0.0, 0.0])
    }
}

struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    fn dim(&self) -> usize { 3 }
    fn max_input_chars(&self) -> usize { 8000 }
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(Error::Timeout("embedding service unreachable".into()))
    }
}

fn config(strategy: ChunkStrategy, max_chunk_size: usize) -> ChunkingConfig {
    ChunkingConfig { strategy, max_chunk_size, chunk_overlap: 0, ..ChunkingConfig::default() }
}

fn paragraphs(len: usize, count: usize) -> String {
    (0..count)
        .map(|i| char::from(b'a' + i as u8).to_string().repeat(len))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[tokio::test]
async fn separator_pushes_two_400_char_paragraphs_over_800() {
    let segmenter = SemanticSegmenter::new(Arc::new(UniformEmbedder::default()), config(ChunkStrategy::Paragraph, 800));
    let chunks = segmenter.split_paragraphs(&paragraphs(400, 3)).await;
    // 400 + "\n\n" + 400 = 802 exceeds the bound every time
    assert_eq!(chunks.len(), 3);
    assert!(chunks.iter().all(|c| c.chars().count() == 400));
}

#[tokio::test]
async fn candidate_equal_to_bound_is_merged() {
    let segmenter = SemanticSegmenter::new(Arc::new(UniformEmbedder::default()), config(ChunkStrategy::Paragraph, 800));
    let chunks = segmenter.split_paragraphs(&paragraphs(399, 3)).await;
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].chars().count(), 800);
    assert_eq!(chunks[1].chars().count(), 399);
}

#[tokio::test]
async fn oversized_paragraph_is_emitted_whole() {
    let segmenter = SemanticSegmenter::new(Arc::new(UniformEmbedder::default()), config(ChunkStrategy::Paragraph, 100));
    let text = format!("{}\n\n{}", "x".repeat(250), "short tail");
    let chunks = segmenter.split_paragraphs(&text).await;
    assert_eq!(chunks, vec!["x".repeat(250), "short tail".to_string()]);
}

#[tokio::test]
async fn text_without_paragraph_breaks_falls_back_to_fixed_slices() {
    let embedder = Arc::new(UniformEmbedder::default());
    let segmenter = SemanticSegmenter::new(embedder.clone(), config(ChunkStrategy::Paragraph, 1000));
    let chunks = segmenter.split_paragraphs(&"y".repeat(2500)).await;
    let lens: Vec<usize> = chunks.iter().map(|c| c.len()).collect();
    assert_eq!(lens, vec![1000, 1000, 500]);
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 0, "fallback path never probes similarity");
}

#[tokio::test]
async fn segment_attaches_ordinals_and_boundary_similarity() {
    let embedder = Arc::new(UniformEmbedder::default());
    let segmenter = SemanticSegmenter::new(embedder.clone(), config(ChunkStrategy::Paragraph, 800));
    let doc = Document::new("guide.txt", paragraphs(400, 3)).with_metadata("source", "guide.txt");
    let chunks = segmenter.segment(&doc).await;

    assert_eq!(chunks.len(), 3);
    for (i, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk.ordinal, i);
        assert_eq!(chunk.id, format!("guide.txt:{i}"));
        assert_eq!(chunk.source_ref, "guide.txt");
        assert_eq!(chunk.metadata.get("total_chunks").map(String::as_str), Some("3"));
        assert_eq!(chunk.metadata.get("source").map(String::as_str), Some("guide.txt"));
    }
    assert!(chunks[0].metadata.get("boundary_similarity").is_none());
    assert_eq!(chunks[1].metadata.get("boundary_similarity").map(String::as_str), Some("1.0000"));
    // two overflows, two windows each
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn embedding_failure_does_not_stop_segmentation() {
    let segmenter = SemanticSegmenter::new(Arc::new(FailingEmbedder), config(ChunkStrategy::Paragraph, 800));
    let doc = Document::new("d", paragraphs(400, 3));
    let chunks = segmenter.segment(&doc).await;
    assert_eq!(chunks.len(), 3);
    assert!(chunks.iter().all(|c| c.metadata.get("boundary_similarity").is_none()));
}

#[tokio::test]
async fn sentence_strategy_groups_sentences_up_to_bound() {
    let segmenter = SemanticSegmenter::new(Arc::new(UniformEmbedder::default()), config(ChunkStrategy::Sentence, 30));
    let text = "Fire needs fuel. Fire needs air. Water puts it out! Is it safe? Yes";
    let chunks = segmenter.split_sentences(text).await;
    assert_eq!(chunks, vec!["Fire needs fuel.", "Fire needs air.", "Water puts it out!", "Is it safe? Yes"]);
    assert!(chunks.iter().all(|c| c.chars().count() <= 30));
}

#[tokio::test]
async fn fixed_strategy_uses_overlap() {
    let cfg = ChunkingConfig { strategy: ChunkStrategy::Fixed, max_chunk_size: 10, chunk_overlap: 2, ..ChunkingConfig::default() };
    let segmenter = SemanticSegmenter::new(Arc::new(UniformEmbedder::default()), cfg);
    let chunks = segmenter.segment(&Document::new("n", "0123456789abcdefgh")).await;
    let contents: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
    assert_eq!(contents, vec!["0123456789", "89abcdefgh"]);
}

#[tokio::test]
async fn blank_document_yields_no_chunks() {
    let segmenter = SemanticSegmenter::new(Arc::new(UniformEmbedder::default()), ChunkingConfig::default());
    assert!(segmenter.segment(&Document::new("blank", "  \n\n  ")).await.is_empty());
}
