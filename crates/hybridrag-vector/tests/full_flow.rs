use async_trait::async_trait;
use std::sync::Arc;

use hybridrag_core::error::{Error, Result};
use hybridrag_core::traits::{EmbeddingProvider, VectorIndex};
use hybridrag_core::types::{SourceKind, VectorRecord};
use hybridrag_vector::{LanceVectorIndex, MemoryVectorIndex, VectorSearchAdapter};

/// Maps a few keywords onto axes of a 3-d space.
struct KeywordEmbedder;

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    fn dim(&self) -> usize { 3 }
    fn max_input_chars(&self) -> usize { 1000 }
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let t = text.to_lowercase();
        Ok(vec![
            if t.contains("fire") { 1.0 } else { 0.0 },
            if t.contains("water") { 1.0 } else { 0.0 },
            if t.contains("shelter") { 1.0 } else { 0.0 },
        ])
    }
}

fn record(id: &str, vector: [f32; 3], content: &str) -> VectorRecord {
    let mut metadata = hybridrag_core::types::Meta::new();
    metadata.insert("source".to_string(), format!("{id}.txt"));
    VectorRecord { id: id.to_string(), vector: vector.to_vec(), content: content.to_string(), metadata }
}

fn records() -> Vec<VectorRecord> {
    vec![
        record("fire", [1.0, 0.0, 0.0], "Keep the fire small"),
        record("water", [0.0, 1.0, 0.0], "Boil water first"),
        record("shelter", [0.0, 0.0, 1.0], "Shelter from wind"),
    ]
}

async fn exercise(index: Arc<dyn VectorIndex>) {
    assert_eq!(index.count().await.expect("count"), 0);
    assert!(index.get_all().await.expect("get_all").is_empty());

    index.upsert(&records()).await.expect("upsert");
    assert_eq!(index.count().await.expect("count"), 3);

    let matches = index.query(&[0.0, 1.0, 0.0], 2).await.expect("query");
    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].id, "water");
    assert!(matches[0].distance.abs() < 1e-6);
    assert!((matches[1].distance - 2.0).abs() < 1e-5);
    assert_eq!(matches[0].metadata["source"], "water.txt");

    // same id replaces the row
    index.upsert(&[record("water", [0.0, 1.0, 0.0], "Filter then boil water")]).await.expect("upsert");
    assert_eq!(index.count().await.expect("count"), 3);
    let all = index.get_all().await.expect("get_all");
    assert!(all.iter().any(|d| d.content == "Filter then boil water"));
    assert!(!all.iter().any(|d| d.content == "Boil water first"));

    let adapter = VectorSearchAdapter::new(Arc::new(KeywordEmbedder), index.clone());
    let hits = adapter.search("how to start a fire", 3).await.expect("search");
    assert_eq!(hits.len(), 3);
    assert_eq!(hits[0].content, "Keep the fire small");
    assert!((hits[0].score - 1.0).abs() < 1e-6);
    assert!((hits[1].score - 1.0 / 3.0).abs() < 1e-5);
    assert!(hits.iter().all(|h| h.source == SourceKind::Vector));
    assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
}

#[tokio::test]
async fn memory_index_full_flow() {
    exercise(Arc::new(MemoryVectorIndex::new())).await;
}

#[tokio::test]
async fn lance_index_full_flow() {
    let dir = tempfile::tempdir().expect("tempdir");
    let index = LanceVectorIndex::open(&dir.path().join("lancedb"), "chunks", 3).await.expect("open");
    exercise(Arc::new(index)).await;
}

async fn exercise_deletes(index: Arc<dyn VectorIndex>) {
    assert!(index.delete_source("guide.txt").await.expect("delete on empty").is_empty());
    index
        .upsert(&[
            record("guide.txt:0", [1.0, 0.0, 0.0], "Keep the fire small"),
            record("guide.txt:1", [0.0, 1.0, 0.0], "Boil water first"),
            record("guide_txt:0", [0.0, 0.0, 1.0], "Shelter from wind"),
            record("guide.txt:1:2", [0.0, 0.0, 1.0], "Nested source"),
        ])
        .await
        .expect("upsert");

    let mut removed = index.delete_source("guide.txt").await.expect("delete");
    removed.sort();
    assert_eq!(removed, vec!["guide.txt:0".to_string(), "guide.txt:1".to_string()]);
    let mut left: Vec<String> = index.get_all().await.expect("get_all").into_iter().map(|d| d.id).collect();
    left.sort();
    assert_eq!(left, vec!["guide.txt:1:2".to_string(), "guide_txt:0".to_string()]);

    index.clear().await.expect("clear");
    assert_eq!(index.count().await.expect("count"), 0);
    index.upsert(&records()).await.expect("upsert after clear");
    assert_eq!(index.count().await.expect("count"), 3);
}

#[tokio::test]
async fn memory_index_deletes_by_source() {
    exercise_deletes(Arc::new(MemoryVectorIndex::new())).await;
}

#[tokio::test]
async fn lance_index_deletes_by_source() {
    let dir = tempfile::tempdir().expect("tempdir");
    let index = LanceVectorIndex::open(&dir.path().join("lancedb"), "chunks", 3).await.expect("open");
    exercise_deletes(Arc::new(index)).await;
}

#[tokio::test]
async fn dimension_mismatch_is_rejected() {
    let index = MemoryVectorIndex::new();
    index.upsert(&records()).await.expect("upsert");
    assert!(matches!(index.query(&[1.0, 0.0], 1).await, Err(Error::VectorIndex(_))));
    assert!(index.upsert(&[record("x", [1.0, 0.0, 0.0], "x"), VectorRecord { vector: vec![1.0], ..record("y", [0.0; 3], "y") }]).await.is_err());

    let dir = tempfile::tempdir().expect("tempdir");
    let lance = LanceVectorIndex::open(dir.path(), "chunks", 3).await.expect("open");
    assert!(matches!(lance.upsert(&[VectorRecord { vector: vec![1.0], ..record("y", [0.0; 3], "y") }]).await, Err(Error::VectorIndex(_))));
}

#[tokio::test]
async fn adapter_with_zero_k_skips_embedding() {
    let adapter = VectorSearchAdapter::new(Arc::new(KeywordEmbedder), Arc::new(MemoryVectorIndex::new()));
    assert!(adapter.search("fire", 0).await.expect("search").is_empty());
}
