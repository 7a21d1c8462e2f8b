use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Document, VectorMatch, VectorRecord};

/// Turns text into a fixed-dimension vector.
///
/// Implementations report `RateLimited`, `Timeout` or `InvalidInput`; callers
/// truncate input to `max_input_chars` before calling rather than expecting a
/// rejection.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    fn dim(&self) -> usize;
    fn max_input_chars(&self) -> usize;
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// External nearest-neighbour store.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn upsert(&self, records: &[VectorRecord]) -> Result<()>;
    /// Up to `top_k` matches ordered by ascending distance.
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<VectorMatch>>;
    async fn get_all(&self) -> Result<Vec<Document>>;
    async fn count(&self) -> Result<usize>;
    /// Remove every chunk cut from document `source_ref` (see
    /// [`crate::types::chunk_source`]), returning the removed ids.
    async fn delete_source(&self, source_ref: &str) -> Result<Vec<String>>;
    /// Remove every row.
    async fn clear(&self) -> Result<()>;
}

/// Text completion service, used only for query expansion.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, prompt: &str, temperature: f32, max_tokens: u32) -> Result<String>;
}
