use async_trait::async_trait;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;

use hybridrag_core::error::Result;
use hybridrag_core::traits::EmbeddingProvider;

const DEFAULT_CAPACITY: usize = 10_000;

/// Memoizes embeddings by blake3 content hash, evicting the least recently
/// used entry when full. Failures are not cached.
pub struct CachedEmbedder {
    inner: Arc<dyn EmbeddingProvider>,
    entries: Mutex<LruCache<blake3::Hash, Vec<f32>>>,
}

impl CachedEmbedder {
    pub fn new(inner: Arc<dyn EmbeddingProvider>) -> Self {
        Self::with_capacity(inner, DEFAULT_CAPACITY)
    }

    /// A capacity of 0 is treated as 1.
    pub fn with_capacity(inner: Arc<dyn EmbeddingProvider>, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self { inner, entries: Mutex::new(LruCache::new(capacity)) }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[async_trait]
impl EmbeddingProvider for CachedEmbedder {
    fn dim(&self) -> usize {
        self.inner.dim()
    }

    fn max_input_chars(&self) -> usize {
        self.inner.max_input_chars()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let key = blake3::hash(text.as_bytes());
        if let Some(hit) = self.entries.lock().get(&key) {
            return Ok(hit.clone());
        }
        let vector = self.inner.embed(text).await?;
        self.entries.lock().put(key, vector.clone());
        Ok(vector)
    }
}
