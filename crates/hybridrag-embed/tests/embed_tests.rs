use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use hybridrag_core::error::{Error, Result};
use hybridrag_core::traits::EmbeddingProvider;
use hybridrag_embed::{CachedEmbedder, HashEmbedder, RetryPolicy, RetryingEmbedder};

/// Replays a fixed script of outcomes, then succeeds.
struct Scripted {
    script: Mutex<VecDeque<Error>>,
    calls: AtomicUsize,
    seen: Mutex<Vec<String>>,
    max_input_chars: usize,
}

impl Scripted {
    fn new(script: Vec<Error>) -> Self {
        Self { script: Mutex::new(script.into()), calls: AtomicUsize::new(0), seen: Mutex::new(Vec::new()), max_input_chars: 8000 }
    }
    fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }
}

#[async_trait]
impl EmbeddingProvider for Scripted {
    fn dim(&self) -> usize { 2 }
    fn max_input_chars(&self) -> usize { self.max_input_chars }
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().push(text.to_string());
        match self.script.lock().pop_front() {
            Some(e) => Err(e),
            None => Ok(vec![1.0, 0.0]),
        }
    }
}

fn fast_policy() -> RetryPolicy {
    RetryPolicy { max_attempts: 3, base_delay: Duration::from_millis(1) }
}

fn rate_limited() -> Error {
    Error::RateLimited { retry_after_ms: None }
}

#[tokio::test]
async fn retries_rate_limits_until_success() {
    let inner = Arc::new(Scripted::new(vec![rate_limited(), rate_limited()]));
    let embedder = RetryingEmbedder::new(inner.clone(), fast_policy());
    assert_eq!(embedder.embed("hello").await.expect("third attempt succeeds"), vec![1.0, 0.0]);
    assert_eq!(inner.calls(), 3);
}

#[tokio::test]
async fn gives_up_after_max_attempts_with_last_rate_limit() {
    let inner = Arc::new(Scripted::new(vec![rate_limited(), rate_limited(), Error::RateLimited { retry_after_ms: Some(1) }, rate_limited()]));
    let embedder = RetryingEmbedder::new(inner.clone(), fast_policy());
    let err = embedder.embed("hello").await.expect_err("exhausted");
    assert!(matches!(err, Error::RateLimited { retry_after_ms: Some(1) }));
    assert_eq!(inner.calls(), 3);
}

#[tokio::test]
async fn other_errors_are_not_retried() {
    let inner = Arc::new(Scripted::new(vec![Error::Timeout("slow".into())]));
    let embedder = RetryingEmbedder::new(inner.clone(), fast_policy());
    assert!(matches!(embedder.embed("hello").await, Err(Error::Timeout(_))));
    assert_eq!(inner.calls(), 1);

    let inner = Arc::new(Scripted::new(vec![Error::InvalidInput("bad".into())]));
    let embedder = RetryingEmbedder::new(inner.clone(), fast_policy());
    assert!(matches!(embedder.embed("hello").await, Err(Error::InvalidInput(_))));
    assert_eq!(inner.calls(), 1);
}

#[tokio::test]
async fn input_is_truncated_to_provider_limit() {
    let mut scripted = Scripted::new(vec![]);
    scripted.max_input_chars = 5;
    let inner = Arc::new(scripted);
    let embedder = RetryingEmbedder::new(inner.clone(), fast_policy());
    embedder.embed("abcdefghij").await.expect("embed");
    assert_eq!(inner.seen.lock().as_slice(), ["abcde".to_string()]);
}

#[tokio::test]
async fn cache_serves_repeats_without_calling_provider() {
    let inner = Arc::new(Scripted::new(vec![]));
    let cache = CachedEmbedder::new(inner.clone());
    cache.embed("same text").await.expect("embed");
    cache.embed("same text").await.expect("embed");
    cache.embed("other text").await.expect("embed");
    assert_eq!(inner.calls(), 2);
    assert_eq!(cache.len(), 2);
}

#[tokio::test]
async fn cache_does_not_store_failures() {
    let inner = Arc::new(Scripted::new(vec![Error::Provider("boom".into())]));
    let cache = CachedEmbedder::new(inner.clone());
    assert!(cache.embed("x").await.is_err());
    assert!(cache.is_empty());
    assert!(cache.embed("x").await.is_ok());
    assert_eq!(inner.calls(), 2);
}

#[tokio::test]
async fn cache_evicts_least_recently_used_entry() {
    let inner = Arc::new(Scripted::new(vec![]));
    let cache = CachedEmbedder::with_capacity(inner.clone(), 3);
    for text in ["hot", "a", "b"] {
        cache.embed(text).await.expect("embed");
    }
    cache.embed("hot").await.expect("embed");
    cache.embed("c").await.expect("embed");
    assert_eq!(cache.len(), 3);
    assert_eq!(inner.calls(), 4);

    cache.embed("hot").await.expect("embed");
    assert_eq!(inner.calls(), 4, "recently used entry survives the overflow");
    cache.embed("a").await.expect("embed");
    assert_eq!(inner.calls(), 5, "least recently used entry was evicted");
}

#[tokio::test]
async fn hash_embedder_places_shared_vocabulary_closer() {
    let e = HashEmbedder::new(256);
    let a = e.embed("boil water for drinking").await.expect("embed");
    let b = e.embed("drinking water boil safely").await.expect("embed");
    let c = e.embed("lean-to shelter roof").await.expect("embed");
    let dot = |x: &[f32], y: &[f32]| x.iter().zip(y).map(|(p, q)| p * q).sum::<f32>();
    assert!(dot(&a, &b) > dot(&a, &c));
}
