//! hybridrag-embed
//!
//! Embedding providers and wrappers: a deterministic offline hash embedder,
//! OpenAI-compatible HTTP clients, an in-memory cache and the bounded retry
//! policy every embedding call goes through.
pub mod cache;
pub mod hash;
pub mod http;
pub mod retry;

pub use cache::CachedEmbedder;
pub use hash::HashEmbedder;
pub use http::{HttpCompleter, HttpEmbedder};
pub use retry::{truncate_chars, RetryPolicy, RetryingEmbedder};
