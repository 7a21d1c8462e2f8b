//! hybridrag-hybrid
//!
//! Weighted fusion of vector and BM25 rankings, the retriever that runs both
//! axes concurrently, LLM-backed query expansion and the ingestion pipeline
//! feeding the indexes.
pub mod expander;
pub mod fusion;
pub mod pipeline;
pub mod retriever;
pub mod types;

pub use expander::QueryExpander;
pub use fusion::fuse;
pub use pipeline::{load_inverted_index, IndexStats, IngestPipeline, IngestReport};
pub use retriever::{HybridRetriever, LexicalSource, SearchOptions};
pub use types::{dedup_key, CandidateResult, FusedResult, DEDUP_KEY_CHARS};
