//! Domain types shared by the lexical, vector and fusion layers.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type ChunkId = String;
pub type Meta = HashMap<String, String>;

/// A source document owned by the corpus. Never mutated after ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub metadata: Meta,
}

impl Document {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self { id: id.into(), content: content.into(), metadata: Meta::new() }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A bounded contiguous unit of a document, the ingestion granularity.
///
/// - `id`: `"{source_ref}:{ordinal}"`
/// - `ordinal`: position within the parent document, starting at 0
/// - `source_ref`: id of the document the chunk was cut from
/// - `metadata`: the parent's metadata plus `chunk_index`/`total_chunks`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub content: String,
    pub ordinal: usize,
    pub source_ref: String,
    pub metadata: Meta,
}

/// Indicates which ranking axis produced a hit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SourceKind {
    Vector,
    Keyword,
}

/// Result of a single-axis search. Higher `score` is always better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub content: String,
    pub metadata: Meta,
    pub score: f32,
    pub source: SourceKind,
}

/// Row written to a vector index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub content: String,
    pub metadata: Meta,
}

/// Nearest-neighbour row returned by a vector index; smaller `distance` is closer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorMatch {
    pub id: String,
    pub content: String,
    pub metadata: Meta,
    pub distance: f32,
}

impl From<VectorRecord> for Document {
    fn from(r: VectorRecord) -> Self {
        Self { id: r.id, content: r.content, metadata: r.metadata }
    }
}

/// Id of the `ordinal`-th chunk cut from document `source_ref`.
pub fn chunk_id(source_ref: &str, ordinal: usize) -> ChunkId {
    format!("{source_ref}:{ordinal}")
}

/// The document a chunk id was cut from, or `None` if `id` is not a chunk id.
pub fn chunk_source(id: &str) -> Option<&str> {
    let (source, ordinal) = id.rsplit_once(':')?;
    (!ordinal.is_empty() && ordinal.bytes().all(|b| b.is_ascii_digit())).then_some(source)
}
