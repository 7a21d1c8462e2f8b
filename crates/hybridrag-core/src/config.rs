//! Layered configuration and path helpers.
//!
//! Figment merges built-in defaults, `config.toml`, `config.<env>.toml`
//! (picked by `RUST_ENV`) and `APP_*` environment variables, where `__`
//! separates nested keys (`APP_RETRIEVAL__TOP_K=10`).
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Largest tolerated deviation of `alpha + beta` from 1.
pub const WEIGHT_EPSILON: f32 = 1e-6;

pub struct Config {
    figment: Figment,
    env_name: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("."))
    }

    /// Load with config files looked up in `dir`.
    pub fn load_from(dir: &Path) -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_for_env(dir, &env_name)
    }

    pub fn load_for_env(dir: &Path, env_name: &str) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(dir.join("config.toml")));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment, env_name: env_name.to_string() };
        config.settings()?;
        Ok(config)
    }

    pub fn env_name(&self) -> &str {
        &self.env_name
    }

    /// Typed view of the whole configuration, validated.
    pub fn settings(&self) -> Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }
}

/// A validated `(alpha, beta)` fusion weight pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Weights {
    alpha: f32,
    beta: f32,
}

impl Weights {
    pub fn new(alpha: f32, beta: f32) -> Result<Self> {
        let valid = alpha.is_finite()
            && beta.is_finite()
            && alpha >= 0.0
            && beta >= 0.0
            && ((alpha + beta) - 1.0).abs() <= WEIGHT_EPSILON;
        if !valid {
            return Err(Error::InvalidWeights { alpha, beta });
        }
        Ok(Self { alpha, beta })
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn beta(&self) -> f32 {
        self.beta
    }
}

impl Default for Weights {
    fn default() -> Self {
        Self { alpha: 0.7, beta: 0.3 }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data: DataConfig,
    pub retrieval: RetrievalConfig,
    pub chunking: ChunkingConfig,
    pub embedding: EmbeddingConfig,
    pub expansion: ExpansionConfig,
    pub ingest: IngestConfig,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        self.retrieval.weights()?;
        if self.retrieval.top_k == 0 {
            return Err(Error::InvalidConfig("retrieval.top_k must be > 0".into()));
        }
        if self.retrieval.candidate_multiplier == 0 {
            return Err(Error::InvalidConfig("retrieval.candidate_multiplier must be > 0".into()));
        }
        if self.retrieval.bm25.k1 <= 0.0 {
            return Err(Error::InvalidConfig("retrieval.bm25.k1 must be > 0".into()));
        }
        if !(0.0..=1.0).contains(&self.retrieval.bm25.b) {
            return Err(Error::InvalidConfig("retrieval.bm25.b must be within [0, 1]".into()));
        }
        if self.chunking.max_chunk_size == 0 {
            return Err(Error::InvalidConfig("chunking.max_chunk_size must be > 0".into()));
        }
        if self.chunking.chunk_overlap >= self.chunking.max_chunk_size {
            return Err(Error::InvalidConfig("chunking.chunk_overlap must be smaller than max_chunk_size".into()));
        }
        if !(0.0..=1.0).contains(&self.chunking.similarity_threshold) {
            return Err(Error::InvalidConfig("chunking.similarity_threshold must be within [0, 1]".into()));
        }
        if self.embedding.max_attempts == 0 {
            return Err(Error::InvalidConfig("embedding.max_attempts must be > 0".into()));
        }
        if self.ingest.batch_size == 0 {
            return Err(Error::InvalidConfig("ingest.batch_size must be > 0".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub raw_txt_dir: String,
    pub lancedb_dir: String,
    pub table: String,
    pub max_file_bytes: u64,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            raw_txt_dir: "./data/txt".to_string(),
            lancedb_dir: "./data/indexes/lancedb".to_string(),
            table: "documents".to_string(),
            max_file_bytes: 5 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bm25Params {
    pub k1: f32,
    pub b: f32,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.5, b: 0.75 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub alpha: f32,
    pub beta: f32,
    pub top_k: usize,
    /// Each axis fetches `candidate_multiplier * top_k` candidates before fusion.
    pub candidate_multiplier: usize,
    pub bm25: Bm25Params,
}

impl RetrievalConfig {
    pub fn weights(&self) -> Result<Weights> {
        Weights::new(self.alpha, self.beta)
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        let weights = Weights::default();
        Self {
            alpha: weights.alpha(),
            beta: weights.beta(),
            top_k: 5,
            candidate_multiplier: 2,
            bm25: Bm25Params::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkStrategy {
    Paragraph,
    Sentence,
    Fixed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub strategy: ChunkStrategy,
    pub max_chunk_size: usize,
    pub chunk_overlap: usize,
    pub similarity_threshold: f32,
    /// Characters compared on each side of a candidate boundary.
    pub window_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            strategy: ChunkStrategy::Paragraph,
            max_chunk_size: 1000,
            chunk_overlap: 100,
            similarity_threshold: 0.7,
            window_chars: 200,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    Hash,
    OpenAi,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingBackend,
    pub endpoint: String,
    pub model: String,
    pub dimension: usize,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_input_chars: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingBackend::Hash,
            endpoint: "https://api.openai.com/v1/embeddings".to_string(),
            model: "text-embedding-ada-002".to_string(),
            dimension: 384,
            timeout_secs: 30,
            max_attempts: 3,
            base_delay_ms: 2000,
            max_input_chars: 8000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpansionConfig {
    pub endpoint: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            temperature: 0.3,
            max_tokens: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub batch_size: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self { batch_size: 5 }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against `base` after expansion.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
