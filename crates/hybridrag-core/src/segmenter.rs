//! Length-bounded segmentation of documents into chunks.
//!
//! The greedy strategies accumulate paragraphs (or sentences) while the joined
//! text stays within `max_chunk_size` characters. Whenever the next unit would
//! overflow, the tail of the current chunk and the head of the next unit are
//! embedded and compared against `similarity_threshold`. Either outcome closes
//! the current chunk; the measured similarity is kept on the following chunk
//! as `boundary_similarity` so boundaries stay inspectable.
use futures::try_join;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::{ChunkStrategy, ChunkingConfig};
use crate::traits::EmbeddingProvider;
use crate::types::{chunk_id, Chunk, Document};

static PARAGRAPH_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\s*\n").expect("Invalid paragraph regex pattern"));

static SENTENCE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^.!?]+[.!?]+").expect("Invalid sentence regex pattern"));

pub const PARAGRAPH_SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone)]
struct Piece {
    text: String,
    boundary_similarity: Option<f32>,
}

impl Piece {
    fn plain(text: String) -> Self {
        Self { text, boundary_similarity: None }
    }
}

pub struct SemanticSegmenter {
    embedder: Arc<dyn EmbeddingProvider>,
    config: ChunkingConfig,
}

impl SemanticSegmenter {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, config: ChunkingConfig) -> Self {
        Self { embedder, config }
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// Cut `document` into chunks with the configured strategy.
    pub async fn segment(&self, document: &Document) -> Vec<Chunk> {
        let pieces = match self.config.strategy {
            ChunkStrategy::Paragraph => self.paragraph_pieces(&document.content).await,
            ChunkStrategy::Sentence => self.sentence_pieces(&document.content).await,
            ChunkStrategy::Fixed => {
                split_fixed(&document.content, self.config.max_chunk_size, self.config.chunk_overlap)
                    .into_iter()
                    .map(Piece::plain)
                    .collect()
            }
        };
        let total = pieces.len();
        debug!("Segmented document {} into {} chunks", document.id, total);

        pieces
            .into_iter()
            .enumerate()
            .map(|(ordinal, piece)| {
                let mut metadata = document.metadata.clone();
                metadata.insert("chunk_index".to_string(), ordinal.to_string());
                metadata.insert("total_chunks".to_string(), total.to_string());
                if let Some(similarity) = piece.boundary_similarity {
                    metadata.insert("boundary_similarity".to_string(), format!("{similarity:.4}"));
                }
                Chunk {
                    id: chunk_id(&document.id, ordinal),
                    content: piece.text,
                    ordinal,
                    source_ref: document.id.clone(),
                    metadata,
                }
            })
            .collect()
    }

    /// Paragraph-greedy split. Falls back to fixed-size slicing without
    /// overlap when the text has no paragraph breaks.
    pub async fn split_paragraphs(&self, text: &str) -> Vec<String> {
        self.paragraph_pieces(text).await.into_iter().map(|p| p.text).collect()
    }

    /// Sentence-greedy split on `.`, `!` and `?` terminators.
    pub async fn split_sentences(&self, text: &str) -> Vec<String> {
        self.sentence_pieces(text).await.into_iter().map(|p| p.text).collect()
    }

    async fn paragraph_pieces(&self, text: &str) -> Vec<Piece> {
        let paragraphs: Vec<&str> = PARAGRAPH_BREAK
            .split(text)
            .filter(|p| !p.trim().is_empty())
            .collect();
        if paragraphs.len() <= 1 {
            return split_fixed(text, self.config.max_chunk_size, 0)
                .into_iter()
                .map(Piece::plain)
                .collect();
        }

        let max = self.config.max_chunk_size;
        let window = self.config.window_chars;
        let mut pieces = Vec::new();
        let mut current = paragraphs[0].to_string();
        let mut current_similarity = None;

        for paragraph in &paragraphs[1..] {
            let candidate_len =
                char_len(&current) + PARAGRAPH_SEPARATOR.len() + char_len(paragraph);
            if candidate_len > max {
                let similarity = self
                    .boundary_similarity(tail_chars(&current, window), head_chars(paragraph, window))
                    .await;
                self.log_boundary(similarity);
                push_piece(&mut pieces, &current, current_similarity);
                current = (*paragraph).to_string();
                current_similarity = similarity;
            } else {
                current.push_str(PARAGRAPH_SEPARATOR);
                current.push_str(paragraph);
            }
        }
        push_piece(&mut pieces, &current, current_similarity);
        pieces
    }

    async fn sentence_pieces(&self, text: &str) -> Vec<Piece> {
        let sentences = split_sentence_units(text);
        let max = self.config.max_chunk_size;
        let mut pieces = Vec::new();
        let mut current = String::new();
        let mut sentences_in_chunk = 0usize;
        let mut current_similarity = None;
        let mut previous: Option<&str> = None;

        for sentence in sentences {
            if char_len(&current) + char_len(sentence) > max && !current.is_empty() {
                let similarity = match previous {
                    Some(last) if sentences_in_chunk > 1 => {
                        let similarity = self.boundary_similarity(last, sentence).await;
                        self.log_boundary(similarity);
                        similarity
                    }
                    _ => None,
                };
                push_piece(&mut pieces, &current, current_similarity);
                current = sentence.to_string();
                sentences_in_chunk = 1;
                current_similarity = similarity;
            } else {
                current.push_str(sentence);
                sentences_in_chunk += 1;
            }
            previous = Some(sentence);
        }
        push_piece(&mut pieces, &current, current_similarity);
        pieces
    }

    /// Cosine similarity of the two windows, or `None` when embedding fails.
    async fn boundary_similarity(&self, left: &str, right: &str) -> Option<f32> {
        match try_join!(self.embedder.embed(left), self.embedder.embed(right)) {
            Ok((a, b)) => Some(cosine_similarity(&a, &b)),
            Err(e) => {
                warn!("Boundary similarity unavailable, splitting on length only: {}", e);
                None
            }
        }
    }

    fn log_boundary(&self, similarity: Option<f32>) {
        // Coherent or not, an overflowing unit always starts a new chunk.
        match similarity {
            Some(s) if s >= self.config.similarity_threshold => {
                debug!("Chunk boundary inside coherent text (similarity {:.3})", s)
            }
            Some(s) => debug!("Chunk boundary at semantic break (similarity {:.3})", s),
            None => {}
        }
    }
}

fn push_piece(pieces: &mut Vec<Piece>, text: &str, boundary_similarity: Option<f32>) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        pieces.push(Piece { text: trimmed.to_string(), boundary_similarity });
    }
}

/// Sentences ending in a terminator, plus any unterminated tail. Text without
/// any terminator is returned whole.
fn split_sentence_units(text: &str) -> Vec<&str> {
    let mut units = Vec::new();
    let mut consumed = 0;
    for m in SENTENCE_PATTERN.find_iter(text) {
        units.push(m.as_str());
        consumed = m.end();
    }
    if units.is_empty() {
        return vec![text];
    }
    let rest = &text[consumed..];
    if !rest.trim().is_empty() {
        units.push(rest);
    }
    units
}

/// Fixed windows of `size` characters, consecutive windows sharing `overlap`
/// characters. Windows are trimmed and blank ones dropped.
pub fn split_fixed(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() || size == 0 {
        return Vec::new();
    }
    let step = size.saturating_sub(overlap).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + size).min(chars.len());
        let window: String = chars[start..end].iter().collect();
        let trimmed = window.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed.to_string());
        }
        if end >= chars.len() {
            break;
        }
        start += step;
    }
    chunks
}

/// Cosine similarity; 0 for mismatched dimensions or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn head_chars(s: &str, n: usize) -> &str {
    s.char_indices().nth(n).map_or(s, |(i, _)| &s[..i])
}

fn tail_chars(s: &str, n: usize) -> &str {
    let count = char_len(s);
    if count <= n {
        return s;
    }
    s.char_indices().nth(count - n).map_or(s, |(i, _)| &s[i..])
}
