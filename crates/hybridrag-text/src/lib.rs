//! hybridrag-text
//!
//! Lexical side of retrieval: normalization and tokenization, BM25 scoring over
//! a corpus snapshot, and an incrementally maintained inverted index producing
//! the same scores without rescanning the corpus.
pub mod tokenizer;
pub mod bm25;
pub mod inverted;

pub use bm25::{idf, LexicalIndex, TermStatistics};
pub use inverted::InvertedIndex;
pub use tokenizer::{Tokenizer, Tokens, STOP_WORDS};
