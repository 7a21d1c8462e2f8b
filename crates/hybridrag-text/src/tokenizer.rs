use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").expect("Invalid non-word regex pattern"));

pub const STOP_WORDS: &[&str] = &[
	"the","a","an","and","or","but","in","on","at","to","for","of","with","by","from","as","is","was","are","were","be","been","being","have","has","had","do","does","did","will","would","could","should","may","might","must","can","this","that","these","those","i","you","he","she","it","we","they",
];

/// Lowercases, blanks out punctuation, splits on whitespace and drops short
/// tokens and stopwords. Cheap to clone; every call starts a fresh stream.
#[derive(Debug, Clone)]
pub struct Tokenizer {
	min_token_chars: usize,
	stop_words: HashSet<String>,
}

impl Default for Tokenizer {
	fn default() -> Self {
		Self::with_stop_words(STOP_WORDS.iter().copied())
	}
}

impl Tokenizer {
	pub fn new() -> Self { Self::default() }

	pub fn with_stop_words<I, S>(stop_words: I) -> Self where I: IntoIterator<Item = S>, S: Into<String> {
		Self { min_token_chars: 3, stop_words: stop_words.into_iter().map(Into::into).collect() }
	}

	/// Lazily split `text` into normalized tokens.
	pub fn tokens(&self, text: &str) -> Tokens<'_> {
		let lowered = text.to_lowercase();
		let normalized = NON_WORD.replace_all(&lowered, " ").into_owned();
		Tokens { tokenizer: self, normalized, pos: 0 }
	}

	pub fn tokenize(&self, text: &str) -> Vec<String> { self.tokens(text).collect() }

	fn keeps(&self, token: &str) -> bool {
		token.chars().count() >= self.min_token_chars && !self.stop_words.contains(token)
	}
}

pub struct Tokens<'t> {
	tokenizer: &'t Tokenizer,
	normalized: String,
	pos: usize,
}

impl Iterator for Tokens<'_> {
	type Item = String;

	fn next(&mut self) -> Option<String> {
		loop {
			let start = self.pos + self.normalized[self.pos..].find(|c: char| !c.is_whitespace())?;
			let end = self.normalized[start..].find(char::is_whitespace).map_or(self.normalized.len(), |i| start + i);
			self.pos = end;
			let token = &self.normalized[start..end];
			if self.tokenizer.keeps(token) { return Some(token.to_string()); }
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn normalizes_and_filters() {
		let t = Tokenizer::new();
		assert_eq!(t.tokenize("Express is a web-framework for Node.js!"), vec!["express", "web", "framework", "node"]);
	}

	#[test]
	fn drops_tokens_of_two_chars_or_fewer() {
		let t = Tokenizer::new();
		assert_eq!(t.tokenize("go to ai lab now"), vec!["lab", "now"]);
	}

	#[test]
	fn empty_and_punctuation_only_input() {
		let t = Tokenizer::new();
		assert!(t.tokenize("").is_empty());
		assert!(t.tokenize("  ?!... --- ").is_empty());
	}

	#[test]
	fn streams_are_restartable() {
		let t = Tokenizer::new();
		let text = "Rust compilers parse tokens";
		let first: Vec<String> = t.tokens(text).collect();
		let second: Vec<String> = t.tokens(text).collect();
		assert_eq!(first, second);
		assert_eq!(t.tokens(text).next().as_deref(), Some("rust"));
	}

	#[test]
	fn custom_stop_words() {
		let t = Tokenizer::with_stop_words(["rust"]);
		assert_eq!(t.tokenize("rust and the crab"), vec!["and", "the", "crab"]);
	}
}
