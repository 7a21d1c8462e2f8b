use std::sync::Arc;
use tracing::debug;

use hybridrag_core::config::ExpansionConfig;
use hybridrag_core::error::Result;
use hybridrag_core::traits::CompletionProvider;

/// Broadens a query with related terms suggested by a completion model.
#[derive(Clone)]
pub struct QueryExpander {
    provider: Arc<dyn CompletionProvider>,
    temperature: f32,
    max_tokens: u32,
}

impl QueryExpander {
    pub fn new(provider: Arc<dyn CompletionProvider>, config: &ExpansionConfig) -> Self {
        Self { provider, temperature: config.temperature, max_tokens: config.max_tokens }
    }

    pub fn prompt(query: &str) -> String {
        format!(
            "Generate 3-5 synonyms or closely related terms for the following search query, separated by commas.\n\nOriginal query: {query}\n\nRelated terms:"
        )
    }

    /// Comma-separated terms, trimmed, empties dropped.
    pub fn parse_terms(response: &str) -> Vec<String> {
        response.split(',').map(str::trim).filter(|t| !t.is_empty()).map(str::to_string).collect()
    }

    /// `query` followed by the suggested terms, space separated. Provider
    /// errors are returned unchanged.
    pub async fn expand(&self, query: &str) -> Result<String> {
        let response = self.provider.complete(&Self::prompt(query), self.temperature, self.max_tokens).await?;
        let terms = Self::parse_terms(&response);
        debug!("Expansion added {} terms", terms.len());
        let mut expanded = query.to_string();
        for term in terms {
            expanded.push(' ');
            expanded.push_str(&term);
        }
        Ok(expanded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comma_separated_terms() {
        assert_eq!(QueryExpander::parse_terms(" fire starter, tinder ,, kindling,"), vec!["fire starter", "tinder", "kindling"]);
        assert!(QueryExpander::parse_terms(" , ").is_empty());
    }

    #[test]
    fn prompt_embeds_the_query() {
        assert!(QueryExpander::prompt("water purification").contains("Original query: water purification"));
    }
}
