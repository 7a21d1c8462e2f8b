//! Weighted score fusion.
//!
//! Formula: `combined = alpha * v / max(v) + beta * k / max(k)`, each axis
//! normalized by its maximum over the merged candidate set. An axis whose
//! maximum is not positive contributes 0 everywhere, and negative normalized
//! values (BM25 can go below 0) are clamped to 0, which keeps `combined` in
//! `[0, 1]` for any valid weight pair.
use std::collections::HashMap;
use tracing::debug;

use hybridrag_core::config::Weights;
use hybridrag_core::types::SearchHit;

use crate::types::{dedup_key, CandidateResult, FusedResult};

/// Merge both ranked lists by dedup key, vector hits first. Ranks are the
/// 1-based position within each list; when a key repeats inside one list the
/// best-ranked occurrence is kept.
pub fn merge(vector_hits: &[SearchHit], keyword_hits: &[SearchHit]) -> Vec<CandidateResult> {
    let mut merged: Vec<CandidateResult> = Vec::with_capacity(vector_hits.len() + keyword_hits.len());
    let mut by_key: HashMap<String, usize> = HashMap::new();

    for (i, hit) in vector_hits.iter().enumerate() {
        let key = dedup_key(&hit.content);
        if by_key.contains_key(key) {
            debug!("Duplicate vector candidate at rank {} ignored", i + 1);
            continue;
        }
        by_key.insert(key.to_string(), merged.len());
        merged.push(CandidateResult {
            content: hit.content.clone(),
            metadata: hit.metadata.clone(),
            vector_score: hit.score,
            vector_rank: Some(i + 1),
            keyword_score: 0.0,
            keyword_rank: None,
        });
    }

    for (i, hit) in keyword_hits.iter().enumerate() {
        let key = dedup_key(&hit.content);
        match by_key.get(key) {
            Some(&idx) => {
                let candidate = &mut merged[idx];
                if candidate.keyword_rank.is_some() {
                    debug!("Duplicate keyword candidate at rank {} ignored", i + 1);
                    continue;
                }
                candidate.keyword_score = hit.score;
                candidate.keyword_rank = Some(i + 1);
            }
            None => {
                by_key.insert(key.to_string(), merged.len());
                merged.push(CandidateResult {
                    content: hit.content.clone(),
                    metadata: hit.metadata.clone(),
                    vector_score: 0.0,
                    vector_rank: None,
                    keyword_score: hit.score,
                    keyword_rank: Some(i + 1),
                });
            }
        }
    }
    merged
}

fn normalizer(max: f32) -> impl Fn(f32) -> f32 {
    move |score| if max > 0.0 { (score / max).max(0.0) } else { 0.0 }
}

/// Fuse two ranked lists into one ordering, best first. Ties keep merge order.
pub fn fuse(vector_hits: &[SearchHit], keyword_hits: &[SearchHit], weights: Weights) -> Vec<FusedResult> {
    let candidates = merge(vector_hits, keyword_hits);
    let max_vector = candidates.iter().map(|c| c.vector_score).fold(f32::NEG_INFINITY, f32::max);
    let max_keyword = candidates.iter().map(|c| c.keyword_score).fold(f32::NEG_INFINITY, f32::max);
    let norm_vector = normalizer(max_vector);
    let norm_keyword = normalizer(max_keyword);
    let (alpha, beta) = (weights.alpha(), weights.beta());

    let mut fused: Vec<FusedResult> = candidates
        .into_iter()
        .map(|c| {
            let combined = alpha * norm_vector(c.vector_score) + beta * norm_keyword(c.keyword_score);
            FusedResult {
                combined_score: combined.clamp(0.0, 1.0),
                content: c.content,
                metadata: c.metadata,
                vector_score: c.vector_score,
                keyword_score: c.keyword_score,
                vector_rank: c.vector_rank,
                keyword_rank: c.keyword_rank,
                alpha,
                beta,
            }
        })
        .collect();
    fused.sort_by(|a, b| b.combined_score.total_cmp(&a.combined_score));
    fused
}

#[cfg(test)]
mod tests {
    use super::*;
    use hybridrag_core::types::{Meta, SourceKind};

    fn hit(content: &str, score: f32, source: SourceKind) -> SearchHit {
        SearchHit { content: content.to_string(), metadata: Meta::new(), score, source }
    }

    fn v(content: &str, score: f32) -> SearchHit { hit(content, score, SourceKind::Vector) }
    fn k(content: &str, score: f32) -> SearchHit { hit(content, score, SourceKind::Keyword) }

    fn weights(alpha: f32, beta: f32) -> Weights { Weights::new(alpha, beta).expect("valid weights") }

    #[test]
    fn shared_prefix_merges_both_axes() {
        let prefix = "x".repeat(100);
        let a = format!("{prefix} tail one");
        let b = format!("{prefix} tail two");
        let merged = merge(&[v(&a, 0.8)], &[k(&b, 3.0)]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].vector_score, 0.8);
        assert_eq!(merged[0].keyword_score, 3.0);
        assert_eq!(merged[0].vector_rank, Some(1));
        assert_eq!(merged[0].keyword_rank, Some(1));
        assert_eq!(merged[0].content, a);
    }

    #[test]
    fn one_sided_candidates_default_to_zero_and_unranked() {
        let merged = merge(&[v("only vector", 0.5)], &[k("only keyword", 2.0)]);
        assert_eq!(merged.len(), 2);
        assert_eq!((merged[0].keyword_score, merged[0].keyword_rank), (0.0, None));
        assert_eq!((merged[1].vector_score, merged[1].vector_rank), (0.0, None));
    }

    #[test]
    fn combined_score_uses_normalized_axes() {
        let fused = fuse(&[v("a", 0.5), v("b", 0.25)], &[k("b", 4.0), k("c", 2.0)], weights(0.7, 0.3));
        let by = |c: &str| fused.iter().find(|f| f.content == c).expect("present").combined_score;
        assert!((by("a") - 0.7).abs() < 1e-6);
        assert!((by("b") - (0.7 * 0.5 + 0.3)).abs() < 1e-6);
        assert!((by("c") - 0.15).abs() < 1e-6);
        assert_eq!(fused[0].content, "a");
        assert_eq!(fused[0].alpha, 0.7);
    }

    #[test]
    fn zero_or_negative_axis_contributes_nothing() {
        let fused = fuse(&[v("a", 0.5)], &[k("a", -1.0), k("b", -2.0)], weights(0.5, 0.5));
        assert!((fused[0].combined_score - 0.5).abs() < 1e-6);
        assert_eq!(fused[1].combined_score, 0.0);
        assert_eq!(fused[1].keyword_score, -2.0);
    }

    #[test]
    fn negative_normalized_keyword_is_clamped() {
        let fused = fuse(&[], &[k("a", 2.0), k("b", -1.0)], weights(0.0, 1.0));
        assert_eq!(fused[0].combined_score, 1.0);
        assert_eq!(fused[1].combined_score, 0.0);
    }

    #[test]
    fn empty_axis_degrades_to_the_other() {
        let fused = fuse(&[v("a", 0.5), v("b", 0.25)], &[], weights(0.7, 0.3));
        assert_eq!(fused.len(), 2);
        assert!((fused[0].combined_score - 0.7).abs() < 1e-6);
        assert!((fused[1].combined_score - 0.35).abs() < 1e-6);
        assert!(fuse(&[], &[], weights(0.5, 0.5)).is_empty());
    }

    #[test]
    fn combined_scores_stay_in_unit_interval() {
        for (alpha, beta) in [(1.0, 0.0), (0.0, 1.0), (0.3, 0.7), (0.5, 0.5)] {
            let fused = fuse(&[v("a", 1.0), v("b", 0.01)], &[k("b", 9.0), k("c", 0.0), k("a", 0.3)], weights(alpha, beta));
            assert!(fused.iter().all(|f| (0.0..=1.0).contains(&f.combined_score)));
            assert!(fused.windows(2).all(|w| w[0].combined_score >= w[1].combined_score));
        }
    }

    #[test]
    fn repeated_key_within_an_axis_keeps_best_rank() {
        let merged = merge(&[v("dup", 0.9), v("dup", 0.1)], &[]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].vector_score, 0.9);
    }
}
