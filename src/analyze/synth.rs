// src/analyze/synth.rs
use serde::Serialize;
use std::collections::HashMap;

use crate::document::{Analysis, Document};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Synthesis {
    pub score: f64,
    pub topics: Vec<String>,
}

/// Mean score and top-`top_n` topics over the given documents.
///
/// Documents without an analysis are ignored. An empty input yields the
/// neutral 0.5 and no topics. Topics are ranked by count, ties broken by the
/// order in which each topic was first seen.
pub fn synthesize(docs: &[Document], top_n: usize) -> Synthesis {
    let scores: Vec<f64> = docs.iter().filter_map(Document::score).collect();
    let topics = rank_topics(
        docs.iter()
            .filter_map(|d| d.analysis.as_ref())
            .flat_map(|a| a.topics.iter().map(String::as_str)),
        top_n,
    );
    Synthesis {
        score: weighted_score(&scores, &[]),
        topics,
    }
}

/// Arithmetic mean where each source-level `overall` figure counts twice.
/// Returns 0.5 when there is nothing to average.
pub fn weighted_score(scores: &[f64], overall: &[f64]) -> f64 {
    let sum: f64 = scores.iter().sum::<f64>() + 2.0 * overall.iter().sum::<f64>();
    let weight = scores.len() + 2 * overall.len();
    if weight == 0 {
        return Analysis::NEUTRAL;
    }
    (sum / weight as f64).clamp(0.0, 1.0)
}

pub fn rank_topics<'a>(topics: impl IntoIterator<Item = &'a str>, top_n: usize) -> Vec<String> {
    // topic -> (count, first-seen index)
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (i, t) in topics.into_iter().enumerate() {
        let t = t.trim();
        if t.is_empty() {
            continue;
        }
        counts.entry(t).or_insert((0, i)).0 += 1;
    }
    let mut ranked: Vec<(&str, usize, usize)> =
        counts.into_iter().map(|(t, (c, first))| (t, c, first)).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
    ranked
        .into_iter()
        .take(top_n)
        .map(|(t, _, _)| t.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Confidence;

    fn scored(score: f64, topics: &[&str]) -> Document {
        Document {
            title: "t".into(),
            author: String::new(),
            content: String::new(),
            url: String::new(),
            created_at: None,
            source: "s".into(),
            ticker: None,
            likes: 0,
            synthetic: false,
            analysis: Some(Analysis {
                sentiment_score: score,
                topics: topics.iter().map(|s| s.to_string()).collect(),
                confidence: Confidence::Medium,
                degraded: false,
            }),
        }
    }

    #[test]
    fn empty_is_neutral() {
        let s = synthesize(&[], 5);
        assert_eq!(s.score, 0.5);
        assert!(s.topics.is_empty());
    }

    #[test]
    fn topics_rank_by_count_then_first_seen() {
        let docs = vec![
            scored(0.2, &["rates", "ai"]),
            scored(0.4, &["growth", "ai"]),
            scored(0.9, &["growth", "tariffs"]),
        ];
        let s = synthesize(&docs, 3);
        assert_eq!(s.topics, vec!["ai", "growth", "rates"]);
        assert!((s.score - 0.5).abs() < 1e-9);
    }

    #[test]
    fn overall_figures_count_double() {
        assert!((weighted_score(&[0.2, 0.8], &[0.8]) - 0.65).abs() < 1e-9);
        assert_eq!(weighted_score(&[], &[]), 0.5);
    }

    #[test]
    fn score_ignores_input_order() {
        let a = vec![scored(0.1, &[]), scored(0.7, &[]), scored(0.4, &[])];
        let mut b = a.clone();
        b.reverse();
        assert!((synthesize(&a, 5).score - synthesize(&b, 5).score).abs() < 1e-12);
    }
}
