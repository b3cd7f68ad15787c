// src/analyze/lexicon.rs
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

use crate::analyze::SentimentScorer;
use crate::document::{Analysis, Confidence, Document};
use crate::error::ServiceError;

static LEXICON: Lazy<HashMap<String, i32>> = Lazy::new(|| {
    let raw = include_str!("../../sentiment_lexicon.json");
    serde_json::from_str::<HashMap<String, i32>>(raw).expect("valid sentiment lexicon")
});

static RE_CASHTAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?P<tag>\$[a-z]{1,5})\b").expect("cashtag regex"));
static RE_HASHTAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?P<tag>#[a-z0-9_]+)\b").expect("hashtag regex"));

/// Topic keywords matched as whole tokens; value is the emitted topic label.
const TOPIC_KEYWORDS: &[(&str, &str)] = &[
    ("earnings", "earnings"),
    ("revenue", "revenue"),
    ("growth", "growth"),
    ("layoffs", "layoffs"),
    ("ai", "AI"),
    ("cloud", "cloud"),
    ("ev", "EV"),
    ("blockchain", "blockchain"),
    ("regulation", "regulation"),
    ("antitrust", "regulation"),
    ("scrutiny", "regulation"),
    ("innovation", "innovation"),
    ("competition", "competition"),
    ("launch", "launch"),
    ("bullish", "bullish"),
    ("bearish", "bearish"),
    ("inflation", "inflation"),
    ("rates", "rates"),
    ("tariffs", "tariffs"),
];

/// Raw score at which a document is considered strongly polarized.
const HIGH_CONFIDENCE_ABS: i32 = 3;

/// Offline scorer: word lexicon with a 3-token negation window.
#[derive(Debug, Clone, Default)]
pub struct LexiconScorer;

impl LexiconScorer {
    pub fn new() -> Self {
        Self
    }

    #[inline]
    fn word_score(&self, w: &str) -> i32 {
        *LEXICON.get(w).unwrap_or(&0)
    }

    /// Returns (raw score, lexicon hits). A negator in the previous 1..=3
    /// tokens flips the sign of a word's score.
    pub fn score_text(&self, text: &str) -> (i32, usize) {
        let tokens: Vec<String> = tokenize(text).collect();
        let mut score = 0;
        let mut hits = 0;
        for i in 0..tokens.len() {
            let base = self.word_score(&tokens[i]);
            if base == 0 {
                continue;
            }
            let negated = (1..=3).any(|k| i >= k && is_negator(&tokens[i - k]));
            score += if negated { -base } else { base };
            hits += 1;
        }
        (score, hits)
    }

    pub fn analyze(&self, doc: &Document) -> Analysis {
        let text = format!("{} {}", doc.title, doc.content);
        let (raw, hits) = self.score_text(&text);
        let confidence = if raw.abs() >= HIGH_CONFIDENCE_ABS {
            Confidence::High
        } else if hits > 0 {
            Confidence::Medium
        } else {
            Confidence::Low
        };
        Analysis {
            sentiment_score: squash(raw),
            topics: topics(&text),
            confidence,
            degraded: false,
        }
    }
}

/// Map an unbounded lexicon sum into [0,1], 0 → 0.5.
fn squash(raw: i32) -> f64 {
    let s = raw as f64;
    0.5 + 0.5 * s / (s.abs() + 4.0)
}

fn tokenize(s: &str) -> impl Iterator<Item = String> + '_ {
    s.split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .filter(|t| !t.is_empty())
        .map(|t| t.to_ascii_lowercase())
}

fn is_negator(tok: &str) -> bool {
    matches!(
        tok,
        "not"
            | "no"
            | "never"
            | "isn't"
            | "wasn't"
            | "aren't"
            | "won't"
            | "can't"
            | "cannot"
            | "without"
    )
}

/// Cashtags first, then hashtags, then keyword topics; each label once, in
/// first-seen order.
pub fn topics(text: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut push = |t: String| {
        if !out.iter().any(|o| o.eq_ignore_ascii_case(&t)) {
            out.push(t);
        }
    };
    for caps in RE_CASHTAG.captures_iter(text) {
        if let Some(m) = caps.name("tag") {
            push(m.as_str()[1..].to_ascii_uppercase());
        }
    }
    for caps in RE_HASHTAG.captures_iter(text) {
        if let Some(m) = caps.name("tag") {
            push(m.as_str()[1..].to_ascii_lowercase());
        }
    }
    for tok in tokenize(text) {
        if let Some((_, label)) = TOPIC_KEYWORDS.iter().find(|(k, _)| *k == tok) {
            push(label.to_string());
        }
    }
    out
}

#[async_trait]
impl SentimentScorer for LexiconScorer {
    async fn score_batch(&self, docs: &[Document]) -> Result<Vec<Analysis>, ServiceError> {
        Ok(docs.iter().map(|d| self.analyze(d)).collect())
    }

    fn name(&self) -> &'static str {
        "lexicon"
    }
}
