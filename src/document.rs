// src/document.rs
//! Canonical document shape and the extract step that maps provider-specific
//! raw items onto it.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::SourceType;
use crate::ingest::normalize_text;
use crate::ingest::types::RawItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

/// Scoring annotation. `sentiment_score` is always in [0,1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub sentiment_score: f64,
    #[serde(default)]
    pub topics: Vec<String>,
    pub confidence: Confidence,
    /// Set when the scoring batch failed and the neutral default was applied.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub degraded: bool,
}

impl Analysis {
    pub const NEUTRAL: f64 = 0.5;

    pub fn neutral_fallback() -> Self {
        Self {
            sentiment_score: Self::NEUTRAL,
            topics: Vec::new(),
            confidence: Confidence::Low,
            degraded: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub title: String,
    pub author: String,
    pub content: String,
    pub url: String,
    pub created_at: Option<DateTime<Utc>>,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticker: Option<String>,
    #[serde(default)]
    pub likes: u64,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub synthetic: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<Analysis>,
}

impl Document {
    pub fn score(&self) -> Option<f64> {
        self.analysis.as_ref().map(|a| a.sentiment_score)
    }

    /// Counts toward aggregate score and topics.
    pub fn contributes(&self) -> bool {
        !self.synthetic && self.analysis.as_ref().is_some_and(|a| !a.degraded)
    }

    /// Ranking key for aggregate output.
    pub fn influence(&self) -> f64 {
        let s = self.score().unwrap_or(Analysis::NEUTRAL);
        (s * 2.0 + self.likes as f64 / 100.0) / 3.0
    }

    /// Text block stored alongside the embedding record.
    pub fn embedding_text(&self) -> String {
        format!(
            "Title: {}\nSource: {}\nTimestamp: {}\nContent: {}\n",
            self.title,
            self.source,
            self.created_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
            self.content
        )
    }
}

/// Output of the extract step.
#[derive(Debug, Default)]
pub struct Extracted {
    pub documents: Vec<Document>,
    /// Source-level "overall sentiment" figures, already in [0,1].
    pub overall: Vec<f64>,
    /// Items lacking both title and content.
    pub dropped: usize,
}

fn str_field<'a>(item: &'a RawItem, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|k| item.get(*k))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
}

fn num_field(item: &RawItem, keys: &[&str]) -> Option<f64> {
    keys.iter().filter_map(|k| item.get(*k)).find_map(|v| match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn parse_time(item: &RawItem) -> Option<DateTime<Utc>> {
    for key in ["created_at", "created_utc", "timestamp", "date"] {
        match item.get(key) {
            Some(Value::String(s)) => {
                if let Ok(dt) = DateTime::parse_from_rfc3339(s.trim()) {
                    return Some(dt.with_timezone(&Utc));
                }
                if let Ok(d) = NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d") {
                    return d.and_hms_opt(0, 0, 0).map(|n| n.and_utc());
                }
            }
            Some(Value::Number(n)) => {
                if let Some(secs) = n.as_f64() {
                    return DateTime::from_timestamp(secs as i64, 0);
                }
            }
            _ => {}
        }
    }
    None
}

/// Scale a source family reports raw sentiment on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreScale {
    /// Already in [0,1].
    Unit,
    /// Polarity in [-1,1].
    Signed,
}

impl ScoreScale {
    /// News, earnings and analyst coverage report polarity; social posts,
    /// trades and prices carry unit scores.
    pub fn for_family(family: SourceType) -> Self {
        match family {
            SourceType::News | SourceType::Earnings | SourceType::Reports => ScoreScale::Signed,
            SourceType::Social | SourceType::Trades | SourceType::Prices => ScoreScale::Unit,
        }
    }

    /// Map a raw figure on this scale into [0,1].
    pub fn to_unit(self, s: f64) -> f64 {
        match self {
            ScoreScale::Unit => s.clamp(0.0, 1.0),
            ScoreScale::Signed => (s.clamp(-1.0, 1.0) + 1.0) / 2.0,
        }
    }
}

fn pre_scored(item: &RawItem, scale: ScoreScale) -> Option<Analysis> {
    let score = num_field(item, &["sentiment_score"])?;
    let topics = item
        .get("topics")
        .and_then(Value::as_array)
        .map(|a| {
            a.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    Some(Analysis {
        sentiment_score: scale.to_unit(score),
        topics,
        confidence: Confidence::Medium,
        degraded: false,
    })
}

/// Map raw provider items to documents, in input order. Raw scores are read
/// on `scale`.
pub fn extract(
    items: &[RawItem],
    provider: &str,
    ticker: Option<&str>,
    scale: ScoreScale,
) -> Extracted {
    let mut out = Extracted::default();
    for item in items {
        let title = normalize_text(str_field(item, &["title", "headline"]).unwrap_or_default());
        let content = normalize_text(
            str_field(item, &["content", "selftext", "description", "text"]).unwrap_or_default(),
        );

        if title.is_empty() && content.is_empty() {
            match num_field(item, &["overall_sentiment"]) {
                Some(s) => out.overall.push(scale.to_unit(s)),
                None => out.dropped += 1,
            }
            continue;
        }

        let likes = num_field(item, &["likes", "score"])
            .map(|n| n.max(0.0) as u64)
            .unwrap_or(0);
        let item_ticker = str_field(item, &["ticker"])
            .map(str::to_ascii_uppercase)
            .or_else(|| ticker.map(str::to_string));

        out.documents.push(Document {
            title,
            author: str_field(item, &["author"]).unwrap_or_default().to_string(),
            content,
            url: str_field(item, &["url", "link"]).unwrap_or_default().to_string(),
            created_at: parse_time(item),
            source: str_field(item, &["source", "platform"])
                .unwrap_or(provider)
                .to_string(),
            ticker: item_ticker,
            likes,
            synthetic: item.get("synthetic").and_then(Value::as_bool).unwrap_or(false),
            analysis: pre_scored(item, scale),
        });
    }
    out
}
