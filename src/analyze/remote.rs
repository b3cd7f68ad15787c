// src/analyze/remote.rs
//! OpenAI-compatible chat-completions scorer. One request per batch; the
//! model is asked for a JSON array with one object per document.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::analyze::SentimentScorer;
use crate::config::ScorerConfig;
use crate::document::{Analysis, Confidence, Document};
use crate::error::ServiceError;

const SYSTEM_PROMPT: &str = "You score financial text. For each numbered document return one JSON \
object {\"sentiment_score\": float in [-1,1], \"topics\": [short strings], \"confidence\": float in [0,1]}. \
Reply with a JSON array only, same order and length as the input.";

/// Per-document item as returned by the model.
#[derive(Debug, Deserialize)]
struct RemoteItem {
    sentiment_score: f64,
    #[serde(default)]
    topics: Vec<String>,
    #[serde(default)]
    confidence: Option<f64>,
}

pub struct RemoteScorer {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl RemoteScorer {
    pub fn new(cfg: &ScorerConfig, timeout: Duration) -> Result<Self, ServiceError> {
        let api_key = cfg
            .api_key
            .clone()
            .ok_or_else(|| ServiceError::ScoringBatch("OPENAI_API_KEY not set".into()))?;
        let http = reqwest::Client::builder()
            .user_agent(concat!("signal-forge/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(4))
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::ScoringBatch(format!("http client: {e}")))?;
        Ok(Self {
            http,
            api_key,
            base_url: cfg.base_url.clone(),
            model: cfg.model.clone(),
        })
    }

    fn render_batch(docs: &[Document]) -> String {
        let mut s = String::new();
        for (i, d) in docs.iter().enumerate() {
            s.push_str(&format!("[{}] Title: {}\nContent: {}\n\n", i + 1, d.title, d.content));
        }
        s
    }
}

fn to_confidence(c: Option<f64>) -> Confidence {
    match c {
        Some(c) if c >= 0.7 => Confidence::High,
        Some(c) if c >= 0.4 => Confidence::Medium,
        _ => Confidence::Low,
    }
}

/// Parse the model's reply. Tolerates a fenced code block around the array.
pub fn parse_response(content: &str, expected: usize) -> Result<Vec<Analysis>, ServiceError> {
    let trimmed = content.trim();
    let json = match (trimmed.find('['), trimmed.rfind(']')) {
        (Some(a), Some(b)) if a < b => &trimmed[a..=b],
        _ => return Err(ServiceError::ScoringBatch("no JSON array in reply".into())),
    };
    let items: Vec<RemoteItem> = serde_json::from_str(json)
        .map_err(|e| ServiceError::ScoringBatch(format!("bad JSON in reply: {e}")))?;
    if items.len() != expected {
        return Err(ServiceError::ScoringBatch(format!(
            "expected {expected} items, got {}",
            items.len()
        )));
    }
    Ok(items
        .into_iter()
        .map(|it| Analysis {
            sentiment_score: (it.sentiment_score.clamp(-1.0, 1.0) + 1.0) / 2.0,
            topics: it.topics,
            confidence: to_confidence(it.confidence),
            degraded: false,
        })
        .collect())
}

#[async_trait]
impl SentimentScorer for RemoteScorer {
    async fn score_batch(&self, docs: &[Document]) -> Result<Vec<Analysis>, ServiceError> {
        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: String,
        }

        let user = Self::render_batch(docs);
        let req = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                Msg {
                    role: "user",
                    content: &user,
                },
            ],
            temperature: 0.0,
        };

        let resp = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .map_err(|e| ServiceError::ScoringBatch(format!("request: {e}")))?;
        if !resp.status().is_success() {
            return Err(ServiceError::ScoringBatch(format!(
                "status {}",
                resp.status()
            )));
        }
        let body: Resp = resp
            .json()
            .await
            .map_err(|e| ServiceError::ScoringBatch(format!("decode: {e}")))?;
        let content = body
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .unwrap_or("");
        parse_response(content, docs.len())
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}
