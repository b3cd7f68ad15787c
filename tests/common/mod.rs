// tests/common/mod.rs
// Shared mock providers/scorers for integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

use signal_forge::catalog::{Source, SourceType};
use signal_forge::config::ServiceConfig;
use signal_forge::document::{Analysis, Confidence, Document};
use signal_forge::ingest::types::{FetchParams, RawItem, SourceProvider};
use signal_forge::ServiceBuilder;

pub fn item(v: Value) -> RawItem {
    v.as_object().cloned().expect("object literal")
}

pub fn post(title: &str, likes: u64) -> RawItem {
    item(json!({ "title": title, "content": format!("{title} body"), "likes": likes }))
}

/// Returns fixed items and counts calls.
pub struct StaticProvider {
    pub items: Vec<RawItem>,
    pub calls: Arc<AtomicUsize>,
}

impl StaticProvider {
    pub fn new(items: Vec<RawItem>) -> (Arc<Self>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Arc::new(Self {
                items,
                calls: Arc::clone(&calls),
            }),
            calls,
        )
    }
}

#[async_trait]
impl SourceProvider for StaticProvider {
    async fn fetch(&self, _params: &FetchParams) -> Result<Vec<RawItem>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.items.clone())
    }
    fn name(&self) -> &'static str {
        "static"
    }
}

pub struct FailingProvider;

#[async_trait]
impl SourceProvider for FailingProvider {
    async fn fetch(&self, _params: &FetchParams) -> Result<Vec<RawItem>> {
        Err(anyhow!("simulated outage"))
    }
    fn name(&self) -> &'static str {
        "failing"
    }
}

pub struct SlowProvider(pub Duration);

#[async_trait]
impl SourceProvider for SlowProvider {
    async fn fetch(&self, _params: &FetchParams) -> Result<Vec<RawItem>> {
        tokio::time::sleep(self.0).await;
        Ok(vec![post("late", 1)])
    }
    fn name(&self) -> &'static str {
        "slow"
    }
}

/// Scores every document 0.8, except that call number `fail_on` errors.
pub struct ScriptedScorer {
    pub calls: AtomicUsize,
    pub fail_on: Option<usize>,
}

impl ScriptedScorer {
    pub fn failing_on(n: usize) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail_on: Some(n),
        })
    }
}

#[async_trait]
impl signal_forge::analyze::SentimentScorer for ScriptedScorer {
    async fn score_batch(
        &self,
        docs: &[Document],
    ) -> Result<Vec<Analysis>, signal_forge::ServiceError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if Some(n) == self.fail_on {
            return Err(signal_forge::ServiceError::ScoringBatch("scripted".into()));
        }
        Ok(docs
            .iter()
            .map(|_| Analysis {
                sentiment_score: 0.8,
                topics: vec!["earnings".into()],
                confidence: Confidence::High,
                degraded: false,
            })
            .collect())
    }
    fn name(&self) -> &'static str {
        "scripted"
    }
}

pub fn test_config() -> ServiceConfig {
    let mut cfg = ServiceConfig::default();
    cfg.provider_timeout_secs = 1;
    cfg.aggregate_timeout_secs = 2;
    cfg.scoring_batch_size = 5;
    cfg
}

/// Builder with every live integration replaced by a failing provider,
/// so no test reaches the network unless it overrides a source itself.
pub fn offline_builder() -> ServiceBuilder {
    ServiceBuilder::new(test_config())
        .with_provider(Source::new(SourceType::Social, "reddit"), Arc::new(FailingProvider))
        .with_provider(Source::new(SourceType::News, "cnbc"), Arc::new(FailingProvider))
}
