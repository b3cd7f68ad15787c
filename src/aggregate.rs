// src/aggregate.rs
//! # Fallback Aggregator
//!
//! For one or more source families, every live provider is queried
//! concurrently through the fetch cache and all non-empty results are unioned
//! in family then chain order. A synthetic generator fires only when every
//! live provider came back empty. Provenance (`sources`) lists the providers
//! that actually contributed. Raw scores are read on each family's scale.
//!
//! Synthetic documents are shown but never scored into `sentiment_score` or
//! `trending_topics`, so a fully failed aggregate reports the neutral 0.5.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;

use crate::analyze::{analyze_documents, synthesize, weighted_score, SentimentScorer};
use crate::catalog::{Source, SourceCatalog, SourceType};
use crate::document::{extract, Document, ScoreScale};
use crate::error::{ServiceError, ServiceResult};
use crate::ingest::providers::{SocialTemplateGenerator, TradeTemplateGenerator};
use crate::ingest::types::{normalize_ticker, Envelope, FetchParams, SourceProvider};
use crate::ingest::FetchCache;
use crate::store::DocumentStore;

pub const MARKET_TICKER: &str = "MARKET";
pub const SNAPSHOT_COLLECTION: &str = "sentiment_snapshots";
pub const TRENDING_TOPICS: usize = 10;

/// Families merged into the `/sentiment` views, in provenance order.
pub const SENTIMENT_FAMILIES: [SourceType; 2] = [SourceType::News, SourceType::Social];

/// High-interest tickers merged into the market view when no ticker is given.
pub fn default_panel() -> Vec<String> {
    ["AAPL", "TSLA", "MSFT", "AMZN", "NVDA"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Ordered providers for one family plus its optional synthetic generator.
#[derive(Clone)]
pub struct FallbackChain {
    pub family: SourceType,
    pub live: Vec<Source>,
    pub synthetic: Option<Arc<dyn SourceProvider>>,
    /// Scale raw scores from this family are reported on.
    pub scale: ScoreScale,
}

impl FallbackChain {
    fn new(family: SourceType, names: &[&str]) -> Self {
        Self {
            family,
            live: names.iter().map(|n| Source::new(family, *n)).collect(),
            synthetic: None,
            scale: ScoreScale::for_family(family),
        }
    }

    fn with_synthetic(mut self, p: Arc<dyn SourceProvider>) -> Self {
        self.synthetic = Some(p);
        self
    }
}

/// Chain per family. Families without an explicit priority use catalog order.
pub fn default_chains(catalog: &SourceCatalog) -> HashMap<SourceType, FallbackChain> {
    let mut chains = HashMap::new();
    for t in SourceType::ALL {
        let chain = match t {
            SourceType::Social => FallbackChain::new(t, &["reddit", "twitter", "truth_social"])
                .with_synthetic(Arc::new(SocialTemplateGenerator)),
            SourceType::News => FallbackChain::new(t, &["cnbc", "yahoo_finance", "msn_finance"]),
            SourceType::Trades => {
                FallbackChain::new(t, &["capitol_trades", "senate_stock_watcher"])
                    .with_synthetic(Arc::new(TradeTemplateGenerator))
            }
            _ => FallbackChain::new(t, catalog.names(t)),
        };
        chains.insert(t, chain);
    }
    chains
}

#[derive(Debug, Clone, Serialize)]
pub struct AggregateResult {
    pub ticker: String,
    pub sentiment_score: f64,
    pub sources: Vec<String>,
    pub trending_topics: Vec<String>,
    pub documents: Vec<Document>,
}

pub struct Aggregator {
    cache: Arc<FetchCache>,
    scorer: Arc<dyn SentimentScorer>,
    chains: HashMap<SourceType, FallbackChain>,
    documents: Arc<dyn DocumentStore>,
    batch_size: usize,
    timeout: Duration,
    panel: Vec<String>,
}

impl Aggregator {
    pub fn new(
        cache: Arc<FetchCache>,
        scorer: Arc<dyn SentimentScorer>,
        chains: HashMap<SourceType, FallbackChain>,
        documents: Arc<dyn DocumentStore>,
        batch_size: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            cache,
            scorer,
            chains,
            documents,
            batch_size,
            timeout,
            panel: default_panel(),
        }
    }

    pub fn with_panel(mut self, panel: Vec<String>) -> Self {
        self.panel = panel;
        self
    }

    pub fn chain(&self, family: SourceType) -> Option<&FallbackChain> {
        self.chains.get(&family)
    }

    /// Aggregate one family for `ticker`, or for the market panel when `None`.
    pub async fn aggregate(
        &self,
        family: SourceType,
        ticker: Option<&str>,
    ) -> ServiceResult<AggregateResult> {
        self.aggregate_families(&[family], ticker).await
    }

    /// Aggregate several families into one view. Live results are unioned in
    /// family order; a synthetic generator fires only when every live
    /// provider of every family came back empty.
    pub async fn aggregate_families(
        &self,
        families: &[SourceType],
        ticker: Option<&str>,
    ) -> ServiceResult<AggregateResult> {
        let chains = families
            .iter()
            .map(|f| {
                self.chains
                    .get(f)
                    .ok_or_else(|| ServiceError::unknown_source(f.as_str(), "*"))
            })
            .collect::<ServiceResult<Vec<&FallbackChain>>>()?;

        let ticker = ticker.and_then(normalize_ticker);
        let tickers: Vec<Option<String>> = match &ticker {
            Some(t) => vec![Some(t.clone())],
            None => self.panel.iter().map(|t| Some(t.clone())).collect(),
        };

        // Fan out: every (provider, ticker) pair at once, each bounded.
        let tickers_ref = &tickers;
        let calls = chains.iter().flat_map(move |chain| {
            chain.live.iter().flat_map(move |src| {
                tickers_ref.iter().map(move |t| {
                    let params = FetchParams::for_ticker(t.as_deref());
                    async move {
                        let env = match tokio::time::timeout(
                            self.timeout,
                            self.cache.get(src, &params),
                        )
                        .await
                        {
                            Ok(env) => env,
                            Err(_) => {
                                tracing::warn!(%src, ticker = ?params.ticker, "aggregate fetch timed out");
                                Envelope::empty(src, params.ticker.clone())
                            }
                        };
                        (chain.scale, env)
                    }
                })
            })
        });
        let envelopes: Vec<(ScoreScale, Envelope)> = join_all(calls).await;

        let mut sources: Vec<String> = Vec::new();
        let mut labelled: Vec<(String, ScoreScale, Envelope)> = Vec::new();
        for (scale, env) in envelopes {
            if env.is_empty() {
                continue;
            }
            if !sources.contains(&env.source) {
                sources.push(env.source.clone());
            }
            labelled.push((env.source.clone(), scale, env));
        }

        if labelled.is_empty() {
            for chain in &chains {
                let Some(generator) = &chain.synthetic else {
                    continue;
                };
                for t in &tickers {
                    let params = FetchParams::for_ticker(t.as_deref());
                    match generator.fetch(&params).await {
                        Ok(items) if !items.is_empty() => {
                            let src = Source::new(chain.family, generator.name());
                            labelled.push((
                                generator.name().to_string(),
                                chain.scale,
                                Envelope::new(&src, items, params.ticker.clone()),
                            ));
                        }
                        Ok(_) => {}
                        Err(e) => tracing::warn!(error = ?e, generator = generator.name(), "synthetic generator failed"),
                    }
                }
                if !labelled.is_empty() {
                    tracing::info!(family = %chain.family, ticker = ?ticker, generator = generator.name(), "all live providers empty; using synthetic data");
                    sources.push(generator.name().to_string());
                    break;
                }
            }
        }

        let mut docs = Vec::new();
        let mut overall = Vec::new();
        for (label, scale, env) in &labelled {
            let ex = extract(&env.data, label, env.ticker.as_deref(), *scale);
            docs.extend(ex.documents);
            overall.extend(ex.overall);
        }

        let analyzed = analyze_documents(self.scorer.as_ref(), docs, self.batch_size).await;
        let mut docs = analyzed.documents;

        let contributing: Vec<Document> =
            docs.iter().filter(|d| d.contributes()).cloned().collect();
        let scores: Vec<f64> = contributing.iter().filter_map(Document::score).collect();
        let synthesis = synthesize(&contributing, TRENDING_TOPICS);

        // Stable: equal influence keeps provider order.
        docs.sort_by(|a, b| {
            b.influence()
                .partial_cmp(&a.influence())
                .unwrap_or(Ordering::Equal)
        });

        let result = AggregateResult {
            ticker: ticker.unwrap_or_else(|| MARKET_TICKER.to_string()),
            sentiment_score: weighted_score(&scores, &overall),
            sources,
            trending_topics: synthesis.topics,
            documents: docs,
        };
        self.snapshot(families, &result).await;
        Ok(result)
    }

    async fn snapshot(&self, families: &[SourceType], result: &AggregateResult) {
        let doc = serde_json::json!({
            "source_types": families,
            "ticker": result.ticker,
            "sentiment_score": result.sentiment_score,
            "sources": result.sources,
            "trending_topics": result.trending_topics,
            "document_count": result.documents.len(),
        });
        if let Err(e) = self.documents.insert_one(SNAPSHOT_COLLECTION, doc).await {
            metrics::counter!("persist_failures_total").increment(1);
            tracing::error!(error = %e, ticker = %result.ticker, "snapshot persist failed");
        }
    }
}
