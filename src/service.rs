// src/service.rs
//! Wires config, providers, cache, scorer, stores, aggregator and
//! orchestrator into one `AppState`. Tests use the same builder with
//! provider/scorer/store overrides.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;

use crate::aggregate::{default_chains, Aggregator};
use crate::analyze::{LexiconScorer, RemoteScorer, SentimentScorer};
use crate::api::AppState;
use crate::catalog::{Source, SourceCatalog};
use crate::config::{ScorerKind, ServiceConfig};
use crate::ingest::providers::{registry, ProviderMap};
use crate::ingest::types::SourceProvider;
use crate::ingest::FetchCache;
use crate::store::{DocumentStore, EmbeddingStore, MemoryDocumentStore, MemoryEmbeddingStore};
use crate::workflow::{Orchestrator, Pipeline};

pub struct ServiceBuilder {
    cfg: ServiceConfig,
    catalog: SourceCatalog,
    overrides: ProviderMap,
    scorer: Option<Arc<dyn SentimentScorer>>,
    documents: Option<Arc<dyn DocumentStore>>,
    embeddings: Option<Arc<dyn EmbeddingStore>>,
    panel: Option<Vec<String>>,
}

impl ServiceBuilder {
    pub fn new(cfg: ServiceConfig) -> Self {
        Self {
            cfg,
            catalog: SourceCatalog::builtin(),
            overrides: ProviderMap::new(),
            scorer: None,
            documents: None,
            embeddings: None,
            panel: None,
        }
    }

    /// Replace the fetcher registered for `source`.
    pub fn with_provider(mut self, source: Source, provider: Arc<dyn SourceProvider>) -> Self {
        self.overrides.insert(source, provider);
        self
    }

    pub fn with_scorer(mut self, scorer: Arc<dyn SentimentScorer>) -> Self {
        self.scorer = Some(scorer);
        self
    }

    pub fn with_document_store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.documents = Some(store);
        self
    }

    pub fn with_embedding_store(mut self, store: Arc<dyn EmbeddingStore>) -> Self {
        self.embeddings = Some(store);
        self
    }

    pub fn with_panel(mut self, panel: Vec<String>) -> Self {
        self.panel = Some(panel);
        self
    }

    fn default_scorer(cfg: &ServiceConfig) -> Arc<dyn SentimentScorer> {
        match cfg.scorer.kind {
            ScorerKind::Lexicon => Arc::new(LexiconScorer::new()),
            ScorerKind::OpenAi => match RemoteScorer::new(&cfg.scorer, cfg.provider_timeout()) {
                Ok(s) => Arc::new(s),
                Err(e) => {
                    tracing::warn!(error = %e, "remote scorer unavailable; using lexicon");
                    Arc::new(LexiconScorer::new())
                }
            },
        }
    }

    pub fn build(self) -> Result<AppState> {
        let mut providers = registry(&self.cfg, &self.catalog)?;
        providers.extend(self.overrides);

        let cache = Arc::new(FetchCache::new(
            providers,
            self.cfg.cache_ttl(),
            self.cfg.provider_timeout(),
        ));
        let scorer = self
            .scorer
            .unwrap_or_else(|| Self::default_scorer(&self.cfg));
        let documents: Arc<dyn DocumentStore> = self
            .documents
            .unwrap_or_else(|| Arc::new(MemoryDocumentStore::new()));
        let embeddings: Arc<dyn EmbeddingStore> = self
            .embeddings
            .unwrap_or_else(|| Arc::new(MemoryEmbeddingStore::new()));

        let mut aggregator = Aggregator::new(
            Arc::clone(&cache),
            Arc::clone(&scorer),
            default_chains(&self.catalog),
            Arc::clone(&documents),
            self.cfg.scoring_batch_size,
            self.cfg.aggregate_timeout(),
        );
        if let Some(panel) = self.panel {
            aggregator = aggregator.with_panel(panel);
        }
        let aggregator = Arc::new(aggregator);

        let pipeline = Arc::new(Pipeline {
            cache: Arc::clone(&cache),
            aggregator: Arc::clone(&aggregator),
            scorer,
            documents,
            embeddings,
            batch_size: self.cfg.scoring_batch_size,
        });
        let orchestrator = Arc::new(Orchestrator::new(pipeline, self.catalog.clone()));

        tracing::info!(
            scorer = ?self.cfg.scorer.kind,
            cache_ttl_secs = self.cfg.cache_ttl_secs,
            batch = self.cfg.scoring_batch_size,
            "service state built"
        );

        Ok(AppState {
            catalog: Arc::new(self.catalog),
            cache,
            aggregator,
            orchestrator,
            started: Instant::now(),
        })
    }
}
