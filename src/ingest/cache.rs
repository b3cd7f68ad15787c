// src/ingest/cache.rs
//! Per-source TTL cache in front of the provider fetchers.
//!
//! Entries are `Arc`s replaced wholesale on refresh, so a reader holding an
//! entry always sees a complete envelope. Concurrent misses on the same key
//! may both fetch; the last insert wins. Failed or timed-out fetches are not
//! cached and the next call retries.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use metrics::{counter, histogram};

use crate::catalog::{Source, SourceType};
use crate::ingest::types::{Envelope, FetchParams, SourceProvider};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    source_type: SourceType,
    name: String,
    ticker: Option<String>,
}

impl CacheKey {
    fn new(source: &Source, params: &FetchParams) -> Self {
        Self {
            source_type: source.source_type,
            name: source.name.clone(),
            ticker: params.ticker.clone(),
        }
    }
}

struct CacheEntry {
    envelope: Envelope,
    fetched_at: Instant,
}

pub struct FetchCache {
    ttl: Duration,
    timeout: Duration,
    providers: HashMap<Source, Arc<dyn SourceProvider>>,
    entries: DashMap<CacheKey, Arc<CacheEntry>>,
}

impl FetchCache {
    pub fn new(
        providers: HashMap<Source, Arc<dyn SourceProvider>>,
        ttl: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            ttl,
            timeout,
            providers,
            entries: DashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached envelope if fresh, otherwise fetch, store and return.
    /// Never fails: provider errors yield an empty, uncached envelope.
    pub async fn get(&self, source: &Source, params: &FetchParams) -> Envelope {
        let key = CacheKey::new(source, params);

        // Clone out of the shard guard before any await or insert.
        let cached = self.entries.get(&key).map(|e| Arc::clone(e.value()));
        if let Some(entry) = cached {
            if entry.fetched_at.elapsed() < self.ttl {
                counter!("fetch_cache_hits_total").increment(1);
                return entry.envelope.clone();
            }
        }
        counter!("fetch_cache_misses_total").increment(1);

        let Some(provider) = self.providers.get(source) else {
            tracing::debug!(%source, "no fetcher registered; returning empty envelope");
            return Envelope::empty(source, params.ticker.clone());
        };

        let t0 = Instant::now();
        let outcome = tokio::time::timeout(self.timeout, provider.fetch(params)).await;
        histogram!("fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

        match outcome {
            Ok(Ok(items)) => {
                let envelope = Envelope::new(source, items, params.ticker.clone());
                self.entries.insert(
                    key,
                    Arc::new(CacheEntry {
                        envelope: envelope.clone(),
                        fetched_at: Instant::now(),
                    }),
                );
                envelope
            }
            Ok(Err(e)) => {
                tracing::warn!(error = ?e, provider = provider.name(), %source, "provider error");
                counter!("provider_errors_total").increment(1);
                Envelope::empty(source, params.ticker.clone())
            }
            Err(_) => {
                tracing::warn!(
                    provider = provider.name(),
                    %source,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "provider timed out"
                );
                counter!("provider_timeouts_total").increment(1);
                Envelope::empty(source, params.ticker.clone())
            }
        }
    }

    /// Drop a cached entry so the next `get` refetches.
    pub fn invalidate(&self, source: &Source, params: &FetchParams) {
        self.entries.remove(&CacheKey::new(source, params));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
