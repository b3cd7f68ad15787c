// src/ingest/providers/placeholder.rs
use anyhow::Result;
use async_trait::async_trait;

use crate::ingest::types::{FetchParams, RawItem, SourceProvider};

/// Stand-in for a catalog source with no live integration yet.
/// Always returns an empty list, which sends the aggregator down its fallback chain.
pub struct PlaceholderProvider {
    name: &'static str,
}

impl PlaceholderProvider {
    pub fn new(name: &'static str) -> Self {
        Self { name }
    }
}

#[async_trait]
impl SourceProvider for PlaceholderProvider {
    async fn fetch(&self, _params: &FetchParams) -> Result<Vec<RawItem>> {
        tracing::debug!(provider = self.name, "no live integration; returning empty");
        Ok(Vec::new())
    }

    fn name(&self) -> &'static str {
        self.name
    }
}
