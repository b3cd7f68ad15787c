// src/ingest/providers/mod.rs
pub mod cnbc_rss;
pub mod placeholder;
pub mod reddit;
pub mod synthetic;

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::catalog::{Source, SourceCatalog, SourceType};
use crate::config::ServiceConfig;
use crate::ingest::types::SourceProvider;

pub use cnbc_rss::CnbcRssProvider;
pub use placeholder::PlaceholderProvider;
pub use reddit::RedditProvider;
pub use synthetic::{SocialTemplateGenerator, TradeTemplateGenerator};

pub type ProviderMap = HashMap<Source, Arc<dyn SourceProvider>>;

const USER_AGENT: &str = concat!("signal-forge/", env!("CARGO_PKG_VERSION"));

/// One fetcher per catalog entry: live where we have an integration,
/// a placeholder everywhere else.
pub fn registry(cfg: &ServiceConfig, catalog: &SourceCatalog) -> Result<ProviderMap> {
    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(cfg.provider_timeout())
        .connect_timeout(std::time::Duration::from_secs(5))
        .build()
        .context("building provider http client")?;

    let mut map = ProviderMap::new();
    for source in catalog.iter() {
        let provider: Arc<dyn SourceProvider> = match (source.source_type, source.name.as_str()) {
            (SourceType::News, "cnbc") => Arc::new(CnbcRssProvider::from_url(
                cfg.providers.cnbc_rss_url.clone(),
                client.clone(),
            )),
            (SourceType::Social, "reddit") => Arc::new(RedditProvider::new(
                client.clone(),
                cfg.providers.reddit_base_url.clone(),
                cfg.providers.reddit_subreddit.clone(),
                cfg.providers.reddit_limit,
            )),
            (_, name) => Arc::new(PlaceholderProvider::new(static_name(catalog, source.source_type, name))),
        };
        map.insert(source, provider);
    }
    tracing::info!(providers = map.len(), "provider registry built");
    Ok(map)
}

fn static_name(catalog: &SourceCatalog, t: SourceType, name: &str) -> &'static str {
    catalog
        .names(t)
        .iter()
        .copied()
        .find(|n| *n == name)
        .unwrap_or("placeholder")
}
