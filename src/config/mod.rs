// src/config/mod.rs
//! Service configuration: defaults, optional TOML file, then env overrides.
//!
//! File lookup order:
//! 1) $SERVICE_CONFIG_PATH (must exist)
//! 2) config/service.toml
//! 3) built-in defaults

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_CONFIG_PATH: &str = "SERVICE_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/service.toml";

pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;
pub const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_AGGREGATE_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_SCORING_BATCH_SIZE: usize = 5;

/// Which scoring capability the analyze stage uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScorerKind {
    Lexicon,
    OpenAi,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProviderUrls {
    pub reddit_base_url: String,
    pub reddit_subreddit: String,
    pub reddit_limit: u32,
    pub cnbc_rss_url: String,
}

impl Default for ProviderUrls {
    fn default() -> Self {
        Self {
            reddit_base_url: "https://www.reddit.com".to_string(),
            reddit_subreddit: "wallstreetbets".to_string(),
            reddit_limit: 10,
            cnbc_rss_url: "https://www.cnbc.com/id/20910258/device/rss/rss.html".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScorerConfig {
    pub kind: ScorerKind,
    /// Only read from env (`OPENAI_API_KEY`), never from the file.
    #[serde(skip)]
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            kind: ScorerKind::Lexicon,
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub cache_ttl_secs: u64,
    pub provider_timeout_secs: u64,
    pub aggregate_timeout_secs: u64,
    pub scoring_batch_size: usize,
    pub providers: ProviderUrls,
    pub scorer: ScorerConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            provider_timeout_secs: DEFAULT_PROVIDER_TIMEOUT_SECS,
            aggregate_timeout_secs: DEFAULT_AGGREGATE_TIMEOUT_SECS,
            scoring_batch_size: DEFAULT_SCORING_BATCH_SIZE,
            providers: ProviderUrls::default(),
            scorer: ScorerConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Load defaults → file → env, then sanitize.
    pub fn load() -> Result<Self> {
        let mut cfg = match config_path()? {
            Some(p) => Self::load_from(&p)?,
            None => Self::default(),
        };
        cfg.apply_env(|k| std::env::var(k).ok());
        cfg.sanitize();
        Ok(cfg)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading service config from {}", path.display()))?;
        let cfg: ServiceConfig = toml::from_str(&content)
            .with_context(|| format!("parsing service config {}", path.display()))?;
        Ok(cfg)
    }

    /// Apply overrides from a key lookup (env in production, a map in tests).
    pub fn apply_env<F>(&mut self, get: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        fn num<T: std::str::FromStr>(raw: Option<String>) -> Option<T> {
            raw.and_then(|s| s.trim().parse::<T>().ok())
        }

        if let Some(v) = num(get("CACHE_TTL_SECS")) {
            self.cache_ttl_secs = v;
        }
        if let Some(v) = num(get("PROVIDER_TIMEOUT_SECS")) {
            self.provider_timeout_secs = v;
        }
        if let Some(v) = num(get("AGGREGATE_TIMEOUT_SECS")) {
            self.aggregate_timeout_secs = v;
        }
        if let Some(v) = num(get("SCORING_BATCH_SIZE")) {
            self.scoring_batch_size = v;
        }
        if let Some(v) = get("REDDIT_BASE_URL") {
            self.providers.reddit_base_url = v;
        }
        if let Some(v) = get("REDDIT_SUBREDDIT") {
            self.providers.reddit_subreddit = v;
        }
        if let Some(v) = num(get("REDDIT_LIMIT")) {
            self.providers.reddit_limit = v;
        }
        if let Some(v) = get("CNBC_RSS_URL") {
            self.providers.cnbc_rss_url = v;
        }
        if let Some(v) = get("SCORER") {
            match v.trim().to_ascii_lowercase().as_str() {
                "openai" => self.scorer.kind = ScorerKind::OpenAi,
                "lexicon" => self.scorer.kind = ScorerKind::Lexicon,
                other => tracing::warn!(scorer = other, "unknown SCORER value, keeping current"),
            }
        }
        if let Some(v) = get("OPENAI_API_KEY") {
            if !v.trim().is_empty() {
                self.scorer.api_key = Some(v.trim().to_string());
            }
        }
        if let Some(v) = get("OPENAI_BASE_URL") {
            self.scorer.base_url = v;
        }
        if let Some(v) = get("OPENAI_MODEL") {
            self.scorer.model = v;
        }
    }

    fn sanitize(&mut self) {
        if self.scoring_batch_size == 0 {
            self.scoring_batch_size = 1;
        }
        if self.provider_timeout_secs == 0 {
            self.provider_timeout_secs = DEFAULT_PROVIDER_TIMEOUT_SECS;
        }
        if self.aggregate_timeout_secs < self.provider_timeout_secs {
            self.aggregate_timeout_secs = self.provider_timeout_secs;
        }
        self.providers.reddit_base_url = self
            .providers
            .reddit_base_url
            .trim_end_matches('/')
            .to_string();
        self.scorer.base_url = self.scorer.base_url.trim_end_matches('/').to_string();
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }

    pub fn aggregate_timeout(&self) -> Duration {
        Duration::from_secs(self.aggregate_timeout_secs)
    }
}

fn config_path() -> Result<Option<PathBuf>> {
    if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return Ok(Some(pb));
        }
        return Err(anyhow!("SERVICE_CONFIG_PATH points to non-existent path"));
    }
    let default = PathBuf::from(DEFAULT_CONFIG_PATH);
    if default.exists() {
        return Ok(Some(default));
    }
    Ok(None)
}
