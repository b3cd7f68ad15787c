// src/ingest/types.rs
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::catalog::{Source, SourceType};

/// One provider-specific record, kept as loose JSON until the extract step.
pub type RawItem = serde_json::Map<String, serde_json::Value>;

/// Request parameters forwarded to a provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchParams {
    #[serde(default)]
    pub ticker: Option<String>,
    #[serde(default, flatten)]
    pub extra: BTreeMap<String, String>,
}

impl FetchParams {
    pub fn for_ticker(ticker: Option<&str>) -> Self {
        Self {
            ticker: ticker.and_then(normalize_ticker),
            extra: BTreeMap::new(),
        }
    }

    /// Build from the free-form `params` object of a process request.
    pub fn from_json(params: Option<&serde_json::Value>) -> Self {
        let mut out = Self::default();
        let Some(obj) = params.and_then(|v| v.as_object()) else {
            return out;
        };
        for (k, v) in obj {
            let s = match v {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Null => continue,
                other => other.to_string(),
            };
            if k == "ticker" {
                out.ticker = normalize_ticker(&s);
            } else {
                out.extra.insert(k.clone(), s);
            }
        }
        out
    }
}

/// Trim + uppercase; empty → None.
pub fn normalize_ticker(t: &str) -> Option<String> {
    let t = t.trim().trim_start_matches('$').to_ascii_uppercase();
    if t.is_empty() {
        None
    } else {
        Some(t)
    }
}

/// Uniform wrapper returned by the fetch layer.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    pub source: String,
    #[serde(rename = "type")]
    pub source_type: SourceType,
    pub data: Vec<RawItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticker: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Envelope {
    pub fn new(source: &Source, data: Vec<RawItem>, ticker: Option<String>) -> Self {
        Self {
            source: source.name.clone(),
            source_type: source.source_type,
            data,
            ticker,
            timestamp: Utc::now(),
        }
    }

    pub fn empty(source: &Source, ticker: Option<String>) -> Self {
        Self::new(source, Vec::new(), ticker)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// One strategy per external source. Failures are reported as `Err` and
/// absorbed by the fetch cache; they never cross it.
#[async_trait::async_trait]
pub trait SourceProvider: Send + Sync {
    async fn fetch(&self, params: &FetchParams) -> Result<Vec<RawItem>>;
    fn name(&self) -> &'static str;
}
