// src/catalog.rs
//! # Source Catalog
//!
//! Static registry of source types and the provider names each one supports.
//! Every fetch, aggregate and workflow request is resolved here first; an
//! unregistered pair fails with `ServiceError::UnknownSource`.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

/// Family of external signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    News,
    Social,
    Trades,
    Earnings,
    Prices,
    Reports,
}

impl SourceType {
    pub const ALL: [SourceType; 6] = [
        SourceType::News,
        SourceType::Social,
        SourceType::Trades,
        SourceType::Earnings,
        SourceType::Prices,
        SourceType::Reports,
    ];

    /// Canonical path slug, e.g. `GET /social/reddit`.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::News => "news",
            SourceType::Social => "social",
            SourceType::Trades => "trades",
            SourceType::Earnings => "earnings",
            SourceType::Prices => "prices",
            SourceType::Reports => "reports",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = ServiceError;

    /// Accepts the canonical slug plus the long legacy names
    /// (`social_media`, `politician-trades`, ...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm = s.trim().to_ascii_lowercase().replace('-', "_");
        let t = match norm.as_str() {
            "news" => SourceType::News,
            "social" | "social_media" => SourceType::Social,
            "trades" | "politician_trades" => SourceType::Trades,
            "earnings" | "earnings_calls" => SourceType::Earnings,
            "prices" | "market_prices" => SourceType::Prices,
            "reports" | "analyst_reports" => SourceType::Reports,
            _ => return Err(ServiceError::unknown_source(s, "*")),
        };
        Ok(t)
    }
}

/// Immutable `(type, name)` identifier of one provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Source {
    pub source_type: SourceType,
    pub name: String,
}

impl Source {
    pub fn new(source_type: SourceType, name: impl Into<String>) -> Self {
        Self {
            source_type,
            name: name.into(),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.source_type, self.name)
    }
}

#[derive(Debug, Clone)]
pub struct SourceCatalog {
    entries: BTreeMap<SourceType, Vec<&'static str>>,
}

impl Default for SourceCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl SourceCatalog {
    /// Built-in registry, fixed at startup.
    pub fn builtin() -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(SourceType::News, vec!["cnbc", "msn_finance", "yahoo_finance"]);
        entries.insert(SourceType::Social, vec!["twitter", "reddit", "truth_social"]);
        entries.insert(
            SourceType::Trades,
            vec!["capitol_trades", "senate_stock_watcher"],
        );
        entries.insert(SourceType::Earnings, vec!["sec_edgar"]);
        entries.insert(SourceType::Prices, vec!["yahoo_finance", "tradingview"]);
        entries.insert(
            SourceType::Reports,
            vec![
                "ubs",
                "citi",
                "morgan_stanley",
                "wells_fargo",
                "goldman_sachs",
                "jp_morgan",
                "barclays",
                "bofa",
            ],
        );
        Self { entries }
    }

    pub fn names(&self, source_type: SourceType) -> &[&'static str] {
        self.entries
            .get(&source_type)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn contains(&self, source_type: SourceType, name: &str) -> bool {
        self.names(source_type).iter().any(|n| *n == name)
    }

    /// Resolve raw path segments into a registered `Source`.
    pub fn resolve(&self, source_type: &str, name: &str) -> Result<Source, ServiceError> {
        let t: SourceType = source_type
            .parse()
            .map_err(|_| ServiceError::unknown_source(source_type, name))?;
        self.resolve_typed(t, name)
    }

    pub fn resolve_typed(&self, source_type: SourceType, name: &str) -> Result<Source, ServiceError> {
        let name = name.trim().to_ascii_lowercase();
        if self.contains(source_type, &name) {
            Ok(Source::new(source_type, name))
        } else {
            Err(ServiceError::unknown_source(source_type.as_str(), name))
        }
    }

    /// All registered sources, in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = Source> + '_ {
        self.entries
            .iter()
            .flat_map(|(t, names)| names.iter().map(move |n| Source::new(*t, *n)))
    }

    /// `{type: [names]}` view served by `GET /sources`.
    pub fn as_map(&self) -> BTreeMap<String, Vec<String>> {
        self.entries
            .iter()
            .map(|(t, v)| (t.to_string(), v.iter().map(|s| s.to_string()).collect()))
            .collect()
    }
}
