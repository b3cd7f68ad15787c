// src/ingest/providers/cnbc_rss.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use quick_xml::de::from_str;
use serde::Deserialize;
use serde_json::Value;
use time::{format_description::well_known::Rfc2822, format_description::well_known::Rfc3339};
use time::{OffsetDateTime, UtcOffset};

use crate::ingest::types::{FetchParams, RawItem, SourceProvider};
use crate::ingest::{mentions_ticker, normalize_text};

/// Cap on headlines per fetch.
const MAX_ITEMS: usize = 10;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

fn rfc2822_to_rfc3339(ts: &str) -> Option<String> {
    OffsetDateTime::parse(ts.trim(), &Rfc2822)
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC))
        .and_then(|dt| dt.format(&Rfc3339).ok())
}

/// CNBC markets headlines from the public RSS feed.
pub struct CnbcRssProvider {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { url: String, client: reqwest::Client },
}

impl CnbcRssProvider {
    pub fn from_fixture(s: &str) -> Self {
        Self {
            mode: Mode::Fixture(s.to_string()),
        }
    }

    pub fn from_url(url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            mode: Mode::Http {
                url: url.into(),
                client,
            },
        }
    }

    fn parse_items_from_str(s: &str, params: &FetchParams) -> Result<Vec<RawItem>> {
        let xml_clean = scrub_html_entities_for_xml(s);
        let rss: Rss = from_str(&xml_clean).context("parsing cnbc rss xml")?;

        let mut out = Vec::with_capacity(rss.channel.item.len().min(MAX_ITEMS));
        for it in rss.channel.item {
            let headline = normalize_text(it.title.as_deref().unwrap_or_default());
            let content = normalize_text(it.description.as_deref().unwrap_or_default());
            if headline.is_empty() && content.is_empty() {
                continue;
            }
            if let Some(t) = params.ticker.as_deref() {
                if !mentions_ticker(&headline, t) && !mentions_ticker(&content, t) {
                    continue;
                }
            }

            let mut raw = RawItem::new();
            raw.insert("headline".into(), Value::String(headline));
            raw.insert("content".into(), Value::String(content));
            raw.insert(
                "url".into(),
                Value::String(it.link.unwrap_or_default().trim().to_string()),
            );
            if let Some(ts) = it.pub_date.as_deref().and_then(rfc2822_to_rfc3339) {
                raw.insert("timestamp".into(), Value::String(ts));
            }
            raw.insert("source".into(), Value::String("CNBC".into()));
            out.push(raw);

            if out.len() >= MAX_ITEMS {
                break;
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl SourceProvider for CnbcRssProvider {
    async fn fetch(&self, params: &FetchParams) -> Result<Vec<RawItem>> {
        match &self.mode {
            Mode::Fixture(s) => Self::parse_items_from_str(s, params),
            Mode::Http { url, client } => {
                let resp = client
                    .get(url.as_str())
                    .send()
                    .await
                    .context("cnbc http get()")?
                    .error_for_status()
                    .context("cnbc http status")?;
                let body = resp.text().await.context("cnbc http .text()")?;
                Self::parse_items_from_str(&body, params)
            }
        }
    }

    fn name(&self) -> &'static str {
        "cnbc"
    }
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}
