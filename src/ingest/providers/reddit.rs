// src/ingest/providers/reddit.rs
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::ingest::types::{FetchParams, RawItem, SourceProvider};
use crate::ingest::{mentions_ticker, normalize_text};

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: Post,
}

#[derive(Debug, Deserialize)]
struct Post {
    #[serde(default)]
    title: String,
    #[serde(default)]
    selftext: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    permalink: String,
    #[serde(default)]
    created_utc: f64,
    #[serde(default)]
    num_comments: u64,
}

/// Hot posts of one subreddit via the public JSON listing.
pub struct RedditProvider {
    client: reqwest::Client,
    base_url: String,
    subreddit: String,
    limit: u32,
}

impl RedditProvider {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        subreddit: impl Into<String>,
        limit: u32,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            subreddit: subreddit.into(),
            limit: limit.max(1),
        }
    }

    fn listing_url(&self, params: &FetchParams) -> String {
        let sub = params
            .extra
            .get("subreddit")
            .map(String::as_str)
            .unwrap_or(&self.subreddit);
        format!("{}/r/{}/hot.json?limit={}", self.base_url, sub, self.limit)
    }
}

/// Map a listing body to raw items; keeps only posts mentioning `ticker` when given.
pub fn parse_listing(body: &str, subreddit: &str, ticker: Option<&str>) -> Result<Vec<RawItem>> {
    let listing: Listing = serde_json::from_str(body).context("parsing reddit listing json")?;
    let mut out = Vec::with_capacity(listing.data.children.len());
    for child in listing.data.children {
        let p = child.data;
        let title = normalize_text(&p.title);
        let content = normalize_text(&p.selftext);
        if let Some(t) = ticker {
            if !mentions_ticker(&title, t) && !mentions_ticker(&content, t) {
                continue;
            }
        }
        let created = Utc
            .timestamp_opt(p.created_utc as i64, 0)
            .single()
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_default();

        let mut raw = RawItem::new();
        raw.insert("title".into(), Value::String(title));
        raw.insert("content".into(), Value::String(content));
        raw.insert("author".into(), Value::String(p.author));
        raw.insert("score".into(), Value::from(p.score));
        raw.insert(
            "url".into(),
            Value::String(format!("https://www.reddit.com{}", p.permalink)),
        );
        raw.insert("created_utc".into(), Value::String(created));
        raw.insert("num_comments".into(), Value::from(p.num_comments));
        raw.insert("subreddit".into(), Value::String(subreddit.to_string()));
        raw.insert("platform".into(), Value::String("Reddit".into()));
        out.push(raw);
    }
    Ok(out)
}

#[async_trait]
impl SourceProvider for RedditProvider {
    async fn fetch(&self, params: &FetchParams) -> Result<Vec<RawItem>> {
        let url = self.listing_url(params);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .context("reddit http get()")?;
        let status = resp.status();
        if status.as_u16() == 429 {
            bail!("reddit rate limited");
        }
        if !status.is_success() {
            bail!("reddit http status {}", status);
        }
        let body = resp.text().await.context("reddit http .text()")?;
        let sub = params
            .extra
            .get("subreddit")
            .map(String::as_str)
            .unwrap_or(&self.subreddit);
        parse_listing(&body, sub, params.ticker.as_deref())
    }

    fn name(&self) -> &'static str {
        "reddit"
    }
}
