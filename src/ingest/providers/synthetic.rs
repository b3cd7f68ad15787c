// src/ingest/providers/synthetic.rs
//! Template generators used when every live provider of a family came back
//! empty. Output is flagged `"synthetic": true` so downstream stages can keep
//! it out of scores.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde_json::Value;

use crate::ingest::types::{FetchParams, RawItem, SourceProvider};

/// Ticker used when the caller gave none.
const GENERIC_TICKER: &str = "MARKET";

fn seed_for(ticker: &str) -> u64 {
    // FNV-1a; stable across runs and platforms.
    ticker.bytes().fold(0xcbf2_9ce4_8422_2325u64, |h, b| {
        (h ^ b as u64).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

fn ticker_templates(ticker: &str) -> Option<&'static [(&'static str, f64)]> {
    let t: &'static [(&'static str, f64)] = match ticker {
        "AAPL" => &[
            ("Apple's innovation continues to lead the tech industry! $AAPL", 0.85),
            ("Just heard AAPL might be entering the AI race with their own models!", 0.78),
            ("AAPL services revenue hit another record this quarter. Strong growth!", 0.81),
            ("Apple's supply chain challenges in China could impact next quarter $AAPL", 0.42),
            ("Do you think AAPL stock will split again soon? The price is getting high.", 0.55),
        ],
        "MSFT" => &[
            ("Microsoft's cloud business growth is impressive! $MSFT leading the way", 0.87),
            ("MSFT integrating AI everywhere: Office, Azure, Windows. Smart strategy!", 0.82),
            ("Microsoft Teams vs Slack, MSFT clearly winning the enterprise battle", 0.76),
            ("MSFT layoffs concerning, but probably necessary to stay competitive", 0.48),
            ("Is Microsoft (MSFT) too dependent on enterprise spending in a recession?", 0.39),
        ],
        "TSLA" => &[
            ("Tesla's manufacturing efficiency is years ahead of competition $TSLA", 0.84),
            ("TSLA expanding into energy storage is a game-changer for the grid", 0.88),
            ("Tesla FSD beta is improving fast! $TSLA ahead in autonomous driving", 0.79),
            ("TSLA facing increased EV competition. Ford and GM catching up?", 0.41),
            ("Tesla's China sales dropped last month. TSLA needs new markets.", 0.35),
        ],
        "AMZN" => &[
            ("Amazon AWS growth recovering after slowdown. AMZN back on track!", 0.82),
            ("AMZN logistics network is their real competitive advantage", 0.77),
            ("Amazon's advertising business becoming a major revenue source $AMZN", 0.80),
            ("AMZN facing unionization pressure at more warehouses. Costs may rise.", 0.38),
            ("Amazon (AMZN) Prime price increases: will customers keep paying?", 0.45),
        ],
        "GOOGL" => &[
            ("Google's AI search integration is revolutionary! $GOOGL", 0.89),
            ("GOOGL ad revenue still growing despite competition from TikTok", 0.74),
            ("Google Cloud gaining market share from AWS. Good for GOOGL diversification", 0.81),
            ("GOOGL facing more antitrust scrutiny in EU. Legal battles ahead.", 0.32),
            ("Google's moonshot investments (GOOGL): are they wasting money?", 0.47),
        ],
        "META" => &[
            ("Meta's cost-cutting is working! META profits up significantly", 0.83),
            ("META Reality Labs making progress. Metaverse still the future!", 0.75),
            ("Facebook user growth stabilized, Instagram thriving. $META back on track", 0.79),
            ("META faces challenges with Apple privacy changes affecting ad targeting", 0.41),
            ("Is Meta (META) spending too much on VR/AR with uncertain returns?", 0.38),
        ],
        _ => return None,
    };
    Some(t)
}

fn default_templates(ticker: &str) -> Vec<(String, f64)> {
    vec![
        (format!("{ticker} showing strong technical patterns for a breakout"), 0.82),
        (format!("Latest earnings for {ticker} exceeded analyst expectations"), 0.78),
        (format!("{ticker} announced new partnerships that should drive growth"), 0.75),
        (format!("Is {ticker} overvalued at current prices? Seeing some weakness"), 0.42),
        (format!("{ticker} facing regulatory scrutiny that could impact operations"), 0.35),
    ]
}

const TRUTH_SOCIAL_AUTHORS: [&str; 5] = [
    "TruthSpeaker",
    "AmericanPatriot",
    "FinanceFreedom",
    "TruthSocial_Insider",
    "WallStMaverick",
];
const REDDIT_AUTHORS: [&str; 5] = [
    "DeepValueInvestor",
    "MarketSage",
    "BullishAnalyst",
    "StockPickGuru",
    "ValueHunter",
];

/// Social posts built from per-ticker templates, alternating Truth Social and
/// Reddit. Authors and like counts are seeded by ticker, so repeated calls
/// for the same ticker produce the same posts.
#[derive(Debug, Default, Clone)]
pub struct SocialTemplateGenerator;

impl SocialTemplateGenerator {
    pub fn generate(&self, ticker: &str) -> Vec<RawItem> {
        let templates: Vec<(String, f64)> = match ticker_templates(ticker) {
            Some(t) => t.iter().map(|(c, s)| (c.to_string(), *s)).collect(),
            None => default_templates(ticker),
        };
        let mut rng = StdRng::seed_from_u64(seed_for(ticker));
        let now = Utc::now();

        templates
            .into_iter()
            .enumerate()
            .map(|(i, (content, score))| {
                let (platform, authors) = if i % 2 == 0 {
                    ("Truth Social", &TRUTH_SOCIAL_AUTHORS)
                } else {
                    ("Reddit", &REDDIT_AUTHORS)
                };
                let author = authors[rng.random_range(0..authors.len())];
                let likes: u64 = rng.random_range(50..=500);
                let ts = now - Duration::hours(3 * i as i64);

                let mut raw = RawItem::new();
                raw.insert("platform".into(), Value::String(platform.into()));
                raw.insert("author".into(), Value::String(author.into()));
                raw.insert("content".into(), Value::String(content));
                raw.insert(
                    "timestamp".into(),
                    Value::String(ts.format("%Y-%m-%dT%H:%M:%SZ").to_string()),
                );
                raw.insert("likes".into(), Value::from(likes));
                raw.insert("sentiment_score".into(), Value::from(score));
                raw.insert("synthetic".into(), Value::Bool(true));
                raw
            })
            .collect()
    }
}

#[async_trait]
impl SourceProvider for SocialTemplateGenerator {
    async fn fetch(&self, params: &FetchParams) -> Result<Vec<RawItem>> {
        Ok(self.generate(params.ticker.as_deref().unwrap_or(GENERIC_TICKER)))
    }

    fn name(&self) -> &'static str {
        "synthetic_social"
    }
}

/// Placeholder politician disclosures: (politician, committee, side, amount, days ago).
const TRADE_TEMPLATES: [(&str, &str, &str, &str, i64); 5] = [
    ("Senator A. Smith", "Senate Finance Committee", "Purchase", "$50,000-$100,000", 5),
    ("Rep. J. Johnson", "House Ways and Means Committee", "Purchase", "$15,000-$50,000", 10),
    ("Senator R. Williams", "Senate Banking Committee", "Sale", "$1,000-$15,000", 15),
    ("Rep. T. Miller", "House Financial Services Committee", "Purchase", "$100,000-$250,000", 20),
    ("Senator K. Taylor", "Senate Commerce Committee", "Purchase", "$15,000-$50,000", 25),
];

#[derive(Debug, Default, Clone)]
pub struct TradeTemplateGenerator;

impl TradeTemplateGenerator {
    pub fn generate(&self, ticker: &str) -> Vec<RawItem> {
        let today = Utc::now().date_naive();
        TRADE_TEMPLATES
            .iter()
            .map(|(who, position, side, amount, days)| {
                let traded = today - Duration::days(*days);
                let disclosed = traded + Duration::days(3);
                let mut raw = RawItem::new();
                raw.insert(
                    "title".into(),
                    Value::String(format!("{who} reports {} of {ticker}", side.to_lowercase())),
                );
                raw.insert("author".into(), Value::String((*who).into()));
                raw.insert("position".into(), Value::String((*position).into()));
                raw.insert("transaction_type".into(), Value::String((*side).into()));
                raw.insert("amount".into(), Value::String((*amount).into()));
                raw.insert("date".into(), Value::String(traded.to_string()));
                raw.insert("disclosure_date".into(), Value::String(disclosed.to_string()));
                raw.insert("ticker".into(), Value::String(ticker.into()));
                raw.insert("synthetic".into(), Value::Bool(true));
                raw
            })
            .collect()
    }
}

#[async_trait]
impl SourceProvider for TradeTemplateGenerator {
    async fn fetch(&self, params: &FetchParams) -> Result<Vec<RawItem>> {
        Ok(self.generate(params.ticker.as_deref().unwrap_or(GENERIC_TICKER)))
    }

    fn name(&self) -> &'static str {
        "synthetic_trades"
    }
}
