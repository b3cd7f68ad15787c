// src/ingest/mod.rs
pub mod cache;
pub mod providers;
pub mod types;

use metrics::{describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;

pub use cache::FetchCache;
pub use types::{Envelope, FetchParams, RawItem, SourceProvider};

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("fetch_cache_hits_total", "Fetch cache lookups served fresh.");
        describe_counter!(
            "fetch_cache_misses_total",
            "Fetch cache lookups that went to a provider."
        );
        describe_counter!("provider_errors_total", "Provider fetch/parse errors.");
        describe_counter!("provider_timeouts_total", "Provider fetches that timed out.");
        describe_histogram!("fetch_ms", "Provider fetch time in milliseconds.");
        describe_counter!(
            "scoring_batch_failures_total",
            "Scoring batches degraded to the neutral score."
        );
        describe_counter!("workflows_started_total", "Workflows accepted.");
        describe_counter!("workflows_completed_total", "Workflows that completed.");
        describe_counter!("workflows_failed_total", "Workflows that failed.");
        describe_counter!("persist_failures_total", "Document/embedding store write failures.");
        describe_gauge!("fetch_cache_ttl_secs", "Configured fetch cache TTL.");
    });
}

/// Normalize text: collapse whitespace, trim, strip stray punctuation.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Normalize curly quotes and guillemets to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();
    out = out.trim().to_string();

    // 5) Length cap: 1500 chars
    if out.chars().count() > 1500 {
        out = out.chars().take(1500).collect();
    }

    out
}

/// Case-insensitive mention of a ticker (`AAPL`, `$AAPL`) in free text.
pub fn mentions_ticker(text: &str, ticker: &str) -> bool {
    let t = ticker.to_ascii_uppercase();
    text.split(|c: char| !(c.is_alphanumeric() || c == '$'))
        .map(|w| w.trim_start_matches('$'))
        .any(|w| w.eq_ignore_ascii_case(&t))
}
