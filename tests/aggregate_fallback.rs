//! Fallback aggregation across a family's providers.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{item, offline_builder, post, FailingProvider, ScriptedScorer, SlowProvider, StaticProvider};
use serde_json::json;
use signal_forge::aggregate::SENTIMENT_FAMILIES;
use signal_forge::catalog::{Source, SourceType};

fn social(name: &str) -> Source {
    Source::new(SourceType::Social, name)
}

#[tokio::test]
async fn unions_every_non_empty_provider_in_chain_order() {
    let (reddit, _) = StaticProvider::new(vec![post("r1", 5), post("r2", 5), post("r3", 5)]);
    let (twitter, _) = StaticProvider::new(vec![post("t1", 5), post("t2", 5)]);
    let state = offline_builder()
        .with_provider(social("reddit"), reddit)
        .with_provider(social("twitter"), twitter)
        .build()
        .unwrap();

    let out = state
        .aggregator
        .aggregate(SourceType::Social, Some("aapl"))
        .await
        .unwrap();

    assert_eq!(out.ticker, "AAPL");
    assert_eq!(out.documents.len(), 5);
    assert_eq!(out.sources, vec!["reddit", "twitter"]);
    assert!(out.documents.iter().all(|d| !d.synthetic));
}

#[tokio::test]
async fn all_live_providers_down_falls_back_to_synthetic() {
    let state = offline_builder().build().unwrap();

    let out = state
        .aggregator
        .aggregate(SourceType::Social, Some("TSLA"))
        .await
        .unwrap();

    assert_eq!(out.sources, vec!["synthetic_social"]);
    assert!(!out.documents.is_empty());
    assert!(out.documents.iter().all(|d| d.synthetic));
    assert_eq!(out.sentiment_score, 0.5);
    assert!(out.trending_topics.is_empty());
}

#[tokio::test]
async fn family_without_generator_returns_empty_neutral_result() {
    let state = offline_builder().build().unwrap();

    let out = state
        .aggregator
        .aggregate(SourceType::News, Some("AAPL"))
        .await
        .unwrap();

    assert!(out.sources.is_empty());
    assert!(out.documents.is_empty());
    assert_eq!(out.sentiment_score, 0.5);
}

#[tokio::test]
async fn slow_provider_is_treated_as_empty() {
    let (twitter, _) = StaticProvider::new(vec![post("fast", 1)]);
    let state = offline_builder()
        .with_provider(social("reddit"), Arc::new(SlowProvider(Duration::from_secs(3))))
        .with_provider(social("twitter"), twitter)
        .build()
        .unwrap();

    let out = state
        .aggregator
        .aggregate(SourceType::Social, Some("AAPL"))
        .await
        .unwrap();

    assert_eq!(out.sources, vec!["twitter"]);
    assert_eq!(out.documents.len(), 1);
    assert_eq!(out.documents[0].title, "fast");
}

#[tokio::test]
async fn no_ticker_aggregates_the_market_panel() {
    let (reddit, calls) = StaticProvider::new(vec![post("panel", 1)]);
    let state = offline_builder()
        .with_provider(social("reddit"), reddit)
        .with_panel(vec!["AAPL".into(), "MSFT".into()])
        .build()
        .unwrap();

    let out = state
        .aggregator
        .aggregate(SourceType::Social, None)
        .await
        .unwrap();

    assert_eq!(out.ticker, "MARKET");
    assert_eq!(out.sources, vec!["reddit"]);
    assert_eq!(out.documents.len(), 2);
    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 2);
}

#[tokio::test]
async fn overall_figures_count_double() {
    let (reddit, _) = StaticProvider::new(vec![
        post("scored", 1),
        item(json!({ "overall_sentiment": 0.2 })),
    ]);
    let scorer = Arc::new(ScriptedScorer {
        calls: Default::default(),
        fail_on: None,
    });
    let state = offline_builder()
        .with_provider(social("reddit"), reddit)
        .with_scorer(scorer)
        .build()
        .unwrap();

    let out = state
        .aggregator
        .aggregate(SourceType::Social, Some("AAPL"))
        .await
        .unwrap();

    // (0.8 + 2 * 0.2) / 3
    assert!((out.sentiment_score - 0.4).abs() < 1e-9);
    assert_eq!(out.documents.len(), 1);
    assert_eq!(out.trending_topics, vec!["earnings"]);
}

#[tokio::test]
async fn documents_are_ordered_by_influence() {
    let (reddit, _) = StaticProvider::new(vec![post("quiet", 0), post("loud", 900), post("mid", 200)]);
    let state = offline_builder()
        .with_provider(social("reddit"), reddit)
        .build()
        .unwrap();

    let out = state
        .aggregator
        .aggregate(SourceType::Social, Some("AAPL"))
        .await
        .unwrap();

    let titles: Vec<&str> = out.documents.iter().map(|d| d.title.as_str()).collect();
    assert_eq!(titles, vec!["loud", "mid", "quiet"]);
}

#[tokio::test]
async fn failing_twitter_does_not_hide_reddit() {
    let (reddit, _) = StaticProvider::new(vec![post("kept", 3)]);
    let state = offline_builder()
        .with_provider(social("reddit"), reddit)
        .with_provider(social("twitter"), Arc::new(FailingProvider))
        .build()
        .unwrap();

    let out = state
        .aggregator
        .aggregate(SourceType::Social, Some("AAPL"))
        .await
        .unwrap();

    assert_eq!(out.sources, vec!["reddit"]);
    assert_eq!(out.documents.len(), 1);
}

#[tokio::test]
async fn signed_family_figures_of_opposite_sign_cancel_out() {
    let (cnbc, _) = StaticProvider::new(vec![
        item(json!({ "overall_sentiment": 0.6 })),
        item(json!({ "overall_sentiment": -0.6 })),
    ]);
    let state = offline_builder()
        .with_provider(Source::new(SourceType::News, "cnbc"), cnbc)
        .build()
        .unwrap();

    let out = state
        .aggregator
        .aggregate(SourceType::News, Some("AAPL"))
        .await
        .unwrap();

    assert_eq!(out.sources, vec!["cnbc"]);
    assert!((out.sentiment_score - 0.5).abs() < 1e-9, "got {}", out.sentiment_score);
}

#[tokio::test]
async fn news_and_social_merge_in_family_order() {
    let (cnbc, _) = StaticProvider::new(vec![post("AAPL beats", 1)]);
    let (reddit, _) = StaticProvider::new(vec![post("AAPL to the moon", 900)]);
    let state = offline_builder()
        .with_provider(Source::new(SourceType::News, "cnbc"), cnbc)
        .with_provider(social("reddit"), reddit)
        .build()
        .unwrap();

    let out = state
        .aggregator
        .aggregate_families(&SENTIMENT_FAMILIES, Some("AAPL"))
        .await
        .unwrap();

    assert_eq!(out.sources, vec!["cnbc", "reddit"]);
    assert_eq!(out.documents.len(), 2);
    // Influence sort runs over the union.
    assert_eq!(out.documents[0].title, "AAPL to the moon");
    assert!(out.documents.iter().all(|d| !d.synthetic));
}

#[tokio::test]
async fn merged_view_falls_back_only_when_every_family_is_empty() {
    let state = offline_builder().build().unwrap();

    let out = state
        .aggregator
        .aggregate_families(&SENTIMENT_FAMILIES, Some("AAPL"))
        .await
        .unwrap();

    assert_eq!(out.sources, vec!["synthetic_social"]);
    assert_eq!(out.sentiment_score, 0.5);
}
