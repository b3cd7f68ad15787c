// tests/providers_fixtures.rs
//
// Live-integration parsers fed from recorded payloads; no network.

use signal_forge::document::{extract, ScoreScale};
use signal_forge::ingest::providers::{reddit::parse_listing, CnbcRssProvider};
use signal_forge::ingest::types::{FetchParams, SourceProvider};

const CNBC_XML: &str = include_str!("fixtures/cnbc_rss.xml");
const REDDIT_JSON: &str = include_str!("fixtures/reddit_hot.json");

#[tokio::test]
async fn cnbc_fixture_maps_all_headlines() {
    let p = CnbcRssProvider::from_fixture(CNBC_XML);
    let items = p.fetch(&FetchParams::default()).await.unwrap();

    assert_eq!(items.len(), 3, "empty item must be skipped");
    assert_eq!(
        items[0]["headline"],
        "Apple (AAPL) shares climb after record services revenue"
    );
    assert_eq!(items[0]["content"], "Apple beat estimates on \"strong\" iPhone demand.");
    assert_eq!(items[0]["timestamp"], "2025-06-10T14:30:00Z");
    assert_eq!(items[0]["source"], "CNBC");
}

#[tokio::test]
async fn cnbc_fixture_filters_by_ticker() {
    let p = CnbcRssProvider::from_fixture(CNBC_XML);
    let items = p
        .fetch(&FetchParams::for_ticker(Some("tsla")))
        .await
        .unwrap();

    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["url"], "https://www.cnbc.com/2025/06/10/tesla-recall.html");

    let docs = extract(&items, "cnbc", Some("TSLA"), ScoreScale::Signed).documents;
    assert_eq!(docs[0].title, "Tesla recalls vehicles over software issue");
    assert_eq!(docs[0].source, "CNBC");
    assert!(docs[0].created_at.is_some());
}

#[test]
fn reddit_fixture_maps_posts() {
    let items = parse_listing(REDDIT_JSON, "wallstreetbets", None).unwrap();
    assert_eq!(items.len(), 3);

    let first = &items[0];
    assert_eq!(first["author"], "diamondhands");
    assert_eq!(first["score"], 1542);
    assert_eq!(first["num_comments"], 311);
    assert_eq!(first["platform"], "Reddit");
    assert_eq!(
        first["url"],
        "https://www.reddit.com/r/wallstreetbets/comments/abc/tsla_moon/"
    );

    // Missing selftext deserializes as empty.
    assert_eq!(items[2]["content"], "");
}

#[test]
fn reddit_fixture_keeps_only_ticker_mentions() {
    let items = parse_listing(REDDIT_JSON, "wallstreetbets", Some("TSLA")).unwrap();
    assert_eq!(items.len(), 1);

    let docs = extract(&items, "reddit", Some("TSLA"), ScoreScale::Unit).documents;
    assert_eq!(docs[0].likes, 1542);
    assert_eq!(docs[0].source, "Reddit");
    assert_eq!(docs[0].ticker.as_deref(), Some("TSLA"));
}

#[test]
fn reddit_garbage_body_is_an_error() {
    assert!(parse_listing("<html>rate limited</html>", "stocks", None).is_err());
}
