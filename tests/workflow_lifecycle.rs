//! Workflow orchestration end to end through the in-memory stores.

mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use common::{offline_builder, post, ScriptedScorer, StaticProvider};
use signal_forge::catalog::{Source, SourceType};
use signal_forge::store::{DocumentStore, MemoryDocumentStore, MemoryEmbeddingStore};
use signal_forge::workflow::{ProcessRequest, WorkflowStatus};
use signal_forge::ServiceError;

fn request(source_type: &str, source_name: &str, params: Value) -> ProcessRequest {
    ProcessRequest {
        source_type: source_type.into(),
        source_name: source_name.into(),
        params: Some(params),
    }
}

fn cnbc() -> Source {
    Source::new(SourceType::News, "cnbc")
}

struct BrokenStore;

#[async_trait]
impl DocumentStore for BrokenStore {
    async fn insert_many(&self, _c: &str, _docs: Vec<Value>) -> Result<Vec<String>, ServiceError> {
        Err(ServiceError::Persistence("disk full".into()))
    }
}

#[tokio::test]
async fn news_workflow_completes_and_persists() {
    let (p, _) = StaticProvider::new(vec![post("Apple beats", 10), post("Apple guides up", 4), post("Fed", 1)]);
    let docs = Arc::new(MemoryDocumentStore::new());
    let embeds = Arc::new(MemoryEmbeddingStore::new());
    let state = offline_builder()
        .with_provider(cnbc(), p)
        .with_document_store(docs.clone())
        .with_embedding_store(embeds.clone())
        .build()
        .unwrap();

    let accepted = state
        .orchestrator
        .process("news", request("news", "cnbc", json!({"ticker": "aapl"})))
        .unwrap();
    assert!(accepted.workflow_id.starts_with("news_cnbc_AAPL_"));
    assert_eq!(accepted.status, WorkflowStatus::Created);
    assert_eq!(accepted.message, "Started processing news data from cnbc");

    let early = state.orchestrator.status(&accepted.workflow_id).unwrap();
    assert!(matches!(early.status, WorkflowStatus::Created | WorkflowStatus::Running));

    let done = state.orchestrator.wait(&accepted.workflow_id).await.unwrap();
    assert_eq!(done.status, WorkflowStatus::Completed);
    assert_eq!(done.progress, 1.0);
    for stage in ["fetch", "extract", "analyze", "persist"] {
        assert_eq!(done.details[stage]["status"], "success", "stage {stage}");
    }
    assert_eq!(done.details["fetch"]["items"], 3);
    assert_eq!(done.details["fetch"]["fallback"], false);
    assert_eq!(done.details["extract"]["documents"], 3);

    assert_eq!(docs.count("news_analysis"), 3);
    assert_eq!(docs.count("news_aggregates"), 1);
    assert_eq!(embeds.count("news"), 3);
}

#[tokio::test]
async fn failed_scoring_batch_degrades_but_completes() {
    let items = (0..7).map(|i| post(&format!("item {i}"), 1)).collect();
    let (p, _) = StaticProvider::new(items);
    let state = offline_builder()
        .with_provider(cnbc(), p)
        .with_scorer(ScriptedScorer::failing_on(0))
        .build()
        .unwrap();

    let id = state
        .orchestrator
        .process("news", request("news", "cnbc", json!({})))
        .unwrap()
        .workflow_id;
    let done = state.orchestrator.wait(&id).await.unwrap();

    assert_eq!(done.status, WorkflowStatus::Completed);
    assert_eq!(done.details["analyze"]["failed_batches"], 1);
    assert_eq!(done.details["analyze"]["degraded"], 5);
    // Only the two healthy documents count toward the score.
    let score = done.details["analyze"]["sentiment_score"].as_f64().unwrap();
    assert!((score - 0.8).abs() < 1e-9);
}

#[tokio::test]
async fn empty_news_fetch_fails_at_fetch_stage() {
    let state = offline_builder().build().unwrap();

    let id = state
        .orchestrator
        .process("news", request("news", "cnbc", json!({"ticker": "AAPL"})))
        .unwrap()
        .workflow_id;
    let done = state.orchestrator.wait(&id).await.unwrap();

    assert_eq!(done.status, WorkflowStatus::Failed);
    assert_eq!(done.details["status"], "error");
    assert_eq!(done.details["stage"], "fetch");
    assert!(done.details.get("extract").is_none());
}

#[tokio::test]
async fn empty_social_fetch_uses_synthetic_generator() {
    let state = offline_builder().build().unwrap();

    let id = state
        .orchestrator
        .process("social", request("social_media", "reddit", json!({"ticker": "TSLA"})))
        .unwrap()
        .workflow_id;
    let done = state.orchestrator.wait(&id).await.unwrap();

    assert_eq!(done.status, WorkflowStatus::Completed);
    assert_eq!(done.details["fetch"]["fallback"], true);
    assert_eq!(done.details["fetch"]["provider"], "synthetic_social");
}

#[tokio::test]
async fn store_failure_marks_persist_partial() {
    let (p, _) = StaticProvider::new(vec![post("one", 1)]);
    let state = offline_builder()
        .with_provider(cnbc(), p)
        .with_document_store(Arc::new(BrokenStore))
        .build()
        .unwrap();

    let id = state
        .orchestrator
        .process("news", request("news", "cnbc", json!({})))
        .unwrap()
        .workflow_id;
    let done = state.orchestrator.wait(&id).await.unwrap();

    assert_eq!(done.status, WorkflowStatus::Completed);
    assert_eq!(done.details["persist"]["status"], "partial");
    assert_eq!(done.details["persist"]["partial"], true);
    assert_eq!(done.details["persist"]["embedded"], 1);
    assert_eq!(done.details["persist"]["errors"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn rejects_unknown_kind_and_source() {
    let state = offline_builder().build().unwrap();

    let err = state
        .orchestrator
        .process("weather", request("news", "cnbc", json!({})))
        .unwrap_err();
    assert!(matches!(err, ServiceError::UnknownKind(_)));

    let err = state
        .orchestrator
        .process("news", request("news", "bloomberg", json!({})))
        .unwrap_err();
    assert!(matches!(err, ServiceError::UnknownSource { .. }));
    assert!(state.orchestrator.is_empty());

    assert!(matches!(
        state.orchestrator.status("news_cnbc_general_0"),
        Err(ServiceError::WorkflowNotFound(_))
    ));
}

#[tokio::test]
async fn back_to_back_requests_get_distinct_ids() {
    let (p, _) = StaticProvider::new(vec![post("x", 1)]);
    let state = offline_builder().with_provider(cnbc(), p).build().unwrap();

    let mut ids = Vec::new();
    for _ in 0..20 {
        ids.push(
            state
                .orchestrator
                .process("news", request("news", "cnbc", json!({})))
                .unwrap()
                .workflow_id,
        );
    }
    let mut unique = ids.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), ids.len());
    assert_eq!(state.orchestrator.len(), 20);
}

#[tokio::test]
async fn polled_progress_never_decreases() {
    let (p, _) = StaticProvider::new(vec![post("a", 1), post("b", 2)]);
    let state = offline_builder().with_provider(cnbc(), p).build().unwrap();

    let id = state
        .orchestrator
        .process("news", request("news", "cnbc", json!({})))
        .unwrap()
        .workflow_id;

    let mut last = 0.0;
    for _ in 0..200 {
        let r = state.orchestrator.status(&id).unwrap();
        assert!(r.progress >= last);
        last = r.progress;
        if r.status.is_terminal() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(state.orchestrator.wait(&id).await.unwrap().progress, 1.0);
}
