// src/api.rs
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::aggregate::{AggregateResult, Aggregator, SENTIMENT_FAMILIES};
use crate::catalog::{SourceCatalog, SourceType};
use crate::error::{ServiceError, ServiceResult};
use crate::ingest::types::{Envelope, FetchParams};
use crate::ingest::FetchCache;
use crate::workflow::{Orchestrator, ProcessAccepted, ProcessRequest, WorkflowRecord};

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<SourceCatalog>,
    pub cache: Arc<FetchCache>,
    pub aggregator: Arc<Aggregator>,
    pub orchestrator: Arc<Orchestrator>,
    pub started: Instant,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/sources", get(sources))
        .route("/process/{kind}", post(process))
        .route("/workflow/{id}", get(workflow_status))
        .route("/sentiment", get(market_sentiment))
        .route("/sentiment/{ticker}", get(ticker_sentiment))
        .route("/aggregate/{source_type}", get(aggregate_family))
        .route("/{source_type}/{source_name}", get(fetch_source))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
struct TickerQuery {
    #[serde(default)]
    ticker: Option<String>,
}

#[derive(Serialize)]
struct HealthResp {
    status: &'static str,
    uptime: f64,
    version: &'static str,
}

async fn health(State(state): State<AppState>) -> Json<HealthResp> {
    Json(HealthResp {
        status: "healthy",
        uptime: state.started.elapsed().as_secs_f64(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn sources(State(state): State<AppState>) -> Json<BTreeMap<String, Vec<String>>> {
    Json(state.catalog.as_map())
}

async fn fetch_source(
    State(state): State<AppState>,
    Path((source_type, source_name)): Path<(String, String)>,
    Query(q): Query<TickerQuery>,
) -> ServiceResult<Json<Envelope>> {
    let source = state.catalog.resolve(&source_type, &source_name)?;
    let params = FetchParams::for_ticker(q.ticker.as_deref());
    Ok(Json(state.cache.get(&source, &params).await))
}

async fn process(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Json(req): Json<ProcessRequest>,
) -> ServiceResult<Json<ProcessAccepted>> {
    state.orchestrator.process(&kind, req).map(Json)
}

async fn workflow_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ServiceResult<Json<WorkflowRecord>> {
    state.orchestrator.status(&id).map(Json)
}

async fn ticker_sentiment(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
) -> ServiceResult<Json<AggregateResult>> {
    state
        .aggregator
        .aggregate_families(&SENTIMENT_FAMILIES, Some(&ticker))
        .await
        .map(Json)
}

async fn market_sentiment(State(state): State<AppState>) -> ServiceResult<Json<AggregateResult>> {
    state
        .aggregator
        .aggregate_families(&SENTIMENT_FAMILIES, None)
        .await
        .map(Json)
}

async fn aggregate_family(
    State(state): State<AppState>,
    Path(source_type): Path<String>,
    Query(q): Query<TickerQuery>,
) -> ServiceResult<Json<AggregateResult>> {
    let family: SourceType = source_type
        .parse()
        .map_err(|_| ServiceError::unknown_source(&source_type, "*"))?;
    state
        .aggregator
        .aggregate(family, q.ticker.as_deref())
        .await
        .map(Json)
}
