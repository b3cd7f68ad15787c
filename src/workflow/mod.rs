// src/workflow/mod.rs
//! # Workflow Orchestrator
//!
//! `process` registers a record in state `created`, hands the write side of
//! a `watch` channel to a background task and returns the id at once. The
//! task is the only writer for that workflow; `status` readers only borrow
//! the latest snapshot.
//!
//! Stages run strictly in order: fetch → extract → analyze → persist.

pub mod record;
pub mod stages;

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use metrics::counter;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::watch;

use crate::catalog::{SourceCatalog, SourceType};
use crate::error::{ServiceError, ServiceResult};
use crate::ingest::types::FetchParams;

pub use record::{WorkflowRecord, WorkflowStatus};
pub use stages::{Job, Pipeline, StageResult};

/// Body of `POST /process/{kind}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessRequest {
    pub source_type: String,
    pub source_name: String,
    #[serde(default)]
    pub params: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessAccepted {
    pub workflow_id: String,
    pub status: WorkflowStatus,
    pub message: String,
}

pub struct Orchestrator {
    pipeline: Arc<Pipeline>,
    catalog: SourceCatalog,
    workflows: DashMap<String, watch::Receiver<WorkflowRecord>>,
    last_micros: AtomicI64,
}

impl Orchestrator {
    pub fn new(pipeline: Arc<Pipeline>, catalog: SourceCatalog) -> Self {
        Self {
            pipeline,
            catalog,
            workflows: DashMap::new(),
            last_micros: AtomicI64::new(0),
        }
    }

    /// Strictly increasing microsecond stamp, so ids never collide even when
    /// two requests land in the same clock tick.
    fn next_micros(&self) -> i64 {
        let now = Utc::now().timestamp_micros();
        let mut prev = self.last_micros.load(Ordering::Relaxed);
        loop {
            let next = now.max(prev + 1);
            match self.last_micros.compare_exchange_weak(
                prev,
                next,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return next,
                Err(actual) => prev = actual,
            }
        }
    }

    /// Validate, register and spawn. Must be called inside a Tokio runtime.
    pub fn process(&self, kind: &str, req: ProcessRequest) -> ServiceResult<ProcessAccepted> {
        let kind: SourceType = kind
            .parse()
            .map_err(|_| ServiceError::UnknownKind(kind.to_string()))?;
        let source = self.catalog.resolve(&req.source_type, &req.source_name)?;
        let params = FetchParams::from_json(req.params.as_ref());

        let workflow_id = format!(
            "{}_{}_{}_{}",
            kind,
            source.name,
            params.ticker.as_deref().unwrap_or("general"),
            self.next_micros()
        );
        let record = WorkflowRecord::new(workflow_id.clone(), kind.as_str());
        let (tx, rx) = watch::channel(record);
        self.workflows.insert(workflow_id.clone(), rx);
        counter!("workflows_started_total").increment(1);

        let message = format!("Started processing {} data from {}", kind, source.name);
        let job = Job {
            kind: kind.as_str().to_string(),
            source,
            params,
        };
        tracing::info!(workflow_id = %workflow_id, source = %job.source, ticker = ?job.params.ticker, "workflow created");
        tokio::spawn(run(Arc::clone(&self.pipeline), job, tx));

        Ok(ProcessAccepted {
            message,
            workflow_id,
            status: WorkflowStatus::Created,
        })
    }

    pub fn status(&self, id: &str) -> ServiceResult<WorkflowRecord> {
        self.workflows
            .get(id)
            .map(|rx| rx.borrow().clone())
            .ok_or_else(|| ServiceError::WorkflowNotFound(id.to_string()))
    }

    /// Resolve once the workflow reaches a terminal state.
    pub async fn wait(&self, id: &str) -> ServiceResult<WorkflowRecord> {
        let mut rx = self
            .workflows
            .get(id)
            .map(|rx| rx.clone())
            .ok_or_else(|| ServiceError::WorkflowNotFound(id.to_string()))?;
        // Sender gone means the last value is final.
        if rx.wait_for(|r| r.status.is_terminal()).await.is_err() {
            tracing::debug!(workflow_id = %id, "workflow task ended before terminal state");
        }
        let terminal = rx.borrow().clone();
        Ok(terminal)
    }

    pub fn len(&self) -> usize {
        self.workflows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workflows.is_empty()
    }
}

/// Background body of one workflow. Owns the only sender.
async fn run(p: Arc<Pipeline>, job: Job, tx: watch::Sender<WorkflowRecord>) {
    let id = tx.borrow().workflow_id.clone();
    tx.send_modify(|r| {
        r.start();
    });
    tracing::info!(workflow_id = %id, "workflow running");

    let fetched = stages::fetch(&p, &job).await;
    if let StageResult::Ok(f) = &fetched {
        let d = stages::fetch_details(f);
        tx.send_modify(|r| {
            r.advance(0.25, "fetch", d);
        });
    }

    let extracted = stages::extract_stage(fetched);
    if let StageResult::Ok(b) = &extracted {
        let d = stages::extract_details(b);
        tx.send_modify(|r| {
            r.advance(0.5, "extract", d);
        });
    }

    let analyzed = stages::analyze_stage(&p, extracted).await;
    if let StageResult::Ok(b) = &analyzed {
        let d = stages::analyze_details(b);
        tx.send_modify(|r| {
            r.advance(0.75, "analyze", d);
        });
    }

    match stages::persist_stage(&p, &job, &analyzed).await {
        StageResult::Ok(persisted) => {
            let d = stages::persist_details(&persisted);
            tx.send_modify(|r| {
                r.advance(0.75, "persist", d);
                r.complete();
            });
            counter!("workflows_completed_total").increment(1);
            tracing::info!(workflow_id = %id, partial = persisted.partial, "workflow completed");
        }
        StageResult::Error { stage, message } => {
            tx.send_modify(|r| {
                r.fail(stage, &message);
            });
            counter!("workflows_failed_total").increment(1);
            tracing::warn!(workflow_id = %id, stage, message = %message, "workflow failed");
        }
    }
}
