// src/workflow/stages.rs
//! The four pipeline stages. Each takes the previous stage's `StageResult`
//! and passes an error marker straight through, so the runner can call them
//! unconditionally in order.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::aggregate::Aggregator;
use crate::analyze::{analyze_documents, synthesize, weighted_score, SentimentScorer};
use crate::catalog::Source;
use crate::document::{extract, Document, ScoreScale};
use crate::ingest::types::{Envelope, FetchParams};
use crate::ingest::FetchCache;
use crate::store::{DocumentStore, EmbeddingRecord, EmbeddingStore};

pub const WORKFLOW_TOPICS: usize = 5;

/// Success value or the error marker of the first stage that failed.
#[derive(Debug, Clone)]
pub enum StageResult<T> {
    Ok(T),
    Error { stage: &'static str, message: String },
}

impl<T> StageResult<T> {
    fn error(stage: &'static str, message: impl Into<String>) -> Self {
        StageResult::Error {
            stage,
            message: message.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, StageResult::Ok(_))
    }
}

/// Everything a workflow needs, shared read-only across runs.
pub struct Pipeline {
    pub cache: Arc<FetchCache>,
    pub aggregator: Arc<Aggregator>,
    pub scorer: Arc<dyn SentimentScorer>,
    pub documents: Arc<dyn DocumentStore>,
    pub embeddings: Arc<dyn EmbeddingStore>,
    pub batch_size: usize,
}

/// One requested run.
#[derive(Debug, Clone)]
pub struct Job {
    pub kind: String,
    pub source: Source,
    pub params: FetchParams,
}

#[derive(Debug, Clone)]
pub struct Fetched {
    pub envelope: Envelope,
    /// Provider label used for provenance (`synthetic_*` on fallback).
    pub provider: String,
    pub fallback: bool,
    pub scale: ScoreScale,
}

#[derive(Debug, Clone)]
pub struct ExtractedBatch {
    pub documents: Vec<Document>,
    pub overall: Vec<f64>,
    pub dropped: usize,
    pub provider: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyzedBatch {
    pub documents: Vec<Document>,
    pub sentiment_score: f64,
    pub topics: Vec<String>,
    pub scored: usize,
    pub degraded: usize,
    pub failed_batches: usize,
    pub provider: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Persisted {
    pub document_ids: usize,
    pub aggregate_id: Option<String>,
    pub embedded: usize,
    pub partial: bool,
    pub errors: Vec<String>,
}

pub async fn fetch(p: &Pipeline, job: &Job) -> StageResult<Fetched> {
    let chain = p.aggregator.chain(job.source.source_type);
    let scale = chain
        .map(|c| c.scale)
        .unwrap_or_else(|| ScoreScale::for_family(job.source.source_type));

    let envelope = p.cache.get(&job.source, &job.params).await;
    if !envelope.is_empty() {
        return StageResult::Ok(Fetched {
            provider: job.source.name.clone(),
            envelope,
            fallback: false,
            scale,
        });
    }

    let generator = chain.and_then(|c| c.synthetic.clone());
    if let Some(generator) = generator {
        match generator.fetch(&job.params).await {
            Ok(items) if !items.is_empty() => {
                tracing::info!(source = %job.source, generator = generator.name(), "provider empty; using synthetic data");
                let src = Source::new(job.source.source_type, generator.name());
                return StageResult::Ok(Fetched {
                    envelope: Envelope::new(&src, items, job.params.ticker.clone()),
                    provider: generator.name().to_string(),
                    fallback: true,
                    scale,
                });
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = ?e, generator = generator.name(), "synthetic generator failed"),
        }
    }
    StageResult::error(
        "fetch",
        format!("Failed to fetch {} data from {}", job.kind, job.source.name),
    )
}

pub fn extract_stage(input: StageResult<Fetched>) -> StageResult<ExtractedBatch> {
    let f = match input {
        StageResult::Ok(f) => f,
        StageResult::Error { stage, message } => return StageResult::Error { stage, message },
    };
    let ex = extract(
        &f.envelope.data,
        &f.provider,
        f.envelope.ticker.as_deref(),
        f.scale,
    );
    StageResult::Ok(ExtractedBatch {
        documents: ex.documents,
        overall: ex.overall,
        dropped: ex.dropped,
        provider: f.provider,
    })
}

pub async fn analyze_stage(
    p: &Pipeline,
    input: StageResult<ExtractedBatch>,
) -> StageResult<AnalyzedBatch> {
    let batch = match input {
        StageResult::Ok(b) => b,
        StageResult::Error { stage, message } => {
            return StageResult::Error { stage, message }
        }
    };
    let out = analyze_documents(p.scorer.as_ref(), batch.documents, p.batch_size).await;

    let contributing: Vec<Document> = out
        .documents
        .iter()
        .filter(|d| d.contributes())
        .cloned()
        .collect();
    let scores: Vec<f64> = contributing.iter().filter_map(Document::score).collect();
    let synthesis = synthesize(&contributing, WORKFLOW_TOPICS);

    StageResult::Ok(AnalyzedBatch {
        sentiment_score: weighted_score(&scores, &batch.overall),
        topics: synthesis.topics,
        scored: out.scored,
        degraded: out.degraded,
        failed_batches: out.failed_batches,
        documents: out.documents,
        provider: batch.provider,
    })
}

fn embedding_for(doc: &Document) -> EmbeddingRecord {
    let mut meta = Map::new();
    meta.insert("title".into(), Value::String(doc.title.clone()));
    meta.insert("source".into(), Value::String(doc.source.clone()));
    meta.insert("url".into(), Value::String(doc.url.clone()));
    meta.insert(
        "timestamp".into(),
        Value::String(doc.created_at.map(|t| t.to_rfc3339()).unwrap_or_default()),
    );
    meta.insert(
        "sentiment_score".into(),
        json!(doc.score().unwrap_or(crate::document::Analysis::NEUTRAL)),
    );
    EmbeddingRecord::new(doc.embedding_text(), meta)
}

/// JSON values for every item that serializes; failures land in `errors`.
fn serialize_all<T: Serialize>(items: &[T], errors: &mut Vec<String>) -> Vec<Value> {
    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        match serde_json::to_value(item) {
            Ok(v) => out.push(v),
            Err(e) => errors.push(format!("document {i}: {e}")),
        }
    }
    out
}

/// Write documents, the aggregate and embedding records. Store failures are
/// collected into the result; they never turn the stage into an error.
pub async fn persist_stage(
    p: &Pipeline,
    job: &Job,
    input: &StageResult<AnalyzedBatch>,
) -> StageResult<Persisted> {
    let batch = match input {
        StageResult::Ok(b) => b,
        StageResult::Error { stage, message } => {
            return StageResult::Error {
                stage: *stage,
                message: message.clone(),
            }
        }
    };
    let mut errors = Vec::new();

    let doc_values = serialize_all(&batch.documents, &mut errors);
    let document_ids = if doc_values.is_empty() {
        0
    } else {
        match p
            .documents
            .insert_many(&format!("{}_analysis", job.kind), doc_values)
            .await
        {
            Ok(ids) => ids.len(),
            Err(e) => {
                errors.push(format!("documents: {e}"));
                0
            }
        }
    };

    let aggregate = json!({
        "source": job.source.name,
        "provider": batch.provider,
        "ticker": job.params.ticker,
        "sentiment_score": batch.sentiment_score,
        "topics": batch.topics,
        "document_count": batch.documents.len(),
    });
    let aggregate_id = match p
        .documents
        .insert_one(&format!("{}_aggregates", job.kind), aggregate)
        .await
    {
        Ok(id) => Some(id),
        Err(e) => {
            errors.push(format!("aggregate: {e}"));
            None
        }
    };

    let records: Vec<EmbeddingRecord> = batch.documents.iter().map(embedding_for).collect();
    let embedded = if records.is_empty() {
        0
    } else {
        match p.embeddings.add(&job.kind, records).await {
            Ok(n) => n,
            Err(e) => {
                errors.push(format!("embeddings: {e}"));
                0
            }
        }
    };

    if !errors.is_empty() {
        metrics::counter!("persist_failures_total").increment(errors.len() as u64);
        tracing::error!(kind = %job.kind, source = %job.source, errors = ?errors, "persist partially failed");
    }

    StageResult::Ok(Persisted {
        document_ids,
        aggregate_id,
        embedded,
        partial: !errors.is_empty(),
        errors,
    })
}

pub fn fetch_details(f: &Fetched) -> Value {
    json!({
        "status": "success",
        "provider": f.provider,
        "fallback": f.fallback,
        "items": f.envelope.data.len(),
        "fetched_at": f.envelope.timestamp,
    })
}

pub fn extract_details(b: &ExtractedBatch) -> Value {
    json!({
        "status": "success",
        "documents": b.documents.len(),
        "dropped": b.dropped,
        "overall_figures": b.overall.len(),
    })
}

pub fn analyze_details(b: &AnalyzedBatch) -> Value {
    json!({
        "status": "success",
        "sentiment_score": b.sentiment_score,
        "topics": b.topics,
        "scored": b.scored,
        "degraded": b.degraded,
        "failed_batches": b.failed_batches,
    })
}

pub fn persist_details(p: &Persisted) -> Value {
    json!({
        "status": if p.partial { "partial" } else { "success" },
        "document_ids": p.document_ids,
        "aggregate_id": p.aggregate_id,
        "embedded": p.embedded,
        "partial": p.partial,
        "errors": p.errors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::ser::{Error as _, Serializer};

    struct Broken;

    impl Serialize for Broken {
        fn serialize<S: Serializer>(&self, _s: S) -> Result<S::Ok, S::Error> {
            Err(S::Error::custom("unsupported value"))
        }
    }

    #[test]
    fn unserializable_documents_are_reported() {
        let mut errors = Vec::new();
        let values = serialize_all(&[json!({"a": 1})], &mut errors);
        assert_eq!(values.len(), 1);
        assert!(errors.is_empty());

        let values = serialize_all(&[Broken, Broken], &mut errors);
        assert!(values.is_empty());
        assert_eq!(errors.len(), 2);
        assert!(errors[0].starts_with("document 0"));
    }
}
