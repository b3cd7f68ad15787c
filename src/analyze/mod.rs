// src/analyze/mod.rs
//! Scoring capability and the batched analyze step.
//!
//! Documents are scored in fixed-size batches. A batch that fails (or returns
//! the wrong number of results) degrades only its own documents to the
//! neutral score with low confidence; the remaining batches still run.

pub mod lexicon;
pub mod remote;
pub mod synth;

use async_trait::async_trait;
use metrics::counter;

use crate::document::{Analysis, Document};
use crate::error::ServiceError;

pub use lexicon::LexiconScorer;
pub use remote::RemoteScorer;
pub use synth::{synthesize, weighted_score, Synthesis};

/// Pluggable sentiment capability. Implementations return one `Analysis`
/// per input document, in order, with `sentiment_score` in [0,1].
#[async_trait]
pub trait SentimentScorer: Send + Sync {
    async fn score_batch(&self, docs: &[Document]) -> Result<Vec<Analysis>, ServiceError>;
    fn name(&self) -> &'static str;
}

#[derive(Debug, Default)]
pub struct AnalyzeOutcome {
    pub documents: Vec<Document>,
    /// Documents scored by the capability in this run.
    pub scored: usize,
    /// Documents that fell back to the neutral default.
    pub degraded: usize,
    pub failed_batches: usize,
    pub batches: usize,
}

/// Score every document that has no analysis yet. Already-annotated
/// documents (pre-scored provider rows) pass through untouched.
pub async fn analyze_documents(
    scorer: &dyn SentimentScorer,
    mut docs: Vec<Document>,
    batch_size: usize,
) -> AnalyzeOutcome {
    let batch_size = batch_size.max(1);
    let pending: Vec<usize> = docs
        .iter()
        .enumerate()
        .filter(|(_, d)| d.analysis.is_none())
        .map(|(i, _)| i)
        .collect();

    let mut out = AnalyzeOutcome::default();
    for chunk in pending.chunks(batch_size) {
        out.batches += 1;
        let batch: Vec<Document> = chunk.iter().map(|&i| docs[i].clone()).collect();
        let result = scorer.score_batch(&batch).await.and_then(|v| {
            if v.len() == batch.len() {
                Ok(v)
            } else {
                Err(ServiceError::ScoringBatch(format!(
                    "expected {} results, got {}",
                    batch.len(),
                    v.len()
                )))
            }
        });

        match result {
            Ok(analyses) => {
                for (&i, mut a) in chunk.iter().zip(analyses) {
                    a.sentiment_score = a.sentiment_score.clamp(0.0, 1.0);
                    docs[i].analysis = Some(a);
                }
                out.scored += chunk.len();
            }
            Err(e) => {
                tracing::warn!(
                    scorer = scorer.name(),
                    batch = out.batches,
                    size = chunk.len(),
                    error = %e,
                    "scoring batch failed; applying neutral default"
                );
                counter!("scoring_batch_failures_total").increment(1);
                for &i in chunk {
                    docs[i].analysis = Some(Analysis::neutral_fallback());
                }
                out.degraded += chunk.len();
                out.failed_batches += 1;
            }
        }
    }
    out.documents = docs;
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Confidence;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn doc(title: &str) -> Document {
        Document {
            title: title.into(),
            author: String::new(),
            content: String::new(),
            url: String::new(),
            created_at: None,
            source: "t".into(),
            ticker: None,
            likes: 0,
            synthetic: false,
            analysis: None,
        }
    }

    /// Fails its second call.
    struct FlakyScorer {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SentimentScorer for FlakyScorer {
        async fn score_batch(&self, docs: &[Document]) -> Result<Vec<Analysis>, ServiceError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 1 {
                return Err(ServiceError::ScoringBatch("upstream 500".into()));
            }
            Ok(docs
                .iter()
                .map(|_| Analysis {
                    sentiment_score: 0.9,
                    topics: vec!["growth".into()],
                    confidence: Confidence::High,
                    degraded: false,
                })
                .collect())
        }
        fn name(&self) -> &'static str {
            "flaky"
        }
    }

    #[tokio::test]
    async fn failed_batch_degrades_only_its_documents() {
        let scorer = FlakyScorer {
            calls: AtomicUsize::new(0),
        };
        let docs: Vec<Document> = (0..7).map(|i| doc(&format!("d{i}"))).collect();
        let out = analyze_documents(&scorer, docs, 3).await;

        assert_eq!(out.batches, 3);
        assert_eq!(out.failed_batches, 1);
        assert_eq!(out.scored, 4);
        assert_eq!(out.degraded, 3);

        let a = out.documents[4].analysis.as_ref().unwrap();
        assert_eq!(a.sentiment_score, 0.5);
        assert_eq!(a.confidence, Confidence::Low);
        assert!(a.degraded);
        assert_eq!(out.documents[6].score(), Some(0.9));
    }

    #[tokio::test]
    async fn pre_scored_documents_are_skipped() {
        let mut d = doc("pre");
        d.analysis = Some(Analysis {
            sentiment_score: 0.2,
            topics: vec![],
            confidence: Confidence::Medium,
            degraded: false,
        });
        let out = analyze_documents(&LexiconScorer::new(), vec![d, doc("fresh")], 5).await;
        assert_eq!(out.scored, 1);
        assert_eq!(out.documents[0].score(), Some(0.2));
    }

    struct ShortScorer;

    #[async_trait]
    impl SentimentScorer for ShortScorer {
        async fn score_batch(&self, _docs: &[Document]) -> Result<Vec<Analysis>, ServiceError> {
            Ok(Vec::new())
        }
        fn name(&self) -> &'static str {
            "short"
        }
    }

    #[tokio::test]
    async fn length_mismatch_counts_as_failure() {
        let out = analyze_documents(&ShortScorer, vec![doc("a"), doc("b")], 5).await;
        assert_eq!(out.failed_batches, 1);
        assert!(out.documents.iter().all(|d| !d.contributes()));
    }
}
