// src/store.rs
//! Opaque document and embedding stores used by the persist stage.
//! Both are traits so a real backend can be swapped in; the in-memory
//! implementations back the service by default and the tests.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::ServiceError;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert JSON documents into `collection`; returns their ids in order.
    async fn insert_many(&self, collection: &str, docs: Vec<Value>)
        -> Result<Vec<String>, ServiceError>;

    async fn insert_one(&self, collection: &str, doc: Value) -> Result<String, ServiceError> {
        let mut ids = self.insert_many(collection, vec![doc]).await?;
        ids.pop()
            .ok_or_else(|| ServiceError::Persistence("store returned no id".into()))
    }
}

/// One record for semantic retrieval. The id is the SHA-256 of the text,
/// so re-persisting the same content overwrites instead of duplicating.
#[derive(Debug, Clone, Serialize)]
pub struct EmbeddingRecord {
    pub id: String,
    pub text: String,
    pub metadata: Map<String, Value>,
}

impl EmbeddingRecord {
    pub fn new(text: String, metadata: Map<String, Value>) -> Self {
        Self {
            id: content_id(&text),
            text,
            metadata,
        }
    }
}

pub fn content_id(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    let mut out = String::with_capacity(64);
    for b in digest.iter() {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

#[async_trait]
pub trait EmbeddingStore: Send + Sync {
    async fn add(&self, collection: &str, records: Vec<EmbeddingRecord>)
        -> Result<usize, ServiceError>;
}

#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: DashMap<String, Vec<(String, Value)>>,
    next_id: AtomicU64,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, collection: &str) -> usize {
        self.collections.get(collection).map(|c| c.len()).unwrap_or(0)
    }

    pub fn documents(&self, collection: &str) -> Vec<Value> {
        self.collections
            .get(collection)
            .map(|c| c.iter().map(|(_, v)| v.clone()).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn insert_many(
        &self,
        collection: &str,
        docs: Vec<Value>,
    ) -> Result<Vec<String>, ServiceError> {
        let now = Value::String(Utc::now().to_rfc3339());
        let mut ids = Vec::with_capacity(docs.len());
        let mut entry = self.collections.entry(collection.to_string()).or_default();
        for mut doc in docs {
            let id = format!("{:016x}", self.next_id.fetch_add(1, Ordering::Relaxed));
            if let Value::Object(ref mut m) = doc {
                m.insert("_id".into(), Value::String(id.clone()));
                m.entry("stored_at").or_insert_with(|| now.clone());
            }
            entry.push((id.clone(), doc));
            ids.push(id);
        }
        Ok(ids)
    }
}

#[derive(Default)]
pub struct MemoryEmbeddingStore {
    collections: DashMap<String, DashMap<String, EmbeddingRecord>>,
}

impl MemoryEmbeddingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, collection: &str) -> usize {
        self.collections.get(collection).map(|c| c.len()).unwrap_or(0)
    }
}

#[async_trait]
impl EmbeddingStore for MemoryEmbeddingStore {
    async fn add(
        &self,
        collection: &str,
        records: Vec<EmbeddingRecord>,
    ) -> Result<usize, ServiceError> {
        let n = records.len();
        let coll = self.collections.entry(collection.to_string()).or_default();
        for r in records {
            coll.insert(r.id.clone(), r);
        }
        Ok(n)
    }
}
