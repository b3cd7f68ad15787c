// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod aggregate;
pub mod analyze;
pub mod api;
pub mod catalog;
pub mod config;
pub mod document;
pub mod error;
pub mod ingest;
pub mod metrics;
pub mod service;
pub mod store;
pub mod workflow;

pub use crate::api::{create_router, AppState};
pub use crate::error::{ServiceError, ServiceResult};
pub use crate::service::ServiceBuilder;

use axum::Router;

/// Shared state from a loaded config, with the default providers and stores.
pub fn build_state(cfg: config::ServiceConfig) -> anyhow::Result<AppState> {
    ServiceBuilder::new(cfg).build()
}

/// Full router (without `/metrics`) from env/file configuration.
pub fn app() -> anyhow::Result<Router> {
    let cfg = config::ServiceConfig::load()?;
    Ok(create_router(build_state(cfg)?))
}
