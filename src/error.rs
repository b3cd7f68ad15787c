// src/error.rs
//! Error taxonomy shared by the fetch layer, workflows and the HTTP surface.
//!
//! Only `UnknownSource`, `UnknownKind` and `WorkflowNotFound` ever reach a
//! client. The remaining variants are raised at component seams and absorbed
//! there (empty data, neutral score, partial-success note).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("unknown source '{name}' for type '{source_type}'")]
    UnknownSource { source_type: String, name: String },

    #[error("unknown workflow kind '{0}'")]
    UnknownKind(String),

    #[error("workflow {0} not found")]
    WorkflowNotFound(String),

    #[error("provider {provider} failed: {message}")]
    ProviderFetch { provider: String, message: String },

    #[error("scoring batch failed: {0}")]
    ScoringBatch(String),

    #[error("persistence error: {0}")]
    Persistence(String),
}

impl ServiceError {
    pub fn unknown_source(source_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self::UnknownSource {
            source_type: source_type.into(),
            name: name.into(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ServiceError::UnknownSource { .. } | ServiceError::WorkflowNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            ServiceError::UnknownKind(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            ServiceError::UnknownSource { .. } => "unknown_source",
            ServiceError::UnknownKind(_) => "unknown_kind",
            ServiceError::WorkflowNotFound(_) => "workflow_not_found",
            ServiceError::ProviderFetch { .. } => "provider_fetch",
            ServiceError::ScoringBatch(_) => "scoring_batch",
            ServiceError::Persistence(_) => "persistence",
        }
    }
}

/// JSON body for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub detail: Option<String>,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            error: self.label().to_string(),
            detail: Some(self.to_string()),
        };
        (status, Json(body)).into_response()
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
