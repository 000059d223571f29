//! Shared application error type, modeled on the teacher's
//! `control::error::AppError`: a flat `thiserror` enum with a single
//! `IntoResponse` impl that maps each kind onto the status-code table in
//! spec §7.

use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use tracing::error;

#[derive(Debug, Serialize)]
pub struct ProblemDetails {
    pub title: String,
    pub detail: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorWrapper {
    error: ProblemDetails,
}

/// Errors produced anywhere in the document lifecycle engine that can be
/// turned directly into an HTTP response by the axum handler shell (spec
/// §7). Library crates raise their own narrower error types and convert
/// into this one only at the service boundary.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Parse/schema-shape error (spec §7): missing required field, bad
    /// JSON shape. 400.
    #[error("invalid request: {0}")]
    Validation(String),

    /// Caller is not permitted to perform this action (spec §7): not the
    /// document owner at confirm, no scopes resolved for a sensitive
    /// status. 403. Never includes enough detail to reveal whether a
    /// denied record exists.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Unknown `doc_id`, unresolved storage path, etc. 404.
    #[error("not found: {0}")]
    NotFound(String),

    /// JWKS unreachable, KV down, directory unreachable with no fallback
    /// available. 503.
    #[error("upstream dependency unavailable: {0}")]
    Unavailable(String),

    /// Integrity manifest failed to build or verify in a way that must
    /// abort the confirmation (distinct from `IntegrityVerification`
    /// reports, which return booleans rather than erroring).
    #[error("integrity error: {0}")]
    Integrity(String),

    #[error("graph store error")]
    Graph(#[from] anyhow::Error),

    #[error("json serialization error")]
    Serde(#[from] serde_json::Error),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Integrity(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Graph(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Serde(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();

        if status.is_server_error() {
            error!(status = ?status, message = ?self, details = ?self.source());
        }

        let body = Json(ErrorWrapper {
            error: ProblemDetails {
                title: self.to_string(),
                detail: self.source().map(ToString::to_string),
            },
        });

        (status, body).into_response()
    }
}
