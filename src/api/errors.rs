use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::error::PersistenceError;

/// Read-path failure, rendered as `500 {"error": ...}`.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::INTERNAL_SERVER_ERROR;
        let body = Json(json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

impl<E: Into<anyhow::Error>> From<E> for AppError {
    fn from(e: E) -> Self {
        Self(e.into())
    }
}

/// Write-path failure, rendered as `500 {"success": false, "error": ...}`.
#[derive(Debug)]
pub enum IngestError {
    /// The body was not JSON or did not fit the request shape.
    Body(JsonRejection),
    Persistence(PersistenceError),
}

impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        let message = match self {
            IngestError::Body(rejection) => rejection.body_text(),
            IngestError::Persistence(e) => e.to_string(),
        };
        let body = Json(json!({ "success": false, "error": message }));
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}

impl From<JsonRejection> for IngestError {
    fn from(e: JsonRejection) -> Self {
        Self::Body(e)
    }
}

impl From<PersistenceError> for IngestError {
    fn from(e: PersistenceError) -> Self {
        Self::Persistence(e)
    }
}
