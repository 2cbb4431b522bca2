use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

use crate::analysis::filter::RangeError;
use crate::ingest::IngestError;
use crate::storage::StoreError;

/// Handler failure, rendered as `{ "error": { "message", "details" } }`.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Ingest(IngestError),
    Store(StoreError),
}

impl From<RangeError> for ApiError {
    fn from(e: RangeError) -> Self {
        Self::BadRequest(e.to_string())
    }
}

impl From<IngestError> for ApiError {
    fn from(e: IngestError) -> Self {
        match e {
            IngestError::Store(inner) => Self::Store(inner),
            other => Self::Ingest(other),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Ingest(_) | Self::Store(StoreError::Rejected(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::Store(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn details(&self) -> Value {
        match self {
            Self::Ingest(IngestError::InvalidEntry(fields)) => json!(fields),
            Self::Ingest(IngestError::MissingColumns(cols)) => json!(cols),
            _ => Value::Null,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::BadRequest(msg) => msg.clone(),
            Self::Ingest(e) => e.to_string(),
            Self::Store(e) => e.to_string(),
        };
        if status.is_server_error() {
            tracing::error!(%message, "Request failed");
        } else {
            tracing::debug!(%message, "Request rejected");
        }
        let body = json!({
            "error": {
                "message": message,
                "details": self.details(),
            }
        });
        (status, Json(body)).into_response()
    }
}
