use crate::datasource::DataSourceError;
use crate::engine::ReconstructionError;
use crate::orchestration::{IngestionError, OrchestrationError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Internal server error: {0}")]
    Internal(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Unprocessable activity log: {0}")]
    Unprocessable(String),
    #[error("Upstream error: {0}")]
    Upstream(String),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<DataSourceError> for AppError {
    fn from(err: DataSourceError) -> Self {
        match err {
            DataSourceError::NotFound(login) => {
                AppError::NotFound(format!("Sponsor {} not found", login))
            }
            other => AppError::Upstream(other.to_string()),
        }
    }
}

impl From<ReconstructionError> for AppError {
    fn from(err: ReconstructionError) -> Self {
        match err {
            ReconstructionError::InvalidRange { .. } => AppError::BadRequest(err.to_string()),
            ReconstructionError::MalformedEvent { .. }
            | ReconstructionError::InconsistentState { .. }
            | ReconstructionError::Timestamp(_) => AppError::Unprocessable(err.to_string()),
        }
    }
}

impl From<IngestionError> for AppError {
    fn from(err: IngestionError) -> Self {
        match err {
            IngestionError::DataSource(e) => e.into(),
            IngestionError::Db(e) => e.into(),
            IngestionError::InvalidTimestamp(_) => AppError::BadRequest(err.to_string()),
        }
    }
}

impl From<OrchestrationError> for AppError {
    fn from(err: OrchestrationError) -> Self {
        match err {
            OrchestrationError::Ingestion(e) => e.into(),
            OrchestrationError::Reconstruction(e) => e.into(),
            OrchestrationError::DataSource(e) => e.into(),
            OrchestrationError::Db(e) => e.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg),
        };

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), "{}", error_message);
        }

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
