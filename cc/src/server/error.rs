//! HTTP error responses

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use sessionstore::SessionError;
use thiserror::Error;
use tracing::{error, warn};

use crate::analysis::AnalysisError;
use crate::documents::DocumentError;

/// Everything a handler can fail with, mapped to a status and a
/// `{"error": "..."}` body
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::Document(_) => StatusCode::BAD_REQUEST,
            Self::Session(SessionError::NoActiveSession) => StatusCode::CONFLICT,
            Self::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Analysis(AnalysisError::MalformedOutput(_) | AnalysisError::Truncated { .. }) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::Analysis(AnalysisError::Llm(_)) => StatusCode::BAD_GATEWAY,
            Self::Analysis(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Session(SessionError::NoActiveSession) => "Session expired, reload the page and upload again".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<axum::extract::multipart::MultipartError> for ApiError {
    fn from(e: axum::extract::multipart::MultipartError) -> Self {
        Self::BadRequest(format!("Invalid multipart body: {}", e.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(%status, error = %self, "Request failed");
        } else {
            warn!(%status, error = %self, "Request rejected");
        }
        (status, Json(serde_json::json!({ "error": self.message() }))).into_response()
    }
}
