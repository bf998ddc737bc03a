use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use geofence::GeoError;
use serde_json::json;
use submission_queue::{QueueError, SubmissionError};
use thiserror::Error;
use zone_watch::WatchError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{message}")]
    Unprocessable { message: String, errors: Vec<String> },

    #[error("{0}")]
    Unavailable(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Unprocessable { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{}", self);
        }
        let errors = match &self {
            Self::Unprocessable { errors, .. } => errors.clone(),
            _ => Vec::new(),
        };
        (status, Json(json!({ "error": self.to_string(), "errors": errors }))).into_response()
    }
}

impl From<GeoError> for ApiError {
    fn from(e: GeoError) -> Self {
        Self::BadRequest(e.to_string())
    }
}

impl From<WatchError> for ApiError {
    fn from(e: WatchError) -> Self {
        match e {
            WatchError::PermissionDenied(_) => Self::Forbidden(e.to_string()),
            WatchError::SensorUnavailable(_) | WatchError::Timeout(_) => Self::Unavailable(e.to_string()),
        }
    }
}

impl From<QueueError> for ApiError {
    fn from(e: QueueError) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<SubmissionError> for ApiError {
    fn from(e: SubmissionError) -> Self {
        match e {
            SubmissionError::ValidationRejected { errors } => Self::Unprocessable {
                message: "Invalid location".to_string(),
                errors,
            },
            SubmissionError::Rejected { message, errors } => Self::Unprocessable { message, errors },
            SubmissionError::Queue(e) => e.into(),
        }
    }
}
