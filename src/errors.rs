use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

pub type CalcResult<T> = Result<T, SizingError>;

pub const INVALID_USAGE_MESSAGE: &str = "Valid monthly usage in kWh is required";
pub const CALCULATION_FAILED_MESSAGE: &str = "Failed to calculate system size";
pub const INVALID_BODY_MESSAGE: &str = "Request body must be a JSON object";

/// Errors raised by the sizing engine. Unrecognized selectors are not errors.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SizingError {
    /// Monthly usage missing, non-numeric, non-finite or not strictly positive.
    #[error("invalid monthly usage: {0}")]
    InvalidUsage(String),

    /// Anything that should not happen with sane reference tables.
    #[error("internal calculation fault: {message}")]
    Internal { message: String },
}

impl SizingError {
    pub fn internal(message: impl Into<String>) -> Self {
        SizingError::Internal { message: message.into() }
    }
}

/// Errors returned from HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Sizing(#[from] SizingError),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

/// Body of every error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Sizing(SizingError::InvalidUsage(_)) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Sizing(SizingError::Internal { .. }) | ApiError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Client-facing message. Internal detail stays in the logs.
    fn public_message(&self) -> String {
        match self {
            ApiError::Sizing(SizingError::InvalidUsage(_)) => INVALID_USAGE_MESSAGE.to_string(),
            ApiError::Sizing(SizingError::Internal { .. }) => CALCULATION_FAILED_MESSAGE.to_string(),
            ApiError::InternalError(_) => "An internal error occurred".to_string(),
            ApiError::BadRequest(msg) => msg.clone(),
            ApiError::NotFound(_) => self.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, "request rejected");
        }
        let body = ErrorBody { error: self.public_message() };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            ApiError::from(SizingError::InvalidUsage("-1".into())).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(SizingError::internal("boom")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(ApiError::NotFound("quote".into()).status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_internal_detail_is_not_exposed() {
        let err = ApiError::from(SizingError::internal("shading table corrupted at index 2"));
        assert_eq!(err.public_message(), CALCULATION_FAILED_MESSAGE);
        let err = ApiError::InternalError("lock poisoned".into());
        assert!(!err.public_message().contains("poisoned"));
    }

    #[test]
    fn test_invalid_usage_message_is_fixed() {
        let err = ApiError::from(SizingError::InvalidUsage("\"abc\"".into()));
        assert_eq!(err.public_message(), INVALID_USAGE_MESSAGE);
    }
}
