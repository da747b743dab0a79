// src/api/error.rs
// Centralized error handling for HTTP API responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;
use tracing::error;

use crate::error::ServiceError;

/// Standard API error response format
#[derive(Debug)]
pub struct ApiError {
    pub message: String,
    pub status_code: StatusCode,
    pub error_code: Option<String>,
}

impl ApiError {
    fn with_code(status_code: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code,
            error_code: Some(code.to_string()),
        }
    }

    /// Create a new internal server error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::with_code(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }

    /// Create a new bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::with_code(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    /// Create a new not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::with_code(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    /// Create a new service unavailable error
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::with_code(StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE", message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        let message = err.to_string();
        match err {
            ServiceError::Loading => {
                Self::with_code(StatusCode::SERVICE_UNAVAILABLE, "LOADING", message)
            }
            ServiceError::StartupFailed(_) => {
                Self::with_code(StatusCode::SERVICE_UNAVAILABLE, "STARTUP_FAILED", message)
            }
            ServiceError::PersonasNotLoaded => {
                Self::with_code(StatusCode::SERVICE_UNAVAILABLE, "PERSONAS_NOT_LOADED", message)
            }
            ServiceError::PersonaNotFound { .. } => {
                Self::with_code(StatusCode::NOT_FOUND, "PERSONA_NOT_FOUND", message)
            }
            ServiceError::InvalidPersonaIndex { .. } => {
                Self::with_code(StatusCode::BAD_REQUEST, "INVALID_PERSONA_INDEX", message)
            }
            ServiceError::InvalidParameter(_) => {
                Self::with_code(StatusCode::BAD_REQUEST, "INVALID_PARAMETER", message)
            }
            ServiceError::Inference(_) | ServiceError::Tokenizer(_) | ServiceError::Backend(_) => {
                error!("Request failed: {}", message);
                Self::with_code(StatusCode::INTERNAL_SERVER_ERROR, "INFERENCE_FAILED", message)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response_json = json!({
            "error": true,
            "message": self.message,
            "status": self.status_code.as_u16()
        });

        if let Some(error_code) = self.error_code {
            response_json["error_code"] = json!(error_code);
        }

        (self.status_code, Json(response_json)).into_response()
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_creation() {
        let error = ApiError::internal("Test error");
        assert_eq!(error.status_code, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error.message, "Test error");
    }

    #[test]
    fn test_service_error_status_mapping() {
        let cases = [
            (ServiceError::Loading, StatusCode::SERVICE_UNAVAILABLE),
            (ServiceError::StartupFailed("x".into()), StatusCode::SERVICE_UNAVAILABLE),
            (ServiceError::PersonasNotLoaded, StatusCode::SERVICE_UNAVAILABLE),
            (ServiceError::PersonaNotFound { index: 9, total: 1 }, StatusCode::NOT_FOUND),
            (ServiceError::InvalidPersonaIndex { index: 9, total: 1 }, StatusCode::BAD_REQUEST),
            (ServiceError::InvalidParameter("top_p".into()), StatusCode::BAD_REQUEST),
            (ServiceError::Inference("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (ServiceError::Tokenizer("bad ids".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (ServiceError::Backend("refused".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_code, status);
        }
    }

    #[test]
    fn test_inference_error_keeps_underlying_text() {
        let error = ApiError::from(ServiceError::Inference("CUDA out of memory".into()));
        assert!(error.message.contains("CUDA out of memory"));
        assert_eq!(error.error_code.as_deref(), Some("INFERENCE_FAILED"));
    }
}
