// src/error.rs
// Typed failure kinds for the chat service

use thiserror::Error;

/// Everything that can go wrong while serving a request.
///
/// Callers (and tests) match on the variant instead of inspecting messages;
/// the HTTP layer maps each kind onto a status code in `api::error`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServiceError {
    #[error("system is still loading")]
    Loading,

    #[error("System not ready: {0}")]
    StartupFailed(String),

    #[error("Personas not loaded")]
    PersonasNotLoaded,

    #[error("Persona not found: index {index} (total {total})")]
    PersonaNotFound { index: i64, total: usize },

    #[error("Invalid persona index: {index} (valid range 0..{total})")]
    InvalidPersonaIndex { index: i64, total: usize },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("generation failed: {0}")]
    Inference(String),

    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    #[error("backend error: {0}")]
    Backend(String),
}

/// Convenience type alias for Result using ServiceError
pub type Result<T> = std::result::Result<T, ServiceError>;

impl ServiceError {
    /// Failures caused by the caller rather than the service
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ServiceError::PersonaNotFound { .. }
                | ServiceError::InvalidPersonaIndex { .. }
                | ServiceError::InvalidParameter(_)
        )
    }

    /// Failures that clear up once startup has finished successfully
    pub fn is_not_ready(&self) -> bool {
        matches!(
            self,
            ServiceError::Loading | ServiceError::StartupFailed(_) | ServiceError::PersonasNotLoaded
        )
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        ServiceError::Backend(err.to_string())
    }
}
