//! Request and error bodies of the HTTP surface

use serde::{Deserialize, Serialize};

/// Stable error codes returned by handlers
pub mod error_codes {
    pub const VALIDATION_ERROR: &str = "validation_error";
    pub const CONSENT_REQUIRED: &str = crate::explain::models::error_kinds::CONSENT_REQUIRED;
    pub const STORAGE_ERROR: &str = "storage_error";
}

/// Error body; shaped like a failed router reply so the UI can treat both alike
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    pub ok: bool,
    pub error: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: code.into(),
            message: message.into(),
        }
    }
}

/// Body of `POST /api/v1/selection`
#[derive(Debug, Clone, Deserialize)]
pub struct SelectionRequest {
    pub text: String,
}

/// Body of `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
