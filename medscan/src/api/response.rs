//! Failure envelope shared by every endpoint.
//!
//! ```json
//! { "success": false, "error": "No image file provided" }
//! ```
//!
//! Validation problems are reported with their message and HTTP 400. Every
//! other failure is logged and reported as HTTP 500 with a fixed message;
//! internal details never reach the client.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::error::ScanError;

pub const PROCESSING_FAILED: &str = "Failed to process medication image";

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct ApiFailure {
    /// Always `false`.
    pub success: bool,
    /// Message safe to display to end users.
    pub error: String,

    /// HTTP status to use in the response. Not serialized on the wire.
    #[serde(skip)]
    status: StatusCode,
}

impl ApiFailure {
    /// HTTP 400 with the given message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: message.into(),
            status: StatusCode::BAD_REQUEST,
        }
    }

    /// HTTP 500 with the fixed processing-failure message.
    pub fn processing() -> Self {
        Self {
            success: false,
            error: PROCESSING_FAILED.to_string(),
            status: StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

impl From<ScanError> for ApiFailure {
    fn from(err: ScanError) -> Self {
        match err {
            ScanError::Validation(msg) => ApiFailure::validation(msg),
            internal => {
                tracing::error!(error = %internal, "Scan failed");
                ApiFailure::processing()
            }
        }
    }
}
