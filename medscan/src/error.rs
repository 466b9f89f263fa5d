use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::api::response::ApiFailure;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Image decode error: {0}")]
    ImageDecode(String),

    #[error("Recognition failed on every variant: {0}")]
    RecognitionFailure(String),

    #[error("OCR error: {0}")]
    Ocr(String),

    #[error("OCR unavailable: {0}")]
    OcrUnavailable(String),

    #[error("Source {source_id} unavailable: {reason}")]
    SourceUnavailable { source_id: String, reason: String },

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ScanError {
    pub fn source_unavailable(source_id: &str, reason: impl Into<String>) -> Self {
        ScanError::SourceUnavailable {
            source_id: source_id.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether the caller caused the failure (bad upload) rather than the pipeline.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ScanError::Validation(_))
    }
}

impl IntoResponse for ScanError {
    fn into_response(self) -> Response {
        ApiFailure::from(self).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
