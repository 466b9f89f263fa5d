use axum::body::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use uuid::Uuid;

use super::MedicationEntry;

/// One uploaded image, as received at the HTTP boundary.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub id: Uuid,
    pub bytes: Bytes,
    pub mime_type: String,
    pub size: usize,
    pub filename: String,
    pub uploaded_at: DateTime<Utc>,
    /// Wall-clock start used for `processingTime`.
    pub started: Instant,
}

impl ScanRequest {
    pub fn new(bytes: Bytes, mime_type: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            size: bytes.len(),
            bytes,
            mime_type: mime_type.into(),
            filename: filename.into(),
            uploaded_at: Utc::now(),
            started: Instant::now(),
        }
    }
}

/// Fixed preprocessing transforms, in the order they are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recipe {
    Grayscale,
    Normalized,
    Sharpened,
    Gamma,
    DenoisedContrast,
    Binarized,
    Inverted,
}

impl Recipe {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Grayscale => "grayscale",
            Self::Normalized => "normalized",
            Self::Sharpened => "sharpened",
            Self::Gamma => "gamma",
            Self::DenoisedContrast => "denoised_contrast",
            Self::Binarized => "binarized",
            Self::Inverted => "inverted",
        }
    }
}

impl std::fmt::Display for Recipe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A preprocessed rendition of the uploaded image, PNG encoded.
#[derive(Debug, Clone)]
pub struct ImageVariant {
    pub id: usize,
    pub recipe: Recipe,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionResult {
    pub variant_id: usize,
    pub recipe: Recipe,
    pub text: String,
    /// 0–100 as reported by the recognizer.
    pub confidence: f32,
}

impl RecognitionResult {
    pub fn non_whitespace_len(&self) -> usize {
        self.text.chars().filter(|c| !c.is_whitespace()).count()
    }
}

/// The single reading chosen to drive extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedText {
    pub text: String,
    pub variant_id: usize,
    pub recipe: Recipe,
    pub confidence: f32,
    pub mean_confidence: f32,
    pub variants_used: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScanMetadata {
    pub filename: String,
    pub file_size: usize,
    pub upload_time: DateTime<Utc>,
    pub ocr_variants_used: usize,
    pub ocr_confidence: f32,
    pub text_formatting: String,
    pub request_id: Uuid,
}

/// Successful `/scan-medication` payload.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScanResponse {
    pub success: bool,
    pub extracted_text: String,
    pub medications: Vec<MedicationEntry>,
    /// Milliseconds since the request was received.
    pub processing_time: u64,
    pub metadata: ScanMetadata,
}
