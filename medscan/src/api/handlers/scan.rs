use axum::body::Bytes;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::{info, warn};

use crate::api::response::ApiFailure;
use crate::api::state::AppState;
use crate::models::{ScanRequest, ScanResponse};

/// Multipart field carrying the label photo.
pub const IMAGE_FIELD: &str = "medicationImage";

pub const ACCEPTED_IMAGE_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/webp",
    "image/gif",
    "image/bmp",
    "image/tiff",
];

pub const NO_IMAGE_PROVIDED: &str = "No image file provided";
pub const INVALID_FILE_TYPE: &str =
    "Invalid file type. Only image files (JPEG, PNG, WebP, GIF, BMP, TIFF) are allowed.";

const MB: usize = 1024 * 1024;
const KB: usize = 1024;

fn file_too_large(max_size: usize) -> ApiFailure {
    ApiFailure::validation(format!(
        "File too large. Maximum size is {}.",
        display_size(max_size)
    ))
}

/// Exact human size: whole MB or KB when the limit divides evenly, bytes otherwise.
fn display_size(bytes: usize) -> String {
    if bytes >= MB && bytes % MB == 0 {
        format!("{}MB", bytes / MB)
    } else if bytes >= KB && bytes % KB == 0 {
        format!("{}KB", bytes / KB)
    } else {
        format!("{bytes} bytes")
    }
}

/// `POST /scan-medication`
///
/// Accepts a multipart form with a `medicationImage` file field. Returns the
/// extracted text and the medications found, or the failure envelope.
#[utoipa::path(
    post,
    path = "/scan-medication",
    tag = "scan",
    request_body(content_type = "multipart/form-data", content = String, description = "Label photo in the `medicationImage` field"),
    responses(
        (status = 200, description = "Scan completed (possibly with no medications)", body = ScanResponse),
        (status = 400, description = "Missing, oversized or non-image upload", body = ApiFailure),
        (status = 500, description = "Image could not be decoded or read", body = ApiFailure),
    )
)]
pub async fn scan_medication(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ScanResponse>, ApiFailure> {
    let multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            warn!(error = %rejection, "Scan request is not multipart");
            return Err(ApiFailure::validation(NO_IMAGE_PROVIDED));
        }
    };

    let upload = read_upload(multipart, state.config.server.max_upload_size).await?;
    let request = ScanRequest::new(upload.bytes, upload.mime_type, upload.filename);

    info!(
        request_id = %request.id,
        filename = %request.filename,
        size = request.size,
        mime_type = %request.mime_type,
        "Scan requested"
    );

    let response = state.pipeline.scan(&request).await?;
    Ok(Json(response))
}

struct Upload {
    bytes: Bytes,
    mime_type: String,
    filename: String,
}

async fn read_upload(mut multipart: Multipart, max_size: usize) -> Result<Upload, ApiFailure> {
    while let Some(mut field) = multipart.next_field().await.map_err(|e| multipart_failure(&e, max_size))? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or("upload").to_string();
        let declared_type = field.content_type().map(str::to_string);

        let mut data = Vec::new();
        while let Some(chunk) = field.chunk().await.map_err(|e| multipart_failure(&e, max_size))? {
            if data.len() + chunk.len() > max_size {
                return Err(file_too_large(max_size));
            }
            data.extend_from_slice(&chunk);
        }

        if data.is_empty() {
            return Err(ApiFailure::validation(NO_IMAGE_PROVIDED));
        }

        let mime_type = resolve_image_type(declared_type.as_deref(), &data)
            .ok_or_else(|| ApiFailure::validation(INVALID_FILE_TYPE))?;

        return Ok(Upload {
            bytes: Bytes::from(data),
            mime_type,
            filename,
        });
    }

    Err(ApiFailure::validation(NO_IMAGE_PROVIDED))
}

fn multipart_failure(err: &MultipartError, max_size: usize) -> ApiFailure {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return file_too_large(max_size);
    }
    warn!(error = %err.body_text(), "Malformed multipart upload");
    ApiFailure::validation(NO_IMAGE_PROVIDED)
}

/// The accepted image MIME type for this upload, or `None` if it is not an
/// image we take. Parts without a usable declared type are sniffed.
pub fn resolve_image_type(declared: Option<&str>, bytes: &[u8]) -> Option<String> {
    let declared = declared
        .map(|ct| ct.split(';').next().unwrap_or_default().trim().to_lowercase())
        .filter(|ct| !ct.is_empty() && ct != "application/octet-stream");

    let mime_type = match declared {
        Some(ct) => ct,
        None => infer::get(bytes)?.mime_type().to_string(),
    };

    ACCEPTED_IMAGE_TYPES
        .contains(&mime_type.as_str())
        .then_some(mime_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    #[test]
    fn declared_image_types_are_accepted() {
        assert_eq!(resolve_image_type(Some("image/png"), b""), Some("image/png".into()));
        assert_eq!(
            resolve_image_type(Some("IMAGE/JPEG; charset=binary"), b""),
            Some("image/jpeg".into())
        );
    }

    #[test]
    fn declared_non_image_types_are_rejected() {
        assert_eq!(resolve_image_type(Some("application/pdf"), PNG_MAGIC), None);
        assert_eq!(resolve_image_type(Some("text/plain"), b"hello"), None);
    }

    #[test]
    fn missing_type_is_sniffed() {
        assert_eq!(resolve_image_type(None, PNG_MAGIC), Some("image/png".into()));
        assert_eq!(
            resolve_image_type(Some("application/octet-stream"), PNG_MAGIC),
            Some("image/png".into())
        );
        assert_eq!(resolve_image_type(None, b"plain text"), None);
    }

    #[test]
    fn too_large_message_names_the_limit() {
        let failure = file_too_large(10 * 1024 * 1024);
        assert_eq!(failure.error, "File too large. Maximum size is 10MB.");
        assert_eq!(failure.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn too_large_message_never_rounds_down_to_zero() {
        assert_eq!(
            file_too_large(512 * 1024).error,
            "File too large. Maximum size is 512KB."
        );
        assert_eq!(
            file_too_large(1536 * 1024).error,
            "File too large. Maximum size is 1536KB."
        );
        assert_eq!(
            file_too_large(1000).error,
            "File too large. Maximum size is 1000 bytes."
        );
        assert_eq!(display_size(5 * MB), "5MB");
    }
}
