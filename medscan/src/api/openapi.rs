use axum::Json;
use utoipa::OpenApi;

use super::handlers;
use super::response;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "medscan API",
        description = "Medication label scanning: multi-variant OCR, text correction, medication extraction and enrichment.",
    ),
    paths(
        handlers::index::api_description,
        handlers::health::health_check,
        handlers::scan::scan_medication,
    ),
    components(schemas(
        response::ApiFailure,
        models::ScanResponse,
        models::ScanMetadata,
        models::MedicationEntry,
        handlers::health::HealthResponse,
        handlers::index::ApiDescription,
        handlers::index::EndpointInfo,
        handlers::index::FeatureFlags,
    )),
    tags(
        (name = "health", description = "Health and service description"),
        (name = "scan", description = "Medication label scanning"),
    ),
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
