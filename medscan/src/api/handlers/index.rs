use axum::extract::State;
use axum::Json;
use serde::Serialize;

use super::health::SERVICE_NAME;
use crate::api::state::AppState;
use crate::ocr::RECIPES;

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiDescription {
    pub name: String,
    pub version: String,
    pub description: String,
    pub endpoints: Vec<EndpointInfo>,
    pub features: FeatureFlags,
    pub data_sources: Vec<String>,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct EndpointInfo {
    pub method: String,
    pub path: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeatureFlags {
    pub ocr_available: bool,
    pub preprocessing_variants: usize,
    pub text_normalization: bool,
    pub fuzzy_correction: bool,
    pub label_context: bool,
    pub enrichment_cache: bool,
}

fn endpoint(method: &str, path: &str, description: &str) -> EndpointInfo {
    EndpointInfo {
        method: method.to_string(),
        path: path.to_string(),
        description: description.to_string(),
    }
}

/// `GET /`
#[utoipa::path(
    get,
    path = "/",
    tag = "health",
    responses(
        (status = 200, description = "API description", body = ApiDescription),
    )
)]
pub async fn api_description(State(state): State<AppState>) -> Json<ApiDescription> {
    Json(ApiDescription {
        name: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        description: "Reads medication labels from photos and enriches the medications found"
            .to_string(),
        endpoints: vec![
            endpoint("GET", "/", "This document"),
            endpoint("GET", "/health", "Service health"),
            endpoint(
                "POST",
                "/scan-medication",
                "Scan a label image (multipart field `medicationImage`)",
            ),
            endpoint("GET", "/openapi.json", "OpenAPI document"),
        ],
        features: FeatureFlags {
            ocr_available: state.pipeline.ocr_available(),
            preprocessing_variants: RECIPES.len(),
            text_normalization: true,
            fuzzy_correction: true,
            label_context: true,
            enrichment_cache: true,
        },
        data_sources: state.pipeline.enrichment().source_ids(),
    })
}
