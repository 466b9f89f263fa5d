use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use super::handlers;
use super::openapi;
use super::AppState;

pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server.cors_origins);

    Router::new()
        .route("/", get(handlers::index::api_description))
        .route("/health", get(handlers::health::health_check))
        .route("/scan-medication", post(handlers::scan::scan_medication))
        .route("/openapi.json", get(openapi::openapi_json))
        // The upload handler stops reading at the per-file limit and answers
        // with its own message.
        .layer(DefaultBodyLimit::disable())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    if origins.iter().any(|origin| origin == "*") {
        return cors.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    cors.allow_origin(AllowOrigin::list(allowed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, EnrichmentConfig, OcrConfig, ServerConfig, DEFAULT_MAX_UPLOAD_SIZE};
    use crate::enrichment::EnrichmentService;
    use crate::ocr::{TesseractEngine, VariantPreprocessor};
    use crate::scan::ScanPipeline;
    use std::sync::Arc;

    fn state(cors_origins: Vec<String>) -> AppState {
        let ocr = OcrConfig {
            languages: "not-installed".to_string(),
            ..OcrConfig::default()
        };
        let enrichment = EnrichmentConfig::default();
        let pipeline = ScanPipeline::new(
            Arc::new(VariantPreprocessor::new(&ocr)),
            Arc::new(TesseractEngine::new(&ocr)),
            EnrichmentService::from_config(&enrichment).unwrap(),
            ocr.concurrency,
        );
        let config = Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors_origins,
                max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
            },
            ocr,
            enrichment,
        };
        AppState::new(config, pipeline)
    }

    // Registering the scan handler requires its future to be Send.
    #[test]
    fn router_builds_with_origin_list() {
        let _router = create_router(state(vec![
            "http://localhost:3000".to_string(),
            "not a header value\n".to_string(),
        ]));
    }

    #[test]
    fn router_builds_with_any_origin() {
        let _router = create_router(state(vec!["*".to_string()]));
    }
}
