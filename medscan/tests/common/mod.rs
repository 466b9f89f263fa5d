#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::http::{header, Request};
use axum::Router;
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use medscan::api::{create_router, AppState};
use medscan::config::{Config, EnrichmentConfig, OcrConfig, ServerConfig, DEFAULT_MAX_UPLOAD_SIZE};
use medscan::enrichment::EnrichmentService;
use medscan::error::{Result, ScanError};
use medscan::models::{ImageVariant, RecognitionResult};
use medscan::ocr::{RecognitionEngine, VariantPreprocessor};
use medscan::scan::ScanPipeline;

pub const BOUNDARY: &str = "medscan-test-boundary";

/// A small PNG with a dark band, enough for every preprocessing recipe.
pub fn label_png(width: u32, height: u32) -> Vec<u8> {
    let img = GrayImage::from_fn(width, height, |x, y| {
        if y > height / 3 && y < 2 * height / 3 && x % 7 != 0 {
            Luma([20])
        } else {
            Luma([230])
        }
    });

    let mut buf = Vec::new();
    DynamicImage::ImageLuma8(img)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .expect("encode test png");
    buf
}

/// One multipart part.
pub struct Part<'a> {
    pub name: &'a str,
    pub filename: Option<&'a str>,
    pub content_type: Option<&'a str>,
    pub data: &'a [u8],
}

impl<'a> Part<'a> {
    pub fn image(data: &'a [u8]) -> Self {
        Self {
            name: "medicationImage",
            filename: Some("label.png"),
            content_type: Some("image/png"),
            data,
        }
    }

    pub fn text(name: &'a str, value: &'a str) -> Self {
        Self {
            name,
            filename: None,
            content_type: None,
            data: value.as_bytes(),
        }
    }
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        let mut disposition = format!("Content-Disposition: form-data; name=\"{}\"", part.name);
        if let Some(filename) = part.filename {
            disposition.push_str(&format!("; filename=\"{filename}\""));
        }
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(b"\r\n");
        if let Some(content_type) = part.content_type {
            body.extend_from_slice(format!("Content-Type: {content_type}\r\n").as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn scan_request(parts: &[Part<'_>]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/scan-medication")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes: Bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Reads the same text from every variant.
pub struct ScriptedEngine {
    pub text: String,
    pub confidence: f32,
    pub calls: Arc<AtomicUsize>,
}

impl ScriptedEngine {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            confidence: 85.0,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl RecognitionEngine for ScriptedEngine {
    async fn recognize(&self, variant: &ImageVariant) -> Result<RecognitionResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(RecognitionResult {
            variant_id: variant.id,
            recipe: variant.recipe,
            text: self.text.clone(),
            confidence: self.confidence,
        })
    }
}

/// Fails on every variant.
pub struct FailingEngine;

#[async_trait]
impl RecognitionEngine for FailingEngine {
    async fn recognize(&self, variant: &ImageVariant) -> Result<RecognitionResult> {
        Err(ScanError::Ocr(format!("cannot read variant {}", variant.recipe)))
    }
}

/// Configuration with every enrichment source pointed at `source_base_url`.
pub fn test_config(source_base_url: &str) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: vec!["http://localhost:3000".to_string()],
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
        },
        ocr: OcrConfig {
            canonical_width: 64,
            min_image_dimension: 4,
            concurrency: 2,
            ..OcrConfig::default()
        },
        enrichment: EnrichmentConfig {
            openfda_base_url: source_base_url.to_string(),
            rxnav_base_url: source_base_url.to_string(),
            medlineplus_base_url: source_base_url.to_string(),
            timeout_secs: 2,
            ..EnrichmentConfig::default()
        },
    }
}

/// Real preprocessing and HTTP enrichment, with the given recognizer.
pub fn build_app(engine: Arc<dyn RecognitionEngine>, config: Config) -> Router {
    let preprocessor = Arc::new(VariantPreprocessor::new(&config.ocr));
    let enrichment =
        EnrichmentService::from_config(&config.enrichment).expect("enrichment service");
    let pipeline = ScanPipeline::new(preprocessor, engine, enrichment, config.ocr.concurrency);
    create_router(AppState::new(config, pipeline))
}
