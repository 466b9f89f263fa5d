use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::aggregate::select_best;
use super::assemble::ResponseAssembler;
use super::extract::extract;
use super::normalize::normalize;
use crate::config::Config;
use crate::enrichment::EnrichmentService;
use crate::error::{Result, ScanError};
use crate::models::{AggregatedText, ImageVariant, RecognitionResult, ScanRequest, ScanResponse};
use crate::ocr::{ImagePreprocessor, RecognitionEngine, TesseractEngine, VariantPreprocessor};

/// Runs one upload through preprocessing, recognition, normalization,
/// extraction, enrichment and assembly.
#[derive(Clone)]
pub struct ScanPipeline {
    preprocessor: Arc<dyn ImagePreprocessor>,
    engine: Arc<dyn RecognitionEngine>,
    enrichment: EnrichmentService,
    concurrency: usize,
}

impl ScanPipeline {
    pub fn new(
        preprocessor: Arc<dyn ImagePreprocessor>,
        engine: Arc<dyn RecognitionEngine>,
        enrichment: EnrichmentService,
        concurrency: usize,
    ) -> Self {
        Self {
            preprocessor,
            engine,
            enrichment,
            concurrency: concurrency.max(1),
        }
    }

    /// Tesseract, the `image`-crate preprocessor and HTTP enrichment sources.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            Arc::new(VariantPreprocessor::new(&config.ocr)),
            Arc::new(TesseractEngine::new(&config.ocr)),
            EnrichmentService::from_config(&config.enrichment)?,
            config.ocr.concurrency,
        ))
    }

    pub fn ocr_available(&self) -> bool {
        self.engine.is_available()
    }

    pub fn enrichment(&self) -> &EnrichmentService {
        &self.enrichment
    }

    pub async fn scan(&self, request: &ScanRequest) -> Result<ScanResponse> {
        let variants = self.preprocessor.preprocess(request.bytes.clone()).await?;
        debug!(request_id = %request.id, variants = variants.len(), "Image preprocessed");

        let aggregated = self.recognize(request.id, &variants).await?;
        drop(variants);

        let text = normalize(&aggregated.text);
        let candidates = extract(&text);

        let mut infos = self.enrichment.enrich_all(&candidates).await;
        for (info, candidate) in infos.iter_mut().zip(&candidates) {
            info.fill_from_label(&candidate.context);
        }

        let response = ResponseAssembler::assemble(request, &aggregated, text, &candidates, infos);

        info!(
            request_id = %request.id,
            filename = %request.filename,
            variants_used = aggregated.variants_used,
            recipe = %aggregated.recipe,
            confidence = aggregated.confidence,
            medications = response.medications.len(),
            processing_ms = response.processing_time,
            "Scan completed"
        );

        Ok(response)
    }

    /// Recognize every variant, tolerating individual failures, and select
    /// the best reading. Fails only if no variant produced a result.
    pub async fn recognize(
        &self,
        request_id: Uuid,
        variants: &[ImageVariant],
    ) -> Result<AggregatedText> {
        let outcomes: Vec<(ImageVariant, Result<RecognitionResult>)> =
            stream::iter(variants.iter().cloned())
                .map(|variant| {
                    let engine = Arc::clone(&self.engine);
                    async move {
                        let outcome = engine.recognize(&variant).await;
                        (variant, outcome)
                    }
                })
                .buffer_unordered(self.concurrency)
                .collect()
                .await;

        let mut results = Vec::with_capacity(outcomes.len());
        let mut last_error = None;

        for (variant, outcome) in outcomes {
            match outcome {
                Ok(result) => results.push(result),
                Err(e) => {
                    warn!(
                        request_id = %request_id,
                        variant = variant.id,
                        recipe = %variant.recipe,
                        error = %e,
                        "Recognition failed for variant"
                    );
                    last_error = Some(e);
                }
            }
        }

        results.sort_by_key(|r| r.variant_id);

        select_best(&results).ok_or_else(|| {
            let reason = match last_error {
                Some(e) => format!("{} variants attempted, last error: {e}", variants.len()),
                None => "no variants to recognize".to_string(),
            };
            ScanError::RecognitionFailure(reason)
        })
    }
}
