use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use leptess::{LepTess, Variable};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::OcrConfig;
use crate::error::{Result, ScanError};
use crate::models::{ImageVariant, RecognitionResult};

/// Tesseract page segmentation mode 3: fully automatic, no OSD.
const PSM_AUTO: &str = "3";

/// Resolution hint; preprocessing upsamples labels to roughly print density.
const SOURCE_DPI: i32 = 300;

/// Runs optical text recognition on one preprocessed variant.
#[async_trait]
pub trait RecognitionEngine: Send + Sync {
    async fn recognize(&self, variant: &ImageVariant) -> Result<RecognitionResult>;

    fn is_available(&self) -> bool {
        true
    }
}

#[derive(Clone)]
enum EngineBackend {
    Local { pool: Arc<TesseractPool> },
    Unavailable { reason: String },
}

/// Fixed set of Tesseract handles handed out round-robin, so up to
/// `pool.len()` variants are recognized at the same time.
struct TesseractPool {
    workers: Vec<Arc<Mutex<LepTess>>>,
    next: AtomicUsize,
}

impl TesseractPool {
    fn checkout(&self) -> Arc<Mutex<LepTess>> {
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.workers.len();
        Arc::clone(&self.workers[index])
    }
}

#[derive(Clone)]
pub struct TesseractEngine {
    backend: EngineBackend,
    config: OcrConfig,
}

fn create_tesseract(config: &OcrConfig) -> std::result::Result<LepTess, String> {
    let mut lt =
        LepTess::new(config.tessdata_path.as_deref(), &config.languages).map_err(|e| e.to_string())?;
    lt.set_variable(Variable::TesseditPagesegMode, PSM_AUTO)
        .map_err(|e| format!("{e:?}"))?;
    Ok(lt)
}

impl TesseractEngine {
    pub fn new(config: &OcrConfig) -> Self {
        let size = config.concurrency.max(1);
        let workers: std::result::Result<Vec<_>, String> = (0..size)
            .map(|_| create_tesseract(config).map(|lt| Arc::new(Mutex::new(lt))))
            .collect();

        let backend = match workers {
            Ok(workers) => {
                info!(languages = %config.languages, workers = size, "Tesseract OCR initialized");
                EngineBackend::Local {
                    pool: Arc::new(TesseractPool {
                        workers,
                        next: AtomicUsize::new(0),
                    }),
                }
            }
            Err(e) => {
                let reason = format!("Tesseract not available: {e}");
                warn!("{}", reason);
                EngineBackend::Unavailable { reason }
            }
        };

        Self {
            backend,
            config: config.clone(),
        }
    }

    async fn recognize_internal(&self, variant: &ImageVariant) -> Result<RecognitionResult> {
        match &self.backend {
            EngineBackend::Local { pool } => {
                let bytes = variant.data.clone();
                let tesseract = pool.checkout();

                let (text, confidence) = tokio::task::spawn_blocking(move || {
                    let mut lt = tesseract.blocking_lock();
                    lt.set_image_from_mem(&bytes)
                        .map_err(|e| ScanError::Ocr(format!("Failed to set image: {e}")))?;
                    lt.set_source_resolution(SOURCE_DPI);
                    let text = lt
                        .get_utf8_text()
                        .map_err(|e| ScanError::Ocr(format!("Failed to extract text: {e}")))?;
                    Ok::<_, ScanError>((text, lt.mean_text_conf()))
                })
                .await
                .map_err(|e| ScanError::Ocr(format!("OCR task panicked: {e}")))??;

                Ok(RecognitionResult {
                    variant_id: variant.id,
                    recipe: variant.recipe,
                    text: text.trim().to_string(),
                    confidence: confidence.clamp(0, 100) as f32,
                })
            }
            EngineBackend::Unavailable { reason } => Err(ScanError::OcrUnavailable(reason.clone())),
        }
    }
}

#[async_trait]
impl RecognitionEngine for TesseractEngine {
    async fn recognize(&self, variant: &ImageVariant) -> Result<RecognitionResult> {
        let timeout_duration = Duration::from_secs(self.config.timeout_secs);

        match tokio::time::timeout(timeout_duration, self.recognize_internal(variant)).await {
            Ok(inner_result) => inner_result,
            Err(_) => Err(ScanError::Ocr(format!(
                "OCR of variant {} timed out after {} seconds",
                variant.recipe, self.config.timeout_secs
            ))),
        }
    }

    fn is_available(&self) -> bool {
        !matches!(self.backend, EngineBackend::Unavailable { .. })
    }
}
