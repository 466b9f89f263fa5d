//! Image preprocessing and optical text recognition.
//!
//! Both stages sit behind traits so the scan pipeline can be driven by
//! fakes in tests:
//! - [`ImagePreprocessor`] turns one upload into the fixed, ordered set of
//!   recognition variants ([`RECIPES`]); [`VariantPreprocessor`] is the
//!   `image`-crate implementation.
//! - [`RecognitionEngine`] reads one variant; [`TesseractEngine`] runs a
//!   small pool of Tesseract handles via leptess.
//!
//! # Configuration
//!
//! Controlled via `OcrConfig` (see `config.rs`):
//! - `languages`: Tesseract language codes, e.g. "eng" or "eng+fra"
//! - `tessdata_path`: optional tessdata directory
//! - `timeout_secs`: per-variant recognition timeout
//! - `canonical_width`: width every upload is scaled to before the recipes
//! - `max/min_image_dimension`: size limits
//! - `concurrency`: variants processed at once, and Tesseract pool size

mod preprocessing;
mod provider;

pub use preprocessing::{build_variants, ImagePreprocessor, VariantPreprocessor, RECIPES};
pub use provider::{RecognitionEngine, TesseractEngine};
