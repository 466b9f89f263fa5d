//! Medication label scanning service.
//!
//! An uploaded label photo is preprocessed into several recognition-friendly
//! variants ([`ocr`]), read with Tesseract, and the best reading is
//! normalized, mined for medication names and strengths, and enriched from
//! external drug-information sources ([`scan`], [`enrichment`]). The HTTP
//! surface lives in [`api`].

pub mod api;
pub mod config;
pub mod enrichment;
pub mod error;
pub mod models;
pub mod ocr;
pub mod scan;
