//! Medication enrichment from external information sources.
//!
//! [`EnrichmentService`] resolves each candidate against a priority-ordered
//! list of [`ExternalSourceClient`]s (openFDA, RxNorm, MedlinePlus by
//! default), merging fields first-come per field, and memoizes the result in
//! a [`MedicationCache`] keyed by normalized name. Source failures are logged
//! and absorbed; a candidate nobody knows still resolves to a named fallback.

mod cache;
mod merge;
mod service;
mod sources;

pub use cache::MedicationCache;
pub use merge::{source_text, SourceRecord, MAX_SOURCE_TEXT_CHARS};
pub use service::{EnrichmentService, Resolution};
pub use sources::{
    build_sources, ExternalSourceClient, MedlinePlusClient, OpenFdaClient, RxNormClient,
    MEDLINEPLUS, OPENFDA, RXNORM,
};
