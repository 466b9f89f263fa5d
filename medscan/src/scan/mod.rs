//! The scan pipeline after recognition: aggregation, normalization,
//! extraction and response assembly, plus [`ScanPipeline`], which drives a
//! request through every stage.

pub mod aggregate;
pub mod assemble;
pub mod extract;
pub mod normalize;
mod pipeline;

pub use aggregate::select_best;
pub use assemble::{ResponseAssembler, TEXT_FORMATTING};
pub use extract::{extract, label_context};
pub use normalize::normalize;
pub use pipeline::ScanPipeline;
