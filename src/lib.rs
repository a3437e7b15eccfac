//
// lib.rs
// Medprep-rs
//
// Exposes the preprocessing stages, the directory orchestrator and the CLI entry point for binary and library consumers.
//
// Thales Matheus Mendonça Santos - November 2025

// Public surface of the library: one module per pipeline stage plus the shared plumbing.
pub mod batch;
pub mod cli;
pub mod codec;
pub mod config;
pub mod dicom_io;
pub mod error;
pub mod logging;
pub mod models;
pub mod nifti_io;
pub mod normalize;
pub mod pipeline;
pub mod quantize;
pub mod resize;
pub mod tiff_io;

pub use batch::TreeOrchestrator;
pub use cli::{run as run_cli, Cli};
pub use config::{DatasetLocation, PipelineConfig};
pub use pipeline::{ImageTransformPipeline, ProcessingResult};
