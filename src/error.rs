//
// error.rs
// Medprep-rs
//
// Typed failure taxonomy: configuration defects, codec and resize failures, per-file pipeline errors and run-level errors.
//
// Thales Matheus Mendonça Santos - November 2025

use std::path::PathBuf;

use thiserror::Error;

use crate::pipeline::Stage;

/// Invalid configuration values; always raised before any file is touched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid intensity mode: {0} (expected minmax01, minmax11, zscore or raw)")]
    InvalidIntensity(String),

    #[error("invalid output mode: {0} (expected 8bit or 16bit)")]
    InvalidOutputMode(String),

    #[error("invalid resizer: {0} (expected pil or opencv)")]
    InvalidResizer(String),

    #[error("unsupported output format: {0}")]
    UnsupportedFormat(String),

    #[error("invalid target size {width}x{height}: both dimensions must be positive")]
    InvalidSize { width: u32, height: u32 },
}

/// Failures raised by the decode/encode backends.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("unrecognized input extension: {0:?}")]
    UnknownInput(PathBuf),

    #[error("failed to decode {path:?}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("failed to encode {path:?}: {reason}")]
    Encode { path: PathBuf, reason: String },

    #[error("unsupported array shape {0:?}")]
    UnsupportedShape(Vec<usize>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ResizeError {
    #[error("pixel buffer does not match {width}x{height}")]
    BufferMismatch { width: u32, height: u32 },

    #[error("cannot resize an empty image")]
    EmptyImage,

    #[error("bilinear resampler failed: {0}")]
    Backend(String),
}

/// Errors that can be raised by a single pipeline stage.
#[derive(Error, Debug)]
pub enum StageError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Resize(#[from] ResizeError),
}

/// A per-file failure: which stage broke, on which input, and why.
#[derive(Error, Debug)]
#[error("{stage} failed for {path:?}: {source}")]
pub struct PipelineError {
    pub stage: Stage,
    pub path: PathBuf,
    #[source]
    pub source: StageError,
}

/// Errors that short-circuit a whole run.
#[derive(Error, Debug)]
pub enum RunError {
    #[error("input root does not exist: {0:?}")]
    MissingRoot(PathBuf),

    #[error("input root is not a directory: {0:?}")]
    NotADirectory(PathBuf),

    #[error("cannot derive an output root from data path {0:?}")]
    InvalidDataPath(PathBuf),

    #[error("failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}
