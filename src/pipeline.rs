//
// pipeline.rs
// Medprep-rs
//
// Per-file transform: decode -> normalize -> quantize -> resize -> encode, with typed failure capture.
//
// Thales Matheus Mendonça Santos - November 2025

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::config::PipelineConfig;
use crate::error::{PipelineError, StageError};
use crate::{codec, normalize, quantize, resize};

/// Stages a file moves through, in order. A failure in any of them ends the run for that file.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
pub enum Stage {
    Decoding,
    Normalizing,
    Quantizing,
    Resizing,
    Encoding,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Decoding => "decode",
            Stage::Normalizing => "normalize",
            Stage::Quantizing => "quantize",
            Stage::Resizing => "resize",
            Stage::Encoding => "encode",
        };
        f.write_str(name)
    }
}

/// Written output path, or the stage and cause that stopped the file.
pub type ProcessingResult = Result<PathBuf, PipelineError>;

/// Applies one immutable configuration to individual files. Holds no per-file state.
#[derive(Debug, Clone, Copy)]
pub struct ImageTransformPipeline<'a> {
    config: &'a PipelineConfig,
}

impl<'a> ImageTransformPipeline<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self { config }
    }

    /// Transform `input` and write it to `output_stem` plus the configured extension.
    ///
    /// Only the encode stage writes, so a failed file leaves no output behind.
    pub fn process(&self, input: &Path, output_stem: &Path) -> ProcessingResult {
        let fail = |stage: Stage| {
            move |source: StageError| PipelineError {
                stage,
                path: input.to_path_buf(),
                source,
            }
        };

        debug!("Processing image: {:?}", input);

        let mut pixels = codec::decode(input)
            .map_err(StageError::from)
            .map_err(fail(Stage::Decoding))?;
        debug!("{}: decoded {:?}", Stage::Decoding, pixels.dim());

        normalize::normalize(&mut pixels, self.config.intensity);
        let (min, max) = normalize::value_range(&pixels);
        debug!("{}: {} -> [{}, {}]", Stage::Normalizing, self.config.intensity, min, max);

        let quantized = quantize::quantize(&pixels, self.config.output_mode, self.config.intensity);
        drop(pixels);
        debug!("{}: {}", Stage::Quantizing, quantized.bit_depth());

        let resized = resize::resize(&quantized, self.config.size, self.config.resizer)
            .map_err(StageError::from)
            .map_err(fail(Stage::Resizing))?;

        let written = codec::encode(&resized, output_stem, self.config.output_format)
            .map_err(StageError::from)
            .map_err(fail(Stage::Encoding))?;
        debug!("{}: wrote {:?}", Stage::Encoding, written);

        Ok(written)
    }
}
