//
// quantize.rs
// Medprep-rs
//
// Maps normalized intensities onto 8-bit or 12-bits-in-16 integer pixel buffers.
//
// Thales Matheus Mendonça Santos - November 2025

use ndarray::Array2;

use crate::config::{NormalizationMode, OutputBitDepth};

/// Brightest level written to 8-bit outputs.
pub const MAX_8BIT_LEVEL: u8 = 255;
/// Brightest level written to 16-bit outputs (12 bits of dynamic range).
pub const MAX_16BIT_LEVEL: u16 = 4095;

/// Single-channel integer pixels, shaped (rows, columns).
#[derive(Debug, Clone, PartialEq)]
pub enum QuantizedImage {
    Gray8(Array2<u8>),
    Gray16(Array2<u16>),
}

impl QuantizedImage {
    /// (width, height) in pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        let (rows, cols) = match self {
            QuantizedImage::Gray8(a) => a.dim(),
            QuantizedImage::Gray16(a) => a.dim(),
        };
        (cols as u32, rows as u32)
    }

    pub fn bit_depth(&self) -> OutputBitDepth {
        match self {
            QuantizedImage::Gray8(_) => OutputBitDepth::Eight,
            QuantizedImage::Gray16(_) => OutputBitDepth::Sixteen,
        }
    }
}

/// Clamp and truncate `normalized` into the configured integer format.
///
/// Raw mode at 16 bits clips pixel units straight to [0, 4095]; every other
/// combination clips to [0, 1] and scales to the full output level.
pub fn quantize(
    normalized: &Array2<f64>,
    depth: OutputBitDepth,
    mode: NormalizationMode,
) -> QuantizedImage {
    match depth {
        OutputBitDepth::Eight => {
            let max = f64::from(MAX_8BIT_LEVEL);
            QuantizedImage::Gray8(normalized.mapv(|v| (v.clamp(0.0, 1.0) * max) as u8))
        }
        OutputBitDepth::Sixteen if mode == NormalizationMode::Raw => {
            let max = f64::from(MAX_16BIT_LEVEL);
            QuantizedImage::Gray16(normalized.mapv(|v| v.clamp(0.0, max) as u16))
        }
        OutputBitDepth::Sixteen => {
            let max = f64::from(MAX_16BIT_LEVEL);
            QuantizedImage::Gray16(normalized.mapv(|v| (v.clamp(0.0, 1.0) * max) as u16))
        }
    }
}
