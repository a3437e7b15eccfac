//
// tiff_io.rs
// Medprep-rs
//
// TIFF-family (.tif/.tiff/.btf) decoding into f64 arrays and grayscale encoding through the image crate.
//
// Thales Matheus Mendonça Santos - November 2025

use std::path::Path;

use image::{DynamicImage, ImageBuffer, ImageFormat, ImageReader, Luma, Pixel};
use ndarray::Array2;

use crate::error::CodecError;
use crate::quantize::QuantizedImage;

/// Reads the first page of a TIFF as a single-channel array.
///
/// Grayscale pages keep their stored values; color pages are reduced to luma
/// at their native sample depth.
pub fn decode(path: &Path) -> Result<Array2<f64>, CodecError> {
    let decode_err = |reason: String| CodecError::Decode {
        path: path.to_path_buf(),
        reason,
    };

    // The content is sniffed rather than trusting the extension, so .btf files decode too.
    let image = ImageReader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(|e| decode_err(e.to_string()))?;

    let (width, height) = (image.width() as usize, image.height() as usize);
    let values: Vec<f64> = match image {
        DynamicImage::ImageLuma8(buf) => widen(buf),
        DynamicImage::ImageLuma16(buf) => widen(buf),
        other => to_luma(other),
    };

    Array2::from_shape_vec((height, width), values).map_err(|e| decode_err(e.to_string()))
}

fn to_luma(image: DynamicImage) -> Vec<f64> {
    match &image {
        DynamicImage::ImageLumaA8(_) | DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => {
            widen(image.to_luma8())
        }
        DynamicImage::ImageLumaA16(_)
        | DynamicImage::ImageRgb16(_)
        | DynamicImage::ImageRgba16(_) => widen(image.to_luma16()),
        _ => widen(image.to_luma32f()),
    }
}

fn widen<T>(buffer: ImageBuffer<Luma<T>, Vec<T>>) -> Vec<f64>
where
    T: Copy + Into<f64>,
    Luma<T>: Pixel<Subpixel = T>,
{
    buffer.into_raw().into_iter().map(Into::into).collect()
}

/// Writes a grayscale TIFF at the image's bit depth, whatever the file extension.
pub fn encode(image: &QuantizedImage, path: &Path) -> Result<(), CodecError> {
    let (width, height) = image.dimensions();
    let encode_err = |reason: String| CodecError::Encode {
        path: path.to_path_buf(),
        reason,
    };

    match image {
        QuantizedImage::Gray8(a) => {
            let pixels = a.as_standard_layout().into_owned().into_raw_vec();
            let buffer: ImageBuffer<Luma<u8>, Vec<u8>> = ImageBuffer::from_raw(width, height, pixels)
                .ok_or_else(|| encode_err("pixel buffer does not match dimensions".into()))?;
            buffer
                .save_with_format(path, ImageFormat::Tiff)
                .map_err(|e| encode_err(e.to_string()))
        }
        QuantizedImage::Gray16(a) => {
            let pixels = a.as_standard_layout().into_owned().into_raw_vec();
            let buffer: ImageBuffer<Luma<u16>, Vec<u16>> =
                ImageBuffer::from_raw(width, height, pixels)
                    .ok_or_else(|| encode_err("pixel buffer does not match dimensions".into()))?;
            buffer
                .save_with_format(path, ImageFormat::Tiff)
                .map_err(|e| encode_err(e.to_string()))
        }
    }
}
