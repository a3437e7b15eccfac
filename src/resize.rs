//
// resize.rs
// Medprep-rs
//
// Bilinear spatial resampling of quantized buffers through one of two interchangeable backends.
//
// Thales Matheus Mendonça Santos - November 2025

use fast_image_resize::images::Image;
use fast_image_resize::{PixelType, ResizeAlg, ResizeOptions, Resizer};
use image::imageops::{self, FilterType};
use image::{ImageBuffer, Luma, Pixel};
use ndarray::Array2;
use tracing::debug;

use crate::config::{ResizerBackend, TargetSize};
use crate::error::ResizeError;
use crate::quantize::QuantizedImage;

/// Resample `image` to `size` with the selected backend, keeping its bit depth.
pub fn resize(
    image: &QuantizedImage,
    size: TargetSize,
    backend: ResizerBackend,
) -> Result<QuantizedImage, ResizeError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(ResizeError::EmptyImage);
    }
    debug!(
        "Resizing {}x{} -> {} with {} backend",
        width, height, size, backend
    );

    let resized = match (backend, image) {
        (ResizerBackend::Pil, QuantizedImage::Gray8(a)) => {
            QuantizedImage::Gray8(resize_with_image(a, size)?)
        }
        (ResizerBackend::Pil, QuantizedImage::Gray16(a)) => {
            QuantizedImage::Gray16(resize_with_image(a, size)?)
        }
        (ResizerBackend::OpenCv, QuantizedImage::Gray8(a)) => {
            let pixels = a.as_standard_layout().into_owned().into_raw_vec();
            let bytes = resize_bilinear(pixels, (width, height), PixelType::U8, size)?;
            QuantizedImage::Gray8(into_array(bytes, size)?)
        }
        (ResizerBackend::OpenCv, QuantizedImage::Gray16(a)) => {
            let pixels = a.iter().flat_map(|v| v.to_ne_bytes()).collect();
            let bytes = resize_bilinear(pixels, (width, height), PixelType::U16, size)?;
            let values = bytes
                .chunks_exact(2)
                .map(|pair| u16::from_ne_bytes([pair[0], pair[1]]))
                .collect();
            QuantizedImage::Gray16(into_array(values, size)?)
        }
    };

    Ok(resized)
}

/// Converts the array into an `image` buffer, applies the triangle filter and converts back.
///
/// The triangle filter widens its support when shrinking, so downscales are
/// smoothed the same way an antialiased bilinear resize would be.
fn resize_with_image<T>(array: &Array2<T>, size: TargetSize) -> Result<Array2<T>, ResizeError>
where
    T: Copy + 'static,
    Luma<T>: Pixel<Subpixel = T>,
{
    let (rows, cols) = array.dim();
    let (width, height) = (cols as u32, rows as u32);
    let pixels = array.as_standard_layout().into_owned().into_raw_vec();
    let buffer: ImageBuffer<Luma<T>, Vec<T>> = ImageBuffer::from_raw(width, height, pixels)
        .ok_or(ResizeError::BufferMismatch { width, height })?;

    let resized = imageops::resize(&buffer, size.width(), size.height(), FilterType::Triangle);

    into_array(resized.into_raw(), size)
}

/// Plain bilinear interpolation on a packed single-channel buffer, without widening the
/// kernel on downscales. Pixel centers are aligned, edges are clamped.
fn resize_bilinear(
    pixels: Vec<u8>,
    (width, height): (u32, u32),
    pixel_type: PixelType,
    size: TargetSize,
) -> Result<Vec<u8>, ResizeError> {
    let source = Image::from_vec_u8(width, height, pixels, pixel_type)
        .map_err(|e| ResizeError::Backend(e.to_string()))?;
    let mut target = Image::new(size.width(), size.height(), pixel_type);

    let options = ResizeOptions::new().resize_alg(ResizeAlg::Interpolation(
        fast_image_resize::FilterType::Bilinear,
    ));
    Resizer::new()
        .resize(&source, &mut target, &options)
        .map_err(|e| ResizeError::Backend(e.to_string()))?;

    Ok(target.into_vec())
}

fn into_array<T>(values: Vec<T>, size: TargetSize) -> Result<Array2<T>, ResizeError> {
    Array2::from_shape_vec((size.height() as usize, size.width() as usize), values).map_err(|_| {
        ResizeError::BufferMismatch {
            width: size.width(),
            height: size.height(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient16(rows: usize, cols: usize) -> QuantizedImage {
        QuantizedImage::Gray16(Array2::from_shape_fn((rows, cols), |(r, c)| {
            ((r * cols + c) * 4095 / (rows * cols - 1)) as u16
        }))
    }

    #[test]
    fn both_backends_hit_the_target_size() {
        let size = TargetSize::new(7, 3).expect("size");
        let source = gradient16(12, 20);
        for backend in [ResizerBackend::Pil, ResizerBackend::OpenCv] {
            let resized = resize(&source, size, backend).expect("resize");
            assert_eq!(resized.dimensions(), (7, 3));
            assert_eq!(resized.bit_depth(), source.bit_depth());
        }
    }

    #[test]
    fn upscaling_preserves_constant_images() {
        let size = TargetSize::new(9, 9).expect("size");
        let source = QuantizedImage::Gray8(Array2::from_elem((2, 3), 200));
        for backend in [ResizerBackend::Pil, ResizerBackend::OpenCv] {
            match resize(&source, size, backend).expect("resize") {
                QuantizedImage::Gray8(a) => assert!(a.iter().all(|&v| v == 200)),
                other => panic!("unexpected depth: {:?}", other.bit_depth()),
            }
        }
    }

    #[test]
    fn backends_agree_within_interpolation_drift() {
        let size = TargetSize::new(16, 16).expect("size");
        let source = gradient16(32, 32);
        let pil = resize(&source, size, ResizerBackend::Pil).expect("pil");
        let opencv = resize(&source, size, ResizerBackend::OpenCv).expect("opencv");
        match (pil, opencv) {
            (QuantizedImage::Gray16(a), QuantizedImage::Gray16(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    assert!((i32::from(*x) - i32::from(*y)).abs() <= 200, "{} vs {}", x, y);
                }
            }
            _ => panic!("bit depth changed"),
        }
    }

    #[test]
    fn bilinear_upscale_interpolates_between_pixel_centers() {
        let source = QuantizedImage::Gray8(Array2::from_shape_vec((1, 2), vec![0u8, 100]).expect("shape"));
        let size = TargetSize::new(4, 1).expect("size");
        let out = match resize(&source, size, ResizerBackend::OpenCv).expect("resize") {
            QuantizedImage::Gray8(a) => a.row(0).to_vec(),
            other => panic!("unexpected depth: {:?}", other.bit_depth()),
        };
        // Fixed-point weights may land one level off the exact 0, 25, 75, 100.
        for (got, want) in out.iter().zip([0i32, 25, 75, 100]) {
            assert!((i32::from(*got) - want).abs() <= 1, "{:?}", out);
        }
    }

    #[test]
    fn bilinear_downscale_keeps_sixteen_bit_values() {
        let source = QuantizedImage::Gray16(Array2::from_shape_fn((4, 4), |(_, c)| {
            if c < 2 { 1000 } else { 4000 }
        }));
        let size = TargetSize::new(2, 2).expect("size");
        match resize(&source, size, ResizerBackend::OpenCv).expect("resize") {
            QuantizedImage::Gray16(a) => {
                assert_eq!(a.dim(), (2, 2));
                assert!(a.column(0).iter().all(|&v| (999..=1001).contains(&v)), "{:?}", a);
                assert!(a.column(1).iter().all(|&v| (3999..=4001).contains(&v)), "{:?}", a);
            }
            other => panic!("unexpected depth: {:?}", other.bit_depth()),
        }
    }
}
