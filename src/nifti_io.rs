//
// nifti_io.rs
// Medprep-rs
//
// NIfTI-family (.nii/.hdr/.img) slice decoding and identity-affine encoding.
//
// Thales Matheus Mendonça Santos - November 2025

use std::path::{Path, PathBuf};

use ndarray::{Array2, ArrayD, Axis, Ix2};
use nifti::writer::WriterOptions;
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};
use tracing::debug;

use crate::error::CodecError;
use crate::quantize::QuantizedImage;

/// Decode the first slice of a NIfTI volume as (rows = j, columns = i).
///
/// A `.img` path is read through its sibling `.hdr`.
pub fn decode(path: &Path) -> Result<Array2<f64>, CodecError> {
    let decode_err = |reason: String| CodecError::Decode {
        path: path.to_path_buf(),
        reason,
    };

    let header_path = header_path(path);
    let obj = ReaderOptions::new()
        .read_file(&header_path)
        .map_err(|e| decode_err(e.to_string()))?;
    let volume: ArrayD<f64> = obj
        .into_volume()
        .into_ndarray::<f64>()
        .map_err(|e| decode_err(e.to_string()))?;

    first_slice(volume)
}

/// Reduce an (i, j, k, ...) volume to its first (i, j) slice, returned row-major as (j, i).
fn first_slice(mut volume: ArrayD<f64>) -> Result<Array2<f64>, CodecError> {
    if volume.ndim() < 2 {
        return Err(CodecError::UnsupportedShape(volume.shape().to_vec()));
    }
    if volume.ndim() > 2 {
        debug!("Volume {:?}: keeping the first slice", volume.shape());
    }
    while volume.ndim() > 2 {
        if volume.len_of(Axis(2)) == 0 {
            return Err(CodecError::UnsupportedShape(volume.shape().to_vec()));
        }
        volume = volume.index_axis_move(Axis(2), 0);
    }

    let plane = volume
        .into_dimensionality::<Ix2>()
        .map_err(|_| CodecError::UnsupportedShape(Vec::new()))?;
    Ok(plane.reversed_axes())
}

/// Write a slice with an identity affine. `.hdr`/`.img` targets produce a header/image pair.
pub fn encode(image: &QuantizedImage, path: &Path) -> Result<(), CodecError> {
    let header = NiftiHeader {
        sform_code: 1,
        qform_code: 0,
        srow_x: [1.0, 0.0, 0.0, 0.0],
        srow_y: [0.0, 1.0, 0.0, 0.0],
        srow_z: [0.0, 0.0, 1.0, 0.0],
        ..NiftiHeader::default()
    };

    let target = header_path(path);
    let paired = target != path;
    let writer = WriterOptions::new(&target)
        .reference_header(&header)
        .write_header_file(paired || is_extension(path, "hdr"));
    // Arrays are (rows, columns); NIfTI's first axis runs along a row.
    let result = match image {
        QuantizedImage::Gray8(a) => writer.write_nifti(&a.t()),
        QuantizedImage::Gray16(a) => writer.write_nifti(&a.t()),
    };

    result.map_err(|e| CodecError::Encode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn is_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .map_or(false, |e| e.eq_ignore_ascii_case(ext))
}

fn header_path(path: &Path) -> PathBuf {
    if is_extension(path, "img") {
        path.with_extension("hdr")
    } else {
        path.to_path_buf()
    }
}
