//
// codec.rs
// Medprep-rs
//
// Format dispatch: which inputs are decodable, which backend reads them, and which writer an output format uses.
//
// Thales Matheus Mendonça Santos - November 2025

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use ndarray::Array2;

use crate::config::{OutputFormat, OutputFormatFamily};
use crate::error::CodecError;
use crate::quantize::QuantizedImage;
use crate::{dicom_io, nifti_io, tiff_io};

/// Input extensions recognized by the directory walk, lowercase without the dot.
pub const INPUT_EXTENSIONS: [&str; 8] = ["tif", "tiff", "dicom", "dcm", "nii", "hdr", "img", "btf"];

fn input_family(path: &Path) -> Option<OutputFormatFamily> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "tif" | "tiff" | "btf" => Some(OutputFormatFamily::Tiff),
        "dicom" | "dcm" => Some(OutputFormatFamily::Dicom),
        "nii" | "hdr" | "img" => Some(OutputFormatFamily::Nifti),
        _ => None,
    }
}

/// True when the file name carries one of the decodable extensions (any case).
pub fn is_eligible(path: &Path) -> bool {
    input_family(path).is_some()
}

/// Decode any supported input into a single 2-D slice.
pub fn decode(path: &Path) -> Result<Array2<f64>, CodecError> {
    let slice = match input_family(path) {
        Some(OutputFormatFamily::Tiff) => tiff_io::decode(path)?,
        Some(OutputFormatFamily::Dicom) => dicom_io::decode(path)?,
        Some(OutputFormatFamily::Nifti) => nifti_io::decode(path)?,
        None => return Err(CodecError::UnknownInput(path.to_path_buf())),
    };

    if slice.is_empty() {
        return Err(CodecError::UnsupportedShape(slice.shape().to_vec()));
    }
    Ok(slice)
}

/// `output_stem` with the format's extension appended (the stem may itself contain dots).
pub fn output_path(output_stem: &Path, format: OutputFormat) -> PathBuf {
    let mut name = OsString::from(output_stem.as_os_str());
    name.push(format.extension());
    PathBuf::from(name)
}

/// Encode `image` next to `output_stem` and return the written path.
pub fn encode(
    image: &QuantizedImage,
    output_stem: &Path,
    format: OutputFormat,
) -> Result<PathBuf, CodecError> {
    let path = output_path(output_stem, format);
    match format.family() {
        OutputFormatFamily::Nifti => nifti_io::encode(image, &path)?,
        OutputFormatFamily::Dicom => dicom_io::encode(image, &path)?,
        OutputFormatFamily::Tiff => tiff_io::encode(image, &path)?,
    }
    Ok(path)
}
