//
// dicom_io.rs
// Medprep-rs
//
// DICOM-family (.dcm/.dicom) decoding through dicom-pixeldata and Secondary Capture encoding of quantized slices.
//
// Thales Matheus Mendonça Santos - November 2025

use std::path::Path;

use dicom::core::{DataElement, PrimitiveValue, Tag, VR};
use dicom::dictionary_std::StandardDataDictionary;
use dicom::object::{open_file, FileDicomObject, FileMetaTableBuilder, InMemDicomObject};
use dicom::pixeldata::PixelDecoder;
use dicom::transfer_syntax::entries::EXPLICIT_VR_LITTLE_ENDIAN;
use dicom_pixeldata::{ConvertOptions, VoiLutOption};
use ndarray::{Array2, Axis};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::CodecError;
use crate::quantize::QuantizedImage;

const SECONDARY_CAPTURE_SOP_CLASS: &str = "1.2.840.10008.5.1.4.1.1.7";

/// Decode the first frame of a DICOM file into modality units.
///
/// The modality LUT (rescale slope/intercept) is applied, the VOI window is not.
/// Multi-sample pixels are averaged into one channel.
pub fn decode(path: &Path) -> Result<Array2<f64>, CodecError> {
    let decode_err = |reason: String| CodecError::Decode {
        path: path.to_path_buf(),
        reason,
    };

    let obj = open_file(path).map_err(|e| decode_err(e.to_string()))?;
    let decoded = obj
        .decode_pixel_data()
        .map_err(|e| decode_err(e.to_string()))?;

    let options = ConvertOptions::new().with_voi_lut(VoiLutOption::Identity);
    // Shape: (frames, rows, columns, samples per pixel).
    let volume = decoded
        .to_ndarray_with_options::<f32>(&options)
        .map_err(|e| decode_err(e.to_string()))?;

    let frames = volume.len_of(Axis(0));
    if frames == 0 {
        return Err(CodecError::UnsupportedShape(volume.shape().to_vec()));
    }
    if frames > 1 {
        debug!("{:?}: keeping frame 0 of {}", path, frames);
    }

    let first = volume.index_axis(Axis(0), 0);
    let luma = first
        .mean_axis(Axis(2))
        .ok_or_else(|| CodecError::UnsupportedShape(volume.shape().to_vec()))?;

    Ok(luma.mapv(f64::from))
}

/// Write a quantized slice as an uncompressed MONOCHROME2 Secondary Capture.
pub fn encode(image: &QuantizedImage, path: &Path) -> Result<(), CodecError> {
    let encode_err = |reason: String| CodecError::Encode {
        path: path.to_path_buf(),
        reason,
    };

    let (columns, rows) = image.dimensions();
    let (columns, rows) = match (u16::try_from(columns), u16::try_from(rows)) {
        (Ok(c), Ok(r)) => (c, r),
        _ => return Err(encode_err(format!("{}x{} exceeds DICOM limits", columns, rows))),
    };
    let (bits, pixel_vr, mut pixel_bytes) = match image {
        QuantizedImage::Gray8(a) => (
            8_u16,
            VR::OB,
            a.as_standard_layout().into_owned().into_raw_vec(),
        ),
        QuantizedImage::Gray16(a) => (
            16_u16,
            VR::OW,
            a.iter().flat_map(|v| v.to_le_bytes()).collect::<Vec<u8>>(),
        ),
    };
    // Pixel Data must have an even length.
    if pixel_bytes.len() % 2 == 1 {
        pixel_bytes.push(0);
    }

    let study_uid = derived_uid(path, "study");
    let series_uid = derived_uid(path, "series");
    let instance_uid = derived_uid(path, "instance");

    let mut obj = InMemDicomObject::new_empty_with_dict(StandardDataDictionary);
    let strings = [
        (Tag(0x0008, 0x0016), VR::UI, SECONDARY_CAPTURE_SOP_CLASS), // SOP Class UID
        (Tag(0x0008, 0x0018), VR::UI, instance_uid.as_str()),       // SOP Instance UID
        (Tag(0x0008, 0x0060), VR::CS, "OT"),                        // Modality
        (Tag(0x0008, 0x0064), VR::CS, "WSD"),                       // Conversion Type
        (Tag(0x0020, 0x000D), VR::UI, study_uid.as_str()),          // Study Instance UID
        (Tag(0x0020, 0x000E), VR::UI, series_uid.as_str()),         // Series Instance UID
        (Tag(0x0028, 0x0004), VR::CS, "MONOCHROME2"),               // Photometric Interpretation
    ];
    for (tag, vr, value) in strings {
        obj.put(DataElement::new(tag, vr, PrimitiveValue::from(value)));
    }

    let shorts = [
        (Tag(0x0028, 0x0002), 1_u16),    // Samples per Pixel
        (Tag(0x0028, 0x0010), rows),     // Rows
        (Tag(0x0028, 0x0011), columns),  // Columns
        (Tag(0x0028, 0x0100), bits),     // Bits Allocated
        (Tag(0x0028, 0x0101), bits),     // Bits Stored
        (Tag(0x0028, 0x0102), bits - 1), // High Bit
        (Tag(0x0028, 0x0103), 0_u16),    // Pixel Representation
    ];
    for (tag, value) in shorts {
        obj.put(DataElement::new(tag, VR::US, PrimitiveValue::from(value)));
    }

    obj.put(DataElement::new(
        Tag(0x7FE0, 0x0010),
        pixel_vr,
        PrimitiveValue::from(pixel_bytes),
    ));

    let file_meta = FileMetaTableBuilder::new()
        .transfer_syntax(EXPLICIT_VR_LITTLE_ENDIAN.uid())
        .media_storage_sop_class_uid(SECONDARY_CAPTURE_SOP_CLASS)
        .media_storage_sop_instance_uid(instance_uid.as_str())
        .build()
        .map_err(|e| encode_err(e.to_string()))?;

    let mut file_obj = FileDicomObject::new_empty_with_dict_and_meta(StandardDataDictionary, file_meta);
    for elem in obj {
        file_obj.put(elem);
    }

    file_obj
        .write_to_file(path)
        .map_err(|e| encode_err(e.to_string()))
}

/// Deterministic `2.25.<decimal>` UID so reruns write identical files.
fn derived_uid(path: &Path, role: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.to_string_lossy().as_bytes());
    hasher.update(role.as_bytes());
    let digest = hasher.finalize();

    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    format!("2.25.{}", u128::from_be_bytes(bytes))
}
