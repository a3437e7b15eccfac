//
// preprocessing_workflows.rs
// Medprep-rs
//
// Integration-style tests covering directory mirroring, per-file failure isolation, format dispatch and rerun stability.
//
// Thales Matheus Mendonça Santos - November 2025

use std::fs;
use std::path::{Path, PathBuf};

use dicom::core::{DataElement, PrimitiveValue, Tag, VR};
use dicom::dictionary_std::StandardDataDictionary;
use dicom::object::{FileDicomObject, FileMetaTableBuilder, InMemDicomObject};
use dicom::transfer_syntax::entries::EXPLICIT_VR_LITTLE_ENDIAN;
use image::{DynamicImage, ImageBuffer, Luma};
use medprep::config::{
    DatasetLocation, NormalizationMode, OutputBitDepth, OutputFormat, PipelineConfig,
    ResizerBackend, TargetSize,
};
use medprep::error::RunError;
use medprep::pipeline::Stage;
use medprep::{nifti_io, TreeOrchestrator};
use tempfile::{tempdir, TempDir};

fn config(
    intensity: NormalizationMode,
    size: (u32, u32),
    depth: OutputBitDepth,
    resizer: ResizerBackend,
    format: OutputFormat,
) -> PipelineConfig {
    PipelineConfig::new(
        intensity,
        TargetSize::new(size.0, size.1).expect("size"),
        depth,
        resizer,
        format,
    )
}

fn write_tiff16(path: &Path, width: u32, height: u32) {
    // Diagonal ramp covering most of the 16-bit range.
    let buffer: ImageBuffer<Luma<u16>, Vec<u16>> = ImageBuffer::from_fn(width, height, |x, y| {
        Luma([((x + y) * 60_000 / (width + height)) as u16])
    });
    buffer
        .save_with_format(path, image::ImageFormat::Tiff)
        .expect("write tiff");
}

fn write_tiff16_offset(path: &Path, offset: u16) {
    let buffer: ImageBuffer<Luma<u16>, Vec<u16>> =
        ImageBuffer::from_fn(4, 4, |x, y| Luma([offset + (x + 4 * y) as u16]));
    buffer
        .save_with_format(path, image::ImageFormat::Tiff)
        .expect("write tiff");
}

fn dataset() -> (TempDir, PathBuf) {
    let dir = tempdir().expect("tempdir");
    let root = dir.path().join("cohort");
    fs::create_dir_all(&root).expect("create root");
    (dir, root)
}

fn build_test_dicom(path: &Path) {
    // Tiny Secondary Capture with a rescale so modality units differ from stored values.
    let mut obj = InMemDicomObject::new_empty_with_dict(StandardDataDictionary);
    let strings = [
        (Tag(0x0008, 0x0016), VR::UI, "1.2.840.10008.5.1.4.1.1.7"),
        (Tag(0x0008, 0x0018), VR::UI, "1.2.826.0.1.3680043.2.1125.1"),
        (Tag(0x0008, 0x0060), VR::CS, "OT"),
        (Tag(0x0028, 0x0004), VR::CS, "MONOCHROME2"),
        (Tag(0x0028, 0x0008), VR::IS, "1"),    // Number of Frames
        (Tag(0x0028, 0x1052), VR::DS, "-1024"), // Rescale Intercept
        (Tag(0x0028, 0x1053), VR::DS, "2"),     // Rescale Slope
    ];
    for (tag, vr, value) in strings {
        obj.put(DataElement::new(tag, vr, PrimitiveValue::from(value)));
    }
    let shorts = [
        (Tag(0x0028, 0x0010), 2_u16), // Rows
        (Tag(0x0028, 0x0011), 2_u16), // Columns
        (Tag(0x0028, 0x0002), 1_u16), // Samples per pixel
        (Tag(0x0028, 0x0100), 8_u16), // Bits Allocated
        (Tag(0x0028, 0x0101), 8_u16), // Bits Stored
        (Tag(0x0028, 0x0102), 7_u16), // High Bit
        (Tag(0x0028, 0x0103), 0_u16), // Pixel Representation
    ];
    for (tag, value) in shorts {
        obj.put(DataElement::new(tag, VR::US, PrimitiveValue::from(value)));
    }
    obj.put(DataElement::new(
        Tag(0x7fe0, 0x0010),
        VR::OB,
        PrimitiveValue::from(vec![0_u8, 64, 128, 255]),
    ));

    let meta = FileMetaTableBuilder::new()
        .transfer_syntax(EXPLICIT_VR_LITTLE_ENDIAN.uid())
        .media_storage_sop_class_uid("1.2.840.10008.5.1.4.1.1.7")
        .media_storage_sop_instance_uid("1.2.826.0.1.3680043.2.1125.1")
        .build()
        .expect("meta");

    let mut file_obj = FileDicomObject::new_empty_with_dict_and_meta(StandardDataDictionary, meta);
    for elem in obj {
        file_obj.put(elem);
    }
    file_obj.write_to_file(path).expect("write test dicom");
}

#[test]
fn tiff_with_one_unreadable_sibling_processes_one() {
    let (dir, root) = dataset();
    write_tiff16(&root.join("scan.tiff"), 512, 512);
    fs::write(root.join("zz_corrupt.dcm"), b"not a dicom file").expect("write corrupt");

    let location = DatasetLocation::new(&root).expect("location");
    let config = config(
        NormalizationMode::MinMax01,
        (256, 256),
        OutputBitDepth::Eight,
        ResizerBackend::Pil,
        OutputFormat::Tiff,
    );
    let summary = TreeOrchestrator::new(&location, &config).run().expect("run");

    assert_eq!(summary.eligible, 2);
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.failures.len(), 1);
    assert!(summary.failures[0].path.ends_with("zz_corrupt.dcm"));
    assert_eq!(summary.failures[0].stage, Stage::Decoding);

    let output_root = dir.path().join("cohort_pre");
    assert_eq!(summary.output_root, output_root);
    let outputs: Vec<_> = fs::read_dir(&output_root)
        .expect("read output")
        .map(|e| e.expect("entry").file_name())
        .collect();
    assert_eq!(outputs.len(), 1);

    let written = image::open(output_root.join("scan.tiff")).expect("open output");
    match written {
        DynamicImage::ImageLuma8(buf) => assert_eq!(buf.dimensions(), (256, 256)),
        other => panic!("expected 8-bit grayscale, got {:?}", other.color()),
    }
}

#[test]
fn empty_subdirectories_are_mirrored_and_count_nothing() {
    let (dir, root) = dataset();
    fs::create_dir_all(root.join("patient_a/empty_series")).expect("dirs");
    fs::create_dir_all(root.join("patient_b")).expect("dirs");
    fs::write(root.join("patient_b/readme.txt"), b"ignored").expect("write");

    let location = DatasetLocation::new(&root).expect("location");
    let config = config(
        NormalizationMode::ZScore,
        (8, 8),
        OutputBitDepth::Sixteen,
        ResizerBackend::OpenCv,
        OutputFormat::Nii,
    );
    let summary = TreeOrchestrator::new(&location, &config).run().expect("run");

    assert_eq!(summary.processed, 0);
    assert_eq!(summary.eligible, 0);
    assert_eq!(summary.directories, 4);
    let out = dir.path().join("cohort_pre");
    assert!(out.join("patient_a/empty_series").is_dir());
    assert!(out.join("patient_b").is_dir());
    assert!(!out.join("patient_b/readme.txt").exists());
}

#[test]
fn one_corrupt_file_among_many_does_not_stop_siblings() {
    let (_dir, root) = dataset();
    let series = root.join("series");
    fs::create_dir_all(&series).expect("dirs");
    for name in ["a.tif", "b.TIF", "d.btf"] {
        write_tiff16(&series.join(name), 40, 30);
    }
    fs::write(series.join("c.nii"), b"truncated").expect("write corrupt");

    let location = DatasetLocation::new(&root).expect("location");
    let config = config(
        NormalizationMode::MinMax11,
        (20, 10),
        OutputBitDepth::Sixteen,
        ResizerBackend::OpenCv,
        OutputFormat::Dcm,
    );
    let summary = TreeOrchestrator::new(&location, &config).run().expect("run");

    assert_eq!(summary.eligible, 4);
    assert_eq!(summary.processed, 3);
    assert!(summary.failures[0].path.ends_with("c.nii"));

    let out = location.output_root().join("series");
    for stem in ["a", "b", "d"] {
        let decoded = medprep::dicom_io::decode(&out.join(format!("{}.dcm", stem))).expect("decode");
        assert_eq!(decoded.dim(), (10, 20));
        assert!(decoded.iter().all(|&v| v <= 4095.0));
    }
    assert!(!out.join("c.dcm").exists());
}

#[test]
fn dicom_rescale_flows_through_to_nifti() {
    let (_dir, root) = dataset();
    build_test_dicom(&root.join("ct.dcm"));

    let location = DatasetLocation::new(&root).expect("location");
    let config = config(
        NormalizationMode::MinMax01,
        (2, 2),
        OutputBitDepth::Sixteen,
        ResizerBackend::Pil,
        OutputFormat::Nii,
    );
    let summary = TreeOrchestrator::new(&location, &config).run().expect("run");
    assert_eq!(summary.processed, 1);

    let decoded = nifti_io::decode(&location.output_root().join("ct.nii")).expect("decode");
    // Modality values -1024, -896, -768, -514 rescaled to [0, 1] then to 12 bits.
    assert_eq!(decoded, ndarray::array![[0.0, 1027.0], [2055.0, 4095.0]]);
}

#[test]
fn raw_mode_clips_modality_units() {
    let (_dir, root) = dataset();
    build_test_dicom(&root.join("ct.dicom"));

    let location = DatasetLocation::new(&root).expect("location");
    let config = config(
        NormalizationMode::Raw,
        (2, 2),
        OutputBitDepth::Sixteen,
        ResizerBackend::Pil,
        OutputFormat::Tif,
    );
    let summary = TreeOrchestrator::new(&location, &config).run().expect("run");
    assert_eq!(summary.processed, 1);

    let decoded = medprep::tiff_io::decode(&location.output_root().join("ct.tif")).expect("decode");
    assert!(decoded.iter().all(|&v| v == 0.0));
}

#[test]
fn volumes_contribute_their_first_slice() {
    let (_dir, root) = dataset();
    let volume = ndarray::Array3::from_shape_fn((6, 5, 3), |(i, j, k)| (i + j + 50 * k) as u16);
    nifti::writer::WriterOptions::new(root.join("brain.nii"))
        .write_nifti(&volume)
        .expect("write volume");

    let location = DatasetLocation::new(&root).expect("location");
    let config = config(
        NormalizationMode::Raw,
        (6, 5),
        OutputBitDepth::Sixteen,
        ResizerBackend::OpenCv,
        OutputFormat::Hdr,
    );
    let summary = TreeOrchestrator::new(&location, &config).run().expect("run");
    assert_eq!(summary.processed, 1);

    let out = location.output_root();
    assert!(out.join("brain.hdr").exists());
    assert!(out.join("brain.img").exists());
    let decoded = nifti_io::decode(&out.join("brain.hdr")).expect("decode");
    assert_eq!(decoded.dim(), (5, 6));
    // Only slice k = 0 survives, so every value stays below the k = 1 offset.
    assert!(decoded.iter().all(|&v| v < 50.0));
}

#[test]
fn reruns_and_worker_pools_give_identical_results() {
    let (_dir, root) = dataset();
    for sub in ["x", "y"] {
        fs::create_dir_all(root.join(sub)).expect("dirs");
        for i in 0..3 {
            write_tiff16(&root.join(sub).join(format!("img{}.tif", i)), 33, 17);
        }
        fs::write(root.join(sub).join("bad.hdr"), b"junk").expect("write bad");
    }

    let location = DatasetLocation::new(&root).expect("location");
    let config = config(
        NormalizationMode::ZScore,
        (16, 16),
        OutputBitDepth::Eight,
        ResizerBackend::Pil,
        OutputFormat::Tiff,
    );

    let first = TreeOrchestrator::new(&location, &config).run().expect("first run");
    let first_bytes = fs::read(location.output_root().join("x/img1.tiff")).expect("read");

    let parallel = TreeOrchestrator::new(&location, &config)
        .with_jobs(4)
        .run()
        .expect("parallel run");
    let second_bytes = fs::read(location.output_root().join("x/img1.tiff")).expect("read");

    assert_eq!(first.processed, 6);
    assert_eq!(first.eligible, 8);
    assert_eq!(parallel.processed, first.processed);
    let first_failed: Vec<_> = first.failures.iter().map(|f| f.path.clone()).collect();
    let parallel_failed: Vec<_> = parallel.failures.iter().map(|f| f.path.clone()).collect();
    assert_eq!(first_failed, parallel_failed);
    assert_eq!(first_bytes, second_bytes);
}

#[test]
fn missing_root_short_circuits() {
    let dir = tempdir().expect("tempdir");
    let location = DatasetLocation::new(dir.path().join("nowhere")).expect("location");
    let config = config(
        NormalizationMode::Raw,
        (4, 4),
        OutputBitDepth::Sixteen,
        ResizerBackend::Pil,
        OutputFormat::Tiff,
    );
    let result = TreeOrchestrator::new(&location, &config).run();
    assert!(matches!(result, Err(RunError::MissingRoot(_))));
}

#[test]
fn summary_serializes_for_reports() {
    let (_dir, root) = dataset();
    fs::write(root.join("broken.tif"), b"nope").expect("write");

    let location = DatasetLocation::new(&root).expect("location");
    let config = config(
        NormalizationMode::MinMax01,
        (4, 4),
        OutputBitDepth::Eight,
        ResizerBackend::Pil,
        OutputFormat::Tiff,
    );
    let summary = TreeOrchestrator::new(&location, &config).run().expect("run");
    let json = serde_json::to_value(&summary).expect("json");

    assert_eq!(json["processed"], 0);
    assert_eq!(json["eligible"], 1);
    assert_eq!(json["written"], 0);
    assert_eq!(json["failures"][0]["stage"], "Decoding");
}

#[test]
fn siblings_sharing_a_stem_resolve_to_the_last_name_under_a_pool() {
    let (_dir, root) = dataset();
    write_tiff16_offset(&root.join("a.btf"), 3000);
    write_tiff16_offset(&root.join("a.tif"), 100);
    write_tiff16_offset(&root.join("b.tif"), 200);

    let location = DatasetLocation::new(&root).expect("location");
    let config = config(
        NormalizationMode::Raw,
        (4, 4),
        OutputBitDepth::Sixteen,
        ResizerBackend::Pil,
        OutputFormat::Tiff,
    );
    let output = location.output_root().join("a.tiff");

    let mut observed = Vec::new();
    for _ in 0..12 {
        let summary = TreeOrchestrator::new(&location, &config)
            .with_jobs(4)
            .run()
            .expect("run");
        assert_eq!(summary.eligible, 3);
        assert_eq!(summary.processed, 3);
        assert_eq!(summary.written, 2);
        observed.push(fs::read(&output).expect("read"));
    }

    assert!(observed.windows(2).all(|pair| pair[0] == pair[1]));
    let decoded = medprep::tiff_io::decode(&output).expect("decode");
    // "a.tif" sorts after "a.btf", so its pixels are the ones kept.
    assert!(decoded.iter().all(|&v| v < 1000.0), "{:?}", decoded);
}

#[test]
fn dangling_parent_reference_reports_a_missing_root() {
    let dir = tempdir().expect("tempdir");
    let result = DatasetLocation::new(dir.path().join("missing").join(".."));
    assert!(matches!(result, Err(RunError::MissingRoot(_))));
    assert_eq!(fs::read_dir(dir.path()).expect("read").count(), 0);
}
