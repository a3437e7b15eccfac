//
// config.rs
// Medprep-rs
//
// Immutable preprocessing configuration: the closed sets of intensity modes, bit depths, resizers and output formats,
// plus the input/output dataset locations.
//
// Thales Matheus Mendonça Santos - November 2025

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;

use crate::error::{ConfigError, RunError};

/// How raw intensities are rescaled before quantization.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalizationMode {
    MinMax01,
    MinMax11,
    ZScore,
    Raw,
}

/// Dynamic range associated with each normalization mode.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
pub enum DataRange {
    /// Span 1, values in [0, 1].
    Unit,
    /// Span 2, values in [-1, 1].
    Symmetric,
    /// Unbounded, centered on the mean.
    ZScore,
    /// Pixel units, clipped at the given maximum.
    Raw(u16),
}

const NORMALIZATION_MODES: [(&str, NormalizationMode); 4] = [
    ("minmax01", NormalizationMode::MinMax01),
    ("minmax11", NormalizationMode::MinMax11),
    ("zscore", NormalizationMode::ZScore),
    ("raw", NormalizationMode::Raw),
];

impl NormalizationMode {
    pub fn as_str(self) -> &'static str {
        match self {
            NormalizationMode::MinMax01 => "minmax01",
            NormalizationMode::MinMax11 => "minmax11",
            NormalizationMode::ZScore => "zscore",
            NormalizationMode::Raw => "raw",
        }
    }

    pub fn data_range(self) -> DataRange {
        match self {
            NormalizationMode::MinMax01 => DataRange::Unit,
            NormalizationMode::MinMax11 => DataRange::Symmetric,
            NormalizationMode::ZScore => DataRange::ZScore,
            NormalizationMode::Raw => DataRange::Raw(crate::quantize::MAX_16BIT_LEVEL),
        }
    }
}

impl FromStr for NormalizationMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        NORMALIZATION_MODES
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, mode)| *mode)
            .ok_or_else(|| ConfigError::InvalidIntensity(s.to_string()))
    }
}

impl fmt::Display for NormalizationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for DataRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataRange::Unit => f.write_str("1"),
            DataRange::Symmetric => f.write_str("2"),
            DataRange::ZScore => f.write_str("zscore"),
            DataRange::Raw(max) => write!(f, "{}", max),
        }
    }
}

/// Integer pixel format written to disk.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default, Serialize)]
pub enum OutputBitDepth {
    #[serde(rename = "8bit")]
    Eight,
    #[default]
    #[serde(rename = "16bit")]
    Sixteen,
}

impl OutputBitDepth {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputBitDepth::Eight => "8bit",
            OutputBitDepth::Sixteen => "16bit",
        }
    }
}

impl FromStr for OutputBitDepth {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "8bit" => Ok(OutputBitDepth::Eight),
            "16bit" => Ok(OutputBitDepth::Sixteen),
            _ => Err(ConfigError::InvalidOutputMode(s.to_string())),
        }
    }
}

impl fmt::Display for OutputBitDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bilinear resampling backend.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizerBackend {
    /// Round-trips through an `image` buffer and its triangle (bilinear) filter.
    #[default]
    Pil,
    /// Samples the array directly with two-tap bilinear interpolation on pixel centers.
    OpenCv,
}

impl ResizerBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            ResizerBackend::Pil => "pil",
            ResizerBackend::OpenCv => "opencv",
        }
    }
}

impl FromStr for ResizerBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pil" => Ok(ResizerBackend::Pil),
            "opencv" => Ok(ResizerBackend::OpenCv),
            _ => Err(ConfigError::InvalidResizer(s.to_string())),
        }
    }
}

impl fmt::Display for ResizerBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Writer family an output extension belongs to.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
pub enum OutputFormatFamily {
    Nifti,
    Dicom,
    Tiff,
}

/// Allow-listed output extensions.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
pub enum OutputFormat {
    Nii,
    Hdr,
    Img,
    Dcm,
    Dicom,
    Tif,
    Tiff,
    Btf,
}

const OUTPUT_FORMATS: [OutputFormat; 8] = [
    OutputFormat::Nii,
    OutputFormat::Hdr,
    OutputFormat::Img,
    OutputFormat::Dcm,
    OutputFormat::Dicom,
    OutputFormat::Tif,
    OutputFormat::Tiff,
    OutputFormat::Btf,
];

impl OutputFormat {
    /// Extension including the leading dot, e.g. `.tiff`.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Nii => ".nii",
            OutputFormat::Hdr => ".hdr",
            OutputFormat::Img => ".img",
            OutputFormat::Dcm => ".dcm",
            OutputFormat::Dicom => ".dicom",
            OutputFormat::Tif => ".tif",
            OutputFormat::Tiff => ".tiff",
            OutputFormat::Btf => ".btf",
        }
    }

    pub fn family(self) -> OutputFormatFamily {
        match self {
            OutputFormat::Nii | OutputFormat::Hdr | OutputFormat::Img => OutputFormatFamily::Nifti,
            OutputFormat::Dcm | OutputFormat::Dicom => OutputFormatFamily::Dicom,
            OutputFormat::Tif | OutputFormat::Tiff | OutputFormat::Btf => OutputFormatFamily::Tiff,
        }
    }

    /// Every allow-listed output format, in table order.
    pub fn all() -> impl Iterator<Item = OutputFormat> {
        OUTPUT_FORMATS.into_iter()
    }
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    /// Accepts the extension with or without its leading dot, in any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().to_ascii_lowercase();
        let key = if trimmed.starts_with('.') {
            trimmed
        } else {
            format!(".{}", trimmed)
        };
        OUTPUT_FORMATS
            .into_iter()
            .find(|format| format.extension() == key)
            .ok_or_else(|| ConfigError::UnsupportedFormat(s.to_string()))
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Target spatial dimensions; both are guaranteed non-zero.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
pub struct TargetSize {
    width: u32,
    height: u32,
}

impl TargetSize {
    pub fn new(width: u32, height: u32) -> Result<Self, ConfigError> {
        if width == 0 || height == 0 {
            return Err(ConfigError::InvalidSize { width, height });
        }
        Ok(Self { width, height })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

impl fmt::Display for TargetSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Fully validated settings shared read-only by every stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineConfig {
    pub intensity: NormalizationMode,
    pub data_range: DataRange,
    pub output_mode: OutputBitDepth,
    pub size: TargetSize,
    pub resizer: ResizerBackend,
    pub output_format: OutputFormat,
}

impl PipelineConfig {
    pub fn new(
        intensity: NormalizationMode,
        size: TargetSize,
        output_mode: OutputBitDepth,
        resizer: ResizerBackend,
        output_format: OutputFormat,
    ) -> Self {
        Self {
            intensity,
            data_range: intensity.data_range(),
            output_mode,
            size,
            resizer,
            output_format,
        }
    }

    /// Builds a configuration from loosely typed option strings, failing on the first invalid field.
    pub fn parse(
        intensity: &str,
        size: (u32, u32),
        output_mode: &str,
        resizer: &str,
        output_format: &str,
    ) -> Result<Self, ConfigError> {
        Ok(Self::new(
            intensity.parse()?,
            TargetSize::new(size.0, size.1)?,
            output_mode.parse()?,
            resizer.parse()?,
            output_format.parse()?,
        ))
    }
}

/// Input root and its sibling `<name>_pre` output root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetLocation {
    input_root: PathBuf,
    output_root: PathBuf,
}

impl DatasetLocation {
    pub fn new(input_root: impl AsRef<Path>) -> Result<Self, RunError> {
        let input_root = input_root.as_ref().to_path_buf();
        // "." and ".." have no file name of their own; resolve them when the path exists.
        let named = if input_root.file_name().is_some() {
            input_root.clone()
        } else if !input_root.exists() {
            return Err(RunError::MissingRoot(input_root));
        } else {
            input_root
                .canonicalize()
                .map_err(|_| RunError::InvalidDataPath(input_root.clone()))?
        };

        let dataset_name = named
            .file_name()
            .ok_or_else(|| RunError::InvalidDataPath(input_root.clone()))?
            .to_string_lossy()
            .into_owned();
        let parent = named.parent().unwrap_or_else(|| Path::new(""));
        let output_root = parent.join(format!("{}_pre", dataset_name));

        Ok(Self {
            input_root,
            output_root,
        })
    }

    pub fn input_root(&self) -> &Path {
        &self.input_root
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }
}
