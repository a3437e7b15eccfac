//
// cli.rs
// Medprep-rs
//
// Defines the CLI surface with Clap, resolves it into a validated configuration and drives a directory run.
//
// Thales Matheus Mendonça Santos - November 2025

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use tracing::error;

use crate::batch::TreeOrchestrator;
use crate::config::{
    DatasetLocation, NormalizationMode, OutputBitDepth, OutputFormat, PipelineConfig,
    ResizerBackend, TargetSize,
};
use crate::error::RunError;
use crate::logging;
use crate::models::RunSummary;

/// Command-line interface glue code: collects the options and hands them to the orchestrator.
#[derive(Parser, Debug)]
#[command(name = "medprep")]
#[command(about = "Batch preprocessing of medical images (TIFF, DICOM, NIfTI)", long_about = None)]
pub struct Cli {
    /// Root directory holding the images to convert
    #[arg(long, alias = "data_path")]
    pub data_path: PathBuf,
    /// Intensity normalization
    #[arg(long, value_enum)]
    pub intensity: Intensity,
    /// Output size as WIDTH HEIGHT
    #[arg(long, num_args = 2, value_names = ["WIDTH", "HEIGHT"], required = true)]
    pub size: Vec<u32>,
    /// Output bit depth
    #[arg(long, alias = "output_mode", value_enum, default_value_t = OutputMode::Bits16)]
    pub output_mode: OutputMode,
    /// Resizing backend
    #[arg(long, value_enum, default_value_t = Resizer::Pil)]
    pub resizer: Resizer,
    /// Output file extension (.dcm, .dicom, .nii, .hdr, .img, .tif, .tiff, .btf)
    #[arg(long, alias = "output_format")]
    pub output_format: String,
    /// Files processed concurrently
    #[arg(short, long, default_value_t = 1)]
    pub jobs: usize,
    /// Also print the run summary as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum Intensity {
    #[value(name = "minmax01")]
    MinMax01,
    #[value(name = "minmax11")]
    MinMax11,
    #[value(name = "zscore")]
    ZScore,
    #[value(name = "raw")]
    Raw,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum OutputMode {
    #[value(name = "8bit")]
    Bits8,
    #[value(name = "16bit")]
    Bits16,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum Resizer {
    Pil,
    #[value(name = "opencv")]
    OpenCv,
}

impl From<Intensity> for NormalizationMode {
    fn from(value: Intensity) -> Self {
        match value {
            Intensity::MinMax01 => NormalizationMode::MinMax01,
            Intensity::MinMax11 => NormalizationMode::MinMax11,
            Intensity::ZScore => NormalizationMode::ZScore,
            Intensity::Raw => NormalizationMode::Raw,
        }
    }
}

impl From<OutputMode> for OutputBitDepth {
    fn from(value: OutputMode) -> Self {
        match value {
            OutputMode::Bits8 => OutputBitDepth::Eight,
            OutputMode::Bits16 => OutputBitDepth::Sixteen,
        }
    }
}

impl From<Resizer> for ResizerBackend {
    fn from(value: Resizer) -> Self {
        match value {
            Resizer::Pil => ResizerBackend::Pil,
            Resizer::OpenCv => ResizerBackend::OpenCv,
        }
    }
}

impl Cli {
    /// Validate every option up front so a bad value never reaches the first file.
    pub fn config(&self) -> anyhow::Result<PipelineConfig> {
        let &[width, height] = self.size.as_slice() else {
            bail!("--size takes exactly two values: WIDTH HEIGHT");
        };
        Ok(PipelineConfig::new(
            self.intensity.into(),
            TargetSize::new(width, height)?,
            self.output_mode.into(),
            self.resizer.into(),
            self.output_format.parse::<OutputFormat>()?,
        ))
    }
}

pub fn run() -> anyhow::Result<()> {
    // Parse the raw CLI arguments once and validate them before any file is touched.
    let cli = Cli::parse();
    logging::init();

    let config = cli.config()?;
    let outcome = DatasetLocation::new(&cli.data_path)
        .and_then(|location| preprocess_tree(&location, &config, cli.jobs));

    let summary = match outcome {
        Ok(summary) => summary,
        Err(e @ (RunError::MissingRoot(_) | RunError::NotADirectory(_))) => {
            error!("{}", e);
            return Ok(());
        }
        Err(e) => return Err(e).context("Preprocessing run aborted"),
    };

    print_summary(&summary);
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    Ok(())
}

fn preprocess_tree(
    location: &DatasetLocation,
    config: &PipelineConfig,
    jobs: usize,
) -> Result<RunSummary, RunError> {
    print_banner(location, config);
    TreeOrchestrator::new(location, config).with_jobs(jobs).run()
}

fn print_banner(location: &DatasetLocation, config: &PipelineConfig) {
    println!("=========================================");
    println!("Preprocessing: {:?}", location.input_root());
    println!("  Intensity:     {}", config.intensity);
    println!("  Data range:    {}", config.data_range);
    println!("  Bits:          {}", config.output_mode);
    println!("  Size:          {}", config.size);
    println!("  Resizer:       {}", config.resizer);
    println!("  Output format: {}", config.output_format);
    println!("=========================================");
}

fn print_summary(summary: &RunSummary) {
    println!("=========================================");
    println!(
        "Total images processed: {} of {} ({} failed)",
        summary.processed,
        summary.eligible,
        summary.failed()
    );
    println!("Output files written: {}", summary.written);
    println!("Saved to: {:?}", summary.output_root);
    println!("=========================================");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn underscore_spellings_are_accepted() {
        let cli = Cli::try_parse_from([
            "medprep",
            "--data_path",
            "/data/scans",
            "--intensity",
            "minmax01",
            "--size",
            "256",
            "128",
            "--output_mode",
            "8bit",
            "--resizer",
            "opencv",
            "--output_format",
            ".tiff",
        ])
        .expect("parse");

        let config = cli.config().expect("config");
        let location = DatasetLocation::new(&cli.data_path).expect("location");
        assert_eq!(location.output_root(), std::path::Path::new("/data/scans_pre"));
        assert_eq!(config.size, TargetSize::new(256, 128).expect("size"));
        assert_eq!(config.output_mode, OutputBitDepth::Eight);
        assert_eq!(config.resizer, ResizerBackend::OpenCv);
        assert_eq!(config.output_format, OutputFormat::Tiff);
    }

    #[test]
    fn defaults_are_sixteen_bit_and_pil() {
        let cli = Cli::try_parse_from([
            "medprep",
            "--data-path",
            "in",
            "--intensity",
            "raw",
            "--size",
            "64",
            "64",
            "--output-format",
            ".nii",
        ])
        .expect("parse");

        let config = cli.config().expect("config");
        assert_eq!(config.output_mode, OutputBitDepth::Sixteen);
        assert_eq!(config.resizer, ResizerBackend::Pil);
        assert_eq!(cli.jobs, 1);
    }

    #[test]
    fn bad_format_fails_before_processing() {
        let cli = Cli::try_parse_from([
            "medprep",
            "--data-path",
            "in",
            "--intensity",
            "zscore",
            "--size",
            "64",
            "64",
            "--output-format",
            ".jpg",
        ])
        .expect("parse");
        assert!(cli.config().is_err());
    }

    #[test]
    fn unknown_intensity_is_rejected_by_the_parser() {
        let parsed = Cli::try_parse_from([
            "medprep",
            "--data-path",
            "in",
            "--intensity",
            "gamma",
            "--size",
            "1",
            "1",
            "--output-format",
            ".tif",
        ]);
        assert!(parsed.is_err());
    }
}
