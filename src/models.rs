//
// models.rs
// Medprep-rs
//
// Serializable run report: success counts and the list of per-file failures.
//
// Thales Matheus Mendonça Santos - November 2025

use std::path::PathBuf;

use serde::Serialize;

use crate::error::PipelineError;
use crate::pipeline::Stage;

/// One file that did not make it through the pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct FileFailure {
    pub path: PathBuf,
    pub stage: Stage,
    pub reason: String,
}

impl From<&PipelineError> for FileFailure {
    fn from(err: &PipelineError) -> Self {
        Self {
            path: err.path.clone(),
            stage: err.stage,
            reason: err.source.to_string(),
        }
    }
}

/// Aggregate outcome of a directory run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub input_root: PathBuf,
    pub output_root: PathBuf,
    pub directories: usize,
    pub eligible: usize,
    pub processed: usize,
    /// Distinct output files; lower than `processed` when sibling inputs share a stem.
    pub written: usize,
    pub failures: Vec<FileFailure>,
}

impl RunSummary {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}
