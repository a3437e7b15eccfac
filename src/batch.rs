//
// batch.rs
// Medprep-rs
//
// Walks an input tree, mirrors it under the output root and runs the transform pipeline on every eligible file.
//
// Thales Matheus Mendonça Santos - November 2025

use rayon::prelude::*;
use rayon::ThreadPool;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use walkdir::WalkDir;

use crate::codec;
use crate::config::{DatasetLocation, PipelineConfig};
use crate::error::RunError;
use crate::models::{FileFailure, RunSummary};
use crate::pipeline::{ImageTransformPipeline, ProcessingResult};

/// One mirrored directory and the eligible files found directly inside it.
#[derive(Debug, Clone)]
pub struct DirectoryPlan {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub file_count: usize,
    pub eligible: Vec<PathBuf>,
}

/// A single eligible input and the extension-less output path it is written to.
#[derive(Debug, Clone, PartialEq)]
struct FileJob {
    input: PathBuf,
    output_stem: PathBuf,
}

impl DirectoryPlan {
    fn trace(&self) {
        info!("Exploring directory: {:?}", self.input_dir);
        if self.file_count == 0 {
            info!("  (empty)");
        } else if self.eligible.is_empty() {
            info!("  no eligible files");
        }
    }

    /// Eligible files grouped by output stem, in walk order.
    ///
    /// Every member of a group writes the same output path, so a group runs as one
    /// sequential unit and the last file in name order is the one left on disk.
    fn output_groups(&self) -> Vec<Vec<FileJob>> {
        let mut groups: Vec<Vec<FileJob>> = Vec::new();
        let mut by_stem: HashMap<PathBuf, usize> = HashMap::new();

        for name in &self.eligible {
            let output_stem = self.output_dir.join(stem_of(name));
            let job = FileJob {
                input: self.input_dir.join(name),
                output_stem: output_stem.clone(),
            };
            match by_stem.get(&output_stem) {
                Some(&slot) => groups[slot].push(job),
                None => {
                    by_stem.insert(output_stem, groups.len());
                    groups.push(vec![job]);
                }
            }
        }

        for group in &groups {
            if let Some((kept, replaced)) = group.split_last() {
                for job in replaced {
                    warn!(
                        "Output {:?} of {:?} will be overwritten by {:?}",
                        job.output_stem, job.input, kept.input
                    );
                }
            }
        }

        groups
    }
}

pub struct TreeOrchestrator<'a> {
    location: &'a DatasetLocation,
    config: &'a PipelineConfig,
    jobs: usize,
}

impl<'a> TreeOrchestrator<'a> {
    pub fn new(location: &'a DatasetLocation, config: &'a PipelineConfig) -> Self {
        Self {
            location,
            config,
            jobs: 1,
        }
    }

    /// Number of files processed concurrently; 1 keeps the run strictly sequential.
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Mirror the tree and process every eligible file, isolating per-file failures.
    pub fn run(&self) -> Result<RunSummary, RunError> {
        let input_root = self.location.input_root();
        if !input_root.exists() {
            return Err(RunError::MissingRoot(input_root.to_path_buf()));
        }
        if !input_root.is_dir() {
            return Err(RunError::NotADirectory(input_root.to_path_buf()));
        }

        let plans = self.mirror_tree();
        let pipeline = ImageTransformPipeline::new(self.config);
        let pool = match self.jobs {
            1 => None,
            n => Some(rayon::ThreadPoolBuilder::new().num_threads(n).build()?),
        };

        let mut results: Vec<ProcessingResult> = Vec::new();
        for plan in &plans {
            plan.trace();
            let groups = plan.output_groups();
            results.extend(execute(&pipeline, pool.as_ref(), &groups));
        }

        let failures: Vec<FileFailure> = results
            .iter()
            .filter_map(|result| result.as_ref().err())
            .map(FileFailure::from)
            .collect();
        let written: HashSet<&PathBuf> = results
            .iter()
            .filter_map(|result| result.as_ref().ok())
            .collect();

        Ok(RunSummary {
            input_root: input_root.to_path_buf(),
            output_root: self.location.output_root().to_path_buf(),
            directories: plans.len(),
            eligible: results.len(),
            processed: results.len() - failures.len(),
            written: written.len(),
            failures,
        })
    }

    /// Create every output directory (empty ones included) and list eligible files per directory.
    pub fn mirror_tree(&self) -> Vec<DirectoryPlan> {
        let input_root = self.location.input_root();
        let output_root = self.location.output_root();

        let mut plans: Vec<DirectoryPlan> = Vec::new();
        let mut index: HashMap<PathBuf, usize> = HashMap::new();

        let entries = WalkDir::new(input_root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    None
                }
            });

        for entry in entries {
            let path = entry.path();

            if entry.file_type().is_dir() {
                let relative = path.strip_prefix(input_root).unwrap_or(Path::new(""));
                let output_dir = output_root.join(relative);
                if let Err(e) = fs::create_dir_all(&output_dir) {
                    warn!("Could not create {:?}: {}", output_dir, e);
                }
                index.insert(path.to_path_buf(), plans.len());
                plans.push(DirectoryPlan {
                    input_dir: path.to_path_buf(),
                    output_dir,
                    file_count: 0,
                    eligible: Vec::new(),
                });
                continue;
            }

            let slot = path.parent().and_then(|parent| index.get(parent)).copied();
            if let Some(plan) = slot.map(|i| &mut plans[i]) {
                plan.file_count += 1;
                if codec::is_eligible(path) {
                    plan.eligible.push(PathBuf::from(entry.file_name()));
                }
            }
        }

        plans
    }
}

/// Run one directory's groups, sequentially or on the pool. Results keep walk order
/// either way, so reports do not depend on scheduling.
fn execute(
    pipeline: &ImageTransformPipeline<'_>,
    pool: Option<&ThreadPool>,
    groups: &[Vec<FileJob>],
) -> Vec<ProcessingResult> {
    let run_group = |group: &Vec<FileJob>| -> Vec<ProcessingResult> {
        group
            .iter()
            .map(|job| {
                let result = pipeline.process(&job.input, &job.output_stem);
                if let Err(e) = &result {
                    error!("Failed processing {:?}: {}", job.input, e.source);
                }
                result
            })
            .collect()
    };

    match pool {
        None => groups.iter().flat_map(run_group).collect(),
        Some(pool) => pool
            .install(|| groups.par_iter().map(run_group).collect::<Vec<_>>())
            .into_iter()
            .flatten()
            .collect(),
    }
}

fn stem_of(file_name: &Path) -> PathBuf {
    file_name
        .file_stem()
        .map(PathBuf::from)
        .unwrap_or_else(|| file_name.to_path_buf())
}
