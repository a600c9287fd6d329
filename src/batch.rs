//! Batch orchestration over collections of input files.
//!
//! Each file runs the full pipeline independently; a failure on one file
//! is recorded and the batch moves on — a single corrupt input never
//! aborts the run. Workers share the read-only model handle behind the
//! `Arc` inside [`Denoiser`], so parallel runs need no locking.
//! Cancellation is cooperative: the flag is checked between files, never
//! mid-file, and a partial summary covers the files completed so far.
//! Report order is not guaranteed under parallel execution; every entry
//! carries its input path so callers can re-sort.

use crate::error::EnhanceError;
use crate::io::{read_wav, write_wav};
use crate::metrics::{aggregate, compute_metrics, MetricResult, MetricStats};
use crate::pipeline::Denoiser;
use log::{info, warn};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// One unit of batch work.
#[derive(Debug, Clone, Serialize)]
pub struct BatchItem {
    /// Noisy input WAV.
    pub input: PathBuf,
    /// Where to write the denoised WAV, if anywhere.
    pub output: Option<PathBuf>,
    /// Clean reference WAV; metrics are computed when present.
    pub reference: Option<PathBuf>,
}

impl BatchItem {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: None,
            reference: None,
        }
    }

    pub fn output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }

    pub fn reference(mut self, path: impl Into<PathBuf>) -> Self {
        self.reference = Some(path.into());
        self
    }
}

/// Successful per-file record.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub input: PathBuf,
    pub metrics: Option<MetricResult>,
}

/// Failed per-file record: the error kind tag plus its rendered message.
#[derive(Debug, Clone, Serialize)]
pub struct FileFailure {
    pub input: PathBuf,
    pub kind: String,
    pub message: String,
}

/// End-of-run summary.
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub reports: Vec<FileReport>,
    pub failures: Vec<FileFailure>,
    /// Mean/median per metric over files that produced metrics.
    pub aggregate: BTreeMap<String, MetricStats>,
}

enum Outcome {
    Ok(FileReport),
    Failed(FileFailure),
    Cancelled,
}

pub struct BatchRunner {
    denoiser: Arc<Denoiser>,
    parallel: bool,
    cancel: Arc<AtomicBool>,
}

impl BatchRunner {
    pub fn new(denoiser: Denoiser) -> Self {
        Self {
            denoiser: Arc::new(denoiser),
            parallel: false,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Process files across rayon workers instead of sequentially.
    pub fn parallel(mut self, enabled: bool) -> Self {
        self.parallel = enabled;
        self
    }

    /// Shared flag a caller can set to stop the run between files.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Run the pipeline over every item and fold the outcomes into a
    /// summary.
    pub fn run(&self, items: &[BatchItem]) -> BatchSummary {
        info!(
            "batch start: {} files, model '{}', parallel: {}",
            items.len(),
            self.denoiser.model_name(),
            self.parallel
        );
        let outcomes: Vec<Outcome> = if self.parallel {
            items.par_iter().map(|item| self.process(item)).collect()
        } else {
            items.iter().map(|item| self.process(item)).collect()
        };

        let mut summary = BatchSummary {
            succeeded: 0,
            failed: 0,
            cancelled: 0,
            reports: Vec::new(),
            failures: Vec::new(),
            aggregate: BTreeMap::new(),
        };
        for outcome in outcomes {
            match outcome {
                Outcome::Ok(report) => {
                    summary.succeeded += 1;
                    summary.reports.push(report);
                }
                Outcome::Failed(failure) => {
                    summary.failed += 1;
                    summary.failures.push(failure);
                }
                Outcome::Cancelled => summary.cancelled += 1,
            }
        }
        let with_metrics: Vec<&MetricResult> = summary
            .reports
            .iter()
            .filter_map(|r| r.metrics.as_ref())
            .collect();
        summary.aggregate = aggregate(&with_metrics);

        info!(
            "batch done: {} ok, {} failed, {} cancelled",
            summary.succeeded, summary.failed, summary.cancelled
        );
        summary
    }

    fn process(&self, item: &BatchItem) -> Outcome {
        if self.cancel.load(Ordering::Relaxed) {
            return Outcome::Cancelled;
        }
        match self.process_inner(item) {
            Ok(report) => Outcome::Ok(report),
            Err(error) => {
                warn!("'{}' failed: {}", item.input.display(), error);
                Outcome::Failed(FileFailure {
                    input: item.input.clone(),
                    kind: error.kind().to_string(),
                    message: error.to_string(),
                })
            }
        }
    }

    fn process_inner(&self, item: &BatchItem) -> Result<FileReport, EnhanceError> {
        let sample_rate = self.denoiser.config().sample_rate;
        let noisy = read_wav(&item.input, sample_rate)?;
        let enhanced = self.denoiser.enhance_waveform(&noisy)?;

        let metrics = match &item.reference {
            Some(reference_path) => {
                let reference = read_wav(reference_path, sample_rate)?;
                Some(compute_metrics(&reference, &enhanced, sample_rate)?)
            }
            None => None,
        };

        if let Some(output_path) = &item.output {
            write_wav(output_path, &enhanced, sample_rate)?;
        }

        Ok(FileReport {
            input: item.input.clone(),
            metrics,
        })
    }
}
