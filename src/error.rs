//! Error types for the enhancement pipeline.
//!
//! Single-call operations surface these immediately; the batch
//! orchestrator catches them per file and records them in the summary
//! instead of aborting the run.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the spectral pipeline, the model layer, file I/O
/// and the metrics engine.
#[derive(Error, Debug)]
pub enum EnhanceError {
    #[error("shape mismatch: expected {expected_frames}x{expected_bins}, got {got_frames}x{got_bins}")]
    ShapeMismatch {
        expected_frames: usize,
        expected_bins: usize,
        got_frames: usize,
        got_bins: usize,
    },

    #[error("model '{model}' cannot accept a {frames}x{bins} spectrogram: {reason}")]
    ShapeUnsupported {
        model: String,
        frames: usize,
        bins: usize,
        reason: String,
    },

    #[error("metric inputs of unequal length: reference {reference} samples, processed {processed} samples")]
    LengthMismatch { reference: usize, processed: usize },

    #[error("sample rate mismatch: configured {expected} Hz, file has {got} Hz")]
    SampleRateMismatch { expected: u32, got: u32 },

    #[error("failed to access '{path}': {message}")]
    FileAccess { path: PathBuf, message: String },

    #[error("metric '{metric}' not available: {reason}")]
    MetricUnavailable { metric: String, reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to load model parameters: {0}")]
    ModelLoad(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EnhanceError {
    /// Stable kind tag used in batch summaries and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            EnhanceError::ShapeMismatch { .. } => "ShapeMismatch",
            EnhanceError::ShapeUnsupported { .. } => "ShapeUnsupported",
            EnhanceError::LengthMismatch { .. } => "LengthMismatch",
            EnhanceError::SampleRateMismatch { .. } => "SampleRateMismatch",
            EnhanceError::FileAccess { .. } => "FileAccessError",
            EnhanceError::MetricUnavailable { .. } => "MetricUnavailable",
            EnhanceError::InvalidConfig(_) => "InvalidConfig",
            EnhanceError::ModelLoad(_) => "ModelLoad",
            EnhanceError::Io(_) => "Io",
        }
    }
}

/// Result type for enhancement operations.
pub type EnhanceResult<T> = Result<T, EnhanceError>;
