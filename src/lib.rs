//! vxenhance — offline spectral speech enhancement.
//!
//! Removes background noise from 16 kHz mono speech by enhancing the
//! magnitude of a short-time Fourier representation with a pluggable
//! model and reconstructing the waveform with the original noisy phase.
//! Evaluation against clean references (SNR, SI-SDR, STOI, optional
//! PESQ) is built in for VoiceBank+DEMAND style corpora.
//!
//! Front ends integrate through exactly three entry points:
//! - [`Denoiser::enhance_waveform`] — single waveform in, waveform out
//! - [`BatchRunner::run`] — file list in, summary out
//! - [`compute_metrics`] — two waveforms in, metric result out
//!
//! ```no_run
//! use std::sync::Arc;
//! use vxenhance::{BatchItem, BatchRunner, Denoiser, EnhanceConfig, SpectralSubtraction};
//!
//! let denoiser = Denoiser::new(
//!     EnhanceConfig::default(),
//!     Arc::new(SpectralSubtraction::default()),
//! )?;
//! let summary = BatchRunner::new(denoiser).parallel(true).run(&[
//!     BatchItem::new("noisy/p232_001.wav")
//!         .output("enhanced/p232_001.wav")
//!         .reference("clean/p232_001.wav"),
//! ]);
//! println!("{} ok, {} failed", summary.succeeded, summary.failed);
//! # Ok::<(), vxenhance::EnhanceError>(())
//! ```

pub mod batch;
pub mod config;
pub mod dsp;
pub mod error;
pub mod io;
pub mod metrics;
pub mod model;
pub mod pipeline;

pub use batch::{BatchItem, BatchRunner, BatchSummary, FileFailure, FileReport};
pub use config::EnhanceConfig;
pub use dsp::{SpectralMap, Spectrogram, Stft};
pub use error::{EnhanceError, EnhanceResult};
pub use metrics::{compute_metrics, is_pesq_available, MetricResult, MetricStats, MetricValue};
pub use model::{EnhancementModel, IdentityModel, MaskNet, SpectralSubtraction};
pub use pipeline::Denoiser;
