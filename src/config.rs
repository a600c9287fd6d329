//! Pipeline configuration.
//!
//! Mirrors the JSON configuration used for training so the same file can
//! drive both sides; training-only keys (`batch_size`, `num_epochs`,
//! `learning_rate`) are ignored here. Framing parameters must match the
//! ones the model was trained with, otherwise enhancement quality
//! degrades silently.

use crate::error::{EnhanceError, EnhanceResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

// Defaults follow the 16 kHz VoiceBank+DEMAND recipe: 32 ms windows with
// 75% overlap.
const DEFAULT_SAMPLE_RATE: u32 = 16_000;
const DEFAULT_N_FFT: usize = 512;
const DEFAULT_WIN_LENGTH: usize = 512;
const DEFAULT_HOP_LENGTH: usize = 128;

/// Core pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhanceConfig {
    /// Sample rate every input waveform must already have (Hz).
    pub sample_rate: u32,
    /// FFT size per frame; frames are zero-padded from `win_length` up.
    pub n_fft: usize,
    /// Analysis window length in samples.
    pub win_length: usize,
    /// Stride between consecutive frames in samples.
    pub hop_length: usize,
    /// Training segment length in samples. Unused at inference, kept so
    /// shared config files round-trip.
    pub segment_length: Option<usize>,
}

impl Default for EnhanceConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            n_fft: DEFAULT_N_FFT,
            win_length: DEFAULT_WIN_LENGTH,
            hop_length: DEFAULT_HOP_LENGTH,
            segment_length: None,
        }
    }
}

impl EnhanceConfig {
    /// Load a configuration from a JSON file. Unknown keys are ignored.
    pub fn from_file(path: &Path) -> EnhanceResult<Self> {
        let raw = fs::read_to_string(path).map_err(|e| EnhanceError::FileAccess {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let config: EnhanceConfig = serde_json::from_str(&raw)
            .map_err(|e| EnhanceError::InvalidConfig(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the framing invariants: `hop_length <= win_length <= n_fft`,
    /// everything nonzero.
    pub fn validate(&self) -> EnhanceResult<()> {
        if self.sample_rate == 0 {
            return Err(EnhanceError::InvalidConfig("sample_rate must be > 0".into()));
        }
        if self.n_fft == 0 || self.win_length == 0 || self.hop_length == 0 {
            return Err(EnhanceError::InvalidConfig(
                "n_fft, win_length and hop_length must be > 0".into(),
            ));
        }
        if self.hop_length > self.win_length {
            return Err(EnhanceError::InvalidConfig(format!(
                "hop_length ({}) must not exceed win_length ({})",
                self.hop_length, self.win_length
            )));
        }
        if self.win_length > self.n_fft {
            return Err(EnhanceError::InvalidConfig(format!(
                "win_length ({}) must not exceed n_fft ({})",
                self.win_length, self.n_fft
            )));
        }
        Ok(())
    }

    /// Number of one-sided frequency bins produced per frame.
    pub fn bins(&self) -> usize {
        self.n_fft / 2 + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let cfg = EnhanceConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.bins(), 257);
    }

    #[test]
    fn rejects_hop_larger_than_window() {
        let cfg = EnhanceConfig {
            hop_length: 1024,
            ..EnhanceConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(EnhanceError::InvalidConfig(_))));
    }

    #[test]
    fn loads_json_and_ignores_training_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"sample_rate": 16000, "n_fft": 256, "win_length": 256,
                "hop_length": 64, "batch_size": 16, "num_epochs": 100,
                "learning_rate": 0.001}}"#
        )
        .unwrap();
        let cfg = EnhanceConfig::from_file(file.path()).unwrap();
        assert_eq!(cfg.n_fft, 256);
        assert_eq!(cfg.hop_length, 64);
        assert_eq!(cfg.segment_length, None);
    }
}
