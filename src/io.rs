//! Mono WAV reading and writing.
//!
//! The pipeline consumes decoded sample arrays only; this module is the
//! boundary that turns files into them. Sample-rate mismatches are
//! rejected, never silently resampled, and multichannel input is
//! downmixed to mono by averaging.

use crate::error::{EnhanceError, EnhanceResult};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::path::Path;

fn file_access(path: &Path, message: impl ToString) -> EnhanceError {
    EnhanceError::FileAccess {
        path: path.to_path_buf(),
        message: message.to_string(),
    }
}

/// Read a WAV file as mono f32 samples, enforcing the configured rate.
/// Accepts 16/24/32-bit integer and 32-bit float PCM.
pub fn read_wav(path: &Path, expected_rate: u32) -> EnhanceResult<Vec<f32>> {
    let reader = WavReader::open(path).map_err(|e| file_access(path, e))?;
    let spec = reader.spec();
    if spec.sample_rate != expected_rate {
        return Err(EnhanceError::SampleRateMismatch {
            expected: expected_rate,
            got: spec.sample_rate,
        });
    }
    let channels = spec.channels as usize;
    if channels == 0 {
        return Err(file_access(path, "zero channels"));
    }

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => {
            if spec.bits_per_sample != 32 {
                return Err(file_access(
                    path,
                    format!("unsupported float depth {}", spec.bits_per_sample),
                ));
            }
            reader
                .into_samples::<f32>()
                .collect::<Result<_, _>>()
                .map_err(|e| file_access(path, e))?
        }
        SampleFormat::Int => {
            let bits = spec.bits_per_sample;
            if !matches!(bits, 16 | 24 | 32) {
                return Err(file_access(path, format!("unsupported bit depth {}", bits)));
            }
            let scale = 1.0 / (1i64 << (bits - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<_, _>>()
                .map_err(|e| file_access(path, e))?
        }
    };

    if channels == 1 {
        return Ok(interleaved);
    }
    let inv = 1.0 / channels as f32;
    Ok(interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() * inv)
        .collect())
}

/// Write mono samples as 16-bit PCM, clamping to [-1, 1].
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> EnhanceResult<()> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec).map_err(|e| file_access(path, e))?;
    for &v in samples {
        let q = (v.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16;
        writer.write_sample(q).map_err(|e| file_access(path, e))?;
    }
    writer.finalize().map_err(|e| file_access(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let x: Vec<f32> = (0..2000)
            .map(|i| 0.5 * (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 16000.0).sin())
            .collect();
        write_wav(&path, &x, 16000).unwrap();
        let y = read_wav(&path, 16000).unwrap();
        assert_eq!(y.len(), x.len());
        for (a, b) in x.iter().zip(&y) {
            assert!((a - b).abs() < 2.0 / i16::MAX as f32);
        }
    }

    #[test]
    fn rejects_wrong_sample_rate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rate.wav");
        write_wav(&path, &[0.0; 100], 44100).unwrap();
        let err = read_wav(&path, 16000).unwrap_err();
        assert_eq!(err.kind(), "SampleRateMismatch");
    }

    #[test]
    fn corrupt_file_is_file_access_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.wav");
        std::fs::write(&path, b"definitely not a RIFF header").unwrap();
        let err = read_wav(&path, 16000).unwrap_err();
        assert_eq!(err.kind(), "FileAccessError");
    }

    #[test]
    fn stereo_is_downmixed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        let spec = WavSpec {
            channels: 2,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        for _ in 0..100 {
            writer.write_sample(8000i16).unwrap();
            writer.write_sample(-8000i16).unwrap();
        }
        writer.finalize().unwrap();
        let y = read_wav(&path, 16000).unwrap();
        assert_eq!(y.len(), 100);
        for &v in &y {
            assert!(v.abs() < 1e-4);
        }
    }
}
