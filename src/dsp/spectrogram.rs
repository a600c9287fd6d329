//! Spectrogram containers, magnitude/phase decomposition and the log
//! domain the enhancement models operate in.
//!
//! Every operation returns a fresh array; nothing in the spectral path
//! mutates a buffer another stage still holds.

use crate::dsp::utils::MAG_EPS;
use crate::error::{EnhanceError, EnhanceResult};
use rustfft::num_complex::Complex;

/// One-sided complex spectrogram, row-major `frames x bins`.
/// Carries the producing waveform's sample count so reconstruction can
/// trim back to the exact input length.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrogram {
    frames: usize,
    bins: usize,
    data: Vec<Complex<f32>>,
    num_samples: usize,
}

impl Spectrogram {
    pub fn new(frames: usize, bins: usize, data: Vec<Complex<f32>>, num_samples: usize) -> Self {
        assert_eq!(data.len(), frames * bins);
        Self {
            frames,
            bins,
            data,
            num_samples,
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.frames, self.bins)
    }

    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    pub fn row(&self, t: usize) -> &[Complex<f32>] {
        &self.data[t * self.bins..(t + 1) * self.bins]
    }

    pub fn data(&self) -> &[Complex<f32>] {
        &self.data
    }
}

/// Real-valued matrix with the same layout as a [`Spectrogram`]; used for
/// magnitude, phase and log-magnitude planes.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralMap {
    frames: usize,
    bins: usize,
    data: Vec<f32>,
}

impl SpectralMap {
    pub fn new(frames: usize, bins: usize, data: Vec<f32>) -> Self {
        assert_eq!(data.len(), frames * bins);
        Self { frames, bins, data }
    }

    pub fn zeros(frames: usize, bins: usize) -> Self {
        Self::new(frames, bins, vec![0.0; frames * bins])
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.frames, self.bins)
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn bins(&self) -> usize {
        self.bins
    }

    pub fn row(&self, t: usize) -> &[f32] {
        &self.data[t * self.bins..(t + 1) * self.bins]
    }

    pub fn row_mut(&mut self, t: usize) -> &mut [f32] {
        &mut self.data[t * self.bins..(t + 1) * self.bins]
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Copy of the rows `range.start..range.end` as a new map.
    pub fn slice_frames(&self, start: usize, end: usize) -> SpectralMap {
        assert!(start <= end && end <= self.frames);
        SpectralMap::new(
            end - start,
            self.bins,
            self.data[start * self.bins..end * self.bins].to_vec(),
        )
    }
}

/// Polar decomposition: `(magnitude, phase)`, magnitude non-negative,
/// phase in `(-pi, pi]`.
pub fn split(spec: &Spectrogram) -> (SpectralMap, SpectralMap) {
    let (frames, bins) = spec.shape();
    let mut mag = Vec::with_capacity(frames * bins);
    let mut phase = Vec::with_capacity(frames * bins);
    for &c in spec.data() {
        mag.push(c.norm());
        phase.push(c.arg());
    }
    (
        SpectralMap::new(frames, bins, mag),
        SpectralMap::new(frames, bins, phase),
    )
}

/// Recombine magnitude and phase into a complex spectrogram tagged with
/// `num_samples` for exact-length reconstruction. Fails with
/// `ShapeMismatch` when the two planes disagree.
pub fn combine(
    mag: &SpectralMap,
    phase: &SpectralMap,
    num_samples: usize,
) -> EnhanceResult<Spectrogram> {
    if mag.shape() != phase.shape() {
        let (ef, eb) = mag.shape();
        let (gf, gb) = phase.shape();
        return Err(EnhanceError::ShapeMismatch {
            expected_frames: ef,
            expected_bins: eb,
            got_frames: gf,
            got_bins: gb,
        });
    }
    let data = mag
        .data()
        .iter()
        .zip(phase.data())
        .map(|(&m, &p)| Complex::from_polar(m, p))
        .collect();
    let (frames, bins) = mag.shape();
    Ok(Spectrogram::new(frames, bins, data, num_samples))
}

/// `ln(mag + MAG_EPS)` elementwise; the only representation enhancement
/// models ever see.
pub fn to_log(mag: &SpectralMap) -> SpectralMap {
    let (frames, bins) = mag.shape();
    let data = mag.data().iter().map(|&m| (m + MAG_EPS).ln()).collect();
    SpectralMap::new(frames, bins, data)
}

/// Inverse of [`to_log`], clipped at zero so numeric underflow can never
/// produce a negative magnitude.
pub fn log_to_linear(log_mag: &SpectralMap) -> SpectralMap {
    let (frames, bins) = log_mag.shape();
    let data = log_mag
        .data()
        .iter()
        .map(|&v| (v.exp() - MAG_EPS).max(0.0))
        .collect();
    SpectralMap::new(frames, bins, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_spectrogram() -> Spectrogram {
        let frames = 4;
        let bins = 9;
        let data: Vec<Complex<f32>> = (0..frames * bins)
            .map(|i| {
                let a = (0.7 * i as f32).sin() * 3.0;
                let b = (0.3 * i as f32).cos() * 2.0;
                Complex::new(a, b)
            })
            .collect();
        Spectrogram::new(frames, bins, data, 1000)
    }

    #[test]
    fn split_combine_recombines() {
        let spec = sample_spectrogram();
        let (mag, phase) = split(&spec);
        for &m in mag.data() {
            assert!(m >= 0.0);
        }
        for &p in phase.data() {
            assert!(p > -std::f32::consts::PI - 1e-6 && p <= std::f32::consts::PI + 1e-6);
        }
        let rebuilt = combine(&mag, &phase, spec.num_samples()).unwrap();
        assert_eq!(rebuilt.shape(), spec.shape());
        assert_eq!(rebuilt.num_samples(), spec.num_samples());
        for (a, b) in rebuilt.data().iter().zip(spec.data()) {
            assert!((a - b).norm() <= 1e-5 * (1.0 + b.norm()));
        }
    }

    #[test]
    fn combine_rejects_mismatched_shapes() {
        let spec = sample_spectrogram();
        let (mag, _) = split(&spec);
        let phase = SpectralMap::zeros(3, 9);
        let err = combine(&mag, &phase, 0).unwrap_err();
        assert_eq!(err.kind(), "ShapeMismatch");
    }

    #[test]
    fn log_round_trip_preserves_magnitudes() {
        let spec = sample_spectrogram();
        let (mag, _) = split(&spec);
        let rebuilt = log_to_linear(&to_log(&mag));
        for (a, b) in rebuilt.data().iter().zip(mag.data()) {
            assert!((a - b).abs() <= 1e-5 * (1.0 + b.abs()));
        }
    }

    #[test]
    fn log_to_linear_never_goes_negative() {
        // Strongly negative log values underflow to zero, not below.
        let log_mag = SpectralMap::new(1, 3, vec![-40.0, -20.0, 0.0]);
        let lin = log_to_linear(&log_mag);
        for &v in lin.data() {
            assert!(v >= 0.0);
        }
    }
}
