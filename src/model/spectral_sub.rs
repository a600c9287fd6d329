//! Spectral-subtraction heuristic model.
//!
//! Estimates a stationary noise fingerprint from the leading frames
//! (assumed speech-free room tone), subtracts an over-weighted copy of
//! it per bin in the power domain, and floors the result at a fraction
//! of the noisy magnitude. Bounded subtraction: only attenuates, never
//! amplifies.

use crate::dsp::{log_to_linear, to_log, SpectralMap};
use crate::error::EnhanceResult;
use crate::model::EnhancementModel;

// First frames assumed to be noise-only.
const DEFAULT_NOISE_FRAMES: usize = 10;
// Over-subtraction factor (power domain).
const DEFAULT_OVER_SUBTRACTION: f32 = 2.0;
// Fraction of the noisy magnitude kept as a floor against musical noise.
const DEFAULT_SPECTRAL_FLOOR: f32 = 0.02;

#[derive(Debug, Clone)]
pub struct SpectralSubtraction {
    noise_estimation_frames: usize,
    over_subtraction_factor: f32,
    spectral_floor: f32,
}

impl Default for SpectralSubtraction {
    fn default() -> Self {
        Self {
            noise_estimation_frames: DEFAULT_NOISE_FRAMES,
            over_subtraction_factor: DEFAULT_OVER_SUBTRACTION,
            spectral_floor: DEFAULT_SPECTRAL_FLOOR,
        }
    }
}

impl SpectralSubtraction {
    pub fn new(
        noise_estimation_frames: usize,
        over_subtraction_factor: f32,
        spectral_floor: f32,
    ) -> Self {
        assert!(noise_estimation_frames > 0);
        assert!(over_subtraction_factor >= 1.0);
        assert!((0.0..1.0).contains(&spectral_floor));
        Self {
            noise_estimation_frames,
            over_subtraction_factor,
            spectral_floor,
        }
    }

    /// Mean power per bin over the leading noise-only frames.
    fn noise_profile(&self, mag: &SpectralMap) -> Vec<f32> {
        let frames = mag.frames().min(self.noise_estimation_frames);
        let mut profile = vec![0.0f32; mag.bins()];
        for t in 0..frames {
            for (slot, &m) in profile.iter_mut().zip(mag.row(t)) {
                *slot += m * m;
            }
        }
        let inv = 1.0 / frames.max(1) as f32;
        for slot in profile.iter_mut() {
            *slot *= inv;
        }
        profile
    }
}

impl EnhancementModel for SpectralSubtraction {
    fn name(&self) -> &str {
        "spectral_subtraction"
    }

    fn enhance(&self, log_mag: &SpectralMap) -> EnhanceResult<SpectralMap> {
        let mag = log_to_linear(log_mag);
        let noise = self.noise_profile(&mag);

        let mut out = SpectralMap::zeros(mag.frames(), mag.bins());
        for t in 0..mag.frames() {
            let row = mag.row(t);
            let out_row = out.row_mut(t);
            for i in 0..row.len() {
                let power = row[i] * row[i];
                let sub = power - self.over_subtraction_factor * noise[i];
                let floor = self.spectral_floor * row[i];
                out_row[i] = sub.max(0.0).sqrt().max(floor).min(row[i]);
            }
        }
        Ok(to_log(&out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noisy_map(frames: usize, bins: usize) -> SpectralMap {
        // Stationary noise floor of 0.5 with a strong "speech" band in
        // the middle frames.
        let mut mag = SpectralMap::zeros(frames, bins);
        for t in 0..frames {
            let row = mag.row_mut(t);
            for (i, slot) in row.iter_mut().enumerate() {
                *slot = 0.5 + 0.05 * ((t * bins + i) as f32 * 0.13).sin();
                if (12..20).contains(&t) && (8..16).contains(&i) {
                    *slot += 10.0;
                }
            }
        }
        mag
    }

    #[test]
    fn attenuates_stationary_noise_keeps_speech() {
        let mag = noisy_map(32, 33);
        let log_mag = to_log(&mag);
        let model = SpectralSubtraction::default();
        let enhanced = log_to_linear(&model.enhance(&log_mag).unwrap());
        assert_eq!(enhanced.shape(), mag.shape());

        // Noise-only region is strongly attenuated.
        let before: f32 = mag.row(25).iter().sum();
        let after: f32 = enhanced.row(25).iter().sum();
        assert!(after < 0.2 * before, "noise not reduced: {} vs {}", after, before);

        // Speech-dominant bins survive nearly intact.
        let speech_before = mag.row(15)[12];
        let speech_after = enhanced.row(15)[12];
        assert!(speech_after > 0.9 * speech_before);
    }

    #[test]
    fn never_amplifies() {
        let mag = noisy_map(32, 33);
        let model = SpectralSubtraction::default();
        let enhanced = log_to_linear(&model.enhance(&to_log(&mag)).unwrap());
        for (a, b) in enhanced.data().iter().zip(mag.data()) {
            assert!(*a <= b * 1.001);
        }
    }
}
