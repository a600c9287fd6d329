//! Shared DSP helpers and constants.

use std::f32::consts::PI;

/// Floor added before taking logs of magnitudes, and subtracted again on
/// the way back. Keeps `ln` away from -inf without coloring the spectrum.
pub const MAG_EPS: f32 = 1e-7;

/// Overlap-add normalization floor. Window-weight sums below this are
/// clamped instead of divided through.
pub const OLA_NORM_EPS: f32 = 1e-6;

/// Periodic square-root Hann window, applied on both analysis and
/// synthesis so the overlap-add denominator is the plain Hann sum.
pub fn make_sqrt_hann_window(len: usize) -> Vec<f32> {
    assert!(len > 0);
    (0..len)
        .map(|i| {
            let h = 0.5 - 0.5 * (2.0 * PI * i as f32 / len as f32).cos();
            h.max(0.0).sqrt()
        })
        .collect()
}

/// Periodic Hann window (analysis-only uses, e.g. metric framing).
pub fn make_hann_window(len: usize) -> Vec<f32> {
    assert!(len > 0);
    (0..len)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f32 / len as f32).cos())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqrt_hann_squares_to_hann() {
        let w = make_sqrt_hann_window(512);
        let h = make_hann_window(512);
        for i in 0..512 {
            assert!((w[i] * w[i] - h[i]).abs() < 1e-6);
        }
    }

    #[test]
    fn hann_is_cola_at_quarter_hop() {
        // Periodic Hann sums to a constant at 75% overlap.
        let h = make_hann_window(512);
        let hop = 128;
        let mut acc = vec![0.0f32; 512 + 3 * hop];
        for t in 0..4 {
            for (i, &v) in h.iter().enumerate() {
                acc[t * hop + i] += v;
            }
        }
        // Fully covered region only.
        for &v in &acc[512 - hop..512] {
            assert!((v - 2.0).abs() < 1e-4);
        }
    }
}
