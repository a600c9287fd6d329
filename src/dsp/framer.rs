//! Framing and weighted overlap-add.
//!
//! Analysis applies the window elementwise while slicing; synthesis
//! applies the matching window again and divides every output sample by
//! the accumulated window-weight sum. Skipping that normalization is the
//! classic amplitude-ripple bug at overlap boundaries, so it is covered
//! by tests here and round-trip tests in `stft`.

use crate::dsp::utils::OLA_NORM_EPS;

/// Number of analysis frames needed to cover `len` samples.
pub fn num_frames(len: usize, win: usize, hop: usize) -> usize {
    if len == 0 {
        0
    } else if len <= win {
        1
    } else {
        (len - win + hop - 1) / hop + 1
    }
}

/// Slice `x` into overlapping frames at stride `hop`, applying the
/// analysis window. The final partial frame is zero-padded on the right.
pub fn frame_signal(x: &[f32], window: &[f32], hop: usize) -> Vec<Vec<f32>> {
    let win = window.len();
    assert!(hop > 0 && hop <= win);

    let n_frames = num_frames(x.len(), win, hop);
    let mut frames = Vec::with_capacity(n_frames);
    for t in 0..n_frames {
        let start = t * hop;
        let mut frame = vec![0.0f32; win];
        for (i, slot) in frame.iter_mut().enumerate() {
            if let Some(&sample) = x.get(start + i) {
                *slot = window[i] * sample;
            }
        }
        frames.push(frame);
    }
    frames
}

/// Weighted overlap-add: applies the synthesis window, sums overlapping
/// frames, and normalizes by the accumulated window-weight sum (clamped
/// at `OLA_NORM_EPS` where coverage is vanishing, e.g. sequence edges).
/// Output is truncated or zero-extended to exactly `out_len` samples.
pub fn overlap_add(frames: &[Vec<f32>], window: &[f32], hop: usize, out_len: usize) -> Vec<f32> {
    let win = window.len();
    assert!(hop > 0 && hop <= win);

    let span = if frames.is_empty() {
        0
    } else {
        (frames.len() - 1) * hop + win
    };
    let mut acc = vec![0.0f32; span];
    let mut norm = vec![0.0f32; span];
    for (t, frame) in frames.iter().enumerate() {
        assert_eq!(frame.len(), win, "frame length must match window length");
        let start = t * hop;
        for i in 0..win {
            acc[start + i] += window[i] * frame[i];
            norm[start + i] += window[i] * window[i];
        }
    }

    let mut out = vec![0.0f32; out_len];
    for (i, slot) in out.iter_mut().enumerate().take(span.min(out_len)) {
        *slot = acc[i] / norm[i].max(OLA_NORM_EPS);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::utils::make_sqrt_hann_window;

    fn test_signal(len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (0.37 * i as f32).sin() + 0.25 * (0.11 * i as f32).cos())
            .collect()
    }

    #[test]
    fn frame_count_covers_signal() {
        assert_eq!(num_frames(0, 512, 128), 0);
        assert_eq!(num_frames(100, 512, 128), 1);
        assert_eq!(num_frames(512, 512, 128), 1);
        let n = num_frames(5000, 512, 128);
        assert!((n - 1) * 128 + 512 >= 5000);
        assert!((n - 2) * 128 + 512 < 5000);
    }

    #[test]
    fn round_trip_is_exact_with_center_padding() {
        let win = 256;
        let hop = 64;
        let window = make_sqrt_hann_window(win);
        let x = test_signal(3000);

        // Centered the way the STFT wrapper does it: half a window of
        // zeros on both sides keeps real samples off the window tails.
        let pad = win / 2;
        let mut padded = vec![0.0f32; pad];
        padded.extend_from_slice(&x);
        padded.extend_from_slice(&vec![0.0f32; pad]);

        let frames = frame_signal(&padded, &window, hop);
        let rebuilt = overlap_add(&frames, &window, hop, padded.len());
        for (i, &v) in x.iter().enumerate() {
            assert!(
                (rebuilt[pad + i] - v).abs() < 1e-5,
                "sample {} differs: {} vs {}",
                i,
                rebuilt[pad + i],
                v
            );
        }
    }

    #[test]
    fn output_length_matches_request() {
        let window = make_sqrt_hann_window(128);
        let x = test_signal(333);
        let frames = frame_signal(&x, &window, 32);
        let y = overlap_add(&frames, &window, 32, x.len());
        assert_eq!(y.len(), x.len());
    }
}
