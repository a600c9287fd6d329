//! Forward and inverse short-time Fourier transform.
//!
//! Framing (sqrt-Hann WOLA) comes from [`crate::dsp::framer`]; this
//! module adds the per-frame FFT restricted to the one-sided spectrum of
//! a real signal, and the conjugate-symmetric inverse. Input is
//! center-padded by half a window on both sides so the first and last
//! real samples never sit under a near-zero window tail; the pad is
//! trimmed on reconstruction and output length equals input length
//! exactly.

use crate::config::EnhanceConfig;
use crate::dsp::framer::{frame_signal, overlap_add};
use crate::dsp::spectrogram::Spectrogram;
use crate::dsp::utils::make_sqrt_hann_window;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

pub struct Stft {
    fft_forward: Arc<dyn Fft<f32>>,
    fft_inverse: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    n_fft: usize,
    win_length: usize,
    hop_length: usize,
}

impl Stft {
    pub fn new(config: &EnhanceConfig) -> Self {
        let mut planner = FftPlanner::new();
        Self {
            fft_forward: planner.plan_fft_forward(config.n_fft),
            fft_inverse: planner.plan_fft_inverse(config.n_fft),
            window: make_sqrt_hann_window(config.win_length),
            n_fft: config.n_fft,
            win_length: config.win_length,
            hop_length: config.hop_length,
        }
    }

    /// One-sided bins per frame.
    pub fn bins(&self) -> usize {
        self.n_fft / 2 + 1
    }

    fn pad(&self) -> usize {
        self.win_length / 2
    }

    /// Windowed, framed forward transform producing a one-sided complex
    /// spectrogram tagged with the input length.
    pub fn forward(&self, x: &[f32]) -> Spectrogram {
        let pad = self.pad();
        let mut padded = vec![0.0f32; pad];
        padded.extend_from_slice(x);
        padded.resize(x.len() + 2 * pad, 0.0);

        let frames = frame_signal(&padded, &self.window, self.hop_length);
        let bins = self.bins();
        let mut data = Vec::with_capacity(frames.len() * bins);
        let mut buf = vec![Complex::new(0.0f32, 0.0f32); self.n_fft];
        for frame in &frames {
            for slot in buf.iter_mut() {
                *slot = Complex::new(0.0, 0.0);
            }
            for (i, &v) in frame.iter().enumerate() {
                buf[i] = Complex::new(v, 0.0);
            }
            self.fft_forward.process(&mut buf);
            data.extend_from_slice(&buf[..bins]);
        }
        Spectrogram::new(frames.len(), bins, data, x.len())
    }

    /// Inverse transform and overlap-add back to a waveform of exactly
    /// `spec.num_samples()` samples.
    pub fn inverse(&self, spec: &Spectrogram) -> Vec<f32> {
        let (n_frames, bins) = spec.shape();
        assert_eq!(bins, self.bins(), "spectrogram bins must match n_fft");

        let scale = 1.0 / self.n_fft as f32;
        let mut frames = Vec::with_capacity(n_frames);
        let mut buf = vec![Complex::new(0.0f32, 0.0f32); self.n_fft];
        for t in 0..n_frames {
            let row = spec.row(t);
            buf[..bins].copy_from_slice(row);
            // Negative frequencies by conjugate symmetry of a real signal.
            for k in 1..self.n_fft - bins + 1 {
                buf[self.n_fft - k] = row[k].conj();
            }
            self.fft_inverse.process(&mut buf);
            let frame: Vec<f32> = buf[..self.win_length].iter().map(|c| c.re * scale).collect();
            frames.push(frame);
        }

        let pad = self.pad();
        let num_samples = spec.num_samples();
        let padded = overlap_add(&frames, &self.window, self.hop_length, num_samples + 2 * pad);
        padded[pad..pad + num_samples].to_vec()
    }
}
