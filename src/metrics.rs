//! Objective-quality metrics for (reference, processed) waveform pairs.
//!
//! SNR and SI-SDR follow the evaluation recipe used during training.
//! STOI uses its own standardized framing (10 kHz analysis rate, 25.6 ms
//! Hann frames at 50% overlap, 15 one-third-octave bands from 150 Hz,
//! 384 ms short-time segments), deliberately distinct from the
//! enhancement STFT's parameters. PESQ has no bundled backend and is
//! reported as an explicit "not computed" entry, never an error.
//!
//! Both inputs must be equal length; trimming is never applied silently.

use crate::dsp::utils::make_hann_window;
use crate::error::{EnhanceError, EnhanceResult};
use log::warn;
use once_cell::sync::OnceCell;
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use serde::Serialize;
use std::collections::BTreeMap;

// Denominator guard used by the training-side evaluation code.
const POWER_EPS: f64 = 1e-8;

// STOI (Taal et al. 2011) constants. Must not change.
const STOI_FS: u32 = 10_000;
const STOI_FRAME: usize = 256;
const STOI_HOP: usize = 128;
const STOI_NFFT: usize = 512;
const STOI_NUM_BANDS: usize = 15;
const STOI_MIN_FREQ: f64 = 150.0;
const STOI_SEG_FRAMES: usize = 30;
const STOI_BETA_DB: f64 = -15.0;
const STOI_DYN_RANGE_DB: f64 = 40.0;
const STOI_EPS: f64 = 1e-15;

static PESQ_WARNED: OnceCell<()> = OnceCell::new();

/// A single metric slot: either a computed scalar or an explicit record
/// of why it was not computed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum MetricValue {
    Computed(f64),
    NotComputed(String),
}

/// Immutable per-pair metric set.
#[derive(Debug, Clone, Serialize)]
pub struct MetricResult {
    pub snr_db: f64,
    pub si_sdr_db: f64,
    pub stoi: f64,
    pub pesq: MetricValue,
}

impl MetricResult {
    /// Computed scalars by metric name.
    pub fn computed(&self) -> BTreeMap<&'static str, f64> {
        let mut map = BTreeMap::new();
        map.insert("snr", self.snr_db);
        map.insert("si_sdr", self.si_sdr_db);
        map.insert("stoi", self.stoi);
        if let MetricValue::Computed(v) = self.pesq {
            map.insert("pesq", v);
        }
        map
    }
}

/// Whether a PESQ backend is available in this build. None is bundled;
/// the slot exists so evaluation reports stay shape-stable with the
/// training-side tooling.
pub fn is_pesq_available() -> bool {
    false
}

/// Compute all metrics for one (reference, processed) pair.
pub fn compute_metrics(
    reference: &[f32],
    processed: &[f32],
    sample_rate: u32,
) -> EnhanceResult<MetricResult> {
    if reference.len() != processed.len() {
        return Err(EnhanceError::LengthMismatch {
            reference: reference.len(),
            processed: processed.len(),
        });
    }

    let pesq = if is_pesq_available() {
        // Unreachable today; kept so a backend can slot in.
        MetricValue::NotComputed("backend produced no score".into())
    } else {
        PESQ_WARNED.get_or_init(|| {
            warn!("no PESQ backend is bundled; PESQ will be reported as not computed");
        });
        MetricValue::NotComputed("no PESQ backend available".into())
    };

    Ok(MetricResult {
        snr_db: snr_db(reference, processed),
        si_sdr_db: si_sdr_db(reference, processed),
        stoi: stoi(reference, processed, sample_rate),
        pesq,
    })
}

/// Signal-to-noise ratio in dB; +inf when the residual is exactly zero.
pub fn snr_db(reference: &[f32], processed: &[f32]) -> f64 {
    let mut signal = 0.0f64;
    let mut noise = 0.0f64;
    for (&r, &p) in reference.iter().zip(processed) {
        let r = r as f64;
        let d = p as f64 - r;
        signal += r * r;
        noise += d * d;
    }
    if noise == 0.0 {
        return f64::INFINITY;
    }
    10.0 * (signal / (noise + POWER_EPS)).log10()
}

/// Scale-invariant signal-to-distortion ratio in dB.
pub fn si_sdr_db(reference: &[f32], processed: &[f32]) -> f64 {
    let n = reference.len().max(1) as f64;
    let mean_r = reference.iter().map(|&v| v as f64).sum::<f64>() / n;
    let mean_p = processed.iter().map(|&v| v as f64).sum::<f64>() / n;

    let mut dot = 0.0f64;
    let mut ref_pow = 0.0f64;
    for (&r, &p) in reference.iter().zip(processed) {
        let r = r as f64 - mean_r;
        let p = p as f64 - mean_p;
        dot += r * p;
        ref_pow += r * r;
    }
    let scale = dot / (ref_pow + POWER_EPS);

    let mut target_pow = 0.0f64;
    let mut noise_pow = 0.0f64;
    for (&r, &p) in reference.iter().zip(processed) {
        let target = scale * (r as f64 - mean_r);
        let err = (p as f64 - mean_p) - target;
        target_pow += target * target;
        noise_pow += err * err;
    }
    10.0 * (target_pow / (noise_pow + POWER_EPS)).log10()
}

/// Short-time objective intelligibility in [0, 1]. Degenerate input
/// (too short after silent-frame removal, or unresamplable) yields 0.0
/// with a warning rather than an error.
pub fn stoi(reference: &[f32], processed: &[f32], sample_rate: u32) -> f64 {
    debug_assert_eq!(reference.len(), processed.len());
    if reference.is_empty() {
        warn!("STOI: empty input");
        return 0.0;
    }

    let to_f64 = |x: &[f32]| x.iter().map(|&v| v as f64).collect::<Vec<f64>>();
    let (ref_10k, proc_10k) = if sample_rate == STOI_FS {
        (to_f64(reference), to_f64(processed))
    } else {
        let r = resample_to_stoi_rate(&to_f64(reference), sample_rate);
        let p = resample_to_stoi_rate(&to_f64(processed), sample_rate);
        match (r, p) {
            (Ok(r), Ok(p)) => (r, p),
            (Err(e), _) | (_, Err(e)) => {
                warn!("STOI: resampling to {} Hz failed: {}", STOI_FS, e);
                return 0.0;
            }
        }
    };

    let window = make_hann_window(STOI_FRAME)
        .iter()
        .map(|&v| v as f64)
        .collect::<Vec<f64>>();
    let (ref_frames, proc_frames) = active_frames(&ref_10k, &proc_10k, &window);
    if ref_frames.len() < STOI_SEG_FRAMES {
        warn!(
            "STOI: only {} active frames, need {}",
            ref_frames.len(),
            STOI_SEG_FRAMES
        );
        return 0.0;
    }

    let obm = third_octave_bands();
    let ref_bands = band_envelopes(&ref_frames, &obm);
    let proc_bands = band_envelopes(&proc_frames, &obm);

    let clip = 1.0 + 10f64.powf(-STOI_BETA_DB / 20.0);
    let n_segments = ref_frames.len() - STOI_SEG_FRAMES + 1;
    let mut total = 0.0f64;
    for m in 0..n_segments {
        for j in 0..STOI_NUM_BANDS {
            let x: Vec<f64> = (m..m + STOI_SEG_FRAMES).map(|t| ref_bands[t][j]).collect();
            let y: Vec<f64> = (m..m + STOI_SEG_FRAMES).map(|t| proc_bands[t][j]).collect();

            let norm_x = x.iter().map(|v| v * v).sum::<f64>().sqrt();
            let norm_y = y.iter().map(|v| v * v).sum::<f64>().sqrt();
            let alpha = norm_x / (norm_y + STOI_EPS);
            let y_prime: Vec<f64> = x
                .iter()
                .zip(&y)
                .map(|(&xi, &yi)| (alpha * yi).min(xi * clip))
                .collect();

            total += correlation(&x, &y_prime);
        }
    }
    total / (n_segments * STOI_NUM_BANDS) as f64
}

/// Frame both signals and drop frames whose *reference* energy is more
/// than `STOI_DYN_RANGE_DB` below the loudest reference frame.
fn active_frames(
    reference: &[f64],
    processed: &[f64],
    window: &[f64],
) -> (Vec<Vec<f64>>, Vec<Vec<f64>>) {
    let len = reference.len().min(processed.len());
    let mut ref_frames = Vec::new();
    let mut proc_frames = Vec::new();
    let mut energies_db = Vec::new();
    let mut start = 0;
    while start + STOI_FRAME <= len {
        let r: Vec<f64> = (0..STOI_FRAME)
            .map(|i| window[i] * reference[start + i])
            .collect();
        let p: Vec<f64> = (0..STOI_FRAME)
            .map(|i| window[i] * processed[start + i])
            .collect();
        let norm = r.iter().map(|v| v * v).sum::<f64>().sqrt();
        energies_db.push(20.0 * (norm + STOI_EPS).log10());
        ref_frames.push(r);
        proc_frames.push(p);
        start += STOI_HOP;
    }

    let max_db = energies_db.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let mut kept_ref = Vec::new();
    let mut kept_proc = Vec::new();
    for (i, e) in energies_db.iter().enumerate() {
        if *e > max_db - STOI_DYN_RANGE_DB {
            kept_ref.push(std::mem::take(&mut ref_frames[i]));
            kept_proc.push(std::mem::take(&mut proc_frames[i]));
        }
    }
    (kept_ref, kept_proc)
}

/// One-third-octave band membership over the one-sided 512-point grid:
/// band j covers center 150 * 2^(j/3) Hz, edges a sixth-octave out.
fn third_octave_bands() -> Vec<Vec<usize>> {
    let bin_hz = STOI_FS as f64 / STOI_NFFT as f64;
    (0..STOI_NUM_BANDS)
        .map(|j| {
            let center = STOI_MIN_FREQ * 2f64.powf(j as f64 / 3.0);
            let lo = center * 2f64.powf(-1.0 / 6.0);
            let hi = center * 2f64.powf(1.0 / 6.0);
            (0..STOI_NFFT / 2 + 1)
                .filter(|&k| {
                    let f = k as f64 * bin_hz;
                    f >= lo && f < hi
                })
                .collect()
        })
        .collect()
}

/// sqrt of summed bin powers per band, per frame.
fn band_envelopes(frames: &[Vec<f64>], obm: &[Vec<usize>]) -> Vec<Vec<f64>> {
    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(STOI_NFFT);
    let mut buf = vec![Complex::new(0.0f64, 0.0f64); STOI_NFFT];
    frames
        .iter()
        .map(|frame| {
            for slot in buf.iter_mut() {
                *slot = Complex::new(0.0, 0.0);
            }
            for (i, &v) in frame.iter().enumerate() {
                buf[i] = Complex::new(v, 0.0);
            }
            fft.process(&mut buf);
            obm.iter()
                .map(|bins| {
                    bins.iter()
                        .map(|&k| buf[k].norm_sqr())
                        .sum::<f64>()
                        .sqrt()
                })
                .collect()
        })
        .collect()
}

/// Pearson correlation of two equal-length segments.
fn correlation(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len() as f64;
    let mx = x.iter().sum::<f64>() / n;
    let my = y.iter().sum::<f64>() / n;
    let mut dot = 0.0;
    let mut nx = 0.0;
    let mut ny = 0.0;
    for (&a, &b) in x.iter().zip(y) {
        let a = a - mx;
        let b = b - my;
        dot += a * b;
        nx += a * a;
        ny += b * b;
    }
    dot / (nx.sqrt() * ny.sqrt() + STOI_EPS)
}

fn resample_to_stoi_rate(x: &[f64], from_rate: u32) -> anyhow::Result<Vec<f64>> {
    if x.is_empty() {
        return Ok(Vec::new());
    }
    let params = SincInterpolationParameters {
        sinc_len: 128,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 128,
        window: WindowFunction::Blackman2,
    };
    let ratio = STOI_FS as f64 / from_rate as f64;
    let mut resampler = SincFixedIn::<f64>::new(ratio, 1.1, params, x.len(), 1)?;
    let mut out = resampler.process(&[x], None)?;
    Ok(out.remove(0))
}

/// Mean/median summary of one metric across a batch. Only finite values
/// participate (an identical pair yields SNR = +inf, which would poison
/// the mean); `count` says how many did.
#[derive(Debug, Clone, Serialize)]
pub struct MetricStats {
    pub mean: f64,
    pub median: f64,
    pub count: usize,
}

/// Aggregate per-metric statistics over many results.
pub fn aggregate(results: &[&MetricResult]) -> BTreeMap<String, MetricStats> {
    let mut columns: BTreeMap<&'static str, Vec<f64>> = BTreeMap::new();
    for result in results {
        for (name, value) in result.computed() {
            if value.is_finite() {
                columns.entry(name).or_default().push(value);
            }
        }
    }
    columns
        .into_iter()
        .filter(|(_, values)| !values.is_empty())
        .map(|(name, mut values)| {
            values.sort_by(|a, b| a.partial_cmp(b).expect("finite values"));
            let count = values.len();
            let mean = values.iter().sum::<f64>() / count as f64;
            let median = if count % 2 == 1 {
                values[count / 2]
            } else {
                0.5 * (values[count / 2 - 1] + values[count / 2])
            };
            (name.to_string(), MetricStats { mean, median, count })
        })
        .collect()
}
