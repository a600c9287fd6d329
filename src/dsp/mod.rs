pub mod framer;
pub mod spectrogram;
pub mod stft;
pub mod utils;

pub use spectrogram::{combine, log_to_linear, split, to_log, SpectralMap, Spectrogram};
pub use stft::Stft;
