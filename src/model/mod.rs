//! Enhancement model interface.
//!
//! A model maps one log-magnitude spectrogram to another of identical
//! shape. It never sees phase, never adapts shapes itself (a model that
//! cannot accept a shape reports `ShapeUnsupported`; segmenting is the
//! pipeline's job), and is read-only once constructed, so one instance
//! can serve a whole concurrent batch behind an `Arc`.

mod identity;
mod mask_net;
mod spectral_sub;

pub use identity::IdentityModel;
pub use mask_net::MaskNet;
pub use spectral_sub::SpectralSubtraction;

use crate::dsp::SpectralMap;
use crate::error::EnhanceResult;

pub trait EnhancementModel: Send + Sync {
    /// Short identifier for logs and reports.
    fn name(&self) -> &str;

    /// Map a log-magnitude spectrogram to an enhanced one of the exact
    /// same shape.
    fn enhance(&self, log_mag: &SpectralMap) -> EnhanceResult<SpectralMap>;

    /// Maximum number of frames this model accepts per call, if bounded.
    /// The pipeline segments longer inputs and stitches the results.
    fn frame_capacity(&self) -> Option<usize> {
        None
    }
}
