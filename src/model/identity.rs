//! Identity passthrough model. With this in the pipeline the output
//! equals the plain STFT round trip, which is the anchor test for the
//! whole reconstruction path.

use crate::dsp::SpectralMap;
use crate::error::EnhanceResult;
use crate::model::EnhancementModel;

#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityModel;

impl EnhancementModel for IdentityModel {
    fn name(&self) -> &str {
        "identity"
    }

    fn enhance(&self, log_mag: &SpectralMap) -> EnhanceResult<SpectralMap> {
        Ok(log_mag.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_input_through_unchanged() {
        let input = SpectralMap::new(2, 3, vec![-1.0, 0.0, 1.0, 2.0, -3.0, 0.5]);
        let out = IdentityModel.enhance(&input).unwrap();
        assert_eq!(out, input);
    }
}
