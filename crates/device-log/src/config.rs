use telemetry::env_f64;

use crate::model::{FixProfile, ProtocolIds};

#[derive(Debug, Clone)]
pub struct EncoderConfig {
    pub ids: ProtocolIds,
    /// Fix status split for batches built from sampler output.
    pub live_fix: FixProfile,
    /// Fix status split for synthetic full batches.
    pub synthetic_fix: FixProfile,
}

impl EncoderConfig {
    #[must_use]
    pub fn from_env() -> Self {
        // live invalid fixes default to `V`; a lower invalid ratio leaves
        // room for `0`
        let live_valid = env_f64("LIVE_FIX_VALID_RATIO", 1.0);
        let live_invalid = env_f64("LIVE_FIX_INVALID_RATIO", 1.0 - live_valid.clamp(0.0, 1.0));
        Self {
            ids: ProtocolIds::default(),
            live_fix: FixProfile::clamped(live_valid, live_invalid),
            synthetic_fix: FixProfile::clamped(
                env_f64("SYNTHETIC_FIX_VALID_RATIO", 0.90),
                env_f64("SYNTHETIC_FIX_INVALID_RATIO", 0.08),
            ),
        }
    }
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
