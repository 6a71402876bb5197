//! Volume scaling between `0.0..=1.0` levels and receiver steps

use crate::error::{OnkyoError, Result};
use crate::types::ReceiverConfig;

/// Maps normalized volume levels onto raw receiver steps
///
/// Full scale (`1.0`) corresponds to `max_volume` percent of
/// `receiver_max_volume` steps, so a receiver that goes up to 80 steps with
/// `max_volume = 50` tops out at step 40.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeScale {
    max_volume: u8,
    receiver_max_volume: u8,
}

impl Default for VolumeScale {
    fn default() -> Self {
        Self::new(100, 80)
    }
}

impl VolumeScale {
    /// Create a scale; zero values are raised to 1
    #[must_use]
    pub fn new(max_volume: u8, receiver_max_volume: u8) -> Self {
        Self {
            max_volume: max_volume.clamp(1, 100),
            receiver_max_volume: receiver_max_volume.max(1),
        }
    }

    /// Scale from the receiver configuration
    #[must_use]
    pub fn from_config(config: &ReceiverConfig) -> Self {
        Self::new(config.max_volume, config.receiver_max_volume)
    }

    /// Raw steps reached at level `1.0`
    #[must_use]
    pub fn full_scale(&self) -> f64 {
        f64::from(self.receiver_max_volume) * f64::from(self.max_volume) / 100.0
    }

    /// Raw step for a level, rounded down
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` unless `0.0 <= level <= 1.0`.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "level is checked to 0..=1 and full scale is at most 200"
    )]
    pub fn to_raw(&self, level: f64) -> Result<u8> {
        if !(0.0..=1.0).contains(&level) {
            return Err(OnkyoError::InvalidParameter {
                name: "volume".to_string(),
                message: format!("level {level} outside 0.0..=1.0"),
            });
        }
        Ok((level * self.full_scale()).floor() as u8)
    }

    /// Level for a raw step reported by the receiver, at most `1.0`
    #[must_use]
    pub fn to_level(&self, raw: u8) -> f64 {
        (f64::from(raw) / self.full_scale()).min(1.0)
    }
}
