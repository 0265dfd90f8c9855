//! Sensor subsystem.
//!
//! Raw ADC counts come in through [`SensorPort`](crate::app::ports::SensorPort);
//! this module turns them into physical values and filters them into
//! readings the heater can trust.

pub mod temperature;

use crate::config::SensorConfig;

/// Linear instrument calibration: `value = raw * slope + offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    pub slope: f32,
    pub offset: f32,
}

impl Calibration {
    pub const fn new(slope: f32, offset: f32) -> Self {
        Self { slope, offset }
    }

    pub fn from_config(cfg: &SensorConfig) -> Self {
        Self::new(cfg.slope, cfg.offset)
    }

    /// Raw ADC counts to physical units.
    pub fn apply(&self, raw: u16) -> f32 {
        raw as f32 * self.slope + self.offset
    }

    /// Nearest raw count for a physical value, saturating at the `u16`
    /// range.  Used by simulation and test rigs to synthesise samples.
    pub fn raw_for(&self, value: f32) -> u16 {
        let raw = ((value - self.offset) / self.slope).round();
        if raw.is_nan() || raw <= 0.0 {
            0
        } else if raw >= f32::from(u16::MAX) {
            u16::MAX
        } else {
            raw as u16
        }
    }
}
