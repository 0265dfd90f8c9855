//! Hardware adapter: bridges real peripherals to domain port traits.
//!
//! Owns the heater PWM driver and the clock, exposing them through
//! [`SensorPort`], [`ActuatorPort`] and [`ClockPort`].  This is the only
//! module in the system that touches actual hardware.  On non-espidf
//! targets the underlying drivers use cfg-gated simulation stubs.

use crate::adapters::time::MonotonicClock;
use crate::app::ports::{ActuatorPort, ClockPort, SensorPort};
use crate::config::PwmConfig;
use crate::drivers::hw_init;
use crate::drivers::pwm::{HeaterPwm, LedcTimer};
use crate::error::PwmError;

/// Concrete adapter that combines all hardware behind port traits.
pub struct HardwareAdapter {
    heater: HeaterPwm<LedcTimer>,
    clock: MonotonicClock,
}

impl HardwareAdapter {
    pub fn new(pwm: &PwmConfig) -> Self {
        Self {
            heater: HeaterPwm::new(LedcTimer::new(pwm), pwm),
            clock: MonotonicClock::new(),
        }
    }

    pub fn pwm(&self) -> &HeaterPwm<LedcTimer> {
        &self.heater
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl SensorPort for HardwareAdapter {
    fn read_raw(&mut self, channel: u8) -> u16 {
        hw_init::adc1_read(channel)
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl ActuatorPort for HardwareAdapter {
    fn enable(&mut self, frequency_hz: f32) -> Result<(), PwmError> {
        self.heater.enable(frequency_hz)
    }

    fn set_duty(&mut self, percent: f32) -> Result<(), PwmError> {
        self.heater.set_duty(percent)
    }

    fn disable(&mut self) {
        self.heater.off();
    }

    fn duty(&self) -> f32 {
        self.heater.duty()
    }
}

// ── ClockPort implementation ──────────────────────────────────

impl ClockPort for HardwareAdapter {
    fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }
}
