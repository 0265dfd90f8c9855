//! Heater PWM output.
//!
//! Models an 8-bit fast-PWM timer: `top` sets the period (and with it the
//! frequency), `compare` the number of on-ticks per period.  The LEDC
//! peripheral on the ESP32 is driven through [`LedcTimer`], which maps the
//! same two registers onto an LEDC timer and channel.
//!
//! ## Boundary policy
//!
//! | Requested duty     | compare            |
//! |--------------------|--------------------|
//! | `≤ 0` or NaN       | 0 (fully off)      |
//! | `0 < p < 100`      | `⌊top · p / 100⌋`  |
//! | `100`              | `top` (fully on)   |
//! | `> 100`            | 0 (fully off)      |
//!
//! A duty request before any frequency was configured forces the output
//! off and is reported as [`PwmError::FrequencyNotSet`].

use log::{debug, warn};

use crate::app::ports::ActuatorPort;
use crate::config::PwmConfig;
use crate::drivers::hw_init;
use crate::error::PwmError;

/// The two registers of an 8-bit PWM timer.
pub trait PwmTimer {
    /// Period register.
    fn write_top(&mut self, top: u8);
    /// On-ticks per period; `0` is off, `top` is fully on.
    fn write_compare(&mut self, compare: u8);
}

/// Duty-cycle actuator over a [`PwmTimer`].
pub struct HeaterPwm<T: PwmTimer> {
    timer: T,
    timer_clock_hz: f32,
    min_resolution: u8,
    max_resolution: u8,
    top: Option<u8>,
    duty: f32,
    compare: u8,
}

impl<T: PwmTimer> HeaterPwm<T> {
    pub fn new(timer: T, cfg: &PwmConfig) -> Self {
        Self {
            timer,
            timer_clock_hz: cfg.timer_clock_hz,
            min_resolution: cfg.min_resolution,
            max_resolution: cfg.max_resolution,
            top: None,
            duty: 0.0,
            compare: 0,
        }
    }

    /// Set the PWM frequency.
    ///
    /// The period is clamped to the usable timer range, so frequencies
    /// outside it saturate instead of failing.  A nonzero duty is
    /// re-quantized against the new period.
    pub fn set_frequency(&mut self, hz: f32) -> Result<(), PwmError> {
        if !hz.is_finite() || hz <= 0.0 {
            return Err(PwmError::InvalidFrequency);
        }
        let ticks = self.timer_clock_hz / hz;
        let top = if ticks < f32::from(self.min_resolution) {
            self.min_resolution
        } else if ticks >= f32::from(self.max_resolution) {
            self.max_resolution
        } else {
            ticks as u8
        };
        debug!("PWM: {:.0} Hz -> top {}", hz, top);
        self.top = Some(top);
        self.timer.write_top(top);

        if self.duty > 0.0 {
            self.apply(self.duty, top);
        }
        Ok(())
    }

    /// Set the duty cycle in percent.
    pub fn set_duty(&mut self, percent: f32) -> Result<(), PwmError> {
        let Some(top) = self.top else {
            self.duty = 0.0;
            self.compare = 0;
            self.timer.write_compare(0);
            warn!("PWM: duty {:.1}% requested before frequency, output forced off", percent);
            return Err(PwmError::FrequencyNotSet);
        };
        self.apply(percent, top);
        Ok(())
    }

    /// Output off and frequency forgotten.
    pub fn off(&mut self) {
        self.duty = 0.0;
        self.compare = 0;
        self.top = None;
        self.timer.write_compare(0);
    }

    fn apply(&mut self, percent: f32, top: u8) {
        let compare = Self::quantize(percent, top);
        self.duty = if compare == 0 { 0.0 } else { percent };
        self.compare = compare;
        self.timer.write_compare(compare);
    }

    fn quantize(percent: f32, top: u8) -> u8 {
        if percent.is_nan() || percent <= 0.0 || percent > 100.0 {
            0
        } else if percent == 100.0 {
            top
        } else {
            (f32::from(top) * percent / 100.0) as u8
        }
    }

    /// Effective duty in percent (0 when off).
    pub fn duty(&self) -> f32 {
        self.duty
    }

    pub fn compare(&self) -> u8 {
        self.compare
    }

    pub fn top(&self) -> Option<u8> {
        self.top
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }
}

impl<T: PwmTimer> ActuatorPort for HeaterPwm<T> {
    fn enable(&mut self, frequency_hz: f32) -> Result<(), PwmError> {
        self.set_frequency(frequency_hz)?;
        self.set_duty(0.0)
    }

    fn set_duty(&mut self, percent: f32) -> Result<(), PwmError> {
        HeaterPwm::set_duty(self, percent)
    }

    fn disable(&mut self) {
        self.off();
    }

    fn duty(&self) -> f32 {
        HeaterPwm::duty(self)
    }
}

// ── LEDC-backed timer ─────────────────────────────────────────

/// [`PwmTimer`] on the heater LEDC channel.
///
/// `top` becomes the LEDC frequency (`timer_clock / top`), `compare` is
/// scaled onto the channel's 8-bit duty resolution.
pub struct LedcTimer {
    timer_clock_hz: f32,
    top: u8,
}

impl LedcTimer {
    pub fn new(cfg: &PwmConfig) -> Self {
        Self {
            timer_clock_hz: cfg.timer_clock_hz,
            top: cfg.max_resolution,
        }
    }
}

impl PwmTimer for LedcTimer {
    fn write_top(&mut self, top: u8) {
        self.top = top.max(1);
        let hz = (self.timer_clock_hz / f32::from(self.top)) as u32;
        hw_init::ledc_set_frequency(hz);
    }

    fn write_compare(&mut self, compare: u8) {
        let duty = u32::from(compare.min(self.top)) * 255 / u32::from(self.top);
        hw_init::ledc_set(hw_init::LEDC_CH_HEATER, duty as u8);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SystemConfig;

    #[derive(Default)]
    struct Regs {
        top: u8,
        compare: u8,
        writes: u32,
    }

    impl PwmTimer for Regs {
        fn write_top(&mut self, top: u8) {
            self.top = top;
        }

        fn write_compare(&mut self, compare: u8) {
            self.compare = compare;
            self.writes += 1;
        }
    }

    fn pwm() -> HeaterPwm<Regs> {
        HeaterPwm::new(Regs::default(), &SystemConfig::default().pwm)
    }

    #[test]
    fn frequency_maps_to_clamped_top() {
        let mut p = pwm();
        p.set_frequency(1000.0).unwrap();
        assert_eq!(p.top(), Some(125));
        p.set_frequency(100.0).unwrap();
        assert_eq!(p.top(), Some(255));
        p.set_frequency(50_000.0).unwrap();
        assert_eq!(p.top(), Some(20));
        assert_eq!(p.set_frequency(0.0), Err(PwmError::InvalidFrequency));
        assert_eq!(p.set_frequency(f32::INFINITY), Err(PwmError::InvalidFrequency));
    }

    #[test]
    fn duty_boundaries() {
        let mut p = pwm();
        p.set_frequency(1000.0).unwrap();

        p.set_duty(100.0).unwrap();
        assert_eq!(p.compare(), 125);
        p.set_duty(0.0).unwrap();
        assert_eq!(p.compare(), 0);
        p.set_duty(-5.0).unwrap();
        assert_eq!(p.compare(), 0);
        p.set_duty(150.0).unwrap();
        assert_eq!(p.compare(), 0);
        assert_eq!(p.duty(), 0.0);
        p.set_duty(50.0).unwrap();
        assert_eq!(p.compare(), 62);
        assert_eq!(p.timer().compare, 62);
    }

    #[test]
    fn duty_before_frequency_forces_off() {
        let mut p = pwm();
        assert_eq!(p.set_duty(50.0), Err(PwmError::FrequencyNotSet));
        assert_eq!(p.compare(), 0);
        assert_eq!(p.timer().writes, 1);
    }

    #[test]
    fn frequency_change_requantizes_duty() {
        let mut p = pwm();
        p.set_frequency(1000.0).unwrap();
        p.set_duty(40.0).unwrap();
        assert_eq!(p.compare(), 50);
        p.set_frequency(500.0).unwrap();
        assert_eq!(p.top(), Some(250));
        assert_eq!(p.compare(), 100);
    }

    #[test]
    fn disable_forgets_frequency() {
        let mut p = pwm();
        ActuatorPort::enable(&mut p, 1000.0).unwrap();
        ActuatorPort::set_duty(&mut p, 30.0).unwrap();
        ActuatorPort::disable(&mut p);
        assert_eq!(p.compare(), 0);
        assert_eq!(
            ActuatorPort::set_duty(&mut p, 30.0),
            Err(PwmError::FrequencyNotSet)
        );
    }
}
