//! System configuration parameters
//!
//! All tunable constants for the heater controller: tick cadences, sensor
//! calibration and filtering, PID gains, heater thresholds and timeouts,
//! PWM timer limits.  These are compile-time defaults; nothing here is
//! persisted or reloaded at runtime.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Base tick and derived cadences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickConfig {
    /// Hardware timer period (milliseconds).
    pub base_interval_ms: u32,
    /// Base ticks per 100 ms cadence.
    pub ticks_per_100ms: u8,
    /// 100 ms cadences per 1 s cadence.
    pub hundreds_per_second: u8,
}

/// Thermocouple sampling and outlier rejection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorConfig {
    /// ADC channel the amplifier output is wired to.
    pub adc_channel: u8,
    /// Linear calibration: `value = raw * slope + offset`.
    pub slope: f32,
    pub offset: f32,
    /// Accepted samples averaged into one reading.
    pub samples_per_reading: u8,
    /// Re-samples allowed for one out-of-variance sample.
    pub retries: u8,
    /// Maximum allowed change between consecutive accepted samples (°C).
    pub variance: f32,
    /// Readings above this mean the thermocouple is disconnected (°C).
    pub disconnect_temperature: f32,
    /// Readings below this mean the amplifier has no power (°C).
    pub no_power_temperature: f32,
}

/// PID regulator gains and limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PidConfig {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
    /// Integration time step (seconds); equals the heater period.
    pub dt: f32,
    /// Integration is gated off while `|error|` is at or below this (°C).
    pub epsilon: f32,
    /// Saturation filter (duty percent).
    pub output_min: f32,
    pub output_max: f32,
}

/// Heater regulation thresholds and fault timeouts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeaterConfig {
    /// Fault if still below `ambient_temperature` after this (seconds).
    pub ambient_timeout_secs: f32,
    /// Fault if still below setpoint after this (seconds).
    pub regulation_timeout_secs: f32,
    /// Below this the heater has not left ambient (°C).
    pub ambient_temperature: f32,
    /// Cutoff temperature (°C).
    pub overheat_temperature: f32,
    /// Within this of setpoint counts as at target (°C).
    pub at_target_band: f32,
    /// PWM frequency used while heating (Hz).
    pub pwm_frequency_hz: f32,
    /// Setpoint applied at boot, if any.
    pub autostart_setpoint: Option<f32>,
}

/// 8-bit PWM timer limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PwmConfig {
    /// Timer input clock after prescaling (Hz).
    pub timer_clock_hz: f32,
    /// Smallest usable TOP value (highest frequency).
    pub min_resolution: u8,
    /// Largest usable TOP value (lowest frequency).
    pub max_resolution: u8,
}

/// Scheduler-level containment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyConfig {
    /// Indicator LED toggle period while an alarm is latched (ms).
    pub alarm_blink_ms: u32,
    /// Tolerated unconsumed base ticks before latching an alarm.
    pub max_tick_overruns: u32,
}

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    pub tick: TickConfig,
    pub sensor: SensorConfig,
    pub pid: PidConfig,
    pub heater: HeaterConfig,
    pub pwm: PwmConfig,
    pub safety: SafetyConfig,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            tick: TickConfig {
                base_interval_ms: 10,
                ticks_per_100ms: 10,
                hundreds_per_second: 10,
            },
            // K-type probe through an AD597, 10-bit ADC, 5 V reference.
            sensor: SensorConfig {
                adc_channel: 0,
                slope: 0.686_645_5,
                offset: -4.0625,
                samples_per_reading: 10,
                retries: 4,
                variance: 20.0,
                disconnect_temperature: 400.0,
                no_power_temperature: 5.0,
            },
            pid: PidConfig {
                kp: 5.0,
                ki: 0.1,
                kd: 0.5,
                dt: 0.1,
                epsilon: 1.0,
                output_min: 0.0,
                output_max: 100.0,
            },
            heater: HeaterConfig {
                ambient_timeout_secs: 90.0,
                regulation_timeout_secs: 300.0,
                ambient_temperature: 40.0,
                overheat_temperature: 300.0,
                at_target_band: 2.0,
                pwm_frequency_hz: 1000.0,
                autostart_setpoint: None,
            },
            // 8 MHz / 64 prescaler: roughly 500 Hz – 6 kHz usable.
            pwm: PwmConfig {
                timer_clock_hz: 125_000.0,
                min_resolution: 20,
                max_resolution: 255,
            },
            safety: SafetyConfig {
                alarm_blink_ms: 100,
                max_tick_overruns: 100,
            },
        }
    }
}

impl SystemConfig {
    /// Base tick period in seconds.
    pub fn base_tick_secs(&self) -> f32 {
        self.tick.base_interval_ms as f32 / 1000.0
    }

    /// Heater (100 ms cadence) period in seconds.
    pub fn heater_period_secs(&self) -> f32 {
        self.base_tick_secs() * self.tick.ticks_per_100ms as f32
    }

    /// Check the constants against each other.
    ///
    /// Invalid combinations are rejected, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.tick;
        if t.base_interval_ms == 0 || t.ticks_per_100ms == 0 || t.hundreds_per_second == 0 {
            return Err(ConfigError::ValidationFailed("tick: intervals must be non-zero"));
        }

        let s = &self.sensor;
        if s.samples_per_reading == 0 {
            return Err(ConfigError::ValidationFailed("sensor: samples_per_reading must be >= 1"));
        }
        // A reading has to complete inside one heater cycle or the heater
        // would never see data.
        if s.samples_per_reading > t.ticks_per_100ms {
            return Err(ConfigError::ValidationFailed(
                "sensor: samples_per_reading exceeds base ticks per heater cycle",
            ));
        }
        if !(s.variance > 0.0) {
            return Err(ConfigError::ValidationFailed("sensor: variance must be positive"));
        }
        if !(s.no_power_temperature < s.disconnect_temperature) {
            return Err(ConfigError::ValidationFailed(
                "sensor: no_power_temperature must be below disconnect_temperature",
            ));
        }
        if !s.slope.is_finite() || !s.offset.is_finite() {
            return Err(ConfigError::ValidationFailed("sensor: calibration must be finite"));
        }

        let p = &self.pid;
        if !(p.dt > 0.0) {
            return Err(ConfigError::ValidationFailed("pid: dt must be positive"));
        }
        if !(p.output_min < p.output_max) {
            return Err(ConfigError::ValidationFailed("pid: output_min must be below output_max"));
        }
        if p.output_min < 0.0 || p.output_max > 100.0 {
            return Err(ConfigError::ValidationFailed("pid: output range must lie within 0-100 %"));
        }
        if !(p.epsilon >= 0.0) {
            return Err(ConfigError::ValidationFailed("pid: epsilon must be non-negative"));
        }

        let h = &self.heater;
        if !(h.ambient_timeout_secs > 0.0) {
            return Err(ConfigError::ValidationFailed("heater: ambient timeout must be positive"));
        }
        if !(h.regulation_timeout_secs > h.ambient_timeout_secs) {
            return Err(ConfigError::ValidationFailed(
                "heater: regulation timeout must exceed ambient timeout",
            ));
        }
        if !(h.ambient_temperature > s.no_power_temperature) {
            return Err(ConfigError::ValidationFailed(
                "heater: ambient temperature must be above sensor no-power threshold",
            ));
        }
        if !(h.overheat_temperature > h.ambient_temperature)
            || !(h.overheat_temperature < s.disconnect_temperature)
        {
            return Err(ConfigError::ValidationFailed(
                "heater: overheat temperature must sit between ambient and disconnect",
            ));
        }
        if !(h.at_target_band > 0.0) {
            return Err(ConfigError::ValidationFailed("heater: at_target_band must be positive"));
        }
        if !(h.pwm_frequency_hz > 0.0) {
            return Err(ConfigError::ValidationFailed("heater: pwm frequency must be positive"));
        }
        if let Some(sp) = h.autostart_setpoint {
            if !sp.is_finite() || sp >= h.overheat_temperature {
                return Err(ConfigError::ValidationFailed(
                    "heater: autostart setpoint must be below overheat temperature",
                ));
            }
        }

        let w = &self.pwm;
        if !(w.timer_clock_hz > 0.0) || w.min_resolution == 0 || w.min_resolution > w.max_resolution {
            return Err(ConfigError::ValidationFailed("pwm: invalid timer limits"));
        }

        if self.safety.alarm_blink_ms == 0 {
            return Err(ConfigError::ValidationFailed("safety: alarm_blink_ms must be non-zero"));
        }

        Ok(())
    }
}
