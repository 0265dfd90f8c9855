//! Heater state machine.
//!
//! Runs at the 100 ms cadence.  Owns the temperature sensor filter and the
//! PID controller and drives the actuator through [`ActuatorPort`].
//!
//! ```text
//!            turn_on()
//!   Off ─────────────────▶ Heating ◀──────────────┐
//!    ▲                        │   t ≥ sp − band     │ t < sp − 2·band
//!    │ reinitialize()         ▼                     │
//!    │                    AtTarget ─────────────────┘
//!    │                        │
//!    └──── Shutdown ◀─────────┘  timeout · overheat · sensor/actuator failure
//! ```
//!
//! `Shutdown` is latched: nothing but [`Heater::reinitialize`] leaves it.
//!
//! Both timeouts are measured on one elapsed timer that starts when a
//! heating attempt starts and advances only on periods that deliver a
//! reading.  A period without data waits; it never faults on its own.
//!
//! * **ambient**: still below the ambient threshold after
//!   `ambient_timeout_secs` (the element never started heating);
//! * **regulation**: still below setpoint after `regulation_timeout_secs`
//!   (heating, but too slowly).

use log::{error, info, warn};
use serde::Serialize;

use super::pid::PidController;
use crate::app::ports::{ActuatorPort, SensorPort};
use crate::config::SystemConfig;
use crate::error::{Error, HeaterFault, Result, SensorFault};
use crate::scheduler::PollStatus;
use crate::sensors::temperature::{SensorMode, TemperatureSensor};

/// Heater lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum HeaterMode {
    Off = 0,
    Heating = 1,
    AtTarget = 2,
    Shutdown = 3,
}

impl HeaterMode {
    pub const fn code(self) -> u8 {
        self as u8
    }

    pub const fn is_active(self) -> bool {
        matches!(self, Self::Heating | Self::AtTarget)
    }
}

pub struct Heater {
    mode: HeaterMode,
    fault: Option<HeaterFault>,
    setpoint: f32,
    temperature: Option<f32>,
    elapsed_secs: f32,

    period_secs: f32,
    ambient_timeout_secs: f32,
    regulation_timeout_secs: f32,
    ambient_temperature: f32,
    overheat_temperature: f32,
    at_target_band: f32,
    pwm_frequency_hz: f32,

    sensor: TemperatureSensor,
    pid: PidController,
}

impl Heater {
    pub fn new(config: &SystemConfig) -> Self {
        let h = &config.heater;
        Self {
            mode: HeaterMode::Off,
            fault: None,
            setpoint: 0.0,
            temperature: None,
            elapsed_secs: 0.0,
            period_secs: config.heater_period_secs(),
            ambient_timeout_secs: h.ambient_timeout_secs,
            regulation_timeout_secs: h.regulation_timeout_secs,
            ambient_temperature: h.ambient_temperature,
            overheat_temperature: h.overheat_temperature,
            at_target_band: h.at_target_band,
            pwm_frequency_hz: h.pwm_frequency_hz,
            sensor: TemperatureSensor::new(&config.sensor),
            pid: PidController::new(&config.pid),
        }
    }

    // ── Commands ──────────────────────────────────────────────

    /// Start a heating cycle toward `setpoint`.
    ///
    /// No-op while already heating.  Duty starts at zero and is computed
    /// by the PID loop on every heater period.
    pub fn turn_on(&mut self, setpoint: f32, out: &mut impl ActuatorPort) -> Result<()> {
        match self.mode {
            HeaterMode::Heating | HeaterMode::AtTarget => return Ok(()),
            HeaterMode::Shutdown => return Err(Error::ShutdownLatched(self.fault)),
            HeaterMode::Off => {}
        }
        if !setpoint.is_finite() || setpoint >= self.overheat_temperature {
            return Err(Error::InvalidSetpoint);
        }

        self.sensor.on();
        self.pid.reset();
        if let Err(e) = out.enable(self.pwm_frequency_hz) {
            self.turn_off(HeaterMode::Shutdown, Some(HeaterFault::ActuatorFailed), out);
            return Err(e.into());
        }

        self.setpoint = setpoint;
        self.temperature = None;
        self.elapsed_secs = 0.0;
        self.fault = None;
        self.mode = HeaterMode::Heating;
        info!("Heater: on, setpoint {:.1}", setpoint);
        Ok(())
    }

    /// Stop heating and move to `mode` with `fault` as the reason.
    ///
    /// The actuator is disabled in every case.  A latched `Shutdown` keeps
    /// the mode and fault it latched with.
    pub fn turn_off(
        &mut self,
        mode: HeaterMode,
        fault: Option<HeaterFault>,
        out: &mut impl ActuatorPort,
    ) {
        out.disable();
        self.sensor.off();

        if self.mode == HeaterMode::Shutdown {
            return;
        }
        match fault {
            Some(code) if mode == HeaterMode::Shutdown => {
                error!("Heater: shutdown ({code}) at {:?} after {:.1}s", self.temperature, self.elapsed_secs);
            }
            _ => info!("Heater: {:?} -> {:?}", self.mode, mode),
        }
        self.mode = mode;
        self.fault = fault;
    }

    /// Leave any state (including `Shutdown`) for a clean `Off`.
    pub fn reinitialize(&mut self, out: &mut impl ActuatorPort) {
        out.disable();
        self.sensor.reinitialize();
        self.sensor.off();
        self.pid.reset();
        self.pid.enable();
        self.mode = HeaterMode::Off;
        self.fault = None;
        self.temperature = None;
        self.elapsed_secs = 0.0;
        info!("Heater: reinitialized");
    }

    // ── Cadence handlers ──────────────────────────────────────

    /// Base cadence: feed one sample to the sensor filter.
    pub fn poll_sensor(&mut self, adc: &mut impl SensorPort) -> PollStatus {
        self.sensor.poll(adc)
    }

    /// 100 ms cadence: regulate and check for faults.
    pub fn poll(&mut self, out: &mut impl ActuatorPort) -> PollStatus {
        if !self.mode.is_active() {
            return PollStatus::NoOp;
        }

        if self.sensor.mode() == SensorMode::Shutdown {
            self.turn_off(HeaterMode::Shutdown, Some(HeaterFault::SensorFailed), out);
            return PollStatus::Proceed;
        }

        // Take the finished reading, then ask for the next one.
        let reading = self.sensor.take_reading();
        self.sensor.start_reading();

        let Some(t) = reading else {
            self.wait_for_data(out);
            return PollStatus::Proceed;
        };
        self.temperature = Some(t);
        if self.mode == HeaterMode::Heating {
            self.elapsed_secs += self.period_secs;
        }

        let duty = self.pid.compute(self.setpoint, t);
        if let Err(e) = out.set_duty(duty) {
            warn!("Heater: duty {:.1}% rejected: {}", duty, e);
            self.turn_off(HeaterMode::Shutdown, Some(HeaterFault::ActuatorFailed), out);
            return PollStatus::Proceed;
        }

        if t > self.overheat_temperature {
            self.turn_off(HeaterMode::Shutdown, Some(HeaterFault::Overheated), out);
            return PollStatus::Proceed;
        }

        match self.mode {
            HeaterMode::Heating => {
                if t < self.ambient_temperature && self.elapsed_secs > self.ambient_timeout_secs {
                    self.turn_off(HeaterMode::Shutdown, Some(HeaterFault::AmbientTimedOut), out);
                } else if t < self.setpoint && self.elapsed_secs > self.regulation_timeout_secs {
                    self.turn_off(HeaterMode::Shutdown, Some(HeaterFault::RegulationTimedOut), out);
                } else if t >= self.setpoint - self.at_target_band {
                    info!("Heater: at target ({:.1}) after {:.1}s", t, self.elapsed_secs);
                    self.mode = HeaterMode::AtTarget;
                }
            }
            HeaterMode::AtTarget => {
                if t < self.setpoint - 2.0 * self.at_target_band {
                    info!("Heater: fell to {:.1}, resuming heating", t);
                    self.mode = HeaterMode::Heating;
                    self.elapsed_secs = 0.0;
                }
            }
            HeaterMode::Off | HeaterMode::Shutdown => {}
        }
        PollStatus::Proceed
    }

    /// No reading this cycle.  A sensor that reported disconnected or
    /// unpowered gets no current until it reads normally again.
    fn wait_for_data(&mut self, out: &mut impl ActuatorPort) {
        if !matches!(
            self.sensor.fault(),
            Some(SensorFault::Disconnected | SensorFault::NoPower)
        ) {
            return;
        }
        if out.duty() > 0.0 && out.set_duty(0.0).is_err() {
            self.turn_off(HeaterMode::Shutdown, Some(HeaterFault::ActuatorFailed), out);
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn mode(&self) -> HeaterMode {
        self.mode
    }

    pub fn fault(&self) -> Option<HeaterFault> {
        self.fault
    }

    /// Host-visible fault code (0 = none).
    pub fn code(&self) -> u8 {
        self.fault.map_or(0, HeaterFault::code)
    }

    pub fn setpoint(&self) -> f32 {
        self.setpoint
    }

    /// Last temperature the regulator acted on.
    pub fn temperature(&self) -> Option<f32> {
        self.temperature
    }

    /// Seconds into the current heating attempt.
    pub fn elapsed_secs(&self) -> f32 {
        self.elapsed_secs
    }

    pub fn sensor(&self) -> &TemperatureSensor {
        &self.sensor
    }

    pub fn pid(&self) -> &PidController {
        &self.pid
    }
}
