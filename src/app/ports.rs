//! Port traits: the hexagonal boundary between control logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ControllerService (domain)
//! ```
//!
//! Driven adapters (ADC, PWM, clock, event sinks) implement these traits.
//! The [`ControllerService`](super::service::ControllerService) consumes
//! them via generics, so the control core never touches hardware directly.
//! [`HeaterControl`] points the other way: it is what the service offers to
//! the host register table and any other command source.

use crate::control::heater::HeaterMode;
use crate::error::{PwmError, Result};
use crate::sensors::temperature::SensorMode;

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Raw analog acquisition.  Calibration happens in the sensor filter.
pub trait SensorPort {
    /// One conversion on `channel`.  Must not block longer than a single
    /// conversion.
    fn read_raw(&mut self, channel: u8) -> u16;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Duty-cycle actuator.
pub trait ActuatorPort {
    /// Configure the output frequency and start with duty 0.
    fn enable(&mut self, frequency_hz: f32) -> core::result::Result<(), PwmError>;

    /// Duty in percent.  `0` is fully off, `100` fully on.
    fn set_duty(&mut self, percent: f32) -> core::result::Result<(), PwmError>;

    /// Output off.  A later `set_duty` requires `enable` first.
    fn disable(&mut self);

    /// Effective duty in percent.
    fn duty(&self) -> f32;
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic milliseconds since boot.
pub trait ClockPort {
    fn now_ms(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Heater control (driving side: host → domain)
// ───────────────────────────────────────────────────────────────

/// Named get/set operations offered to the host protocol layer.
pub trait HeaterControl {
    /// Start heating toward `setpoint` (°C).
    fn turn_on(&mut self, setpoint: f32) -> Result<()>;

    /// Stop heating.  A latched shutdown stays latched.
    fn turn_off(&mut self);

    /// Clear every latched fault and return to `Off`.
    fn reinitialize(&mut self);

    /// Last regulated temperature.
    fn temperature(&self) -> Option<f32>;

    fn setpoint(&self) -> f32;

    fn heater_mode(&self) -> HeaterMode;

    fn heater_code(&self) -> u8;

    fn sensor_mode(&self) -> SensorMode;

    fn sensor_code(&self) -> u8;

    /// Applied duty in percent.
    fn duty(&self) -> f32;
}
