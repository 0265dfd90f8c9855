//! Outbound application events.
//!
//! The [`ControllerService`](super::service::ControllerService) emits these
//! through the [`EventSink`](super::ports::EventSink) port.  Adapters on the
//! other side decide what to do with them.

use serde::Serialize;

use crate::control::heater::HeaterMode;
use crate::error::{HeaterFault, SensorFault, SystemAlarm};
use crate::sensors::temperature::SensorMode;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The service has started (carries the initial heater mode).
    Started(HeaterMode),

    /// The heater moved between modes.
    HeaterStateChanged { from: HeaterMode, to: HeaterMode },

    /// The heater latched a shutdown.
    HeaterFaulted(HeaterFault),

    /// The sensor classified a reading as unusable.
    SensorFaulted(SensorFault),

    /// A system alarm is starving the dispatch loop.
    AlarmLatched(SystemAlarm),

    /// Periodic telemetry snapshot.
    Telemetry(TelemetryData),
}

/// A point-in-time telemetry snapshot suitable for logging or transmission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryData {
    pub uptime_secs: u64,
    pub heater_mode: HeaterMode,
    pub heater_code: u8,
    pub sensor_mode: SensorMode,
    pub sensor_code: u8,
    /// Last regulated temperature (°C).
    pub temperature: Option<f32>,
    pub setpoint: f32,
    /// Applied duty (%).
    pub duty: f32,
    pub tick_overruns: u32,
    /// Dispatch passes since boot.
    pub passes: u64,
    pub alarm: Option<SystemAlarm>,
}
