//! Unified error and fault-code types for the heater controller.
//!
//! Two families live here:
//!
//! * **Errors**: returned from fallible calls (`Result<T>`): bad config,
//!   PWM misuse, register-table misuse, a full dispatch list, commands
//!   rejected because the heater is latched in shutdown.
//! * **Fault codes**: latched next to a component's mode and readable by
//!   the host (`SensorFault`, `HeaterFault`, `SystemAlarm`).  They never
//!   propagate as `Err`; the control path records them and keeps running.
//!
//! All types are `Copy` so they pass through the control loop without
//! allocation.

use core::fmt;

use serde::Serialize;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the crate funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Configuration constants are inconsistent.
    Config(ConfigError),
    /// The PWM actuator rejected a command.
    Pwm(PwmError),
    /// A host register access was rejected.
    Register(RegisterError),
    /// The dispatch list could not accept another task.
    Dispatch(DispatchError),
    /// The heater is latched in `Shutdown`; only re-initialization clears it.
    ShutdownLatched(Option<HeaterFault>),
    /// A setpoint was not finite or not below the overheat threshold.
    InvalidSetpoint,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Pwm(e) => write!(f, "pwm: {e}"),
            Self::Register(e) => write!(f, "register: {e}"),
            Self::Dispatch(e) => write!(f, "dispatch: {e}"),
            Self::ShutdownLatched(Some(code)) => write!(f, "heater shut down ({code})"),
            Self::ShutdownLatched(None) => write!(f, "heater shut down"),
            Self::InvalidSetpoint => write!(f, "invalid setpoint"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A field failed range or consistency validation.
    /// The `&'static str` names the field and the rule.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// PWM errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PwmError {
    /// Duty requested before any frequency was configured.
    FrequencyNotSet,
    /// Frequency was zero, negative or not finite.
    InvalidFrequency,
}

impl fmt::Display for PwmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FrequencyNotSet => write!(f, "frequency not set"),
            Self::InvalidFrequency => write!(f, "invalid frequency"),
        }
    }
}

impl From<PwmError> for Error {
    fn from(e: PwmError) -> Self {
        Self::Pwm(e)
    }
}

// ---------------------------------------------------------------------------
// Register-table errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterError {
    /// Address outside the device register block.
    InvalidAddress(u8),
    /// Write to a read-only register.
    ReadOnly(u8),
    /// Value written is not meaningful for the register.
    InvalidValue(u8),
}

impl fmt::Display for RegisterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidAddress(a) => write!(f, "invalid address 0x{a:02x}"),
            Self::ReadOnly(a) => write!(f, "register 0x{a:02x} is read-only"),
            Self::InvalidValue(v) => write!(f, "invalid value 0x{v:02x}"),
        }
    }
}

impl From<RegisterError> for Error {
    fn from(e: RegisterError) -> Self {
        Self::Register(e)
    }
}

// ---------------------------------------------------------------------------
// Dispatch errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError {
    /// Every task slot is taken.
    Full,
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "task list full"),
        }
    }
}

impl From<DispatchError> for Error {
    fn from(e: DispatchError) -> Self {
        Self::Dispatch(e)
    }
}

// ---------------------------------------------------------------------------
// Fault codes
// ---------------------------------------------------------------------------

/// Why the temperature sensor has no usable reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum SensorFault {
    /// Averaged reading above the disconnect threshold (open thermocouple).
    Disconnected = 1,
    /// Averaged reading below the no-power threshold (amplifier unpowered).
    NoPower = 2,
    /// A sample stayed outside the variance bound after every retry.
    /// Fatal: the sensor latches in `Shutdown`.
    BadReadings = 3,
}

impl SensorFault {
    /// Wire code for the host register table.
    pub const fn code(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for SensorFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "sensor disconnected"),
            Self::NoPower => write!(f, "sensor has no power"),
            Self::BadReadings => write!(f, "bad readings"),
        }
    }
}

/// Why the heater was forced into `Shutdown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum HeaterFault {
    /// Still below the ambient threshold after the ambient timeout.
    AmbientTimedOut = 1,
    /// Still below setpoint after the regulation timeout.
    RegulationTimedOut = 2,
    /// Measured temperature above the overheat threshold.
    Overheated = 3,
    /// The sensor latched a fatal sampling failure.
    SensorFailed = 4,
    /// The PWM output rejected a duty command.
    ActuatorFailed = 5,
    /// A scheduler-level alarm shut the whole machine down.
    SystemAlarm = 6,
}

impl HeaterFault {
    /// Wire code for the host register table.
    pub const fn code(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for HeaterFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AmbientTimedOut => write!(f, "ambient timed out"),
            Self::RegulationTimedOut => write!(f, "regulation timed out"),
            Self::Overheated => write!(f, "overheated"),
            Self::SensorFailed => write!(f, "sensor failed"),
            Self::ActuatorFailed => write!(f, "actuator failed"),
            Self::SystemAlarm => write!(f, "system alarm"),
        }
    }
}

/// Machine-wide alarms that stall the dispatch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum SystemAlarm {
    /// Too many base ticks fired before the previous one was consumed.
    TickOverrun = 1,
    /// Raised by another subsystem sharing the dispatch loop.
    External = 2,
}

impl SystemAlarm {
    pub const fn code(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for SystemAlarm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TickOverrun => write!(f, "tick overrun"),
            Self::External => write!(f, "external alarm"),
        }
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
