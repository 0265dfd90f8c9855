//! Byte-addressable host register table.
//!
//! The host bus reserves the first [`COMMON_BLOCK_SIZE`] addresses for the
//! protocol layer itself; device registers start right after it.
//!
//! | Offset | Name            | Access | Encoding                              |
//! |--------|-----------------|--------|---------------------------------------|
//! | 0      | heater mode     | R      | [`HeaterMode::code`]                  |
//! | 1      | heater code     | R      | [`HeaterFault::code`], 0 = none       |
//! | 2      | sensor mode     | R      | [`SensorMode::code`]                  |
//! | 3      | sensor code     | R      | [`SensorFault::code`], 0 = none       |
//! | 4..=5  | temperature     | R      | i16 BE, 0.1 °C; `0x8000` = no reading |
//! | 6..=7  | setpoint        | RW     | i16 BE, 0.1 °C (staged)               |
//! | 8      | command         | RW     | 1 = on, 0 = off, `0xA5` = reinit      |
//! | 9      | duty            | R      | percent, rounded                      |
//!
//! Writing the setpoint only stages it.  The heater picks it up on the
//! next "on" command.
//!
//! [`HeaterMode::code`]: crate::control::heater::HeaterMode::code
//! [`HeaterFault::code`]: crate::error::HeaterFault::code
//! [`SensorMode::code`]: crate::sensors::temperature::SensorMode::code
//! [`SensorFault::code`]: crate::error::SensorFault::code

use log::debug;

use super::ports::HeaterControl;
use crate::error::{RegisterError, Result};

/// Addresses owned by the protocol layer.
pub const COMMON_BLOCK_SIZE: u8 = 0x10;

pub const REG_HEATER_MODE: u8 = 0;
pub const REG_HEATER_CODE: u8 = 1;
pub const REG_SENSOR_MODE: u8 = 2;
pub const REG_SENSOR_CODE: u8 = 3;
pub const REG_TEMPERATURE_HI: u8 = 4;
pub const REG_TEMPERATURE_LO: u8 = 5;
pub const REG_SETPOINT_HI: u8 = 6;
pub const REG_SETPOINT_LO: u8 = 7;
pub const REG_COMMAND: u8 = 8;
pub const REG_DUTY: u8 = 9;

/// Number of device registers.
pub const DEVICE_REGISTER_COUNT: u8 = 10;

pub const CMD_OFF: u8 = 0x00;
pub const CMD_ON: u8 = 0x01;
pub const CMD_REINITIALIZE: u8 = 0xA5;

/// Reported when no temperature reading is available.
pub const NO_READING: i16 = i16::MIN;

#[derive(Debug, Clone, Default)]
pub struct RegisterTable {
    staged_setpoint: [u8; 2],
}

impl RegisterTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read one byte at bus address `addr`.
    pub fn read(
        &self,
        addr: u8,
        ctl: &impl HeaterControl,
    ) -> core::result::Result<u8, RegisterError> {
        let reg = Self::device_offset(addr)?;
        let temperature = ctl.temperature().map_or(NO_READING, to_tenths).to_be_bytes();

        let value = match reg {
            REG_HEATER_MODE => ctl.heater_mode().code(),
            REG_HEATER_CODE => ctl.heater_code(),
            REG_SENSOR_MODE => ctl.sensor_mode().code(),
            REG_SENSOR_CODE => ctl.sensor_code(),
            REG_TEMPERATURE_HI => temperature[0],
            REG_TEMPERATURE_LO => temperature[1],
            REG_SETPOINT_HI => self.staged_setpoint[0],
            REG_SETPOINT_LO => self.staged_setpoint[1],
            REG_COMMAND => u8::from(ctl.heater_mode().is_active()),
            REG_DUTY => ctl.duty().clamp(0.0, 100.0).round() as u8,
            _ => return Err(RegisterError::InvalidAddress(addr)),
        };
        Ok(value)
    }

    /// Write one byte at bus address `addr`.
    ///
    /// Command writes are executed immediately against `ctl`; their
    /// failures (latched shutdown, bad setpoint) come back as `Err`.
    pub fn write(&mut self, addr: u8, value: u8, ctl: &mut impl HeaterControl) -> Result<()> {
        let reg = Self::device_offset(addr)?;
        match reg {
            REG_SETPOINT_HI => self.staged_setpoint[0] = value,
            REG_SETPOINT_LO => self.staged_setpoint[1] = value,
            REG_COMMAND => match value {
                CMD_ON => {
                    let setpoint = self.staged_setpoint();
                    debug!("registers: on at {:.1}", setpoint);
                    ctl.turn_on(setpoint)?;
                }
                CMD_OFF => ctl.turn_off(),
                CMD_REINITIALIZE => ctl.reinitialize(),
                other => return Err(RegisterError::InvalidValue(other).into()),
            },
            _ => return Err(RegisterError::ReadOnly(addr).into()),
        }
        Ok(())
    }

    /// The staged setpoint in °C.
    pub fn staged_setpoint(&self) -> f32 {
        f32::from(i16::from_be_bytes(self.staged_setpoint)) / 10.0
    }

    fn device_offset(addr: u8) -> core::result::Result<u8, RegisterError> {
        match addr.checked_sub(COMMON_BLOCK_SIZE) {
            Some(reg) if reg < DEVICE_REGISTER_COUNT => Ok(reg),
            _ => Err(RegisterError::InvalidAddress(addr)),
        }
    }
}

fn to_tenths(celsius: f32) -> i16 {
    // NO_READING stays reserved.
    (celsius * 10.0).round().clamp(f32::from(i16::MIN + 1), f32::from(i16::MAX)) as i16
}
