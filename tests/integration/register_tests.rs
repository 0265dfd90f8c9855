//! Host register table driven against a live service.

use heatctl::app::ports::HeaterControl;
use heatctl::app::registers::*;
use heatctl::control::heater::HeaterMode;
use heatctl::error::{Error, HeaterFault, RegisterError, SystemAlarm};
use heatctl::sensors::temperature::SensorMode;
use heatctl::tick::TickFlag;

use super::mock_hw::Rig;

const BASE: u8 = COMMON_BLOCK_SIZE;

fn write_setpoint(table: &mut RegisterTable, rig: &mut Rig, celsius: f32) {
    let [hi, lo] = ((celsius * 10.0) as i16).to_be_bytes();
    table.write(BASE + REG_SETPOINT_HI, hi, &mut rig.svc).unwrap();
    table.write(BASE + REG_SETPOINT_LO, lo, &mut rig.svc).unwrap();
}

fn read_temperature(table: &RegisterTable, rig: &Rig) -> i16 {
    let hi = table.read(BASE + REG_TEMPERATURE_HI, &rig.svc).unwrap();
    let lo = table.read(BASE + REG_TEMPERATURE_LO, &rig.svc).unwrap();
    i16::from_be_bytes([hi, lo])
}

#[test]
fn host_starts_heater_through_registers() {
    static FLAG: TickFlag = TickFlag::new();
    let mut rig = Rig::new(&FLAG, 150.0);
    let mut table = RegisterTable::new();

    assert_eq!(read_temperature(&table, &rig), NO_READING);

    write_setpoint(&mut table, &mut rig, 160.0);
    assert_eq!(rig.svc.heater_mode(), HeaterMode::Off);
    table.write(BASE + REG_COMMAND, CMD_ON, &mut rig.svc).unwrap();
    assert_eq!(rig.svc.setpoint(), 160.0);

    rig.run_ticks(100);

    assert_eq!(
        table.read(BASE + REG_HEATER_MODE, &rig.svc),
        Ok(HeaterMode::Heating.code())
    );
    assert_eq!(table.read(BASE + REG_HEATER_CODE, &rig.svc), Ok(0));
    assert_eq!(table.read(BASE + REG_SENSOR_CODE, &rig.svc), Ok(0));
    assert_eq!(table.read(BASE + REG_COMMAND, &rig.svc), Ok(1));

    let tenths = read_temperature(&table, &rig);
    assert!((f32::from(tenths) / 10.0 - 150.0).abs() < 1.0, "got {tenths}");

    let duty = table.read(BASE + REG_DUTY, &rig.svc).unwrap();
    assert_eq!(duty, rig.hw().duty.round() as u8);

    table.write(BASE + REG_COMMAND, CMD_OFF, &mut rig.svc).unwrap();
    assert_eq!(rig.svc.heater_mode(), HeaterMode::Off);
    assert_eq!(table.read(BASE + REG_DUTY, &rig.svc), Ok(0));
}

#[test]
fn setpoint_at_overheat_is_refused() {
    static FLAG: TickFlag = TickFlag::new();
    let mut rig = Rig::new(&FLAG, 25.0);
    let mut table = RegisterTable::new();

    write_setpoint(&mut table, &mut rig, 300.0);
    assert_eq!(
        table.write(BASE + REG_COMMAND, CMD_ON, &mut rig.svc),
        Err(Error::InvalidSetpoint)
    );
    assert_eq!(rig.svc.heater_mode(), HeaterMode::Off);
}

#[test]
fn reinitialize_command_clears_latched_alarm() {
    static FLAG: TickFlag = TickFlag::new();
    let mut rig = Rig::new(&FLAG, 25.0);
    let mut table = RegisterTable::new();

    rig.svc.raise_alarm(SystemAlarm::External);
    assert_eq!(
        table.read(BASE + REG_HEATER_CODE, &rig.svc),
        Ok(HeaterFault::SystemAlarm.code())
    );

    write_setpoint(&mut table, &mut rig, 100.0);
    assert_eq!(
        table.write(BASE + REG_COMMAND, CMD_ON, &mut rig.svc),
        Err(Error::ShutdownLatched(Some(HeaterFault::SystemAlarm)))
    );

    table.write(BASE + REG_COMMAND, CMD_REINITIALIZE, &mut rig.svc).unwrap();
    assert_eq!(table.read(BASE + REG_HEATER_MODE, &rig.svc), Ok(HeaterMode::Off.code()));
    table.write(BASE + REG_COMMAND, CMD_ON, &mut rig.svc).unwrap();
    assert_eq!(rig.svc.heater_mode(), HeaterMode::Heating);
}

#[test]
fn status_registers_are_read_only() {
    static FLAG: TickFlag = TickFlag::new();
    let mut rig = Rig::new(&FLAG, 25.0);
    let mut table = RegisterTable::new();

    for reg in [
        REG_HEATER_MODE,
        REG_HEATER_CODE,
        REG_SENSOR_MODE,
        REG_SENSOR_CODE,
        REG_TEMPERATURE_HI,
        REG_TEMPERATURE_LO,
        REG_DUTY,
    ] {
        assert_eq!(
            table.write(BASE + reg, 0xFF, &mut rig.svc),
            Err(Error::Register(RegisterError::ReadOnly(BASE + reg)))
        );
    }
    assert_eq!(
        table.read(0xFF, &rig.svc),
        Err(RegisterError::InvalidAddress(0xFF))
    );
}

#[test]
fn sensor_mode_register_reports_data_during_regulation() {
    static FLAG: TickFlag = TickFlag::new();
    let mut rig = Rig::new(&FLAG, 100.0);
    let table = RegisterTable::new();
    rig.svc.turn_on(140.0).unwrap();

    rig.run_ticks(10);
    assert_eq!(
        table.read(BASE + REG_SENSOR_MODE, &rig.svc),
        Ok(SensorMode::Sampling.code())
    );

    // First reading lands; from here on it stays visible mid-sample.
    rig.run_ticks(10);
    for _ in 0..25 {
        rig.run_ticks(7);
        assert_eq!(
            table.read(BASE + REG_SENSOR_MODE, &rig.svc),
            Ok(SensorMode::HasData.code())
        );
    }
}
