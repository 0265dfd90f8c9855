//! Integration tests for the tick → heater → actuator pipeline.
//!
//! Each test owns its own `static` tick flag; the dispatcher and service
//! are driven one base tick at a time through [`Rig`].

use heatctl::app::events::AppEvent;
use heatctl::app::ports::HeaterControl;
use heatctl::control::heater::HeaterMode;
use heatctl::error::{Error, HeaterFault, SensorFault, SystemAlarm};
use heatctl::sensors::temperature::SensorMode;
use heatctl::tick::TickFlag;

use super::mock_hw::Rig;

// ── Normal operation ──────────────────────────────────────────

#[test]
fn reaches_target_and_reports_every_second() {
    static FLAG: TickFlag = TickFlag::new();
    let mut rig = Rig::new(&FLAG, 139.0);
    rig.svc.turn_on(140.0).unwrap();
    assert!(rig.hw().enabled);
    assert_eq!(rig.hw().frequency_hz, Some(1000.0));

    rig.run_ticks(300);

    assert_eq!(rig.svc.heater_mode(), HeaterMode::AtTarget);
    assert_eq!(rig.svc.sensor_mode(), SensorMode::HasData);
    assert!(rig.hw().duty > 0.0);

    let sink = rig.events();
    assert!(sink.contains(&AppEvent::HeaterStateChanged {
        from: HeaterMode::Off,
        to: HeaterMode::Heating,
    }));
    assert!(sink.contains(&AppEvent::HeaterStateChanged {
        from: HeaterMode::Heating,
        to: HeaterMode::AtTarget,
    }));
    assert_eq!(sink.count(|e| matches!(e, AppEvent::Telemetry(_))), 3);
    assert_eq!(rig.svc.led().toggles, 3);
}

#[test]
fn telemetry_snapshot_tracks_controller_state() {
    static FLAG: TickFlag = TickFlag::new();
    let mut rig = Rig::new(&FLAG, 100.0);
    rig.svc.turn_on(150.0).unwrap();
    rig.run_ticks(100);

    let last = rig
        .events()
        .events
        .iter()
        .rev()
        .find_map(|e| match e {
            AppEvent::Telemetry(t) => Some(t.clone()),
            _ => None,
        })
        .expect("one telemetry event after 1 s");

    assert_eq!(last.uptime_secs, 1);
    assert_eq!(last.heater_mode, HeaterMode::Heating);
    assert_eq!(last.setpoint, 150.0);
    assert_eq!(last.passes, 100);
    assert_eq!(last.tick_overruns, 0);
    assert_eq!(last.alarm, None);
    let t = last.temperature.expect("reading available after 1 s");
    assert!((t - rig.hw().quantized_temperature()).abs() < 0.01);
}

#[test]
fn turn_off_and_back_on_restarts_cleanly() {
    static FLAG: TickFlag = TickFlag::new();
    let mut rig = Rig::new(&FLAG, 80.0);
    rig.svc.turn_on(140.0).unwrap();
    rig.run_ticks(200);
    assert!(rig.svc.heater().pid().integral() > 0.0);

    rig.svc.turn_off();
    assert_eq!(rig.svc.heater_mode(), HeaterMode::Off);
    assert!(!rig.hw().enabled);
    assert_eq!(rig.svc.duty(), 0.0);

    // Off: the tick task keeps running but the heater stays idle.
    let applied = rig.hw().duties.len();
    rig.run_ticks(50);
    assert_eq!(rig.hw().duties.len(), applied);

    rig.svc.turn_on(140.0).unwrap();
    assert_eq!(rig.svc.heater().pid().integral(), 0.0);
    assert_eq!(rig.svc.heater().pid().prev_error(), 0.0);
}

// ── Faults ────────────────────────────────────────────────────

#[test]
fn ambient_timeout_shuts_down_with_output_off() {
    static FLAG: TickFlag = TickFlag::new();
    let mut rig = Rig::new(&FLAG, 25.0);
    rig.svc.turn_on(140.0).unwrap();

    // 89 s in: still trying.
    rig.run_ticks(8_900);
    assert_eq!(rig.svc.heater_mode(), HeaterMode::Heating);
    assert!(rig.hw().duty > 0.0);

    rig.run_ticks(200);
    assert_eq!(rig.svc.heater_mode(), HeaterMode::Shutdown);
    assert_eq!(rig.svc.heater_code(), HeaterFault::AmbientTimedOut.code());
    assert!(!rig.hw().enabled);
    assert_eq!(rig.hw().duty, 0.0);
    assert!(rig.events().contains(&AppEvent::HeaterFaulted(HeaterFault::AmbientTimedOut)));

    assert_eq!(
        rig.svc.turn_on(140.0),
        Err(Error::ShutdownLatched(Some(HeaterFault::AmbientTimedOut)))
    );
    rig.svc.reinitialize();
    assert_eq!(rig.svc.heater_mode(), HeaterMode::Off);
    assert_eq!(rig.svc.heater_code(), 0);
}

#[test]
fn disconnected_probe_is_reported_once_and_gets_no_current() {
    static FLAG: TickFlag = TickFlag::new();
    let mut rig = Rig::new(&FLAG, 120.0);
    rig.svc.turn_on(140.0).unwrap();
    rig.run_ticks(30);
    assert!(rig.hw().duty > 0.0);

    rig.svc.hw_mut().set_temperature(450.0);
    rig.run_ticks(100);

    assert_eq!(rig.svc.sensor_code(), SensorFault::Disconnected.code());
    assert_eq!(rig.hw().duty, 0.0);
    assert_eq!(rig.svc.heater_mode(), HeaterMode::Heating);
    assert_eq!(
        rig.events()
            .count(|e| *e == AppEvent::SensorFaulted(SensorFault::Disconnected)),
        1
    );
}

#[test]
fn probe_lost_after_two_minutes_of_regulation_is_not_an_ambient_timeout() {
    static FLAG: TickFlag = TickFlag::new();
    let mut rig = Rig::new(&FLAG, 120.0);
    rig.svc.turn_on(140.0).unwrap();
    rig.run_ticks(12_000);
    assert_eq!(rig.svc.heater_mode(), HeaterMode::Heating);
    let elapsed = rig.svc.heater().elapsed_secs();
    assert!(elapsed > 90.0);

    rig.svc.hw_mut().set_temperature(450.0);
    rig.run_ticks(2_000);

    assert_eq!(rig.svc.sensor_code(), SensorFault::Disconnected.code());
    assert_eq!(rig.svc.heater_mode(), HeaterMode::Heating);
    assert_eq!(rig.svc.heater_code(), 0);
    assert!(rig.hw().enabled);
    assert_eq!(rig.hw().duty, 0.0);
    assert_eq!(rig.svc.heater().elapsed_secs(), elapsed);
    assert_eq!(rig.events().count(|e| matches!(e, AppEvent::HeaterFaulted(_))), 0);
}

#[test]
fn amplifier_power_loss_at_target_cuts_current_and_recovers() {
    static FLAG: TickFlag = TickFlag::new();
    let mut rig = Rig::new(&FLAG, 139.0);
    rig.svc.turn_on(140.0).unwrap();
    rig.run_ticks(100);
    assert_eq!(rig.svc.heater_mode(), HeaterMode::AtTarget);

    rig.svc.hw_mut().set_temperature(-20.0);
    rig.run_ticks(100);
    assert_eq!(rig.svc.sensor_code(), SensorFault::NoPower.code());
    assert_eq!(rig.svc.sensor_mode(), SensorMode::Sampling);
    assert_eq!(rig.svc.heater_mode(), HeaterMode::AtTarget);
    assert_eq!(rig.hw().duty, 0.0);
    assert!(rig.events().contains(&AppEvent::SensorFaulted(SensorFault::NoPower)));

    rig.svc.hw_mut().set_temperature(139.0);
    rig.run_ticks(20);
    assert_eq!(rig.svc.sensor_mode(), SensorMode::HasData);
    assert_eq!(rig.svc.sensor_code(), 0);
    assert_eq!(rig.svc.heater_mode(), HeaterMode::AtTarget);
    assert!(rig.hw().duty > 0.0);
}

#[test]
fn sensor_noise_latches_shutdown() {
    static FLAG: TickFlag = TickFlag::new();
    let mut rig = Rig::new(&FLAG, 100.0);
    rig.svc.turn_on(140.0).unwrap();
    rig.run_ticks(13);

    // Mid-reading jump far beyond the variance window.
    rig.svc.hw_mut().set_temperature(250.0);
    rig.run_ticks(20);

    assert_eq!(rig.svc.sensor_mode(), SensorMode::Shutdown);
    assert_eq!(rig.svc.sensor_code(), SensorFault::BadReadings.code());
    assert_eq!(rig.svc.heater_mode(), HeaterMode::Shutdown);
    assert_eq!(rig.svc.heater_code(), HeaterFault::SensorFailed.code());
    assert!(!rig.hw().enabled);
}

// ── Scheduler-level containment ───────────────────────────────

#[test]
fn tick_overruns_latch_alarm_and_starve_the_tick_task() {
    static FLAG: TickFlag = TickFlag::new();
    let mut rig = Rig::new(&FLAG, 100.0);
    rig.svc.turn_on(140.0).unwrap();

    // The loop stalls: 102 timer events, one consumer pass.
    for _ in 0..102 {
        FLAG.on_timer_interrupt();
    }
    assert_eq!(FLAG.overruns(), 101);
    let report = rig.dispatcher.run_pass(&mut rig.svc);
    assert_eq!(report.blocked_by, None);

    assert_eq!(rig.svc.safety().alarm(), Some(SystemAlarm::TickOverrun));
    assert_eq!(rig.svc.heater_mode(), HeaterMode::Shutdown);
    assert_eq!(rig.svc.heater_code(), HeaterFault::SystemAlarm.code());
    assert!(!rig.hw().enabled);
    assert!(rig.events().contains(&AppEvent::AlarmLatched(SystemAlarm::TickOverrun)));

    // From now on the safety idler owns every pass.
    let ticks_before = rig.svc.ticks();
    for _ in 0..5 {
        let report = rig.tick();
        assert_eq!(report.blocked_by, Some("safety"));
        assert_eq!(report.invoked, 1);
    }
    assert_eq!(rig.svc.ticks(), ticks_before);
    assert!(rig.svc.led().toggles >= 1);
    assert_eq!(
        rig.svc.turn_on(140.0),
        Err(Error::ShutdownLatched(Some(HeaterFault::SystemAlarm)))
    );

    rig.svc.reinitialize();
    assert!(!rig.svc.safety().is_latched());
    let report = rig.tick();
    assert_eq!(report.blocked_by, None);
    assert_eq!(rig.svc.ticks(), ticks_before + 1);
    assert!(rig.svc.turn_on(140.0).is_ok());
}

#[test]
fn overruns_before_construction_do_not_count_against_the_budget() {
    static FLAG: TickFlag = TickFlag::new();
    for _ in 0..151 {
        FLAG.on_timer_interrupt();
    }
    assert_eq!(FLAG.overruns(), 150);

    let mut rig = Rig::new(&FLAG, 100.0);
    let report = rig.tick();
    assert_eq!(report.blocked_by, None);
    assert!(!rig.svc.safety().is_latched());
    assert_eq!(rig.svc.heater_mode(), HeaterMode::Off);
    assert!(!rig.events().contains(&AppEvent::AlarmLatched(SystemAlarm::TickOverrun)));
}

#[test]
fn external_alarm_from_another_subsystem() {
    static FLAG: TickFlag = TickFlag::new();
    let mut rig = Rig::new(&FLAG, 100.0);
    assert!(rig.svc.raise_alarm(SystemAlarm::External));
    assert!(!rig.svc.raise_alarm(SystemAlarm::TickOverrun));
    assert_eq!(rig.svc.heater_mode(), HeaterMode::Shutdown);

    let report = rig.tick();
    assert_eq!(report.blocked_by, Some("safety"));
}

#[test]
fn autostart_setpoint_turns_heater_on() {
    static FLAG: TickFlag = TickFlag::new();
    let mut cfg = heatctl::config::SystemConfig::default();
    cfg.heater.autostart_setpoint = Some(120.0);
    let rig = Rig::with_config(&FLAG, 30.0, cfg);

    assert_eq!(rig.svc.heater_mode(), HeaterMode::Heating);
    assert_eq!(rig.svc.setpoint(), 120.0);
    assert_eq!(
        rig.events().events.first(),
        Some(&AppEvent::Started(HeaterMode::Off))
    );
}
