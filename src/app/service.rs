//! Application service: the hexagonal core.
//!
//! [`ControllerService`] owns the tick source, the heater, the safety
//! supervisor and every port it talks through.  It is the context type the
//! [`Dispatcher`] runs its tasks against, so each task is a plain method
//! taking `&mut ControllerService`.
//!
//! ```text
//!  SensorPort ──▶ ┌──────────────────────────┐ ──▶ EventSink
//!                 │    ControllerService      │
//! ActuatorPort ◀──│  Tick · Heater · Safety   │ ──▶ status LED
//!                 └──────────────────────────┘
//!                          ▲
//!                 HeaterControl (host commands)
//! ```
//!
//! ## Standard task list
//!
//! | Priority | Task     | Returns `NotYetDone` when            |
//! |----------|----------|--------------------------------------|
//! | 0        | `safety` | a system alarm is latched            |
//! | 1        | `tick`   | never                                |
//!
//! Further tasks go after these on the same dispatcher.

use embedded_hal::digital::StatefulOutputPin;
use log::{debug, info, warn};

use crate::config::SystemConfig;
use crate::control::heater::{Heater, HeaterMode};
use crate::error::{Error, HeaterFault, Result, SensorFault, SystemAlarm};
use crate::safety::SafetySupervisor;
use crate::scheduler::{Dispatcher, PollStatus, Task};
use crate::sensors::temperature::SensorMode;
use crate::tick::{TickFlag, TickSource};

use super::events::{AppEvent, TelemetryData};
use super::ports::{ActuatorPort, ClockPort, EventSink, HeaterControl, SensorPort};

// ───────────────────────────────────────────────────────────────
// ControllerService
// ───────────────────────────────────────────────────────────────

pub struct ControllerService<H, L, E>
where
    H: SensorPort + ActuatorPort + ClockPort,
    L: StatefulOutputPin,
    E: EventSink,
{
    config: SystemConfig,
    flag: &'static TickFlag,
    ticks: TickSource,
    heater: Heater,
    safety: SafetySupervisor,
    hw: H,
    led: L,
    sink: E,
    /// Overrun total already reported.
    last_overruns: u32,
    last_sensor_fault: Option<SensorFault>,
    passes: u64,
    boot_ms: u64,
}

impl<H, L, E> ControllerService<H, L, E>
where
    H: SensorPort + ActuatorPort + ClockPort,
    L: StatefulOutputPin,
    E: EventSink,
{
    /// Build the service.  Fails if `config` does not validate.
    ///
    /// Does **not** emit anything; call [`start`](Self::start) next.
    pub fn new(
        config: SystemConfig,
        flag: &'static TickFlag,
        hw: H,
        led: L,
        sink: E,
    ) -> Result<Self> {
        config.validate()?;
        let boot_ms = hw.now_ms();
        // Overruns counted before the service existed are not its budget.
        let overruns = flag.overruns();
        let mut safety = SafetySupervisor::new(&config.safety);
        safety.clear(overruns);
        Ok(Self {
            ticks: TickSource::new(&config.tick),
            heater: Heater::new(&config),
            safety,
            last_overruns: overruns,
            last_sensor_fault: None,
            passes: 0,
            boot_ms,
            config,
            flag,
            hw,
            led,
            sink,
        })
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Announce the service and apply the configured autostart setpoint.
    pub fn start(&mut self) {
        self.sink.emit(&AppEvent::Started(self.heater.mode()));
        info!("ControllerService started in {:?}", self.heater.mode());

        if let Some(setpoint) = self.config.heater.autostart_setpoint {
            if let Err(e) = HeaterControl::turn_on(self, setpoint) {
                warn!("Autostart at {:.1} rejected: {}", setpoint, e);
            }
        }
    }

    /// Build the standard dispatch list.
    pub fn dispatcher<const N: usize>(&self) -> Result<Dispatcher<Self, N>> {
        let mut d = Dispatcher::new();
        d.register(Task::new("safety", Self::poll_safety))?;
        d.register(Task::new("tick", Self::poll_tick))?;
        Ok(d)
    }

    // ── Dispatch tasks ────────────────────────────────────────

    /// Shutdown idler.  Blocks the rest of the pass while an alarm is latched.
    pub fn poll_safety(&mut self) -> PollStatus {
        self.passes = self.passes.wrapping_add(1);
        let now = self.hw.now_ms();
        self.safety.poll(now, &mut self.led)
    }

    /// Tick consumer.  Fans one base tick out to the cadence handlers.
    pub fn poll_tick(&mut self) -> PollStatus {
        let Some(cadence) = self.ticks.poll(self.flag) else {
            return PollStatus::NoOp;
        };

        self.check_overruns();

        if cadence.base {
            self.on_base_tick();
        }
        if cadence.hundred_ms {
            self.on_hundred_ms();
        }
        if cadence.one_second {
            self.on_one_second();
        }
        PollStatus::Proceed
    }

    fn on_base_tick(&mut self) {
        self.heater.poll_sensor(&mut self.hw);

        let fault = self.heater.sensor().fault();
        if fault != self.last_sensor_fault {
            if let Some(f) = fault {
                warn!("Sensor: {} (code {})", f, f.code());
                self.sink.emit(&AppEvent::SensorFaulted(f));
            }
            self.last_sensor_fault = fault;
        }
    }

    fn on_hundred_ms(&mut self) {
        let before = self.heater.mode();
        self.heater.poll(&mut self.hw);
        self.report_transition(before);
    }

    fn on_one_second(&mut self) {
        if self.led.toggle().is_err() {
            debug!("heartbeat LED toggle failed");
        }
        let telemetry = self.build_telemetry();
        self.sink.emit(&AppEvent::Telemetry(telemetry));
    }

    // ── Alarms ────────────────────────────────────────────────

    fn check_overruns(&mut self) {
        let total = self.flag.overruns();
        if total == self.last_overruns {
            return;
        }
        warn!(
            "Tick overrun: {} missed (total {})",
            total.wrapping_sub(self.last_overruns),
            total
        );
        self.last_overruns = total;

        if let Some(alarm) = self.safety.check_overruns(total) {
            self.enter_alarm(alarm);
        }
    }

    /// Latch a system alarm on behalf of another subsystem.
    ///
    /// Returns `false` if an alarm was already latched.
    pub fn raise_alarm(&mut self, alarm: SystemAlarm) -> bool {
        if !self.safety.latch(alarm) {
            return false;
        }
        self.enter_alarm(alarm);
        true
    }

    fn enter_alarm(&mut self, alarm: SystemAlarm) {
        let before = self.heater.mode();
        self.heater
            .turn_off(HeaterMode::Shutdown, Some(HeaterFault::SystemAlarm), &mut self.hw);
        self.sink.emit(&AppEvent::AlarmLatched(alarm));
        self.report_transition(before);
    }

    fn report_transition(&mut self, before: HeaterMode) {
        let after = self.heater.mode();
        if after == before {
            return;
        }
        self.sink.emit(&AppEvent::HeaterStateChanged {
            from: before,
            to: after,
        });
        if after == HeaterMode::Shutdown {
            if let Some(fault) = self.heater.fault() {
                self.sink.emit(&AppEvent::HeaterFaulted(fault));
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────

    /// Build a telemetry snapshot from the current state.
    pub fn build_telemetry(&self) -> TelemetryData {
        TelemetryData {
            uptime_secs: self.hw.now_ms().saturating_sub(self.boot_ms) / 1000,
            heater_mode: self.heater.mode(),
            heater_code: self.heater.code(),
            sensor_mode: self.heater.sensor().mode(),
            sensor_code: self.heater.sensor().code(),
            temperature: self.heater.temperature(),
            setpoint: self.heater.setpoint(),
            duty: ActuatorPort::duty(&self.hw),
            tick_overruns: self.flag.overruns(),
            passes: self.passes,
            alarm: self.safety.alarm(),
        }
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    pub fn heater(&self) -> &Heater {
        &self.heater
    }

    pub fn safety(&self) -> &SafetySupervisor {
        &self.safety
    }

    /// Base ticks consumed since boot.
    pub fn ticks(&self) -> u64 {
        self.ticks.ticks()
    }

    /// Dispatch passes since boot.
    pub fn passes(&self) -> u64 {
        self.passes
    }

    pub fn hw(&self) -> &H {
        &self.hw
    }

    pub fn hw_mut(&mut self) -> &mut H {
        &mut self.hw
    }

    pub fn led(&self) -> &L {
        &self.led
    }

    pub fn sink(&self) -> &E {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut E {
        &mut self.sink
    }
}

// ───────────────────────────────────────────────────────────────
// Host operations
// ───────────────────────────────────────────────────────────────

impl<H, L, E> HeaterControl for ControllerService<H, L, E>
where
    H: SensorPort + ActuatorPort + ClockPort,
    L: StatefulOutputPin,
    E: EventSink,
{
    fn turn_on(&mut self, setpoint: f32) -> Result<()> {
        if let Some(alarm) = self.safety.alarm() {
            warn!("turn_on refused: alarm {} latched", alarm);
            return Err(Error::ShutdownLatched(Some(HeaterFault::SystemAlarm)));
        }
        let before = self.heater.mode();
        let result = self.heater.turn_on(setpoint, &mut self.hw);
        self.report_transition(before);
        result
    }

    fn turn_off(&mut self) {
        let before = self.heater.mode();
        self.heater.turn_off(HeaterMode::Off, None, &mut self.hw);
        self.report_transition(before);
    }

    fn reinitialize(&mut self) {
        let before = self.heater.mode();
        self.heater.reinitialize(&mut self.hw);
        let overruns = self.flag.overruns();
        self.safety.clear(overruns);
        self.last_overruns = overruns;
        self.last_sensor_fault = None;
        self.report_transition(before);
    }

    fn temperature(&self) -> Option<f32> {
        self.heater.temperature()
    }

    fn setpoint(&self) -> f32 {
        self.heater.setpoint()
    }

    fn heater_mode(&self) -> HeaterMode {
        self.heater.mode()
    }

    fn heater_code(&self) -> u8 {
        self.heater.code()
    }

    fn sensor_mode(&self) -> SensorMode {
        self.heater.sensor().mode()
    }

    fn sensor_code(&self) -> u8 {
        self.heater.sensor().code()
    }

    fn duty(&self) -> f32 {
        ActuatorPort::duty(&self.hw)
    }
}
