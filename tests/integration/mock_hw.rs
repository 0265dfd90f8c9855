//! Mock hardware for integration tests.
//!
//! A constant-temperature plant behind [`SensorPort`], a recording
//! actuator behind [`ActuatorPort`], and a hand-advanced clock.  Nothing
//! here touches the simulated peripherals in `drivers::hw_init`.

use std::cell::Cell;
use std::convert::Infallible;

use embedded_hal::digital::{ErrorType, OutputPin, StatefulOutputPin};

use heatctl::app::events::AppEvent;
use heatctl::app::ports::{ActuatorPort, ClockPort, EventSink, SensorPort};
use heatctl::app::service::ControllerService;
use heatctl::config::SystemConfig;
use heatctl::error::PwmError;
use heatctl::scheduler::{Dispatcher, PassReport};
use heatctl::sensors::Calibration;
use heatctl::tick::TickFlag;

// ── MockHardware ──────────────────────────────────────────────

pub struct MockHardware {
    pub raw: u16,
    pub enabled: bool,
    pub frequency_hz: Option<f32>,
    pub duty: f32,
    /// Every duty the controller applied, in order.
    pub duties: Vec<f32>,
    pub now_ms: Cell<u64>,
    calibration: Calibration,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn at(celsius: f32) -> Self {
        let calibration = Calibration::from_config(&SystemConfig::default().sensor);
        Self {
            raw: calibration.raw_for(celsius),
            enabled: false,
            frequency_hz: None,
            duty: 0.0,
            duties: Vec::new(),
            now_ms: Cell::new(0),
            calibration,
        }
    }

    pub fn set_temperature(&mut self, celsius: f32) {
        self.raw = self.calibration.raw_for(celsius);
    }

    /// Temperature the sensor filter will actually see.
    pub fn quantized_temperature(&self) -> f32 {
        self.calibration.apply(self.raw)
    }
}

impl SensorPort for MockHardware {
    fn read_raw(&mut self, _channel: u8) -> u16 {
        self.raw
    }
}

impl ActuatorPort for MockHardware {
    fn enable(&mut self, frequency_hz: f32) -> Result<(), PwmError> {
        self.enabled = true;
        self.frequency_hz = Some(frequency_hz);
        self.duty = 0.0;
        Ok(())
    }

    fn set_duty(&mut self, percent: f32) -> Result<(), PwmError> {
        if !self.enabled {
            return Err(PwmError::FrequencyNotSet);
        }
        self.duty = percent;
        self.duties.push(percent);
        Ok(())
    }

    fn disable(&mut self) {
        self.enabled = false;
        self.frequency_hz = None;
        self.duty = 0.0;
    }

    fn duty(&self) -> f32 {
        self.duty
    }
}

impl ClockPort for MockHardware {
    fn now_ms(&self) -> u64 {
        self.now_ms.get()
    }
}

// ── MockLed ───────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MockLed {
    pub lit: bool,
    pub toggles: u32,
}

impl ErrorType for MockLed {
    type Error = Infallible;
}

impl OutputPin for MockLed {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.lit = false;
        self.toggles += 1;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.lit = true;
        self.toggles += 1;
        Ok(())
    }
}

impl StatefulOutputPin for MockLed {
    fn is_set_high(&mut self) -> Result<bool, Infallible> {
        Ok(self.lit)
    }

    fn is_set_low(&mut self) -> Result<bool, Infallible> {
        Ok(!self.lit)
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }

    pub fn contains(&self, event: &AppEvent) -> bool {
        self.events.iter().any(|e| e == event)
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Rig ───────────────────────────────────────────────────────

pub type Service = ControllerService<MockHardware, MockLed, RecordingSink>;

/// A started service, its dispatcher, and the tick flag driving it.
pub struct Rig {
    pub svc: Service,
    pub dispatcher: Dispatcher<Service, 4>,
    pub flag: &'static TickFlag,
}

#[allow(dead_code)]
impl Rig {
    pub fn new(flag: &'static TickFlag, celsius: f32) -> Self {
        Self::with_config(flag, celsius, SystemConfig::default())
    }

    pub fn with_config(flag: &'static TickFlag, celsius: f32, config: SystemConfig) -> Self {
        let mut svc = ControllerService::new(
            config,
            flag,
            MockHardware::at(celsius),
            MockLed::default(),
            RecordingSink::default(),
        )
        .expect("default config validates");
        let dispatcher = svc.dispatcher::<4>().expect("two tasks fit");
        svc.start();
        Self {
            svc,
            dispatcher,
            flag,
        }
    }

    /// Raise one base tick, advance the clock by one interval, run a pass.
    pub fn tick(&mut self) -> PassReport {
        self.flag.on_timer_interrupt();
        let step = u64::from(self.svc.config().tick.base_interval_ms);
        let now = self.svc.hw().now_ms.get();
        self.svc.hw().now_ms.set(now + step);
        self.dispatcher.run_pass(&mut self.svc)
    }

    pub fn run_ticks(&mut self, n: usize) {
        for _ in 0..n {
            self.tick();
        }
    }

    pub fn hw(&self) -> &MockHardware {
        self.svc.hw()
    }

    pub fn events(&self) -> &RecordingSink {
        self.svc.sink()
    }
}
