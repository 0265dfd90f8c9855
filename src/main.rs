//! heatctl firmware entry point.
//!
//! Hexagonal architecture around a cooperative dispatch loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter            LogEventSink       StatusLed       │
//! │  (Sensor+Actuator+Clock)    (EventSink)        (embedded-hal)  │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │          ControllerService (pure logic)                │    │
//! │  │  Tick · Sensor filter · PID · Heater · Safety          │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  esp_timer ──▶ SYSTEM_TICK ──▶ Dispatcher (safety, tick, ...)  │
//! └────────────────────────────────────────────────────────────────┘
//! ```

#![deny(unused_must_use)]

use anyhow::{Context, Result};
use log::info;

use heatctl::adapters::hardware::HardwareAdapter;
use heatctl::adapters::log_sink::LogEventSink;
use heatctl::app::service::ControllerService;
use heatctl::config::SystemConfig;
use heatctl::drivers::status_led::StatusLed;
use heatctl::drivers::{hw_init, hw_timer, watchdog::Watchdog};
use heatctl::pins;
use heatctl::tick::SYSTEM_TICK;

/// Dispatch slots; two are taken by the service itself.
const MAX_TASKS: usize = 8;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  heatctl v{}                        ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration ──────────────────────────────────────
    let config = SystemConfig::default();
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;

    // ── 3. Peripherals ────────────────────────────────────────
    hw_init::init_peripherals(config.sensor.adc_channel).context("peripheral init")?;
    info!(
        "Thermocouple on GPIO{} (ADC1 CH{}), heater on GPIO{}",
        pins::THERMOCOUPLE_ADC_GPIO,
        config.sensor.adc_channel,
        pins::HEATER_PWM_GPIO
    );

    let hw = HardwareAdapter::new(&config.pwm);
    let led = StatusLed::new(pins::STATUS_LED_GPIO);
    let sink = LogEventSink::new();

    // ── 4. Service + dispatcher ───────────────────────────────
    let tick_ms = config.tick.base_interval_ms;
    let mut service = ControllerService::new(config, &SYSTEM_TICK, hw, led, sink)
        .map_err(|e| anyhow::anyhow!("service init: {e}"))?;
    let mut dispatcher = service
        .dispatcher::<MAX_TASKS>()
        .map_err(|e| anyhow::anyhow!("dispatcher init: {e}"))?;
    info!(
        "Dispatch list: {:?}",
        dispatcher.task_names().collect::<heapless::Vec<_, MAX_TASKS>>()
    );

    let watchdog = Watchdog::new();
    service.start();

    // ── 5. Go ─────────────────────────────────────────────────
    hw_timer::start_tick_timer(tick_ms).context("tick timer")?;

    dispatcher.run_forever(&mut service, |report| {
        watchdog.feed();
        if let Some(task) = report.blocked_by {
            log::trace!("pass blocked by {}", task);
        }
    })
}
