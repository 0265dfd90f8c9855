//! Thermocouple temperature sensor filter.
//!
//! Collects `samples_per_reading` calibrated samples per reading at the
//! base cadence, rejecting outliers against the last accepted sample.
//!
//! ```text
//!   Off ──on()──▶ Idle ──start_reading()──▶ Sampling ──N samples──▶ HasData
//!                  ▲                           │                       │
//!                  └── disconnected/no power ──┘   start_reading() ◀───┘
//!
//!   Sampling ──retries exhausted──▶ Shutdown (latched, BadReadings)
//! ```
//!
//! `HasData` is kept while the next reading accumulates, so the last good
//! reading stays visible until a newer one replaces or faults it.  Each
//! completed reading is handed out once by [`TemperatureSensor::take_reading`].
//!
//! A sample further than `variance` from the previous accepted one is
//! re-sampled up to `retries` times.  A reading that cannot be completed
//! within that budget is treated as a hardware failure, not retried forever.

use log::{debug, error, trace, warn};
use serde::Serialize;

use super::Calibration;
use crate::app::ports::SensorPort;
use crate::config::SensorConfig;
use crate::error::SensorFault;
use crate::scheduler::PollStatus;

/// Sensor lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum SensorMode {
    Off = 0,
    /// On, but holding no usable reading.
    Idle = 1,
    /// A reading is being accumulated.
    Sampling = 2,
    /// The last reading completed and classified as normal.
    HasData = 3,
    /// Fatal sampling failure; only `reinitialize()` leaves this.
    Shutdown = 4,
}

impl SensorMode {
    pub const fn code(self) -> u8 {
        self as u8
    }
}

pub struct TemperatureSensor {
    mode: SensorMode,
    fault: Option<SensorFault>,
    calibration: Calibration,
    channel: u8,

    samples_taken: u8,
    samples_target: u8,
    accumulator: f32,
    last_accepted: f32,
    retries: u8,
    variance: f32,

    disconnect_temperature: f32,
    no_power_temperature: f32,

    /// A reading is being accumulated (also while `HasData`).
    sampling: bool,
    /// The `HasData` reading has not been taken yet.
    fresh: bool,

    /// Mean of the last completed reading, whatever its classification.
    mean: Option<f32>,
}

impl TemperatureSensor {
    pub fn new(cfg: &SensorConfig) -> Self {
        Self {
            mode: SensorMode::Idle,
            fault: None,
            calibration: Calibration::from_config(cfg),
            channel: cfg.adc_channel,
            samples_taken: 0,
            samples_target: cfg.samples_per_reading,
            accumulator: 0.0,
            last_accepted: 0.0,
            retries: cfg.retries,
            variance: cfg.variance,
            disconnect_temperature: cfg.disconnect_temperature,
            no_power_temperature: cfg.no_power_temperature,
            sampling: false,
            fresh: false,
            mean: None,
        }
    }

    // ── Commands ──────────────────────────────────────────────

    pub fn on(&mut self) {
        if self.mode == SensorMode::Off {
            self.mode = SensorMode::Idle;
        }
    }

    /// Stop sampling.  A latched `Shutdown` is kept.
    pub fn off(&mut self) {
        self.sampling = false;
        self.fresh = false;
        if self.mode != SensorMode::Shutdown {
            self.mode = SensorMode::Off;
        }
    }

    /// Return to the power-on state, clearing any latched failure.
    pub fn reinitialize(&mut self) {
        self.mode = SensorMode::Idle;
        self.fault = None;
        self.samples_taken = 0;
        self.accumulator = 0.0;
        self.last_accepted = 0.0;
        self.sampling = false;
        self.fresh = false;
        self.mean = None;
    }

    /// Begin a new reading.  Ignored unless `Idle` or `HasData`; a reading
    /// already in progress keeps going.
    pub fn start_reading(&mut self) {
        if self.sampling {
            return;
        }
        match self.mode {
            SensorMode::Idle => self.mode = SensorMode::Sampling,
            SensorMode::HasData => {}
            SensorMode::Off | SensorMode::Sampling | SensorMode::Shutdown => return,
        }
        self.samples_taken = 0;
        self.sampling = true;
    }

    // ── Base-cadence poll ─────────────────────────────────────

    /// Take one sample toward the current reading.
    pub fn poll(&mut self, adc: &mut impl SensorPort) -> PollStatus {
        if !self.sampling {
            return PollStatus::NoOp;
        }

        let sample = if self.samples_taken == 0 {
            // First sample of a reading is the reference.
            self.accumulator = 0.0;
            let s = self.sample(adc);
            self.last_accepted = s;
            s
        } else if let Some(s) = self.sample_within_variance(adc) {
            s
        } else {
            error!(
                "Sensor: no sample within ±{:.1} after {} retries, shutting down",
                self.variance, self.retries
            );
            self.mode = SensorMode::Shutdown;
            self.fault = Some(SensorFault::BadReadings);
            self.sampling = false;
            self.fresh = false;
            return PollStatus::Proceed;
        };

        self.accumulator += sample;
        self.samples_taken += 1;
        trace!("Sensor: sample {}/{} = {:.2}", self.samples_taken, self.samples_target, sample);

        if self.samples_taken >= self.samples_target {
            self.complete_reading();
        }
        PollStatus::Proceed
    }

    fn sample(&self, adc: &mut impl SensorPort) -> f32 {
        self.calibration.apply(adc.read_raw(self.channel))
    }

    fn sample_within_variance(&mut self, adc: &mut impl SensorPort) -> Option<f32> {
        let mut sample = self.sample(adc);
        let mut retries_left = self.retries;
        loop {
            if (sample - self.last_accepted).abs() < self.variance {
                self.last_accepted = sample;
                return Some(sample);
            }
            if retries_left == 0 {
                return None;
            }
            retries_left -= 1;
            debug!("Sensor: rejected {:.2} (ref {:.2}), re-sampling", sample, self.last_accepted);
            sample = self.sample(adc);
        }
    }

    fn complete_reading(&mut self) {
        let mean = self.accumulator / f32::from(self.samples_taken);
        self.mean = Some(mean);
        self.sampling = false;

        if mean > self.disconnect_temperature {
            self.classify_fault(SensorFault::Disconnected, mean);
        } else if mean < self.no_power_temperature {
            self.classify_fault(SensorFault::NoPower, mean);
        } else {
            self.mode = SensorMode::HasData;
            self.fault = None;
            self.fresh = true;
        }
    }

    fn classify_fault(&mut self, fault: SensorFault, mean: f32) {
        if self.fault != Some(fault) {
            warn!("Sensor: {} (mean {:.1})", fault, mean);
        }
        self.mode = SensorMode::Idle;
        self.fault = Some(fault);
        self.fresh = false;
    }

    // ── Queries ───────────────────────────────────────────────

    /// Filtered temperature; only available in `HasData`.
    pub fn temperature(&self) -> Option<f32> {
        if self.mode == SensorMode::HasData {
            self.mean
        } else {
            None
        }
    }

    /// Hand out a reading completed since the last call.
    pub fn take_reading(&mut self) -> Option<f32> {
        if self.fresh && self.mode == SensorMode::HasData {
            self.fresh = false;
            self.mean
        } else {
            None
        }
    }

    /// A reading is being accumulated.
    pub fn is_sampling(&self) -> bool {
        self.sampling
    }

    /// Mean of the last completed reading, including faulted ones.
    pub fn last_mean(&self) -> Option<f32> {
        self.mean
    }

    pub fn mode(&self) -> SensorMode {
        self.mode
    }

    pub fn fault(&self) -> Option<SensorFault> {
        self.fault
    }

    /// Host-visible fault code (0 = none).
    pub fn code(&self) -> u8 {
        self.fault.map_or(0, SensorFault::code)
    }

    pub fn samples_taken(&self) -> u8 {
        self.samples_taken
    }
}
