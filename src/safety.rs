//! Safety supervisor and shutdown idler.
//!
//! The supervisor is the highest-priority dispatch task.  While no alarm
//! is latched it returns `NoOp` and costs nothing.  Once an alarm is
//! latched it blinks the status LED and returns `NotYetDone` on every
//! pass, which starves every lower-priority task.  That is the system's
//! containment mechanism for faults the heater state machine cannot
//! handle on its own.
//!
//! ## Alarm lifecycle
//!
//! 1. A condition latches an alarm (tick overruns beyond the configured
//!    budget, or [`SafetySupervisor::latch`] from another subsystem).
//! 2. The service forces the heater into `Shutdown`.
//! 3. Every pass, `poll()` blinks the LED and blocks the rest of the loop.
//! 4. Only an explicit re-initialization calls [`SafetySupervisor::clear`].

use embedded_hal::digital::StatefulOutputPin;
use log::{error, info, warn};

use crate::config::SafetyConfig;
use crate::error::SystemAlarm;
use crate::scheduler::PollStatus;

/// Safety supervisor.
pub struct SafetySupervisor {
    alarm: Option<SystemAlarm>,
    blink_ms: u32,
    max_tick_overruns: u32,
    /// Overrun count at the last clear; the budget applies from here.
    overrun_base: u32,
    last_toggle_ms: Option<u64>,
}

impl SafetySupervisor {
    pub fn new(cfg: &SafetyConfig) -> Self {
        Self {
            alarm: None,
            blink_ms: cfg.alarm_blink_ms,
            max_tick_overruns: cfg.max_tick_overruns,
            overrun_base: 0,
            last_toggle_ms: None,
        }
    }

    /// Latch `alarm`.  Returns `true` if this call latched it; the first
    /// alarm wins.
    pub fn latch(&mut self, alarm: SystemAlarm) -> bool {
        if self.alarm.is_some() {
            return false;
        }
        error!("SAFETY ALARM LATCHED: {alarm}");
        self.alarm = Some(alarm);
        self.last_toggle_ms = None;
        true
    }

    /// Compare the tick flag's overrun total against the budget.
    pub fn check_overruns(&mut self, total: u32) -> Option<SystemAlarm> {
        let since_clear = total.wrapping_sub(self.overrun_base);
        if since_clear > self.max_tick_overruns && self.latch(SystemAlarm::TickOverrun) {
            warn!("Safety: {} tick overruns (budget {})", since_clear, self.max_tick_overruns);
            return Some(SystemAlarm::TickOverrun);
        }
        None
    }

    /// Release the latch.  `overruns` is the current tick overrun total,
    /// which becomes the new baseline.
    pub fn clear(&mut self, overruns: u32) {
        if let Some(alarm) = self.alarm.take() {
            info!("SAFETY ALARM CLEARED: {alarm}");
        }
        self.overrun_base = overruns;
        self.last_toggle_ms = None;
    }

    /// Dispatch task body.
    pub fn poll<L: StatefulOutputPin>(&mut self, now_ms: u64, led: &mut L) -> PollStatus {
        if self.alarm.is_none() {
            return PollStatus::NoOp;
        }

        let due = match self.last_toggle_ms {
            None => true,
            Some(t) => now_ms.saturating_sub(t) >= u64::from(self.blink_ms),
        };
        if due {
            if led.toggle().is_err() {
                warn!("Safety: status LED toggle failed");
            }
            self.last_toggle_ms = Some(now_ms);
        }
        PollStatus::NotYetDone
    }

    pub fn alarm(&self) -> Option<SystemAlarm> {
        self.alarm
    }

    pub fn is_latched(&self) -> bool {
        self.alarm.is_some()
    }
}
