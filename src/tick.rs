//! Base tick and derived cadences.
//!
//! The hardware timer callback is the only producer: it raises
//! [`TickFlag::pending`] once per base interval.  The tick task is the only
//! consumer.  The 100 ms and 1 s cadences are counted down from the base
//! tick rather than timed independently, so the three never drift apart.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::config::TickConfig;

/// Interrupt-shared tick flag.
///
/// Single writer (timer callback), single reader (tick task).
pub struct TickFlag {
    pending: AtomicBool,
    overruns: AtomicU32,
}

impl Default for TickFlag {
    fn default() -> Self {
        Self::new()
    }
}

impl TickFlag {
    pub const fn new() -> Self {
        Self {
            pending: AtomicBool::new(false),
            overruns: AtomicU32::new(0),
        }
    }

    /// Called from the timer callback.  O(1), lock-free.
    ///
    /// A flag that is still set means the previous tick was never
    /// consumed; that is counted as an overrun.
    pub fn on_timer_interrupt(&self) {
        if self.pending.swap(true, Ordering::AcqRel) {
            self.overruns.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Clear the flag, returning whether it was set.
    fn take(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Ticks lost because the consumer fell behind.
    pub fn overruns(&self) -> u32 {
        self.overruns.load(Ordering::Relaxed)
    }
}

/// The system tick, raised by `drivers::hw_timer`.
pub static SYSTEM_TICK: TickFlag = TickFlag::new();

/// Which cadences fired on one consumed tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cadence {
    pub base: bool,
    pub hundred_ms: bool,
    pub one_second: bool,
}

/// Down-counters deriving the slower cadences.
#[derive(Debug, Clone)]
pub struct TickSource {
    counter_100ms: u8,
    counter_1s: u8,
    reload_100ms: u8,
    reload_1s: u8,
    ticks: u64,
}

impl TickSource {
    pub fn new(cfg: &TickConfig) -> Self {
        Self {
            counter_100ms: cfg.ticks_per_100ms,
            counter_1s: cfg.hundreds_per_second,
            reload_100ms: cfg.ticks_per_100ms,
            reload_1s: cfg.hundreds_per_second,
            ticks: 0,
        }
    }

    /// Consume a pending tick.
    ///
    /// `None` when no tick is pending (the caller reports `NoOp`).
    pub fn poll(&mut self, flag: &TickFlag) -> Option<Cadence> {
        if !flag.take() {
            return None;
        }
        self.ticks = self.ticks.wrapping_add(1);

        let mut cadence = Cadence {
            base: true,
            ..Cadence::default()
        };

        self.counter_100ms = self.counter_100ms.saturating_sub(1);
        if self.counter_100ms == 0 {
            self.counter_100ms = self.reload_100ms;
            cadence.hundred_ms = true;

            self.counter_1s = self.counter_1s.saturating_sub(1);
            if self.counter_1s == 0 {
                self.counter_1s = self.reload_1s;
                cadence.one_second = true;
            }
        }

        Some(cadence)
    }

    /// Base ticks consumed since boot.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}
