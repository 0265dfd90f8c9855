//! Cooperative dispatch scheduler.
//!
//! A strictly ordered list of non-blocking poll functions.  Priority is
//! position: every pass walks the list top to bottom and stops at the
//! first task that reports [`PollStatus::NotYetDone`].
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        run_pass()                            │
//! │                                                              │
//! │  [0] safety ──▶ NoOp ──▶ [1] tick ──▶ Proceed ──▶ [2] comms  │
//! │        │                      │                      │       │
//! │   NotYetDone              NotYetDone             NotYetDone  │
//! │        ▼                      ▼                      ▼       │
//! │   pass ends               pass ends              pass ends   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! A stalled high-priority task starves everything below it.  The shutdown
//! idler relies on exactly that to contain a system-level fault.
//!
//! The scheduler is generic over the context `C` handed to each task, so
//! other subsystems sharing the loop register their own poll functions at
//! their own slots with the same three-outcome contract.

use heapless::Vec;
use log::{debug, info, trace};

use crate::error::DispatchError;

// ═══════════════════════════════════════════════════════════════
//  Task contract
// ═══════════════════════════════════════════════════════════════

/// Outcome of one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStatus {
    /// Work was done; continue with the next task.
    Proceed,
    /// Still busy; no lower-priority task may run this pass.
    NotYetDone,
    /// Nothing to do; continue with the next task.
    NoOp,
}

/// A named poll function.
///
/// Non-capturing closures coerce to the function pointer, so tasks are
/// usually written inline at the registration site.
pub struct Task<C> {
    pub name: &'static str,
    pub poll: fn(&mut C) -> PollStatus,
}

impl<C> Task<C> {
    pub const fn new(name: &'static str, poll: fn(&mut C) -> PollStatus) -> Self {
        Self { name, poll }
    }
}

/// What happened during one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassReport {
    /// Tasks actually polled this pass.
    pub invoked: usize,
    /// Task that ended the pass early, if any.
    pub blocked_by: Option<&'static str>,
}

// ═══════════════════════════════════════════════════════════════
//  Dispatcher
// ═══════════════════════════════════════════════════════════════

/// Fixed-capacity ordered task list.
pub struct Dispatcher<C, const N: usize> {
    tasks: Vec<Task<C>, N>,
    passes: u64,
}

impl<C, const N: usize> Default for Dispatcher<C, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C, const N: usize> Dispatcher<C, N> {
    pub const fn new() -> Self {
        Self {
            tasks: Vec::new(),
            passes: 0,
        }
    }

    /// Append a task at the lowest priority so far.  Returns its slot.
    pub fn register(&mut self, task: Task<C>) -> Result<usize, DispatchError> {
        let slot = self.tasks.len();
        let name = task.name;
        self.tasks.push(task).map_err(|_| DispatchError::Full)?;
        info!("Dispatcher: registered '{}' at slot {}", name, slot);
        Ok(slot)
    }

    /// Run every task in order until one reports `NotYetDone`.
    pub fn run_pass(&mut self, ctx: &mut C) -> PassReport {
        self.passes = self.passes.wrapping_add(1);
        let mut invoked = 0;

        for task in &self.tasks {
            invoked += 1;
            match (task.poll)(ctx) {
                PollStatus::NotYetDone => {
                    trace!("Dispatcher: pass {} blocked by '{}'", self.passes, task.name);
                    return PassReport {
                        invoked,
                        blocked_by: Some(task.name),
                    };
                }
                PollStatus::Proceed | PollStatus::NoOp => {}
            }
        }

        PassReport {
            invoked,
            blocked_by: None,
        }
    }

    /// Run passes forever, calling `between` after each one (watchdog
    /// feed, idle hint).
    pub fn run_forever(&mut self, ctx: &mut C, mut between: impl FnMut(&PassReport)) -> ! {
        debug!("Dispatcher: entering main loop with {} tasks", self.tasks.len());
        loop {
            let report = self.run_pass(ctx);
            between(&report);
        }
    }

    /// Passes executed so far.
    pub fn passes(&self) -> u64 {
        self.passes
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Names in priority order.
    pub fn task_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.tasks.iter().map(|t| t.name)
    }
}
