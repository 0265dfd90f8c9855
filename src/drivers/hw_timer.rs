//! Base tick timer using ESP-IDF's esp_timer API.
//!
//! One periodic timer raises [`SYSTEM_TICK`] every base interval; the
//! dispatch loop's tick task consumes it.  The callback runs in the ESP
//! timer task context (not ISR) and only touches the atomic flag.
//!
//! On simulation targets nothing is started: tests raise the flag by hand.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

#[cfg(target_os = "espidf")]
use crate::tick::SYSTEM_TICK;

#[cfg(target_os = "espidf")]
static mut TICK_TIMER: esp_timer_handle_t = core::ptr::null_mut();

/// SAFETY: TICK_TIMER is written once in `start_tick_timer()` before any
/// timer callbacks fire.  Only called from the single main task.
#[cfg(target_os = "espidf")]
unsafe fn tick_timer() -> esp_timer_handle_t { unsafe { TICK_TIMER } }

#[cfg(target_os = "espidf")]
unsafe extern "C" fn tick_cb(_arg: *mut core::ffi::c_void) {
    SYSTEM_TICK.on_timer_interrupt();
}

/// Errors starting the tick timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerError {
    CreateFailed(i32),
    StartFailed(i32),
}

impl core::fmt::Display for TimerError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::CreateFailed(rc) => write!(f, "tick timer create failed (rc={})", rc),
            Self::StartFailed(rc) => write!(f, "tick timer start failed (rc={})", rc),
        }
    }
}

impl core::error::Error for TimerError {}

/// Start the periodic base tick.
///
/// Unhandled events are skipped, not queued: a late dispatch loop sees
/// one pending tick and the overrun counter, never a burst.
#[cfg(target_os = "espidf")]
pub fn start_tick_timer(interval_ms: u32) -> Result<(), TimerError> {
    // SAFETY: TICK_TIMER is written here once at boot from the single
    // main-task context before any timer callback fires.  The callback
    // only stores to an atomic.
    unsafe {
        let args = esp_timer_create_args_t {
            callback: Some(tick_cb),
            arg: core::ptr::null_mut(),
            dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
            name: b"tick\0".as_ptr() as *const _,
            skip_unhandled_events: true,
        };
        let ret = esp_timer_create(&args, &raw mut TICK_TIMER);
        if ret != ESP_OK as i32 {
            return Err(TimerError::CreateFailed(ret));
        }
        let ret = esp_timer_start_periodic(tick_timer(), u64::from(interval_ms) * 1_000);
        if ret != ESP_OK as i32 {
            return Err(TimerError::StartFailed(ret));
        }
    }
    info!("hw_timer: base tick @{}ms started", interval_ms);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn start_tick_timer(interval_ms: u32) -> Result<(), TimerError> {
    log::info!("hw_timer(sim): {}ms tick not started (raised by the host)", interval_ms);
    Ok(())
}
