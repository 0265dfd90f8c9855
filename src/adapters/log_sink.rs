//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing application events to the logger
//! (UART / USB-CDC in production).  Telemetry goes out as a single JSON
//! status report so a host can scrape it from the console.

use log::{error, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Telemetry(t) => match serde_json::to_string(t) {
                Ok(json) => info!("{{\"sr\":{}}}", json),
                Err(e) => warn!("TELEM | encode failed: {}", e),
            },
            AppEvent::HeaterStateChanged { from, to } => {
                info!("HEATER | {:?} -> {:?}", from, to);
            }
            AppEvent::HeaterFaulted(fault) => {
                error!("HEATER | shutdown: {} (code {})", fault, fault.code());
            }
            AppEvent::SensorFaulted(fault) => {
                warn!("SENSOR | {} (code {})", fault, fault.code());
            }
            AppEvent::AlarmLatched(alarm) => {
                error!("ALARM | {} (code {})", alarm, alarm.code());
            }
            AppEvent::Started(mode) => {
                info!("START | heater={:?}", mode);
            }
        }
    }
}
