//! GPIO / peripheral pin assignments for the heater controller board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Heater (logic-level MOSFET, low-side switch)
// ---------------------------------------------------------------------------

/// LEDC PWM output to the heater MOSFET gate.
pub const HEATER_PWM_GPIO: i32 = 4;
/// LEDC frequency the heater timer is configured with at boot; the PWM
/// driver retunes it on every `enable`.
pub const HEATER_PWM_FREQ_HZ: u32 = 1_000;

// ---------------------------------------------------------------------------
// Thermocouple amplifier (AD597, 10 mV/°C into ADC1)
// ---------------------------------------------------------------------------

/// ADC1 channel 0 (GPIO 1 on ESP32-S3).  The channel number itself comes
/// from `SensorConfig::adc_channel`.
pub const THERMOCOUPLE_ADC_GPIO: i32 = 1;

// ---------------------------------------------------------------------------
// Status LED (heartbeat, alarm blink)
// ---------------------------------------------------------------------------

pub const STATUS_LED_GPIO: i32 = 13;
