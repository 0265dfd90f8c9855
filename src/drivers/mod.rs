//! Actuator drivers, hardware initialisation, and peripheral helpers.

pub mod hw_init;
pub mod hw_timer;
pub mod pwm;
pub mod status_led;
pub mod watchdog;
