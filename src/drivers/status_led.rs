//! Single-colour status LED.
//!
//! Heartbeat toggle at the 1 s cadence, fast blink while a system alarm is
//! latched.  Implements the `embedded-hal` digital output traits so the
//! application layer only depends on [`StatefulOutputPin`].
//!
//! ## Dual-target design
//!
//! On ESP-IDF: drives the GPIO through hw_init.
//! On host/test: hw_init records the level in an atomic.

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, OutputPin, StatefulOutputPin};

use crate::drivers::hw_init;

pub struct StatusLed {
    gpio: i32,
    lit: bool,
}

impl StatusLed {
    pub fn new(gpio: i32) -> Self {
        hw_init::gpio_write(gpio, false);
        Self { gpio, lit: false }
    }

    fn write(&mut self, lit: bool) {
        hw_init::gpio_write(self.gpio, lit);
        self.lit = lit;
    }
}

impl ErrorType for StatusLed {
    type Error = Infallible;
}

impl OutputPin for StatusLed {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.write(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.write(true);
        Ok(())
    }
}

impl StatefulOutputPin for StatusLed {
    fn is_set_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.lit)
    }

    fn is_set_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.lit)
    }
}
