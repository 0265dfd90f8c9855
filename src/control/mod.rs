//! Closed-loop temperature control: PID law and the heater state machine.

pub mod heater;
pub mod pid;
