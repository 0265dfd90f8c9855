//! Application core: domain orchestration, zero I/O.
//!
//! Ties the tick source, heater and safety supervisor together behind the
//! port traits in [`ports`], so the whole control loop runs against mock
//! adapters on the host.  [`registers`] exposes the service to a host bus.

pub mod events;
pub mod ports;
pub mod registers;
pub mod service;
