//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the control loop for the tracker: fetch cycle
//! orchestration, button handling, and reset recovery.  All interaction
//! with hardware happens through **port traits** defined in [`ports`],
//! keeping this layer fully testable without real peripherals.

pub mod events;
pub mod ports;
pub mod recovery;
pub mod service;
