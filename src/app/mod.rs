//! Application core — pure domain logic, zero I/O.
//!
//! This module contains the business rules of the relay: block
//! reassembly orchestration, downlink command execution and event
//! emission. All interaction with hardware and network happens through
//! **port traits** defined in [`ports`], keeping this layer fully
//! testable without real peripherals.

pub mod events;
pub mod ports;
pub mod service;

pub use events::RelayEvent;
pub use service::RelayService;
