//! Fieldlink relay library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. Hardware-backed adapters only exist when the `espidf`
//! feature is enabled; everything else builds and tests on the host.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod downlink;
pub mod link;
pub mod recovery;
pub mod tasks;
pub mod uplink;
pub mod watch;

pub mod error;

pub mod adapters;
