//! MeshNode firmware library.
//!
//! Control plane of a Thread mesh sensor + RGB LED node.  Exposes the
//! engine and the host-buildable adapters for integration testing.  All
//! ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod drivers;
pub mod error;
pub mod events;
pub mod fsm;
pub mod identity;
pub mod input;
pub mod pins;
pub mod scheduler;
