//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the business rules for the mesh node: session
//! orchestration, joining, provisioning, service registration, status
//! reporting, triggers and remote commands.  All interaction with the
//! radio and the board happens through **port traits** defined in
//! [`ports`], keeping this layer fully testable without real peripherals.

pub mod commands;
pub mod dispatch;
pub mod events;
pub mod join;
pub mod model;
pub mod ports;
pub mod provisioning;
pub mod registration;
pub mod report;
pub mod service;
pub mod trigger;
pub mod wire;
pub mod work;
