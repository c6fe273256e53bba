//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against the mock platform.  All tests run on the host (x86_64) with no
//! radio or real hardware required.

mod command_tests;
mod mock_platform;
mod provisioning_tests;
mod scenario_tests;
mod session_tests;
mod trigger_tests;
