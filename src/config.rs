//! Node configuration parameters
//!
//! All tunable parameters for the mesh node.  The platform may persist a
//! config blob in flash; runtime changes made by commands (report
//! interval, link mode) are not written back.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Core node configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    // --- Reporting ---
    /// Status report period at boot (seconds)
    pub report_interval_secs: u32,
    /// Delay before the first report after (re)arming the timer (milliseconds)
    pub report_initial_delay_ms: u32,

    // --- Joining ---
    /// Join automatically at boot
    pub auto_join: bool,
    /// Give up retrying a join after this long (seconds)
    pub commissioning_timeout_secs: u32,
    /// Give up retrying a join after this many failed attempts
    pub max_join_attempts: u32,

    // --- Indicator ---
    /// Blink half-period while a join is in progress (milliseconds)
    pub joining_blink_ms: u32,
    /// Blink half-period while disconnected (milliseconds)
    pub disconnected_blink_ms: u32,
    /// Flash length after a trigger is delivered (milliseconds)
    pub trigger_pulse_ms: u32,

    // --- Provisioning ---
    /// Poll period applied while waiting for a provisioning reply (milliseconds)
    pub boosted_poll_period_ms: u32,

    // --- Service registration ---
    /// Port advertised in the service record
    pub service_port: u16,
    /// Prefix of the service instance name (extended address is appended)
    pub service_instance_prefix: heapless::String<24>,

    // --- Disruptive commands ---
    /// Pause between acknowledging a factory reset and performing it (milliseconds)
    pub reset_grace_ms: u32,
    /// Pause between acknowledging a reboot and performing it (milliseconds)
    pub reboot_grace_ms: u32,
    /// Upper bound on waiting for the registrar to drop our records (milliseconds)
    pub deregister_timeout_ms: u32,

    // --- Identity ---
    /// Firmware version reported as `sw_ver`
    pub sw_version: heapless::String<16>,
    /// Firmware flavour reported as `dev_fw_type`
    pub dev_fw_type: heapless::String<16>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            // Reporting
            report_interval_secs: 300,
            report_initial_delay_ms: 3000,

            // Joining
            auto_join: true,
            commissioning_timeout_secs: 300,
            max_join_attempts: 4096,

            // Indicator
            joining_blink_ms: 200,
            disconnected_blink_ms: 1000,
            trigger_pulse_ms: 100,

            // Provisioning
            boosted_poll_period_ms: 100,

            // Service registration
            service_port: 12345,
            service_instance_prefix: short_string("meshnode-"),

            // Disruptive commands
            reset_grace_ms: 1000,
            reboot_grace_ms: 3000,
            deregister_timeout_ms: 3000,

            // Identity
            sw_version: short_string(env!("CARGO_PKG_VERSION")),
            dev_fw_type: short_string("sensor_light"),
        }
    }
}

impl NodeConfig {
    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.report_interval_secs == 0 {
            return Err(Error::Config("report_interval_secs must be > 0"));
        }
        if self.commissioning_timeout_secs == 0 {
            return Err(Error::Config("commissioning_timeout_secs must be > 0"));
        }
        if self.max_join_attempts == 0 {
            return Err(Error::Config("max_join_attempts must be > 0"));
        }
        if self.joining_blink_ms == 0 || self.disconnected_blink_ms == 0 {
            return Err(Error::Config("blink periods must be > 0"));
        }
        if self.boosted_poll_period_ms == 0 {
            return Err(Error::Config("boosted_poll_period_ms must be > 0"));
        }
        Ok(())
    }

    /// Encode for storage in a flash partition.
    pub fn to_blob(&self) -> Result<Vec<u8>> {
        postcard::to_allocvec(self).map_err(|_| Error::Config("encode failed"))
    }

    /// Decode and validate a stored blob.
    pub fn from_blob(bytes: &[u8]) -> Result<Self> {
        let config: Self =
            postcard::from_bytes(bytes).map_err(|_| Error::Config("stored config corrupted"))?;
        config.validate()?;
        Ok(config)
    }
}

fn short_string<const N: usize>(s: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    for c in s.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}
