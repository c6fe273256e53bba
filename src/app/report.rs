//! Periodic status report: interval policy and payload.

use core::num::NonZeroU32;

use serde::{Deserialize, Serialize};

use crate::error::CommandError;
use crate::identity::NodeIdentity;

use super::ports::SensorPort;

/// Seconds between two status reports.  Always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportInterval(NonZeroU32);

impl ReportInterval {
    pub const DEFAULT: Self = Self(NonZeroU32::new(300).unwrap());

    pub fn from_secs(secs: u32) -> Option<Self> {
        NonZeroU32::new(secs).map(Self)
    }

    pub const fn secs(self) -> u32 {
        self.0.get()
    }

    pub fn period_ms(self) -> u32 {
        self.0.get().saturating_mul(1000)
    }
}

impl TryFrom<i64> for ReportInterval {
    type Error = CommandError;

    /// Non-positive and out-of-range values are rejected.
    fn try_from(secs: i64) -> Result<Self, Self::Error> {
        u32::try_from(secs)
            .ok()
            .and_then(Self::from_secs)
            .ok_or(CommandError::InvalidParameter("val"))
    }
}

/// Sensor readings carried in the `data` object.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorData {
    pub temperature: f64,
    pub humidity: f64,
    pub light: f64,
    pub press: f64,
    pub battery_level: f64,
}

impl SensorData {
    pub fn read(sensors: &impl SensorPort) -> Self {
        Self {
            temperature: sensors.temperature(),
            humidity: sensors.humidity(),
            light: sensors.light(),
            press: sensors.pressure(),
            battery_level: sensors.battery_level(),
        }
    }
}

/// Body of `PUT status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub version: String,
    pub thread_version: u16,
    pub eui64: String,
    pub extaddr: String,
    pub addr: String,
    pub rloc16: u16,
    pub sw_ver: String,
    /// Field name is part of the deployed wire format.
    pub report_intervel: u32,
    pub dev_fw_type: String,
    pub data: SensorData,
}

impl StatusReport {
    pub fn build(
        id: &NodeIdentity,
        data: SensorData,
        interval: ReportInterval,
        sw_version: &str,
        dev_fw_type: &str,
    ) -> Self {
        Self {
            version: id.stack_version.as_str().into(),
            thread_version: id.thread_version,
            eui64: id.eui64_hex().as_str().into(),
            extaddr: id.ext_address_hex().as_str().into(),
            addr: id.mesh_local_eid.to_string(),
            rloc16: id.rloc16,
            sw_ver: sw_version.into(),
            report_intervel: interval.secs(),
            dev_fw_type: dev_fw_type.into(),
            data,
        }
    }
}
