//! Node identity derived from the radio's factory EUI-64 and the mesh
//! addresses the stack assigned.
//!
//! All hardware addresses are rendered as 16 lowercase hex characters.
//! The same strings are used as:
//! - `eui64` / `extaddr` fields of status and trigger payloads
//! - SRP host name (`<extaddr>`)
//! - SRP service instance (`<prefix><extaddr>`)

use core::fmt::Write;
use core::net::Ipv6Addr;

/// 8-byte hardware address (EUI-64 or extended MAC).
pub type HwAddress = [u8; 8];

/// Fixed-size hex rendering of a [`HwAddress`].
pub type HexString = heapless::String<16>;

/// Service instance name, `<prefix><extaddr>`.
pub type InstanceName = heapless::String<48>;

/// Addresses and versions describing this node on the mesh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeIdentity {
    pub eui64: HwAddress,
    pub ext_address: HwAddress,
    pub rloc16: u16,
    pub mesh_local_eid: Ipv6Addr,
    /// Global address from SLAAC, if the partition advertises a prefix.
    pub slaac_address: Option<Ipv6Addr>,
    /// Stack version string.
    pub stack_version: heapless::String<64>,
    /// Thread protocol version number.
    pub thread_version: u16,
}

impl NodeIdentity {
    pub fn eui64_hex(&self) -> HexString {
        hex(&self.eui64)
    }

    pub fn ext_address_hex(&self) -> HexString {
        hex(&self.ext_address)
    }

    /// Address to register with the registrar: SLAAC if present, otherwise
    /// the mesh-local EID.
    pub fn registration_address(&self) -> Ipv6Addr {
        self.slaac_address.unwrap_or(self.mesh_local_eid)
    }
}

/// Lowercase hex of an 8-byte address.
pub fn hex(addr: &HwAddress) -> HexString {
    let mut out = HexString::new();
    for byte in addr {
        // 8 bytes always fit in 16 chars.
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// `<prefix><extaddr>`, truncated to the instance name capacity.
pub fn instance_name(prefix: &str, ext_address: &HwAddress) -> InstanceName {
    let mut name = InstanceName::new();
    for c in prefix.chars() {
        if name.push(c).is_err() {
            break;
        }
    }
    let _ = name.push_str(&hex(ext_address));
    name
}

/// Read the factory EUI-64 from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_factory_eui64() -> HwAddress {
    let mut eui: HwAddress = [0u8; 8];
    unsafe {
        esp_idf_svc::sys::esp_read_mac(
            eui.as_mut_ptr(),
            esp_idf_svc::sys::esp_mac_type_t_ESP_MAC_IEEE802154,
        );
    }
    eui
}

/// Simulation: returns a deterministic fake EUI-64.
#[cfg(not(target_os = "espidf"))]
pub fn read_factory_eui64() -> HwAddress {
    [0x74, 0x4d, 0xbd, 0xff, 0xfe, 0x60, 0x2a, 0x11]
}
