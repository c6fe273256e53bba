//! Provisioning handshake: learn the coordinator's unicast address.
//!
//! The node sends an empty `GET provisioning` to the mesh-local
//! all-nodes group.  The coordinator answers with its raw 16-byte
//! address.  Anything else is dropped and the peer stays unknown until
//! the next opportunity (report tick, trigger, reconnect).

use core::net::Ipv6Addr;

use log::{debug, warn};

use crate::app::ports::NetworkStatusPort;
use crate::error::ProvisioningError;

use super::wire::{
    ADDRESS_LEN, Destination, MESH_LOCAL_ALL_NODES, Method, OutboundRequest, ReplyKind, resource,
};

/// The discovery request.
pub fn request() -> OutboundRequest<'static> {
    OutboundRequest {
        method: Method::Get,
        destination: Destination::Multicast(MESH_LOCAL_ALL_NODES),
        resource: resource::PROVISIONING,
        payload: &[],
        reply: Some(ReplyKind::Provisioning),
    }
}

/// Accept a reply only if it is exactly one address long.
pub fn parse_reply(payload: &[u8]) -> Result<Ipv6Addr, ProvisioningError> {
    let octets: [u8; ADDRESS_LEN] = payload
        .try_into()
        .map_err(|_| ProvisioningError::InvalidReply { len: payload.len() })?;
    Ok(Ipv6Addr::from(octets))
}

/// Shortens the data-poll period of a sleepy end device while a
/// provisioning reply is outstanding, then puts the old period back.
///
/// Devices with the receiver on while idle are never touched.
#[derive(Debug, Default)]
pub struct PollBoost {
    saved_period_ms: Option<u32>,
}

impl PollBoost {
    pub const fn new() -> Self {
        Self {
            saved_period_ms: None,
        }
    }

    pub fn is_engaged(&self) -> bool {
        self.saved_period_ms.is_some()
    }

    pub fn engage(&mut self, net: &mut impl NetworkStatusPort, boosted_ms: u32) {
        if net.link_mode().rx_on_when_idle || self.is_engaged() {
            return;
        }
        let current = net.poll_period_ms();
        match net.set_poll_period_ms(boosted_ms) {
            Ok(()) => {
                debug!("Provisioning: poll period {} -> {} ms", current, boosted_ms);
                self.saved_period_ms = Some(current);
            }
            Err(e) => warn!("Provisioning: cannot boost poll period: {}", e),
        }
    }

    pub fn restore(&mut self, net: &mut impl NetworkStatusPort) {
        let Some(saved) = self.saved_period_ms.take() else {
            return;
        };
        if let Err(e) = net.set_poll_period_ms(saved) {
            warn!("Provisioning: cannot restore poll period {} ms: {}", saved, e);
        } else {
            debug!("Provisioning: poll period restored to {} ms", saved);
        }
    }
}
