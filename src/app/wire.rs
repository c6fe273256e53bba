//! Request/response shapes exchanged with the coordinator over the mesh.
//!
//! The transport itself (CoAP over UDP on the mesh) is owned by the
//! network adapter.  The engine only describes *what* to send.

use core::net::Ipv6Addr;

/// UDP port the node and coordinator exchange requests on.
pub const COAP_PORT: u16 = 5683;

/// Mesh-local scope "all nodes" group used for discovery and testing mode.
pub const MESH_LOCAL_ALL_NODES: Ipv6Addr = Ipv6Addr::new(0xff03, 0, 0, 0, 0, 0, 0, 1);

/// Size in bytes of a raw IPv6 address, the only valid provisioning reply.
pub const ADDRESS_LEN: usize = 16;

/// Resource names on the coordinator side.
pub mod resource {
    pub const PROVISIONING: &str = "provisioning";
    pub const STATUS: &str = "status";
    pub const TRIGGER: &str = "trigger";
    pub const TESTING_LIGHT: &str = "testing_light";
    /// Resource the node itself serves for inbound commands.
    pub const COMMAND: &str = "cmd";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Put,
    Post,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Multicast(Ipv6Addr),
    Unicast(Ipv6Addr),
}

impl Destination {
    pub const fn address(self) -> Ipv6Addr {
        match self {
            Self::Multicast(addr) | Self::Unicast(addr) => addr,
        }
    }
}

/// Which outstanding request a reply belongs to.  The adapter hands the
/// reply back as [`Event::Reply`](crate::events::Event::Reply).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    Provisioning,
    Status,
    Trigger,
}

/// An outbound request.  `reply` is `None` for one-way notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutboundRequest<'a> {
    pub method: Method,
    pub destination: Destination,
    pub resource: &'static str,
    pub payload: &'a [u8],
    pub reply: Option<ReplyKind>,
}

/// Opaque handle the adapter uses to route a response to the right
/// inbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestToken(pub u32);

/// An inbound request on the command resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundRequest {
    pub token: RequestToken,
    pub method: Method,
    pub payload: Vec<u8>,
}
