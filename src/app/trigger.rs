//! Asynchronous trigger notifications.
//!
//! | Mode    | Precondition              | Destination                     |
//! |---------|---------------------------|---------------------------------|
//! | Normal  | Connected + peer known    | `PUT trigger` to the peer       |
//! | Testing | Connected                 | `PUT testing_light` multicast   |

use core::net::Ipv6Addr;

use serde::{Deserialize, Serialize};

use crate::error::ProvisioningError;

use super::wire::{Destination, MESH_LOCAL_ALL_NODES, resource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    InfraredSensor,
    QdecButton,
    QdecRotate,
}

/// A physical trigger, created by the input layer and consumed right away.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerEvent {
    #[serde(rename = "trigger_type")]
    pub kind: TriggerKind,
    #[serde(rename = "obj")]
    pub object_id: String,
    /// Only rotation carries a magnitude.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub value: Option<f64>,
}

impl TriggerEvent {
    pub fn infrared(object_id: &str) -> Self {
        Self {
            kind: TriggerKind::InfraredSensor,
            object_id: object_id.into(),
            value: None,
        }
    }

    pub fn qdec_button(object_id: &str) -> Self {
        Self {
            kind: TriggerKind::QdecButton,
            object_id: object_id.into(),
            value: None,
        }
    }

    pub fn qdec_rotate(object_id: &str, steps: i32) -> Self {
        Self {
            kind: TriggerKind::QdecRotate,
            object_id: object_id.into(),
            value: Some(f64::from(steps)),
        }
    }
}

/// Body of a trigger notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriggerReport<'a> {
    pub eui64: &'a str,
    pub event: &'a TriggerEvent,
}

/// Where a trigger goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub destination: Destination,
    pub resource: &'static str,
    /// Pulse the presence light once the send is accepted.
    pub pulse: bool,
}

/// Pick the route for a trigger.  Callers have already checked that the
/// session is connected.
pub fn route(testing_mode: bool, peer: Option<Ipv6Addr>) -> Result<Route, ProvisioningError> {
    if testing_mode {
        return Ok(Route {
            destination: Destination::Multicast(MESH_LOCAL_ALL_NODES),
            resource: resource::TESTING_LIGHT,
            pulse: false,
        });
    }
    let peer = peer.ok_or(ProvisioningError::PeerUnknown)?;
    Ok(Route {
        destination: Destination::Unicast(peer),
        resource: resource::TRIGGER,
        pulse: true,
    })
}
