//! Outbound application events.
//!
//! The [`NodeService`](super::service::NodeService) emits these through
//! the [`EventSink`](super::ports::EventSink) port.  Adapters on the
//! other side decide what to do with them (serial log, diagnostics
//! counters, a test recorder).

use core::net::Ipv6Addr;

use crate::fsm::SessionState;

use super::registration::RegistrationState;
use super::trigger::TriggerKind;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The service has started (carries initial session state).
    Started(SessionState),

    /// The session FSM moved.
    SessionChanged {
        from: SessionState,
        to: SessionState,
    },

    /// A provisioning reply taught us the coordinator's address.
    PeerDiscovered(Ipv6Addr),

    /// A status report was handed to the transport.
    StatusReported { peer: Ipv6Addr },

    /// A trigger notification was handed to the transport.
    TriggerSent { kind: TriggerKind, broadcast: bool },

    /// An inbound command was answered.
    CommandHandled { command: &'static str, err_code: i32 },

    RegistrationChanged(RegistrationState),

    TestingModeChanged(bool),

    /// The join controller stopped retrying.
    JoinGaveUp { attempts: u32 },
}
