//! Concrete state handler functions and table builder.
//!
//! ```text
//!  DISCONNECTED ──[join requested]──▶ CONNECTING
//!       ▲  │                              │  ▲
//!       │  │                     [attached]  [join gave up]
//!       │  │                              ▼  │
//!       │  └──────[attached]──────▶ CONNECTED
//!       │                                 │
//!       └────────────[detached]───────────┘
//! ```

use super::context::Session;
use super::{SessionState, StateDescriptor};
use crate::app::work::Work;
use log::info;

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.  Called once at startup.
pub fn build_state_table() -> [StateDescriptor; SessionState::COUNT] {
    [
        // Index 0: Disconnected
        StateDescriptor {
            id: SessionState::Disconnected,
            name: "Disconnected",
            on_enter: None,
            on_exit: None,
            on_update: disconnected_update,
        },
        // Index 1: Connecting
        StateDescriptor {
            id: SessionState::Connecting,
            name: "Connecting",
            on_enter: None,
            on_exit: None,
            on_update: connecting_update,
        },
        // Index 2: Connected
        StateDescriptor {
            id: SessionState::Connected,
            name: "Connected",
            on_enter: Some(connected_enter),
            on_exit: Some(connected_exit),
            on_update: connected_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  DISCONNECTED
// ═══════════════════════════════════════════════════════════════════════════

fn disconnected_update(ctx: &Session) -> Option<SessionState> {
    if ctx.attached {
        return Some(SessionState::Connected);
    }
    if ctx.join_active {
        return Some(SessionState::Connecting);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  CONNECTING: commissioning in progress
// ═══════════════════════════════════════════════════════════════════════════

fn connecting_update(ctx: &Session) -> Option<SessionState> {
    if ctx.attached {
        return Some(SessionState::Connected);
    }
    if !ctx.join_active {
        return Some(SessionState::Disconnected);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  CONNECTED: attached to a partition
// ═══════════════════════════════════════════════════════════════════════════

fn connected_enter(ctx: &mut Session) {
    ctx.submit(Work::IndicateConnected);
    ctx.submit(Work::SendProvisioning);
    if ctx.registration.can_begin() {
        ctx.submit(Work::BeginRegistration);
    }
}

fn connected_exit(ctx: &mut Session) {
    ctx.end_episode();
    ctx.submit(Work::IndicateDisconnected);
    ctx.submit(Work::ReleasePollBoost);
    info!("Session: peer forgotten, registration reset");
}

fn connected_update(ctx: &Session) -> Option<SessionState> {
    if !ctx.attached {
        return Some(SessionState::Disconnected);
    }
    None
}
