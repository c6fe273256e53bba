//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink {
    emitted: u32,
}

impl LogEventSink {
    pub fn new() -> Self {
        Self { emitted: 0 }
    }

    /// Events written since start.
    pub fn emitted(&self) -> u32 {
        self.emitted
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        self.emitted = self.emitted.wrapping_add(1);
        match event {
            AppEvent::Started(state) => {
                info!("START | initial_state={:?}", state);
            }
            AppEvent::SessionChanged { from, to } => {
                info!("SESSION | {:?} -> {:?}", from, to);
            }
            AppEvent::PeerDiscovered(addr) => {
                info!("PEER | addr={}", addr);
            }
            AppEvent::StatusReported { peer } => {
                info!("STATUS | sent to={}", peer);
            }
            AppEvent::TriggerSent { kind, broadcast } => {
                info!(
                    "TRIGGER | kind={:?} | {}",
                    kind,
                    if *broadcast { "broadcast" } else { "unicast" }
                );
            }
            AppEvent::CommandHandled { command, err_code } => {
                if *err_code == 0 {
                    info!("CMD | {} | err_code=0", command);
                } else {
                    warn!("CMD | {} | err_code={}", command, err_code);
                }
            }
            AppEvent::RegistrationChanged(state) => {
                info!("SRP | state={:?}", state);
            }
            AppEvent::TestingModeChanged(on) => {
                info!("TESTING | {}", if *on { "on" } else { "off" });
            }
            AppEvent::JoinGaveUp { attempts } => {
                warn!("JOIN | gave up after {} attempts", attempts);
            }
        }
    }
}
