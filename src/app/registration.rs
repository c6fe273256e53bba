//! Service registration sequencing.
//!
//! ```text
//!  NotStarted ──begin──▶ InProgress ──Registered──▶ Registered
//!       ▲                     │
//!       │                     └──error──▶ Failed
//!       └──────────── leave Connected ─────────────┘
//! ```
//!
//! `Registered` is reachable only from `InProgress` and only once per
//! connection episode.  A failure is not retried until the next episode.

use crate::error::RegistrationError;
use crate::identity::{self, InstanceName, NodeIdentity};

/// DNS-SD service type advertised by the node.
pub const SERVICE_TYPE: &str = "_coap._udp";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationState {
    NotStarted,
    InProgress,
    Registered,
    Failed,
}

/// What the registrar (or the client on its behalf) reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    Registered,
    Removed,
    Failed(RegistrationError),
}

/// Result of applying an outcome to the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// First success this episode: start reporting and management.
    FirstRegistration,
    /// Nothing for the caller to do.
    Unchanged,
    Failed,
}

/// Registration state plus the once-per-episode latch.
#[derive(Debug, Clone, Copy)]
pub struct RegistrationTracker {
    state: RegistrationState,
    registered_this_episode: bool,
}

impl Default for RegistrationTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistrationTracker {
    pub const fn new() -> Self {
        Self {
            state: RegistrationState::NotStarted,
            registered_this_episode: false,
        }
    }

    pub fn state(&self) -> RegistrationState {
        self.state
    }

    /// `true` when a new sequence may be kicked off.
    pub fn can_begin(&self) -> bool {
        self.state == RegistrationState::NotStarted
    }

    pub fn begin(&mut self) {
        self.state = RegistrationState::InProgress;
    }

    pub fn fail(&mut self) {
        self.state = RegistrationState::Failed;
    }

    pub fn apply(&mut self, outcome: RegistrationOutcome) -> Advance {
        match outcome {
            RegistrationOutcome::Registered => {
                if self.state != RegistrationState::InProgress || self.registered_this_episode {
                    return Advance::Unchanged;
                }
                self.state = RegistrationState::Registered;
                self.registered_this_episode = true;
                Advance::FirstRegistration
            }
            RegistrationOutcome::Removed => Advance::Unchanged,
            RegistrationOutcome::Failed(_) => {
                if self.state == RegistrationState::InProgress {
                    self.state = RegistrationState::Failed;
                    Advance::Failed
                } else {
                    Advance::Unchanged
                }
            }
        }
    }

    /// Connection episode ended.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

/// One service record as handed to the registration client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescription {
    pub instance: InstanceName,
    pub service_type: &'static str,
    pub port: u16,
    /// `key=value` TXT entries.
    pub txt: heapless::Vec<heapless::String<40>, 4>,
}

impl ServiceDescription {
    pub fn for_node(id: &NodeIdentity, prefix: &str, port: u16, sw_version: &str) -> Self {
        use core::fmt::Write;

        let mut txt = heapless::Vec::new();
        let mut eui = heapless::String::new();
        let _ = write!(eui, "eui64={}", id.eui64_hex());
        let mut sw = heapless::String::new();
        let _ = write!(sw, "sw={sw_version}");
        let _ = txt.push(eui);
        let _ = txt.push(sw);

        Self {
            instance: identity::instance_name(prefix, &id.ext_address),
            service_type: SERVICE_TYPE,
            port,
            txt,
        }
    }
}
