//! Function-pointer finite state machine for the network session.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │  StateTable                                                   │
//! │  ┌──────────────┬───────────┬──────────┬───────────────────┐  │
//! │  │ SessionState │ on_enter  │ on_exit  │ on_update         │  │
//! │  ├──────────────┼───────────┼──────────┼───────────────────┤  │
//! │  │ Disconnected │ —         │ —        │ fn(ctx)->Option<> │  │
//! │  │ Connecting   │ —         │ —        │ fn(ctx)->Option<> │  │
//! │  │ Connected    │ fn(ctx)   │ fn(ctx)  │ fn(ctx)->Option<> │  │
//! │  └──────────────┴───────────┴──────────┴───────────────────┘  │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! The service writes the latest inputs into the [`Session`] and calls
//! [`Fsm::step`].  `on_update` for the current state decides whether to
//! move; if it returns `Some(next)`, the engine runs `on_exit` for the
//! current state, then `on_enter` for the next.  Actions only mutate the
//! session and queue work; they never touch a port.

pub mod context;
pub mod states;

use context::Session;
use log::info;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Connectivity of the node.  Must stay in sync with the table built in
/// [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SessionState {
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
}

impl SessionState {
    /// Total number of states: used to size the table array.
    pub const COUNT: usize = 3;

    /// Convert an index back to `SessionState`.  Out-of-range indices
    /// assert in debug builds and fall back to `Disconnected`.
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Disconnected,
            1 => Self::Connecting,
            2 => Self::Connected,
            _ => {
                debug_assert!(false, "invalid state index: {idx}");
                Self::Disconnected
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
pub type StateActionFn = fn(&mut Session);

/// Signature for the update handler.  Returns `Some(next)` to move.
pub type StateUpdateFn = fn(&Session) -> Option<SessionState>;

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

pub struct StateDescriptor {
    pub id: SessionState,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_update: StateUpdateFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

pub struct Fsm {
    /// Fixed-size table indexed by `SessionState as usize`.
    table: [StateDescriptor; SessionState::COUNT],
    current: usize,
    /// Number of transitions taken since start.
    transitions: u32,
}

impl Fsm {
    pub fn new(table: [StateDescriptor; SessionState::COUNT], initial: SessionState) -> Self {
        Self {
            table,
            current: initial as usize,
            transitions: 0,
        }
    }

    /// Run the initial `on_enter` for the starting state.
    pub fn start(&mut self, ctx: &mut Session) {
        info!("Session: starting in {}", self.table[self.current].name);
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Re-evaluate the current state against the session inputs.
    ///
    /// Follows transitions until the machine settles, so a single input
    /// change (e.g. attached while Disconnected) lands in the final state
    /// in one call.  Returns `true` if the state changed.
    pub fn step(&mut self, ctx: &mut Session) -> bool {
        let before = self.current;
        // Every chain in the table is at most two hops long.
        for _ in 0..SessionState::COUNT {
            match (self.table[self.current].on_update)(ctx) {
                Some(next) if next as usize != self.current => self.transition(next, ctx),
                _ => break,
            }
        }
        self.current != before
    }

    pub fn current_state(&self) -> SessionState {
        SessionState::from_index(self.current)
    }

    pub fn transitions(&self) -> u32 {
        self.transitions
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(&mut self, next: SessionState, ctx: &mut Session) {
        let next_idx = next as usize;

        info!(
            "Session: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        self.current = next_idx;
        self.transitions = self.transitions.wrapping_add(1);

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }
}
