//! Callback-to-main-loop event system.
//!
//! Events are produced by:
//! - Mesh stack callbacks (role change, joiner progress, replies,
//!   registration outcome, inbound command requests)
//! - Timer expiry (via [`QueueDelegate`])
//! - GPIO callbacks (buttons, rotary encoder)
//!
//! Events are consumed by the main loop, which hands them one at a time
//! to [`NodeService::handle_event`](crate::app::service::NodeService::handle_event).
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ Mesh stack  │────▶│              │     │              │
//! │ Timers      │────▶│  EventQueue  │────▶│  Main Loop   │
//! │ Buttons     │────▶│  (channel)   │     │  (consumer)  │
//! │ Encoder     │────▶│              │     │              │
//! └─────────────┘     └──────────────┘     └──────────────┘
//! ```
//!
//! Producers never block: a full queue drops the event and reports it.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::warn;

use crate::app::model::{DeviceRole, JoinerState};
use crate::app::ports::SchedulerDelegate;
use crate::app::registration::RegistrationOutcome;
use crate::app::trigger::TriggerEvent;
use crate::app::wire::{InboundRequest, ReplyKind};
use crate::scheduler::TimerId;

/// Maximum number of pending events.
pub const EVENT_QUEUE_CAP: usize = 32;

/// Everything the engine reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    // ── Mesh stack ────────────────────────────────────────
    /// The device role changed.
    RoleChanged(DeviceRole),
    /// The commissioning procedure reported progress.
    JoinerStateChanged(JoinerState),
    /// A reply to an outstanding request arrived.
    Reply { kind: ReplyKind, payload: Vec<u8> },
    /// An outstanding request expired without a usable reply.
    ReplyTimedOut(ReplyKind),
    /// The registrar answered (or the client gave up).
    RegistrationCompleted(RegistrationOutcome),
    /// A request arrived on the command resource.
    CommandReceived(InboundRequest),

    // ── Timers ────────────────────────────────────────────
    TimerFired(TimerId),

    // ── User input ────────────────────────────────────────
    /// Join the network (join button short press, or boot).
    JoinRequested,
    /// Deregister and wipe the network dataset (join button long press).
    FactoryResetRequested,
    /// Send a status report right away.
    ReportRequested,
    /// Enter or leave testing mode.
    SetTestingMode(bool),
    /// A sensor or encoder trigger fired.
    Trigger(TriggerEvent),
}

/// Bounded multi-producer queue between callback contexts and the main
/// loop.  Lives in a `static`; every method takes `&self`.
pub struct EventQueue {
    channel: Channel<CriticalSectionRawMutex, Event, EVENT_QUEUE_CAP>,
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl EventQueue {
    pub const fn new() -> Self {
        Self {
            channel: Channel::new(),
        }
    }

    /// Push an event.  Safe to call from any callback context.
    /// Returns `false` if the queue is full (event dropped).
    pub fn push(&self, event: Event) -> bool {
        match self.channel.try_send(event) {
            Ok(()) => true,
            Err(_) => {
                warn!("EventQueue: full, event dropped");
                false
            }
        }
    }

    /// Pop the next event.  Returns `None` if the queue is empty.
    pub fn pop(&self) -> Option<Event> {
        self.channel.try_receive().ok()
    }

    /// Drain all pending events into a callback, in FIFO order.
    pub fn drain(&self, mut handler: impl FnMut(Event)) {
        while let Some(event) = self.pop() {
            handler(event);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }

    pub fn len(&self) -> usize {
        self.channel.len()
    }
}

/// Queue shared by every callback context and the main loop.
pub static EVENTS: EventQueue = EventQueue::new();

/// Push onto [`EVENTS`].  For stack and GPIO callbacks.
pub fn push_event(event: Event) -> bool {
    EVENTS.push(event)
}

// ── Scheduler delegate ────────────────────────────────────────
//
// Bridges the scheduler (which knows nothing about the event system)
// to the event queue.

/// Forwards timer expiry into an [`EventQueue`].
pub struct QueueDelegate<'a>(pub &'a EventQueue);

impl SchedulerDelegate for QueueDelegate<'_> {
    fn on_timer_fired(&mut self, id: TimerId) {
        self.0.push(Event::TimerFired(id));
    }
}
