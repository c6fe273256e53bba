//! Deferred work items.
//!
//! Event handlers and FSM actions never perform side effects inline;
//! they submit [`Work`] and the service runs it in FIFO order once the
//! event has been fully applied to the session.

use heapless::Deque;
use log::warn;

use super::trigger::TriggerEvent;

/// Maximum number of pending work items.
pub const WORK_QUEUE_CAP: usize = 16;

#[derive(Debug, Clone, PartialEq)]
pub enum Work {
    /// Presence LED solid on.
    IndicateConnected,
    /// Presence LED slow blink.
    IndicateDisconnected,
    /// Presence LED fast blink.
    IndicateJoining,
    /// Presence LED off (join gave up).
    IndicateIdle,
    /// Multicast discovery of the coordinator.
    SendProvisioning,
    /// Put back the poll period saved before provisioning.
    ReleasePollBoost,
    /// Advertise host and service to the registrar.
    BeginRegistration,
    /// Sample sensors and `PUT status` to the peer.
    ReportStatus,
    /// Deliver a trigger notification.
    EmitTrigger(TriggerEvent),
    /// Start the image-management service.
    StartManagement,
    /// Pause, deregister, wipe the network dataset.
    FactoryReset { grace_ms: u32 },
    /// Pause, restart the SoC.
    Reboot { grace_ms: u32 },
}

impl Work {
    /// Items that carry data are never merged with a pending duplicate.
    fn coalesces(&self) -> bool {
        !matches!(self, Self::EmitTrigger(_))
    }
}

/// FIFO of pending work.
#[derive(Debug, Default)]
pub struct WorkQueue {
    items: Deque<Work, WORK_QUEUE_CAP>,
}

impl WorkQueue {
    pub const fn new() -> Self {
        Self {
            items: Deque::new(),
        }
    }

    /// Queue `work`.  Submitting an item that is already pending is a
    /// no-op.  Returns `false` if the item was dropped because the queue
    /// is full.
    pub fn submit(&mut self, work: Work) -> bool {
        if work.coalesces() && self.items.iter().any(|w| *w == work) {
            return true;
        }
        match self.items.push_back(work) {
            Ok(()) => true,
            Err(dropped) => {
                warn!("Work: queue full, dropped {:?}", dropped);
                false
            }
        }
    }

    pub fn pop(&mut self) -> Option<Work> {
        self.items.pop_front()
    }
}
