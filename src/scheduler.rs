//! Timer engine.
//!
//! Backs [`SchedulerPort`] with a fixed number of slots.  The main loop
//! advances it with the elapsed time; expired timers are reported to a
//! [`SchedulerDelegate`], which pushes them into the event queue.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       Timer Sources                          │
//! │                                                              │
//! │  ┌──────────────────┐          ┌──────────────────────────┐  │
//! │  │ Report (periodic)│          │ LightOff(group) one-shot │  │
//! │  └────────┬─────────┘          └────────────┬─────────────┘  │
//! │           │                                 │                │
//! │           ▼                                 ▼                │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │              SchedulerDelegate                         │  │
//! │  │       (main loop pushes into Event Queue)              │  │
//! │  └───────────────────────┬────────────────────────────────┘  │
//! │                          │                                   │
//! │                          ▼                                   │
//! │                NodeService.handle_event()                    │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use crate::app::model::LightGroup;
use crate::app::ports::{SchedulerDelegate, SchedulerPort};
use log::{debug, warn};

// ═══════════════════════════════════════════════════════════════
//  Timer types
// ═══════════════════════════════════════════════════════════════

/// Identity of every timer the engine arms.  At most one timer per id
/// runs at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerId {
    /// Periodic status report.
    Report,
    /// Delayed switch-off requested by an `onoff` command.
    LightOff(LightGroup),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerKind {
    Periodic { period_ms: u32 },
    OneShot,
}

#[derive(Debug, Clone, Copy)]
struct TimerEntry {
    id: TimerId,
    kind: TimerKind,
    /// Absolute expiry on the scheduler's clock.
    due_ms: u64,
}

// ═══════════════════════════════════════════════════════════════
//  Scheduler engine
// ═══════════════════════════════════════════════════════════════

/// Report timer plus one delayed-off timer per light group.
const MAX_TIMERS: usize = 4;

/// The timer engine.
///
/// Decoupled from the event system: expiry is reported through the
/// [`SchedulerDelegate`] passed to [`tick`](Self::tick).
pub struct Scheduler {
    slots: [Option<TimerEntry>; MAX_TIMERS],
    now_ms: u64,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            slots: [None; MAX_TIMERS],
            now_ms: 0,
        }
    }

    /// Advance the clock by `delta_ms` and fire every timer that is due.
    ///
    /// A periodic timer fires at most once per tick; if the loop stalls for
    /// several periods the missed expiries are folded into one.
    pub fn tick(&mut self, delta_ms: u32, delegate: &mut dyn SchedulerDelegate) {
        self.now_ms += u64::from(delta_ms);

        for slot in &mut self.slots {
            let Some(entry) = slot else { continue };
            if self.now_ms < entry.due_ms {
                continue;
            }

            let id = entry.id;
            match entry.kind {
                TimerKind::Periodic { period_ms } => {
                    let period = u64::from(period_ms.max(1));
                    while entry.due_ms <= self.now_ms {
                        entry.due_ms += period;
                    }
                }
                TimerKind::OneShot => *slot = None,
            }

            debug!("Scheduler: {:?} fired at {} ms", id, self.now_ms);
            delegate.on_timer_fired(id);
        }
    }

    /// Number of armed timers.
    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    fn arm(&mut self, entry: TimerEntry) {
        if let Some(slot) = self.slot_of(entry.id) {
            self.slots[slot] = Some(entry);
            return;
        }
        match self.slots.iter_mut().find(|s| s.is_none()) {
            Some(free) => *free = Some(entry),
            None => warn!("Scheduler: no free slot for {:?}", entry.id),
        }
    }

    fn slot_of(&self, id: TimerId) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| s.is_some_and(|e| e.id == id))
    }
}

impl SchedulerPort for Scheduler {
    fn start_periodic(&mut self, id: TimerId, initial_ms: u32, period_ms: u32) {
        debug!(
            "Scheduler: {:?} periodic, first in {} ms then every {} ms",
            id, initial_ms, period_ms
        );
        self.arm(TimerEntry {
            id,
            kind: TimerKind::Periodic { period_ms },
            due_ms: self.now_ms + u64::from(initial_ms),
        });
    }

    fn start_one_shot(&mut self, id: TimerId, delay_ms: u32) {
        debug!("Scheduler: {:?} one-shot in {} ms", id, delay_ms);
        self.arm(TimerEntry {
            id,
            kind: TimerKind::OneShot,
            due_ms: self.now_ms + u64::from(delay_ms),
        });
    }

    fn stop(&mut self, id: TimerId) {
        if let Some(slot) = self.slot_of(id) {
            debug!("Scheduler: {:?} stopped", id);
            self.slots[slot] = None;
        }
    }

    fn is_running(&self, id: TimerId) -> bool {
        self.slot_of(id).is_some()
    }

    fn now_ms(&self) -> u64 {
        self.now_ms
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
