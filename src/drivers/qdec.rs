//! Rotary encoder (quadrature decoder).
//!
//! The ISR decodes A/B phase transitions into signed steps and adds them
//! to a lock-free counter.  The main loop drains the counter into a
//! [`RotationAccumulator`], which reports a rotation once enough steps
//! in one direction have built up.

use core::sync::atomic::{AtomicI32, AtomicU8, Ordering};

/// Steps in one direction before a rotation is reported.
pub const ROTATION_THRESHOLD: i32 = 24;

/// Net steps decoded by the ISR since the last [`take_steps`].
static STEPS: AtomicI32 = AtomicI32::new(0);
/// Previous `AB` phase state (2 bits).
static PREV_PHASE: AtomicU8 = AtomicU8::new(0);

/// Step for each `(prev << 2) | next` phase transition.  Invalid
/// (double) transitions count as zero.
const TRANSITIONS: [i8; 16] = [0, 1, -1, 0, -1, 0, 0, 1, 1, 0, 0, -1, 0, -1, 1, 0];

/// ISR handler: register on both edges of both phases.
pub fn qdec_isr_handler(a: bool, b: bool) {
    let next = (u8::from(a) << 1) | u8::from(b);
    let prev = PREV_PHASE.swap(next, Ordering::AcqRel);
    let step = TRANSITIONS[usize::from(((prev & 0b11) << 2) | next)];
    if step != 0 {
        STEPS.fetch_add(i32::from(step), Ordering::AcqRel);
    }
}

/// Drain the ISR step counter.
pub fn take_steps() -> i32 {
    STEPS.swap(0, Ordering::AcqRel)
}

/// Folds raw steps into threshold-sized rotation reports.
#[derive(Debug, Clone, Copy)]
pub struct RotationAccumulator {
    steps: i32,
    threshold: i32,
}

impl Default for RotationAccumulator {
    fn default() -> Self {
        Self::new(ROTATION_THRESHOLD)
    }
}

impl RotationAccumulator {
    pub const fn new(threshold: i32) -> Self {
        Self { steps: 0, threshold }
    }

    /// Add `delta` steps.  A change of direction restarts accumulation.
    /// Returns the accumulated value once `|steps| >= threshold`.
    pub fn feed(&mut self, delta: i32) -> Option<i32> {
        if delta == 0 {
            return None;
        }
        if self.steps != 0 && self.steps.signum() != delta.signum() {
            self.steps = 0;
        }
        self.steps = self.steps.saturating_add(delta);
        if self.steps.abs() >= self.threshold {
            return Some(core::mem::take(&mut self.steps));
        }
        None
    }

    pub fn pending(&self) -> i32 {
        self.steps
    }
}
