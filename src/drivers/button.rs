//! ISR-fed button driver with short and long press detection.
//!
//! ## Hardware
//!
//! Four active-low momentary switches with pull-ups. Each GPIO fires on
//! both edges; the ISR records the edge timestamp into an atomic slot for
//! that button, and `tick()` (called from the main loop) classifies the
//! press by how long it was held.
//!
//! ## Gesture detection
//!
//! | Gesture     | Condition                      | Event        |
//! |-------------|--------------------------------|--------------|
//! | Short press | Released after < 300 ms        | `Short`      |
//! | Long press  | Held >= 3 s (fires while held) | `Long`       |
//! | —           | Released between the two       | ignored      |

use core::sync::atomic::{AtomicU32, Ordering};

pub const BUTTON_COUNT: usize = 4;

const SHORT_PRESS_MAX_MS: u32 = 300;
const LONG_PRESS_MS: u32 = 3000;

/// Raw ISR timestamps (milliseconds since boot, truncated to u32, never 0).
/// Written by the ISR, read by the main loop.
static PRESS_MS: [AtomicU32; BUTTON_COUNT] = [const { AtomicU32::new(0) }; BUTTON_COUNT];
static RELEASE_MS: [AtomicU32; BUTTON_COUNT] = [const { AtomicU32::new(0) }; BUTTON_COUNT];

/// Classified gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonGesture {
    Short,
    Long,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GestureState {
    Idle,
    Pressed { since_ms: u32 },
    /// Long press already reported; waiting for release.
    Held,
}

pub struct ButtonDriver {
    index: usize,
    state: GestureState,
    last_press_ms: u32,
    last_release_ms: u32,
}

impl ButtonDriver {
    /// `index` selects the ISR slot (0..[`BUTTON_COUNT`]).
    pub fn new(index: usize) -> Self {
        debug_assert!(index < BUTTON_COUNT);
        Self {
            index: index.min(BUTTON_COUNT - 1),
            state: GestureState::Idle,
            last_press_ms: 0,
            last_release_ms: 0,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Call from the main loop on every pass.
    /// `now_ms` is the current monotonic time in milliseconds.
    pub fn tick(&mut self, now_ms: u32) -> Option<ButtonGesture> {
        let press = PRESS_MS[self.index].load(Ordering::Acquire);
        let release = RELEASE_MS[self.index].load(Ordering::Acquire);

        if press != 0 && press != self.last_press_ms {
            self.last_press_ms = press;
            self.state = GestureState::Pressed { since_ms: press };
        }
        // A release only counts if it happened after the press we track.
        let new_release = release != 0
            && release != self.last_release_ms
            && release.wrapping_sub(self.last_press_ms) < u32::MAX / 2;

        match self.state {
            GestureState::Idle => {
                if new_release {
                    self.last_release_ms = release;
                }
                None
            }
            GestureState::Pressed { since_ms } => {
                if new_release {
                    self.last_release_ms = release;
                    self.state = GestureState::Idle;
                    let held_ms = release.wrapping_sub(since_ms);
                    return (held_ms < SHORT_PRESS_MAX_MS).then_some(ButtonGesture::Short);
                }
                if now_ms.wrapping_sub(since_ms) >= LONG_PRESS_MS {
                    self.state = GestureState::Held;
                    return Some(ButtonGesture::Long);
                }
                None
            }
            GestureState::Held => {
                if new_release {
                    self.last_release_ms = release;
                    self.state = GestureState::Idle;
                }
                None
            }
        }
    }
}

/// ISR handler: register this on the button GPIO, both edges.
/// Safe to call from interrupt context (lock-free atomic store).
pub fn button_isr_handler(index: usize, pressed: bool, now_ms: u32) {
    let Some(slot) = (if pressed { &PRESS_MS } else { &RELEASE_MS }).get(index) else {
        return;
    };
    slot.store(now_ms.max(1), Ordering::Release);
}
