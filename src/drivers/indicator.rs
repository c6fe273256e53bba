//! Presence indicator pattern engine.
//!
//! Turns the [`IndicatorMode`] requested by the application into an
//! on/off level for the single indicator LED.  The main loop calls
//! `tick()` every pass and writes the result to the pin.
//!
//! ## Layers (highest first)
//!
//! 1. **Pulse**: brief inversion of the base output, then back
//! 2. **Base**: Off, On, or a square-wave blink
//!
//! | Mode                  | Output                                   |
//! |-----------------------|------------------------------------------|
//! | Off                   | low                                      |
//! | On                    | high                                     |
//! | Blink { period_ms }   | toggles every `period_ms`, starts high   |
//! | Pulse { duration_ms } | base inverted for `duration_ms`          |

use crate::app::model::IndicatorMode;

use super::hw_init;

/// Indicator engine. Stack-allocated, no heap.
pub struct Indicator {
    gpio: i32,
    base: IndicatorMode,
    phase_ms: u32,
    pulse_left_ms: u32,
    lit: bool,
}

impl Indicator {
    pub fn new(gpio: i32) -> Self {
        Self {
            gpio,
            base: IndicatorMode::Off,
            phase_ms: 0,
            pulse_left_ms: 0,
            lit: false,
        }
    }

    /// Apply a new mode.  A pulse overlays the current base mode.
    pub fn set_mode(&mut self, mode: IndicatorMode) {
        match mode {
            IndicatorMode::Pulse { duration_ms } => self.pulse_left_ms = duration_ms,
            base => {
                if base != self.base {
                    self.base = base;
                    self.phase_ms = 0;
                }
            }
        }
    }

    pub fn mode(&self) -> IndicatorMode {
        self.base
    }

    /// Last level written to the pin.
    pub fn is_lit(&self) -> bool {
        self.lit
    }

    /// Advance by `delta_ms`, drive the pin, and return the level.
    pub fn tick(&mut self, delta_ms: u32) -> bool {
        let level = self.level();
        self.phase_ms = self.phase_ms.wrapping_add(delta_ms);
        self.pulse_left_ms = self.pulse_left_ms.saturating_sub(delta_ms);

        if level != self.lit {
            hw_init::gpio_write(self.gpio, level);
            self.lit = level;
        }
        level
    }

    fn level(&self) -> bool {
        let base = match self.base {
            IndicatorMode::Off | IndicatorMode::Pulse { .. } => false,
            IndicatorMode::On => true,
            IndicatorMode::Blink { period_ms } => (self.phase_ms / period_ms.max(1)) % 2 == 0,
        };
        if self.pulse_left_ms > 0 { !base } else { base }
    }
}
