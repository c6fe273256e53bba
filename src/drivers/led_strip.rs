//! Addressable LED strip driver (WS2812 over RMT).
//!
//! The strip is split into two light groups, `led_left` then `led_right`,
//! each [`LED_STRIP_PIXELS_PER_GROUP`] pixels long.  Every group keeps its
//! own power flag and colour; a powered-off group keeps its colour so the
//! next `on` restores it.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: encodes the whole frame into one RMT signal and sends it
//! blocking.  On host/test: tracks the frame in memory only.

use log::debug;

use crate::app::model::{GroupStatus, LightGroup, Rgb};
use crate::error::ActuatorError;
use crate::pins::{LED_STRIP_PIXELS, LED_STRIP_PIXELS_PER_GROUP};

#[cfg(target_os = "espidf")]
use esp_idf_hal::rmt::{FixedLengthSignal, PinState, Pulse, TxRmtDriver};

/// RMT symbols per frame: 24 bits per pixel.
#[cfg(target_os = "espidf")]
const FRAME_BITS: usize = 24 * LED_STRIP_PIXELS;

pub struct LedStrip {
    groups: [GroupStatus; 2],
    #[cfg(target_os = "espidf")]
    tx: TxRmtDriver<'static>,
}

impl LedStrip {
    #[cfg(target_os = "espidf")]
    pub fn new(tx: TxRmtDriver<'static>) -> Self {
        Self {
            groups: [Self::initial(); 2],
            tx,
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        Self {
            groups: [Self::initial(); 2],
        }
    }

    const fn initial() -> GroupStatus {
        GroupStatus {
            on: false,
            color: Rgb::WHITE,
        }
    }

    pub fn set_power(&mut self, group: LightGroup, on: bool) -> Result<(), ActuatorError> {
        for idx in Self::indices(group) {
            self.groups[idx].on = on;
        }
        debug!("Strip: {} {}", group.name(), if on { "on" } else { "off" });
        self.refresh()
    }

    pub fn set_color(&mut self, group: LightGroup, color: Rgb) -> Result<(), ActuatorError> {
        for idx in Self::indices(group) {
            self.groups[idx].color = color;
        }
        debug!("Strip: {} colour ({}, {}, {})", group.name(), color.r, color.g, color.b);
        self.refresh()
    }

    /// For [`LightGroup::All`]: on if both halves are on, colour of the
    /// left half.
    pub fn status(&self, group: LightGroup) -> GroupStatus {
        match group {
            LightGroup::Left => self.groups[0],
            LightGroup::Right => self.groups[1],
            LightGroup::All => GroupStatus {
                on: self.groups.iter().all(|g| g.on),
                color: self.groups[0].color,
            },
        }
    }

    /// Pixel colours as currently shown.
    pub fn frame(&self) -> [Rgb; LED_STRIP_PIXELS] {
        let mut frame = [Rgb::default(); LED_STRIP_PIXELS];
        for (pixel, out) in frame.iter_mut().enumerate() {
            let group = self.groups[pixel / LED_STRIP_PIXELS_PER_GROUP];
            if group.on {
                *out = group.color;
            }
        }
        frame
    }

    fn indices(group: LightGroup) -> core::ops::Range<usize> {
        match group {
            LightGroup::All => 0..2,
            LightGroup::Left => 0..1,
            LightGroup::Right => 1..2,
        }
    }

    #[cfg(target_os = "espidf")]
    fn refresh(&mut self) -> Result<(), ActuatorError> {
        use core::time::Duration;

        let ticks_hz = self
            .tx
            .counter_clock()
            .map_err(|_| ActuatorError::StripUpdateFailed)?;
        let pulse = |state, ns| {
            Pulse::new_with_duration(ticks_hz, state, &Duration::from_nanos(ns))
                .map_err(|_| ActuatorError::StripUpdateFailed)
        };
        let zero = (pulse(PinState::High, 350)?, pulse(PinState::Low, 800)?);
        let one = (pulse(PinState::High, 700)?, pulse(PinState::Low, 600)?);

        let mut signal = FixedLengthSignal::<FRAME_BITS>::new();
        for (pixel, color) in self.frame().iter().enumerate() {
            // WS2812 wire order is GRB, most significant bit first.
            let grb = (u32::from(color.g) << 16) | (u32::from(color.r) << 8) | u32::from(color.b);
            for bit in 0..24 {
                let symbol = if grb & (1 << (23 - bit)) != 0 { &one } else { &zero };
                signal
                    .set(pixel * 24 + bit, symbol)
                    .map_err(|_| ActuatorError::StripUpdateFailed)?;
            }
        }
        self.tx
            .start_blocking(&signal)
            .map_err(|_| ActuatorError::StripUpdateFailed)
    }

    #[cfg(not(target_os = "espidf"))]
    fn refresh(&mut self) -> Result<(), ActuatorError> {
        Ok(())
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for LedStrip {
    fn default() -> Self {
        Self::new()
    }
}
