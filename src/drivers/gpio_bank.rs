//! Named bank of remotely switchable output pins.
//!
//! Pins are addressed by their wire names (`"0.15"` ...) from
//! [`pins::OUTPUT_BANK`](crate::pins::OUTPUT_BANK).  The bank shadows each
//! level so status queries never touch the hardware.

use crate::app::model::PinState;
use crate::error::ActuatorError;
use crate::pins::OUTPUT_BANK;

use super::hw_init;

const BANK_SIZE: usize = OUTPUT_BANK.len();

pub struct GpioBank {
    levels: [bool; BANK_SIZE],
}

impl Default for GpioBank {
    fn default() -> Self {
        Self::new()
    }
}

impl GpioBank {
    pub fn new() -> Self {
        Self {
            levels: [false; BANK_SIZE],
        }
    }

    fn slot(name: &str) -> Result<usize, ActuatorError> {
        OUTPUT_BANK
            .iter()
            .position(|(pin, _)| *pin == name)
            .ok_or(ActuatorError::UnknownPin)
    }

    pub fn set(&mut self, name: &str, high: bool) -> Result<(), ActuatorError> {
        let idx = Self::slot(name)?;
        if !hw_init::gpio_write(OUTPUT_BANK[idx].1, high) {
            return Err(ActuatorError::GpioFailed);
        }
        self.levels[idx] = high;
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<bool, ActuatorError> {
        Ok(self.levels[Self::slot(name)?])
    }

    pub fn states(&self) -> heapless::Vec<PinState, 8> {
        OUTPUT_BANK
            .iter()
            .zip(self.levels)
            .map(|(&(name, _), high)| PinState { name, high })
            .collect()
    }
}
