//! Board drivers, hardware initialisation, and ISR-fed input helpers.

pub mod button;
pub mod gpio_bank;
pub mod hw_init;
pub mod indicator;
pub mod led_strip;
pub mod qdec;
