//! Domain value types shared between ports, the engine and adapters.

use core::fmt;

use serde::{Deserialize, Serialize};

// ───────────────────────────────────────────────────────────────
// Mesh roles and joiner progress
// ───────────────────────────────────────────────────────────────

/// Role reported by the mesh stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceRole {
    Disabled,
    Detached,
    Child,
    Router,
    Leader,
}

impl DeviceRole {
    /// Child, router and leader count as attached to a partition.
    pub const fn is_attached(self) -> bool {
        matches!(self, Self::Child | Self::Router | Self::Leader)
    }
}

/// Progress notifications of the low-level commissioning procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinerState {
    /// The attempt ended without admitting the device.
    Idle,
    Discover,
    Connect,
    Connected,
    Entrust,
    Joined,
}

// ───────────────────────────────────────────────────────────────
// Link mode
// ───────────────────────────────────────────────────────────────

/// MLE link mode bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkMode {
    /// Receiver stays on while idle (`r`).  Cleared on sleepy end devices.
    pub rx_on_when_idle: bool,
    /// Full thread device (`d`).
    pub full_thread_device: bool,
    /// Full network data (`n`).
    pub full_network_data: bool,
}

impl LinkMode {
    /// Decode a flag string made of the characters `r`, `d` and `n`.
    ///
    /// An empty string is a valid "minimal" mode (sleepy, minimal, stable
    /// network data only).  Any other character is rejected.
    pub fn from_flags(flags: &str) -> Option<Self> {
        let mut mode = Self::default();
        for c in flags.chars() {
            match c {
                'r' => mode.rx_on_when_idle = true,
                'd' => mode.full_thread_device = true,
                'n' => mode.full_network_data = true,
                _ => return None,
            }
        }
        Some(mode)
    }
}

impl fmt::Display for LinkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.rx_on_when_idle {
            f.write_str("r")?;
        }
        if self.full_thread_device {
            f.write_str("d")?;
        }
        if self.full_network_data {
            f.write_str("n")?;
        }
        if *self == Self::default() {
            f.write_str("-")?;
        }
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Light groups
// ───────────────────────────────────────────────────────────────

/// Logical LED strip groups addressable by commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightGroup {
    All,
    Left,
    Right,
}

impl LightGroup {
    /// Groups backed by a physical pixel, in strip order.
    pub const NODES: [Self; 2] = [Self::Left, Self::Right];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "all" => Some(Self::All),
            "led_left" => Some(Self::Left),
            "led_right" => Some(Self::Right),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Left => "led_left",
            Self::Right => "led_right",
        }
    }
}

/// 8-bit RGB colour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Self = Self::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Power and colour of one light group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupStatus {
    pub on: bool,
    pub color: Rgb,
}

/// Name and level of one GPIO in the output bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinState {
    pub name: &'static str,
    pub high: bool,
}

// ───────────────────────────────────────────────────────────────
// Presence indicator
// ───────────────────────────────────────────────────────────────

/// What the presence LED should be doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorMode {
    Off,
    On,
    /// Square wave, `period_ms` on then `period_ms` off.
    Blink { period_ms: u32 },
    /// Brief inversion of the current mode, then back to it.
    Pulse { duration_ms: u32 },
}
