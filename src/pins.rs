//! GPIO / peripheral pin assignments for the mesh node board (ESP32-C6).
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.  Change a pin here and it propagates everywhere.

// ---------------------------------------------------------------------------
// Buttons (active-low, internal pull-up, any-edge interrupt)
// ---------------------------------------------------------------------------

/// Button 1: status report now / testing mode toggle.
pub const BUTTON_REPORT_GPIO: i32 = 9;
/// Button 2: join / factory reset.
pub const BUTTON_JOIN_GPIO: i32 = 18;
/// Button 3: infrared sensor stand-in.
pub const BUTTON_INFRARED_GPIO: i32 = 19;
/// Button 4: rotary encoder push switch.
pub const BUTTON_QDEC_GPIO: i32 = 20;

/// Button pins in [`crate::input::Button`] order.
pub const BUTTON_GPIOS: [i32; 4] = [
    BUTTON_REPORT_GPIO,
    BUTTON_JOIN_GPIO,
    BUTTON_INFRARED_GPIO,
    BUTTON_QDEC_GPIO,
];

// ---------------------------------------------------------------------------
// Rotary encoder (quadrature, any-edge interrupt on both phases)
// ---------------------------------------------------------------------------

pub const QDEC_A_GPIO: i32 = 21;
pub const QDEC_B_GPIO: i32 = 22;

// ---------------------------------------------------------------------------
// Output bank (remotely switchable pins)
// ---------------------------------------------------------------------------

/// `(name, gpio)` for every pin `set_gpio` may drive.  The names are the
/// identifiers used on the wire.
pub const OUTPUT_BANK: [(&str, i32); 4] = [("0.15", 4), ("0.16", 5), ("0.17", 6), ("0.20", 7)];

// ---------------------------------------------------------------------------
// Presence indicator LED (active HIGH)
// ---------------------------------------------------------------------------

pub const INDICATOR_GPIO: i32 = 15;

// ---------------------------------------------------------------------------
// Addressable LED strip (WS2812, driven by RMT channel 0)
// ---------------------------------------------------------------------------

pub const LED_STRIP_GPIO: i32 = 8;
/// Pixels per light group; the strip carries `led_left` then `led_right`.
pub const LED_STRIP_PIXELS_PER_GROUP: usize = 4;
pub const LED_STRIP_PIXELS: usize = 2 * LED_STRIP_PIXELS_PER_GROUP;
