//! Local input mapping: button gestures and encoder rotation to [`Event`]s.
//!
//! | Button | Short press            | Long press             |
//! |--------|------------------------|------------------------|
//! | 1      | status report now      | toggle testing mode    |
//! | 2      | join                   | factory reset          |
//! | 3      | `infra_0` trigger      | —                      |
//! | 4      | `qdec_0` button trigger| —                      |
//!
//! A rotation of the encoder past the step threshold produces a
//! `qdec_0` rotate trigger carrying the accumulated steps.

use crate::app::trigger::TriggerEvent;
use crate::drivers::button::ButtonGesture;
use crate::events::Event;

/// Object id of the infrared trigger source.
pub const INFRARED_OBJECT: &str = "infra_0";
/// Object id of the encoder (push switch and rotation).
pub const QDEC_OBJECT: &str = "qdec_0";

/// Physical buttons, in ISR slot order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum Button {
    Report = 0,
    Join = 1,
    Infrared = 2,
    QdecPush = 3,
}

impl Button {
    pub const ALL: [Self; 4] = [Self::Report, Self::Join, Self::Infrared, Self::QdecPush];

    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Event for a classified gesture.  `testing_mode` is the current mode,
/// so the long press on button 1 can toggle it.
pub fn button_event(button: Button, gesture: ButtonGesture, testing_mode: bool) -> Option<Event> {
    match (button, gesture) {
        (Button::Report, ButtonGesture::Short) => Some(Event::ReportRequested),
        (Button::Report, ButtonGesture::Long) => Some(Event::SetTestingMode(!testing_mode)),
        (Button::Join, ButtonGesture::Short) => Some(Event::JoinRequested),
        (Button::Join, ButtonGesture::Long) => Some(Event::FactoryResetRequested),
        (Button::Infrared, ButtonGesture::Short) => {
            Some(Event::Trigger(TriggerEvent::infrared(INFRARED_OBJECT)))
        }
        (Button::QdecPush, ButtonGesture::Short) => {
            Some(Event::Trigger(TriggerEvent::qdec_button(QDEC_OBJECT)))
        }
        (Button::Infrared | Button::QdecPush, ButtonGesture::Long) => None,
    }
}

/// Event for a completed rotation.
pub fn rotation_event(steps: i32) -> Event {
    Event::Trigger(TriggerEvent::qdec_rotate(QDEC_OBJECT, steps))
}
