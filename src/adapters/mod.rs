//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements               | Connects to                   |
//! |------------|--------------------------|-------------------------------|
//! | `thread`   | NetworkStatusPort        | OpenThread role / link / MLE  |
//! |            | ServiceRegistrationPort  | OpenThread SRP client         |
//! |            | RequestPort              | OpenThread CoAP (`coap`)      |
//! | `hardware` | ActuatorPort, SensorPort | LED strip, GPIO bank, sensors |
//! |            | SystemPort, DelayNs      | restart, image management     |
//! | `log_sink` | EventSink                | Serial log output             |
//! | `time`     | —                        | ESP32 system timer            |

pub mod coap;
pub mod hardware;
pub mod log_sink;
pub mod thread;
pub mod time;
