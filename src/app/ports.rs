//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ NodeService (domain)
//! ```
//!
//! Driven adapters (mesh stack, LED strip, GPIO bank, sensors, timers)
//! implement these traits.  The [`NodeService`](super::service::NodeService)
//! consumes them via generics, so the domain core never touches the
//! radio or the board directly.

use core::net::Ipv6Addr;

use embedded_hal::delay::DelayNs;

use crate::error::{ActuatorError, NetworkError, RegistrationError, SensorError, TransportError};
use crate::identity::NodeIdentity;
use crate::scheduler::TimerId;

use super::events::AppEvent;
use super::model::{DeviceRole, GroupStatus, IndicatorMode, LightGroup, LinkMode, PinState, Rgb};
use super::registration::ServiceDescription;
use super::wire::{OutboundRequest, RequestToken};

// ───────────────────────────────────────────────────────────────
// Network status port (driven adapter: mesh stack ↔ domain)
// ───────────────────────────────────────────────────────────────

/// Role, link mode and identity of the local mesh interface.
///
/// Implementations take the stack lock only around each call.
pub trait NetworkStatusPort {
    fn role(&self) -> DeviceRole;

    fn link_mode(&self) -> LinkMode;

    fn set_link_mode(&mut self, mode: LinkMode) -> Result<(), NetworkError>;

    /// Data-poll period of a sleepy end device, in milliseconds.
    fn poll_period_ms(&self) -> u32;

    fn set_poll_period_ms(&mut self, period_ms: u32) -> Result<(), NetworkError>;

    /// Hardware and mesh addresses of this node.
    fn identity(&self) -> NodeIdentity;

    /// Kick one low-level commissioning attempt.  Progress arrives later as
    /// [`Event::JoinerStateChanged`](crate::events::Event::JoinerStateChanged).
    fn start_joiner(&mut self) -> Result<(), NetworkError>;

    /// Erase the network dataset and restart the stack.  Does not return on
    /// real hardware.
    fn factory_reset(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Service registration port (driven adapter: SRP client)
// ───────────────────────────────────────────────────────────────

/// Advertises the node's host and service to the registrar.
pub trait ServiceRegistrationPort {
    fn set_host_name(&mut self, name: &str) -> Result<(), RegistrationError>;

    fn set_host_address(&mut self, address: Ipv6Addr) -> Result<(), RegistrationError>;

    fn add_service(&mut self, service: &ServiceDescription) -> Result<(), RegistrationError>;

    /// Let the client pick a registrar and register on its own.  The
    /// outcome is delivered as
    /// [`Event::RegistrationCompleted`](crate::events::Event::RegistrationCompleted).
    fn enable_autostart(&mut self) -> Result<(), RegistrationError>;

    /// Remove host and services from the registrar, blocking for at most
    /// `timeout_ms`.
    fn remove_all(&mut self, timeout_ms: u32) -> Result<(), RegistrationError>;
}

// ───────────────────────────────────────────────────────────────
// Request port (driven adapter: CoAP client/server)
// ───────────────────────────────────────────────────────────────

/// Best-effort request delivery.  No retransmission, no delivery guarantee:
/// a request whose reply never arrives is simply forgotten.
pub trait RequestPort {
    /// Send a request.  When `request.reply` is set, the reply is delivered
    /// as [`Event::Reply`](crate::events::Event::Reply).
    fn send(&mut self, request: &OutboundRequest<'_>) -> Result<(), TransportError>;

    /// Answer an inbound request.
    fn respond(&mut self, token: RequestToken, payload: &[u8]) -> Result<(), TransportError>;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → LED strip / GPIO)
// ───────────────────────────────────────────────────────────────

/// Write-side port for the LED strip, the GPIO bank and the presence LED.
pub trait ActuatorPort {
    fn set_group_power(&mut self, group: LightGroup, on: bool) -> Result<(), ActuatorError>;

    /// Store the colour for `group` and push it to the strip if lit.
    fn set_group_color(&mut self, group: LightGroup, color: Rgb) -> Result<(), ActuatorError>;

    fn group_status(&self, group: LightGroup) -> Result<GroupStatus, ActuatorError>;

    fn set_pin(&mut self, name: &str, high: bool) -> Result<(), ActuatorError>;

    fn pin(&self, name: &str) -> Result<bool, ActuatorError>;

    /// Every pin in the output bank, in declaration order.
    fn pins(&self) -> heapless::Vec<PinState, 8>;

    fn set_indicator(&mut self, mode: IndicatorMode);
}

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port.  `sample_all` fetches a fresh sample from every
/// sensor; the getters return the latest converted values.
pub trait SensorPort {
    fn sample_all(&mut self) -> Result<(), SensorError>;

    /// Degrees Celsius.
    fn temperature(&self) -> f64;

    /// Relative humidity, percent.
    fn humidity(&self) -> f64;

    /// Ambient light, lux.
    fn light(&self) -> f64;

    /// Barometric pressure, kPa.
    fn pressure(&self) -> f64;

    /// Battery charge, percent.
    fn battery_level(&self) -> f64;
}

// ───────────────────────────────────────────────────────────────
// System port (driven adapter: SoC services)
// ───────────────────────────────────────────────────────────────

pub trait SystemPort {
    /// Restart the SoC.  Does not return on real hardware.
    fn reboot(&mut self);

    /// Start the image-management (firmware upgrade) service.  Idempotent.
    fn start_management(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Scheduler port + delegate
// ───────────────────────────────────────────────────────────────

/// Timers the engine can arm.  Starting a timer that is already running
/// replaces it.
pub trait SchedulerPort {
    fn start_periodic(&mut self, id: TimerId, initial_ms: u32, period_ms: u32);

    fn start_one_shot(&mut self, id: TimerId, delay_ms: u32);

    fn stop(&mut self, id: TimerId);

    fn is_running(&self, id: TimerId) -> bool;

    /// Monotonic milliseconds since boot.
    fn now_ms(&self) -> u64;
}

/// Callback trait that the scheduler invokes when a timer expires.
///
/// This decouples the [`Scheduler`](crate::scheduler::Scheduler) from the
/// event queue.  The main loop implements this by forwarding into
/// [`EventQueue`](crate::events::EventQueue), but the scheduler itself
/// knows nothing about events or callback contexts.
pub trait SchedulerDelegate {
    fn on_timer_fired(&mut self, id: TimerId);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`]s through this port.
pub trait EventSink {
    fn emit(&mut self, event: &AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Port bundles
// ───────────────────────────────────────────────────────────────

/// Everything the mesh stack adapter provides.
pub trait MeshStack: NetworkStatusPort + ServiceRegistrationPort + RequestPort {}

impl<T: NetworkStatusPort + ServiceRegistrationPort + RequestPort> MeshStack for T {}

/// Everything the board adapter provides.  `DelayNs` realises the grace
/// pause before disruptive actions.
pub trait Board: ActuatorPort + SensorPort + SystemPort + DelayNs {}

impl<T: ActuatorPort + SensorPort + SystemPort + DelayNs> Board for T {}

/// Borrowed set of adapters handed to the service for one event.
pub struct Ports<'a, N, B, S, E> {
    pub net: &'a mut N,
    pub board: &'a mut B,
    pub sched: &'a mut S,
    pub sink: &'a mut E,
}

impl<'a, N, B, S, E> Ports<'a, N, B, S, E>
where
    N: MeshStack,
    B: Board,
    S: SchedulerPort,
    E: EventSink,
{
    pub fn new(net: &'a mut N, board: &'a mut B, sched: &'a mut S, sink: &'a mut E) -> Self {
        Self {
            net,
            board,
            sched,
            sink,
        }
    }
}
