//! Mock platform for integration tests.
//!
//! Records every mesh and board call so tests can assert on the full
//! history without a radio or real GPIO.  The real [`Scheduler`] serves as
//! the timer port; [`Harness::advance`] ticks it and feeds expired timers
//! back into the service the same way the main loop does.

#![allow(dead_code)]

use core::net::Ipv6Addr;

use embedded_hal::delay::DelayNs;
use meshnode::app::events::AppEvent;
use meshnode::app::model::{
    DeviceRole, GroupStatus, IndicatorMode, LightGroup, LinkMode, PinState, Rgb,
};
use meshnode::app::ports::{
    ActuatorPort, EventSink, NetworkStatusPort, Ports, RequestPort, SensorPort,
    ServiceRegistrationPort, SystemPort,
};
use meshnode::app::registration::ServiceDescription;
use meshnode::app::service::NodeService;
use meshnode::app::wire::{
    Destination, InboundRequest, Method, OutboundRequest, ReplyKind, RequestToken,
};
use meshnode::config::NodeConfig;
use meshnode::error::{
    ActuatorError, NetworkError, RegistrationError, SensorError, TransportError,
};
use meshnode::events::{Event, EventQueue, QueueDelegate};
use meshnode::identity::NodeIdentity;
use meshnode::scheduler::Scheduler;

/// Coordinator address used by the provisioning replies in these tests.
pub const PEER: Ipv6Addr = Ipv6Addr::new(0xfd00, 0xdb8, 0, 0, 0, 0, 0, 0x99);

// ── Mesh stack ────────────────────────────────────────────────

/// A request captured by [`MockMesh`].
#[derive(Debug, Clone, PartialEq)]
pub struct Sent {
    pub method: Method,
    pub destination: Destination,
    pub resource: &'static str,
    pub payload: Vec<u8>,
    pub reply: Option<ReplyKind>,
}

impl Sent {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.payload).expect("payload is JSON")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SrpCall {
    HostName(String),
    HostAddress(Ipv6Addr),
    Service(ServiceDescription),
    Autostart,
    RemoveAll { timeout_ms: u32 },
}

pub struct MockMesh {
    pub role: DeviceRole,
    pub link_mode: LinkMode,
    pub poll_period_ms: u32,
    pub poll_history: Vec<u32>,
    pub identity: NodeIdentity,
    pub joiner_starts: u32,
    pub joiner_result: Result<(), NetworkError>,
    pub link_mode_result: Result<(), NetworkError>,
    pub send_result: Result<(), TransportError>,
    pub factory_resets: u32,
    pub sent: Vec<Sent>,
    pub responses: Vec<(RequestToken, serde_json::Value)>,
    pub srp: Vec<SrpCall>,
}

impl MockMesh {
    pub fn new() -> Self {
        let mut stack_version = heapless::String::new();
        let _ = stack_version.push_str("mock-stack/1.0");
        Self {
            role: DeviceRole::Disabled,
            link_mode: LinkMode::default(),
            poll_period_ms: 3_000,
            poll_history: Vec::new(),
            identity: NodeIdentity {
                eui64: [0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77],
                ext_address: [0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff, 0x00, 0x01],
                rloc16: 0x2c01,
                mesh_local_eid: Ipv6Addr::new(0xfd00, 0xdb8, 0, 0, 0x1, 0x2, 0x3, 0x4),
                slaac_address: None,
                stack_version,
                thread_version: 4,
            },
            joiner_starts: 0,
            joiner_result: Ok(()),
            link_mode_result: Ok(()),
            send_result: Ok(()),
            factory_resets: 0,
            sent: Vec::new(),
            responses: Vec::new(),
            srp: Vec::new(),
        }
    }

    pub fn sent_to(&self, resource: &str) -> Vec<&Sent> {
        self.sent.iter().filter(|s| s.resource == resource).collect()
    }

    pub fn last_response(&self) -> Option<&serde_json::Value> {
        self.responses.last().map(|(_, body)| body)
    }
}

impl Default for MockMesh {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkStatusPort for MockMesh {
    fn role(&self) -> DeviceRole {
        self.role
    }

    fn link_mode(&self) -> LinkMode {
        self.link_mode
    }

    fn set_link_mode(&mut self, mode: LinkMode) -> Result<(), NetworkError> {
        self.link_mode_result?;
        self.link_mode = mode;
        Ok(())
    }

    fn poll_period_ms(&self) -> u32 {
        self.poll_period_ms
    }

    fn set_poll_period_ms(&mut self, period_ms: u32) -> Result<(), NetworkError> {
        self.poll_period_ms = period_ms;
        self.poll_history.push(period_ms);
        Ok(())
    }

    fn identity(&self) -> NodeIdentity {
        self.identity.clone()
    }

    fn start_joiner(&mut self) -> Result<(), NetworkError> {
        self.joiner_result?;
        self.joiner_starts += 1;
        Ok(())
    }

    fn factory_reset(&mut self) {
        self.factory_resets += 1;
    }
}

impl ServiceRegistrationPort for MockMesh {
    fn set_host_name(&mut self, name: &str) -> Result<(), RegistrationError> {
        self.srp.push(SrpCall::HostName(name.to_owned()));
        Ok(())
    }

    fn set_host_address(&mut self, address: Ipv6Addr) -> Result<(), RegistrationError> {
        self.srp.push(SrpCall::HostAddress(address));
        Ok(())
    }

    fn add_service(&mut self, service: &ServiceDescription) -> Result<(), RegistrationError> {
        self.srp.push(SrpCall::Service(service.clone()));
        Ok(())
    }

    fn enable_autostart(&mut self) -> Result<(), RegistrationError> {
        self.srp.push(SrpCall::Autostart);
        Ok(())
    }

    fn remove_all(&mut self, timeout_ms: u32) -> Result<(), RegistrationError> {
        self.srp.push(SrpCall::RemoveAll { timeout_ms });
        Ok(())
    }
}

impl RequestPort for MockMesh {
    fn send(&mut self, request: &OutboundRequest<'_>) -> Result<(), TransportError> {
        self.send_result?;
        self.sent.push(Sent {
            method: request.method,
            destination: request.destination,
            resource: request.resource,
            payload: request.payload.to_vec(),
            reply: request.reply,
        });
        Ok(())
    }

    fn respond(&mut self, token: RequestToken, payload: &[u8]) -> Result<(), TransportError> {
        let body = serde_json::from_slice(payload).expect("response is JSON");
        self.responses.push((token, body));
        Ok(())
    }
}

// ── Board ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorCall {
    Power(LightGroup, bool),
    Color(LightGroup, Rgb),
    Pin(&'static str, bool),
}

pub const PIN_NAMES: [&str; 4] = ["0.15", "0.16", "0.17", "0.20"];

pub struct MockBoard {
    pub groups: [GroupStatus; 2],
    pub pins: [bool; 4],
    pub calls: Vec<ActuatorCall>,
    pub indicator: Vec<IndicatorMode>,
    pub delays_ms: Vec<u32>,
    pub samples: u32,
    pub reboots: u32,
    pub management_starts: u32,
    pub temperature: f64,
    pub power_result: Result<(), ActuatorError>,
}

impl MockBoard {
    pub fn new() -> Self {
        Self {
            groups: [GroupStatus {
                on: false,
                color: Rgb::WHITE,
            }; 2],
            pins: [false; 4],
            calls: Vec::new(),
            indicator: Vec::new(),
            delays_ms: Vec::new(),
            samples: 0,
            reboots: 0,
            management_starts: 0,
            temperature: 22.25,
            power_result: Ok(()),
        }
    }

    pub fn last_indicator(&self) -> Option<IndicatorMode> {
        self.indicator.last().copied()
    }

    fn indices(group: LightGroup) -> &'static [usize] {
        match group {
            LightGroup::All => &[0, 1],
            LightGroup::Left => &[0],
            LightGroup::Right => &[1],
        }
    }

    fn pin_index(name: &str) -> Result<usize, ActuatorError> {
        PIN_NAMES
            .iter()
            .position(|p| *p == name)
            .ok_or(ActuatorError::UnknownPin)
    }
}

impl Default for MockBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl ActuatorPort for MockBoard {
    fn set_group_power(&mut self, group: LightGroup, on: bool) -> Result<(), ActuatorError> {
        self.power_result?;
        for &i in Self::indices(group) {
            self.groups[i].on = on;
        }
        self.calls.push(ActuatorCall::Power(group, on));
        Ok(())
    }

    fn set_group_color(&mut self, group: LightGroup, color: Rgb) -> Result<(), ActuatorError> {
        for &i in Self::indices(group) {
            self.groups[i].color = color;
        }
        self.calls.push(ActuatorCall::Color(group, color));
        Ok(())
    }

    fn group_status(&self, group: LightGroup) -> Result<GroupStatus, ActuatorError> {
        Ok(self.groups[Self::indices(group)[0]])
    }

    fn set_pin(&mut self, name: &str, high: bool) -> Result<(), ActuatorError> {
        let idx = Self::pin_index(name)?;
        self.pins[idx] = high;
        self.calls.push(ActuatorCall::Pin(PIN_NAMES[idx], high));
        Ok(())
    }

    fn pin(&self, name: &str) -> Result<bool, ActuatorError> {
        Ok(self.pins[Self::pin_index(name)?])
    }

    fn pins(&self) -> heapless::Vec<PinState, 8> {
        PIN_NAMES
            .iter()
            .zip(self.pins)
            .map(|(&name, high)| PinState { name, high })
            .collect()
    }

    fn set_indicator(&mut self, mode: IndicatorMode) {
        self.indicator.push(mode);
    }
}

impl SensorPort for MockBoard {
    fn sample_all(&mut self) -> Result<(), SensorError> {
        self.samples += 1;
        Ok(())
    }

    fn temperature(&self) -> f64 {
        self.temperature
    }

    fn humidity(&self) -> f64 {
        48.5
    }

    fn light(&self) -> f64 {
        300.0
    }

    fn pressure(&self) -> f64 {
        101.25
    }

    fn battery_level(&self) -> f64 {
        100.0
    }
}

impl SystemPort for MockBoard {
    fn reboot(&mut self) {
        self.reboots += 1;
    }

    fn start_management(&mut self) {
        self.management_starts += 1;
    }
}

impl DelayNs for MockBoard {
    fn delay_ns(&mut self, ns: u32) {
        self.delays_ms.push(ns / 1_000_000);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delays_ms.push(ms);
    }
}

// ── Event sink ────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Harness ───────────────────────────────────────────────────

/// A started service wired to the mocks.
pub struct Harness {
    pub service: NodeService,
    pub mesh: MockMesh,
    pub board: MockBoard,
    pub sched: Scheduler,
    pub sink: RecordingSink,
    queue: EventQueue,
    next_token: u32,
}

impl Harness {
    /// Started with automatic join disabled.
    pub fn new() -> Self {
        Self::with_config(NodeConfig {
            auto_join: false,
            ..NodeConfig::default()
        })
    }

    pub fn with_config(config: NodeConfig) -> Self {
        Self::with_mesh(config, MockMesh::new())
    }

    pub fn with_mesh(config: NodeConfig, mesh: MockMesh) -> Self {
        let mut h = Self {
            service: NodeService::new(config).expect("valid config"),
            mesh,
            board: MockBoard::new(),
            sched: Scheduler::new(),
            sink: RecordingSink::new(),
            queue: EventQueue::new(),
            next_token: 1,
        };
        let mut ports = Ports::new(&mut h.mesh, &mut h.board, &mut h.sched, &mut h.sink);
        h.service.start(&mut ports);
        h
    }

    pub fn handle(&mut self, event: Event) {
        let mut ports = Ports::new(&mut self.mesh, &mut self.board, &mut self.sched, &mut self.sink);
        self.service.handle_event(event, &mut ports);
    }

    /// Advance the scheduler clock and deliver every timer that fired.
    pub fn advance(&mut self, ms: u32) {
        self.sched.tick(ms, &mut QueueDelegate(&self.queue));
        while let Some(event) = self.queue.pop() {
            self.handle(event);
        }
    }

    /// Advance in 100 ms steps, like a main loop would.
    pub fn run_for(&mut self, ms: u32) {
        let mut left = ms;
        while left > 0 {
            let step = left.min(100);
            self.advance(step);
            left -= step;
        }
    }

    pub fn attach(&mut self) {
        self.mesh.role = DeviceRole::Child;
        self.handle(Event::RoleChanged(DeviceRole::Child));
    }

    pub fn detach(&mut self) {
        self.mesh.role = DeviceRole::Detached;
        self.handle(Event::RoleChanged(DeviceRole::Detached));
    }

    pub fn provision(&mut self, peer: Ipv6Addr) {
        self.handle(Event::Reply {
            kind: ReplyKind::Provisioning,
            payload: peer.octets().to_vec(),
        });
    }

    /// Attached, peer known, service registered.
    pub fn connect_fully(&mut self) {
        self.attach();
        self.provision(PEER);
        self.handle(Event::RegistrationCompleted(
            meshnode::app::registration::RegistrationOutcome::Registered,
        ));
    }

    /// Deliver a `PUT cmd` request and return the JSON response.
    pub fn command(&mut self, body: &str) -> serde_json::Value {
        self.command_with(Method::Put, body.as_bytes())
            .expect("PUT is always answered")
    }

    pub fn command_with(&mut self, method: Method, body: &[u8]) -> Option<serde_json::Value> {
        let token = RequestToken(self.next_token);
        self.next_token += 1;
        let before = self.mesh.responses.len();
        self.handle(Event::CommandReceived(InboundRequest {
            token,
            method,
            payload: body.to_vec(),
        }));
        if self.mesh.responses.len() == before {
            return None;
        }
        let (answered, body) = self.mesh.responses.last().cloned()?;
        assert_eq!(answered, token, "response routed to the wrong request");
        Some(body)
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}
