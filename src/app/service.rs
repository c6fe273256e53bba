//! Application service: the hexagonal core.
//!
//! [`NodeService`] owns the session FSM, the join controller and the
//! poll-period boost.  It exposes a hardware-agnostic API: every input
//! arrives as an [`Event`], every output leaves through a port trait
//! injected at call sites, so the whole engine runs against mocks.
//!
//! ```text
//!  Event ──▶ ┌──────────────────────────────┐ ──▶ MeshStack
//!            │          NodeService          │ ──▶ Board
//!            │  Session FSM · Join · Work Q  │ ──▶ SchedulerPort
//!            └──────────────────────────────┘ ──▶ EventSink
//! ```
//!
//! Handling one event is three steps: apply it to the session, step the
//! FSM, then run every queued [`Work`] item in FIFO order.

use core::net::Ipv6Addr;

use log::{debug, info, warn};

use crate::config::NodeConfig;
use crate::error::{Error, ProvisioningError, Result, TransportError};
use crate::events::Event;
use crate::fsm::context::Session;
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, SessionState};
use crate::scheduler::TimerId;

use super::commands::CommandId;
use super::dispatch;
use super::events::AppEvent;
use super::join::{JoinController, JoinState, RetryDecision};
use super::model::{DeviceRole, IndicatorMode, JoinerState};
use super::ports::{Board, EventSink, MeshStack, Ports, SchedulerPort};
use super::provisioning::{self, PollBoost};
use super::registration::{Advance, RegistrationOutcome, RegistrationState, ServiceDescription};
use super::report::{ReportInterval, SensorData, StatusReport};
use super::trigger::{self, TriggerEvent, TriggerReport};
use super::wire::{Destination, InboundRequest, Method, OutboundRequest, ReplyKind, resource};
use super::work::Work;

// ───────────────────────────────────────────────────────────────
// NodeService
// ───────────────────────────────────────────────────────────────

pub struct NodeService {
    config: NodeConfig,
    fsm: Fsm,
    session: Session,
    join: JoinController,
    poll_boost: PollBoost,
}

impl NodeService {
    /// Construct the service from configuration.
    ///
    /// Does **not** start the FSM: call [`start`](Self::start) next.
    pub fn new(config: NodeConfig) -> Result<Self> {
        config.validate()?;
        let interval = ReportInterval::from_secs(config.report_interval_secs)
            .ok_or(Error::Config("report_interval_secs must be > 0"))?;
        let join = JoinController::new(config.commissioning_timeout_secs, config.max_join_attempts);

        Ok(Self {
            fsm: Fsm::new(build_state_table(), SessionState::Disconnected),
            session: Session::new(interval),
            join,
            poll_boost: PollBoost::new(),
            config,
        })
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Start the FSM.  A stack that restored its dataset may already be
    /// attached; otherwise an automatic join is kicked if configured.
    pub fn start<N, B, S, E>(&mut self, ports: &mut Ports<'_, N, B, S, E>)
    where
        N: MeshStack,
        B: Board,
        S: SchedulerPort,
        E: EventSink,
    {
        self.fsm.start(&mut self.session);
        ports.sink.emit(&AppEvent::Started(self.fsm.current_state()));
        info!("NodeService started in {:?}", self.fsm.current_state());

        let role = ports.net.role();
        if role.is_attached() {
            self.on_role_changed(role, ports);
        } else if self.config.auto_join {
            self.request_join(ports);
        }
        self.run_pending(ports);
    }

    // ── Event handling ────────────────────────────────────────

    /// Apply one event, step the FSM and run the work it produced.
    pub fn handle_event<N, B, S, E>(&mut self, event: Event, ports: &mut Ports<'_, N, B, S, E>)
    where
        N: MeshStack,
        B: Board,
        S: SchedulerPort,
        E: EventSink,
    {
        match event {
            Event::RoleChanged(role) => self.on_role_changed(role, ports),
            Event::JoinerStateChanged(state) => self.on_joiner_state(state, ports),
            Event::Reply { kind, payload } => self.on_reply(kind, &payload, ports),
            Event::ReplyTimedOut(kind) => self.on_reply_timeout(kind, ports),
            Event::RegistrationCompleted(outcome) => self.on_registration(outcome, ports),
            Event::CommandReceived(request) => self.on_command(request, ports),
            Event::TimerFired(id) => self.on_timer(id, ports),
            Event::JoinRequested => self.request_join(ports),
            Event::FactoryResetRequested => {
                info!("NodeService: factory reset requested locally");
                self.session.submit(Work::FactoryReset { grace_ms: 0 });
            }
            Event::ReportRequested => self.session.submit(Work::ReportStatus),
            Event::SetTestingMode(on) => self.set_testing_mode(on, ports),
            Event::Trigger(trigger) => self.session.submit(Work::EmitTrigger(trigger)),
        }
        self.run_pending(ports);
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn session_state(&self) -> SessionState {
        self.fsm.current_state()
    }

    /// Coordinator address, if provisioning has succeeded this episode.
    pub fn peer_address(&self) -> Option<Ipv6Addr> {
        self.session.peer
    }

    pub fn registration_state(&self) -> RegistrationState {
        self.session.registration.state()
    }

    pub fn report_interval(&self) -> ReportInterval {
        self.session.report_interval
    }

    pub fn testing_mode(&self) -> bool {
        self.session.testing_mode
    }

    pub fn join_state(&self) -> JoinState {
        self.join.state()
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    // ── Network events ────────────────────────────────────────

    fn on_role_changed<N, B, S, E>(&mut self, role: DeviceRole, ports: &mut Ports<'_, N, B, S, E>)
    where
        N: MeshStack,
        B: Board,
        S: SchedulerPort,
        E: EventSink,
    {
        debug!("NodeService: role {:?}", role);
        self.session.attached = role.is_attached();
        if self.session.attached {
            self.join.on_joined();
        }
        self.sync_session(ports);
    }

    fn on_joiner_state<N, B, S, E>(&mut self, state: JoinerState, ports: &mut Ports<'_, N, B, S, E>)
    where
        N: MeshStack,
        B: Board,
        S: SchedulerPort,
        E: EventSink,
    {
        match state {
            JoinerState::Idle => match self.join.on_joiner_idle(ports.sched.now_ms()) {
                RetryDecision::Retry { attempt } => {
                    debug!("Join: retry #{}", attempt);
                    if let Err(e) = ports.net.start_joiner() {
                        warn!("Join: retry could not start: {}", e);
                        self.join.abandon();
                        self.session.submit(Work::IndicateIdle);
                    }
                }
                RetryDecision::GiveUp { attempts } => {
                    self.session.submit(Work::IndicateIdle);
                    ports.sink.emit(&AppEvent::JoinGaveUp { attempts });
                }
                RetryDecision::Ignore => {}
            },
            JoinerState::Joined => self.join.on_joined(),
            other => debug!("Join: joiner {:?}", other),
        }
        self.sync_session(ports);
    }

    fn request_join<N, B, S, E>(&mut self, ports: &mut Ports<'_, N, B, S, E>)
    where
        N: MeshStack,
        B: Board,
        S: SchedulerPort,
        E: EventSink,
    {
        if self.fsm.current_state() == SessionState::Connected {
            info!("Join: already connected");
            return;
        }
        if let Err(e) = self.join.begin(ports.sched.now_ms()) {
            info!("Join: request ignored ({:?})", e);
            return;
        }
        match ports.net.start_joiner() {
            Ok(()) => self.session.submit(Work::IndicateJoining),
            Err(e) => {
                warn!("Join: joiner start failed: {}", e);
                self.join.abandon();
            }
        }
        self.sync_session(ports);
    }

    fn on_reply<N, B, S, E>(&mut self, kind: ReplyKind, payload: &[u8], ports: &mut Ports<'_, N, B, S, E>)
    where
        N: MeshStack,
        B: Board,
        S: SchedulerPort,
        E: EventSink,
    {
        match kind {
            ReplyKind::Provisioning => self.on_provisioning_reply(payload, ports),
            ReplyKind::Status => debug!("Status: delivered"),
            ReplyKind::Trigger => debug!("Trigger: delivered"),
        }
    }

    /// Requests are fire-and-forget; only the provisioning boost needs
    /// undoing when the coordinator stays silent.
    fn on_reply_timeout<N, B, S, E>(&mut self, kind: ReplyKind, ports: &mut Ports<'_, N, B, S, E>)
    where
        N: MeshStack,
        B: Board,
        S: SchedulerPort,
        E: EventSink,
    {
        match kind {
            ReplyKind::Provisioning => {
                info!("Provisioning: no reply");
                self.poll_boost.restore(ports.net);
            }
            ReplyKind::Status | ReplyKind::Trigger => debug!("{:?}: no reply", kind),
        }
    }

    fn on_provisioning_reply<N, B, S, E>(&mut self, payload: &[u8], ports: &mut Ports<'_, N, B, S, E>)
    where
        N: MeshStack,
        B: Board,
        S: SchedulerPort,
        E: EventSink,
    {
        self.poll_boost.restore(ports.net);

        let addr = match provisioning::parse_reply(payload) {
            Ok(addr) => addr,
            Err(e) => {
                warn!("Provisioning: reply dropped: {}", e);
                return;
            }
        };
        if self.fsm.current_state() != SessionState::Connected {
            info!("Provisioning: reply arrived after disconnect, ignored");
            return;
        }

        info!("Provisioning: peer {}", addr);
        self.session.peer = Some(addr);
        ports.sink.emit(&AppEvent::PeerDiscovered(addr));
        self.session.submit(Work::ReportStatus);
    }

    fn on_registration<N, B, S, E>(
        &mut self,
        outcome: RegistrationOutcome,
        ports: &mut Ports<'_, N, B, S, E>,
    ) where
        N: MeshStack,
        B: Board,
        S: SchedulerPort,
        E: EventSink,
    {
        match self.session.registration.apply(outcome) {
            Advance::FirstRegistration => {
                info!("Registration: service registered");
                ports.board.start_management();
                if !self.session.testing_mode {
                    self.start_report_timer(ports.sched);
                }
            }
            Advance::Failed => warn!("Registration: failed ({:?})", outcome),
            Advance::Unchanged => {
                debug!("Registration: {:?} ignored", outcome);
                return;
            }
        }
        ports
            .sink
            .emit(&AppEvent::RegistrationChanged(self.session.registration.state()));
    }

    fn on_command<N, B, S, E>(&mut self, request: InboundRequest, ports: &mut Ports<'_, N, B, S, E>)
    where
        N: MeshStack,
        B: Board,
        S: SchedulerPort,
        E: EventSink,
    {
        if request.method != Method::Put {
            warn!("Cmd: {:?} on command resource dropped", request.method);
            return;
        }

        let outcome = dispatch::dispatch(
            &request.payload,
            &mut self.session,
            &self.config,
            ports.net,
            ports.board,
            ports.sched,
        );

        if let Err(e) = ports.net.respond(request.token, &outcome.encode()) {
            warn!("Cmd: response not sent: {}", e);
        }
        ports.sink.emit(&AppEvent::CommandHandled {
            command: outcome.command.map_or("unknown", CommandId::name),
            err_code: outcome.err_code,
        });

        if let Some(work) = outcome.follow_up {
            self.session.submit(work);
        }
    }

    // ── Local events ──────────────────────────────────────────

    fn on_timer<N, B, S, E>(&mut self, id: TimerId, ports: &mut Ports<'_, N, B, S, E>)
    where
        N: MeshStack,
        B: Board,
        S: SchedulerPort,
        E: EventSink,
    {
        match id {
            TimerId::Report => self.session.submit(Work::ReportStatus),
            TimerId::LightOff(group) => {
                if let Err(e) = ports.board.set_group_power(group, false) {
                    warn!("Light: delayed off of {} failed: {}", group.name(), e);
                }
            }
        }
    }

    fn set_testing_mode<N, B, S, E>(&mut self, on: bool, ports: &mut Ports<'_, N, B, S, E>)
    where
        N: MeshStack,
        B: Board,
        S: SchedulerPort,
        E: EventSink,
    {
        if on == self.session.testing_mode {
            return;
        }
        if on && self.fsm.current_state() != SessionState::Connected {
            warn!("Testing: only available while connected");
            return;
        }

        self.session.testing_mode = on;
        if on {
            ports.sched.stop(TimerId::Report);
        } else if self.session.registration.state() == RegistrationState::Registered {
            self.start_report_timer(ports.sched);
        }
        info!("Testing: {}", if on { "enabled" } else { "disabled" });
        ports.sink.emit(&AppEvent::TestingModeChanged(on));
    }

    // ── Internal ──────────────────────────────────────────────

    /// Push the join controller's view into the session and step the FSM.
    fn sync_session<N, B, S, E>(&mut self, ports: &mut Ports<'_, N, B, S, E>)
    where
        N: MeshStack,
        B: Board,
        S: SchedulerPort,
        E: EventSink,
    {
        self.session.join_active = self.join.is_joining();
        let from = self.fsm.current_state();
        if self.fsm.step(&mut self.session) {
            let to = self.fsm.current_state();
            ports.sink.emit(&AppEvent::SessionChanged { from, to });
        }
    }

    fn start_report_timer(&self, sched: &mut impl SchedulerPort) {
        sched.start_periodic(
            TimerId::Report,
            self.config.report_initial_delay_ms,
            self.session.report_interval.period_ms(),
        );
    }

    fn run_pending<N, B, S, E>(&mut self, ports: &mut Ports<'_, N, B, S, E>)
    where
        N: MeshStack,
        B: Board,
        S: SchedulerPort,
        E: EventSink,
    {
        while let Some(work) = self.session.work.pop() {
            self.execute(work, ports);
        }
    }

    fn execute<N, B, S, E>(&mut self, work: Work, ports: &mut Ports<'_, N, B, S, E>)
    where
        N: MeshStack,
        B: Board,
        S: SchedulerPort,
        E: EventSink,
    {
        match work {
            Work::IndicateConnected => ports.board.set_indicator(IndicatorMode::On),
            Work::IndicateDisconnected => ports.board.set_indicator(IndicatorMode::Blink {
                period_ms: self.config.disconnected_blink_ms,
            }),
            Work::IndicateJoining => ports.board.set_indicator(IndicatorMode::Blink {
                period_ms: self.config.joining_blink_ms,
            }),
            Work::IndicateIdle => ports.board.set_indicator(IndicatorMode::Off),
            Work::SendProvisioning => self.send_provisioning(ports),
            Work::ReleasePollBoost => self.poll_boost.restore(ports.net),
            Work::BeginRegistration => {
                if let Err(e) = self.begin_registration(ports) {
                    warn!("Registration: could not start: {}", e);
                    self.session.registration.fail();
                    ports
                        .sink
                        .emit(&AppEvent::RegistrationChanged(RegistrationState::Failed));
                }
            }
            Work::ReportStatus => {
                if let Err(e) = self.send_status(ports) {
                    warn!("Status: not sent: {}", e);
                }
            }
            Work::EmitTrigger(trigger) => {
                if let Err(e) = self.send_trigger(&trigger, ports) {
                    warn!("Trigger: {:?} dropped: {}", trigger.kind, e);
                }
            }
            Work::StartManagement => ports.board.start_management(),
            Work::FactoryReset { grace_ms } => {
                ports.board.delay_ms(grace_ms);
                info!("NodeService: deregistering before factory reset");
                if let Err(e) = ports.net.remove_all(self.config.deregister_timeout_ms) {
                    warn!("Registration: removal failed: {}", e);
                }
                ports.net.factory_reset();
                self.join.reset();
            }
            Work::Reboot { grace_ms } => {
                ports.board.delay_ms(grace_ms);
                info!("NodeService: rebooting");
                ports.board.reboot();
            }
        }
    }

    fn send_provisioning<N, B, S, E>(&mut self, ports: &mut Ports<'_, N, B, S, E>)
    where
        N: MeshStack,
        B: Board,
        S: SchedulerPort,
        E: EventSink,
    {
        if self.fsm.current_state() != SessionState::Connected {
            debug!("Provisioning: not connected");
            return;
        }
        if self.session.testing_mode {
            debug!("Provisioning: suspended in testing mode");
            return;
        }

        self.poll_boost
            .engage(ports.net, self.config.boosted_poll_period_ms);
        match ports.net.send(&provisioning::request()) {
            Ok(()) => info!("Provisioning: request sent"),
            Err(e) => {
                warn!("Provisioning: request not sent: {}", e);
                self.poll_boost.restore(ports.net);
            }
        }
    }

    fn begin_registration<N, B, S, E>(&mut self, ports: &mut Ports<'_, N, B, S, E>) -> Result<()>
    where
        N: MeshStack,
        B: Board,
        S: SchedulerPort,
        E: EventSink,
    {
        if !self.session.registration.can_begin() {
            return Ok(());
        }

        let id = ports.net.identity();
        let service = ServiceDescription::for_node(
            &id,
            &self.config.service_instance_prefix,
            self.config.service_port,
            &self.config.sw_version,
        );

        ports.net.set_host_name(&id.ext_address_hex())?;
        ports.net.set_host_address(id.registration_address())?;
        ports.net.add_service(&service)?;
        ports.net.enable_autostart()?;

        self.session.registration.begin();
        info!("Registration: {} in progress", service.instance);
        ports
            .sink
            .emit(&AppEvent::RegistrationChanged(RegistrationState::InProgress));
        Ok(())
    }

    fn send_status<N, B, S, E>(&mut self, ports: &mut Ports<'_, N, B, S, E>) -> Result<()>
    where
        N: MeshStack,
        B: Board,
        S: SchedulerPort,
        E: EventSink,
    {
        if self.session.testing_mode {
            debug!("Status: suspended in testing mode");
            return Ok(());
        }
        if self.fsm.current_state() != SessionState::Connected {
            debug!("Status: not connected, skipped");
            return Ok(());
        }
        let Some(peer) = self.session.peer else {
            self.session.submit(Work::SendProvisioning);
            return Err(ProvisioningError::PeerUnknown.into());
        };

        if let Err(e) = ports.board.sample_all() {
            warn!("Status: sensor sample failed: {}", e);
        }
        let report = StatusReport::build(
            &ports.net.identity(),
            SensorData::read(&*ports.board),
            self.session.report_interval,
            &self.config.sw_version,
            &self.config.dev_fw_type,
        );
        let payload = serde_json::to_vec(&report).map_err(|_| TransportError::NoBufs)?;

        ports.net.send(&OutboundRequest {
            method: Method::Put,
            destination: Destination::Unicast(peer),
            resource: resource::STATUS,
            payload: &payload,
            reply: Some(ReplyKind::Status),
        })?;

        info!("Status: reported to {}", peer);
        ports.board.set_indicator(IndicatorMode::Pulse {
            duration_ms: self.config.trigger_pulse_ms,
        });
        ports.sink.emit(&AppEvent::StatusReported { peer });
        Ok(())
    }

    fn send_trigger<N, B, S, E>(
        &mut self,
        trigger: &TriggerEvent,
        ports: &mut Ports<'_, N, B, S, E>,
    ) -> Result<()>
    where
        N: MeshStack,
        B: Board,
        S: SchedulerPort,
        E: EventSink,
    {
        if self.fsm.current_state() != SessionState::Connected {
            debug!("Trigger: not connected, skipped");
            return Ok(());
        }
        let route = match trigger::route(self.session.testing_mode, self.session.peer) {
            Ok(route) => route,
            Err(e) => {
                self.session.submit(Work::SendProvisioning);
                return Err(e.into());
            }
        };

        let eui64 = ports.net.identity().eui64_hex();
        let body = TriggerReport {
            eui64: &eui64,
            event: trigger,
        };
        let payload = serde_json::to_vec(&body).map_err(|_| TransportError::NoBufs)?;
        let broadcast = matches!(route.destination, Destination::Multicast(_));

        ports.net.send(&OutboundRequest {
            method: Method::Put,
            destination: route.destination,
            resource: route.resource,
            payload: &payload,
            reply: (!broadcast).then_some(ReplyKind::Trigger),
        })?;

        if route.pulse {
            ports.board.set_indicator(IndicatorMode::Pulse {
                duration_ms: self.config.trigger_pulse_ms,
            });
        }
        ports.sink.emit(&AppEvent::TriggerSent {
            kind: trigger.kind,
            broadcast,
        });
        Ok(())
    }
}
