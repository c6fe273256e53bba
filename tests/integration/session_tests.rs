//! Session FSM driven by role changes: connect side effects, episode
//! teardown and service registration.

use meshnode::app::events::AppEvent;
use meshnode::app::model::{DeviceRole, IndicatorMode};
use meshnode::app::registration::{RegistrationOutcome, RegistrationState};
use meshnode::app::wire::{Destination, MESH_LOCAL_ALL_NODES, Method, ReplyKind, resource};
use meshnode::config::NodeConfig;
use meshnode::error::RegistrationError;
use meshnode::events::Event;
use meshnode::fsm::SessionState;

use crate::mock_platform::{Harness, MockMesh, PEER, SrpCall};

#[test]
fn starts_disconnected_and_quiet() {
    let h = Harness::new();
    assert_eq!(h.service.session_state(), SessionState::Disconnected);
    assert!(h.mesh.sent.is_empty());
    assert!(h.board.indicator.is_empty());
    assert_eq!(h.sink.events, vec![AppEvent::Started(SessionState::Disconnected)]);
}

#[test]
fn attach_connects_and_provisions() {
    let mut h = Harness::new();
    h.attach();

    assert_eq!(h.service.session_state(), SessionState::Connected);
    assert_eq!(h.board.last_indicator(), Some(IndicatorMode::On));

    let provisioning = h.mesh.sent_to(resource::PROVISIONING);
    assert_eq!(provisioning.len(), 1);
    assert_eq!(provisioning[0].method, Method::Get);
    assert_eq!(
        provisioning[0].destination,
        Destination::Multicast(MESH_LOCAL_ALL_NODES)
    );
    assert!(provisioning[0].payload.is_empty());
    assert_eq!(provisioning[0].reply, Some(ReplyKind::Provisioning));

    assert_eq!(
        h.sink.count(|e| matches!(
            e,
            AppEvent::SessionChanged {
                from: SessionState::Disconnected,
                to: SessionState::Connected
            }
        )),
        1
    );
}

#[test]
fn registration_advertises_host_and_service() {
    let mut h = Harness::new();
    h.attach();

    let eid = h.mesh.identity.mesh_local_eid;
    assert_eq!(h.mesh.srp.len(), 4);
    assert_eq!(h.mesh.srp[0], SrpCall::HostName("aabbccddeeff0001".into()));
    assert_eq!(h.mesh.srp[1], SrpCall::HostAddress(eid));
    let SrpCall::Service(service) = &h.mesh.srp[2] else {
        panic!("expected service record, got {:?}", h.mesh.srp[2]);
    };
    assert_eq!(service.instance.as_str(), "meshnode-aabbccddeeff0001");
    assert_eq!(service.service_type, "_coap._udp");
    assert_eq!(service.port, 12345);
    assert_eq!(service.txt[0].as_str(), "eui64=0011223344556677");
    assert_eq!(h.mesh.srp[3], SrpCall::Autostart);

    assert_eq!(h.service.registration_state(), RegistrationState::InProgress);
}

#[test]
fn registration_prefers_slaac_address() {
    let mut mesh = MockMesh::new();
    let global = "2001:db8::42".parse().unwrap();
    mesh.identity.slaac_address = Some(global);
    let mut h = Harness::with_mesh(
        NodeConfig {
            auto_join: false,
            ..NodeConfig::default()
        },
        mesh,
    );
    h.attach();
    assert_eq!(h.mesh.srp[1], SrpCall::HostAddress(global));
}

#[test]
fn first_registration_starts_management_once() {
    let mut h = Harness::new();
    h.attach();
    h.handle(Event::RegistrationCompleted(RegistrationOutcome::Registered));
    h.handle(Event::RegistrationCompleted(RegistrationOutcome::Registered));

    assert_eq!(h.service.registration_state(), RegistrationState::Registered);
    assert_eq!(h.board.management_starts, 1);
    assert_eq!(
        h.sink
            .count(|e| *e == AppEvent::RegistrationChanged(RegistrationState::Registered)),
        1
    );
}

#[test]
fn registration_failure_is_logged_not_retried() {
    let mut h = Harness::new();
    h.attach();
    let calls = h.mesh.srp.len();
    h.handle(Event::RegistrationCompleted(RegistrationOutcome::Failed(
        RegistrationError::Rejected,
    )));

    assert_eq!(h.service.registration_state(), RegistrationState::Failed);
    assert_eq!(h.mesh.srp.len(), calls);
    assert_eq!(h.board.management_starts, 0);
}

#[test]
fn detach_forgets_peer_and_blinks() {
    let mut h = Harness::new();
    h.connect_fully();
    assert_eq!(h.service.peer_address(), Some(PEER));

    h.detach();
    assert_eq!(h.service.session_state(), SessionState::Disconnected);
    assert_eq!(h.service.peer_address(), None);
    assert_eq!(h.service.registration_state(), RegistrationState::NotStarted);
    assert_eq!(
        h.board.last_indicator(),
        Some(IndicatorMode::Blink { period_ms: 1000 })
    );
}

#[test]
fn reconnect_registers_again() {
    let mut h = Harness::new();
    h.connect_fully();
    h.detach();
    h.mesh.srp.clear();

    h.attach();
    assert_eq!(h.service.registration_state(), RegistrationState::InProgress);
    assert!(h.mesh.srp.contains(&SrpCall::Autostart));
    assert_eq!(h.mesh.sent_to(resource::PROVISIONING).len(), 2);
}

#[test]
fn router_and_leader_count_as_attached() {
    let mut h = Harness::new();
    h.handle(Event::RoleChanged(DeviceRole::Router));
    assert_eq!(h.service.session_state(), SessionState::Connected);
    h.handle(Event::RoleChanged(DeviceRole::Leader));
    assert_eq!(h.service.session_state(), SessionState::Connected);
    assert_eq!(h.mesh.sent_to(resource::PROVISIONING).len(), 1);
    h.handle(Event::RoleChanged(DeviceRole::Disabled));
    assert_eq!(h.service.session_state(), SessionState::Disconnected);
}

#[test]
fn stack_already_attached_at_boot() {
    let mut mesh = MockMesh::new();
    mesh.role = DeviceRole::Child;
    let h = Harness::with_mesh(NodeConfig::default(), mesh);

    assert_eq!(h.service.session_state(), SessionState::Connected);
    assert_eq!(h.mesh.joiner_starts, 0, "no commissioning when a dataset exists");
    assert_eq!(h.mesh.sent_to(resource::PROVISIONING).len(), 1);
}
