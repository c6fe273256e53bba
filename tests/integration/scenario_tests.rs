//! End-to-end scenarios: a node coming up, serving commands, losing the
//! network and coming back.

use meshnode::app::events::AppEvent;
use meshnode::app::model::{DeviceRole, JoinerState};
use meshnode::app::registration::{RegistrationOutcome, RegistrationState};
use meshnode::app::wire::{Destination, MESH_LOCAL_ALL_NODES, Method, resource};
use meshnode::config::NodeConfig;
use meshnode::events::Event;
use meshnode::fsm::SessionState;

use crate::mock_platform::{Harness, PEER};

#[test]
fn child_provision_detach() {
    let mut h = Harness::new();

    h.attach();
    let provisioning = h.mesh.sent_to(resource::PROVISIONING);
    assert_eq!(provisioning.len(), 1);
    assert_eq!(provisioning[0].method, Method::Get);
    assert_eq!(
        provisioning[0].destination,
        Destination::Multicast(MESH_LOCAL_ALL_NODES)
    );

    h.provision(PEER);
    assert_eq!(h.service.peer_address(), Some(PEER));
    let status = h.mesh.sent_to(resource::STATUS);
    assert_eq!(status.len(), 1);
    assert_eq!(status[0].destination, Destination::Unicast(PEER));

    h.detach();
    assert_eq!(h.service.peer_address(), None);
    h.handle(Event::ReportRequested);
    h.run_for(10_000);
    assert_eq!(h.mesh.sent_to(resource::STATUS).len(), 1, "no reports while detached");
}

#[test]
fn boot_join_connect_report() {
    let mut h = Harness::with_config(NodeConfig::default());
    assert_eq!(h.service.session_state(), SessionState::Connecting);

    // Two failed commissioning rounds, then success.
    h.handle(Event::JoinerStateChanged(JoinerState::Idle));
    h.handle(Event::JoinerStateChanged(JoinerState::Idle));
    h.handle(Event::JoinerStateChanged(JoinerState::Joined));
    h.attach();
    assert_eq!(h.mesh.joiner_starts, 3);

    h.provision(PEER);
    h.handle(Event::RegistrationCompleted(RegistrationOutcome::Registered));
    assert_eq!(h.service.registration_state(), RegistrationState::Registered);

    h.run_for(3_000);
    assert_eq!(h.mesh.sent_to(resource::STATUS).len(), 2);

    let transitions: Vec<_> = h
        .sink
        .events
        .iter()
        .filter_map(|e| match e {
            AppEvent::SessionChanged { to, .. } => Some(*to),
            _ => None,
        })
        .collect();
    assert_eq!(
        transitions,
        vec![
            SessionState::Connecting,
            SessionState::Disconnected,
            SessionState::Connected
        ]
    );
}

#[test]
fn role_flaps_track_last_classification() {
    let mut h = Harness::new();
    let roles = [
        DeviceRole::Detached,
        DeviceRole::Child,
        DeviceRole::Child,
        DeviceRole::Router,
        DeviceRole::Detached,
        DeviceRole::Disabled,
        DeviceRole::Leader,
    ];
    for role in roles {
        h.mesh.role = role;
        h.handle(Event::RoleChanged(role));
        let expected = if role.is_attached() {
            SessionState::Connected
        } else {
            SessionState::Disconnected
        };
        assert_eq!(h.service.session_state(), expected, "after {role:?}");
        if !role.is_attached() {
            assert_eq!(h.service.peer_address(), None);
        }
    }
    // One provisioning request per episode: Child and Leader.
    assert_eq!(h.mesh.sent_to(resource::PROVISIONING).len(), 2);
}

#[test]
fn commands_work_before_provisioning() {
    let mut h = Harness::new();
    h.attach();
    let resp = h.command(r#"{"cmd":"onoff","obj":"all","val":1}"#);
    assert_eq!(resp["err_code"], 0);
    assert!(h.board.groups.iter().all(|g| g.on));
    assert_eq!(
        h.sink.count(|e| *e
            == AppEvent::CommandHandled {
                command: "onoff",
                err_code: 0
            }),
        1
    );
}
