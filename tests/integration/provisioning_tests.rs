//! Provisioning handshake, poll boost and periodic status reports.

use core::net::Ipv6Addr;

use meshnode::app::events::AppEvent;
use meshnode::app::model::{IndicatorMode, LinkMode};
use meshnode::app::registration::RegistrationOutcome;
use meshnode::app::wire::{Destination, Method, ReplyKind, resource};
use meshnode::error::TransportError;
use meshnode::events::Event;

use crate::mock_platform::{Harness, PEER};

#[test]
fn valid_reply_sets_peer_and_reports_once() {
    let mut h = Harness::new();
    h.attach();
    h.provision(PEER);

    assert_eq!(h.service.peer_address(), Some(PEER));
    let status = h.mesh.sent_to(resource::STATUS);
    assert_eq!(status.len(), 1);
    assert_eq!(status[0].method, Method::Put);
    assert_eq!(status[0].destination, Destination::Unicast(PEER));
    assert_eq!(status[0].reply, Some(ReplyKind::Status));
    assert_eq!(h.sink.count(|e| *e == AppEvent::PeerDiscovered(PEER)), 1);
}

#[test]
fn second_reply_replaces_peer() {
    let mut h = Harness::new();
    h.attach();
    let other = Ipv6Addr::new(0xfd00, 0xdb8, 0, 0, 0, 0, 0, 0x77);
    h.provision(PEER);
    h.provision(other);

    assert_eq!(h.service.peer_address(), Some(other));
    let status = h.mesh.sent_to(resource::STATUS);
    assert_eq!(status.len(), 2, "one immediate report per accepted reply");
    assert_eq!(status[1].destination, Destination::Unicast(other));
}

#[test]
fn wrong_length_reply_is_dropped() {
    let mut h = Harness::new();
    h.attach();
    for len in [0usize, 4, 15, 17, 32] {
        h.handle(Event::Reply {
            kind: ReplyKind::Provisioning,
            payload: vec![0xfd; len],
        });
    }
    assert_eq!(h.service.peer_address(), None);
    assert!(h.mesh.sent_to(resource::STATUS).is_empty());
}

#[test]
fn reply_after_disconnect_is_ignored() {
    let mut h = Harness::new();
    h.attach();
    h.detach();
    h.provision(PEER);
    assert_eq!(h.service.peer_address(), None);
    assert!(h.mesh.sent_to(resource::STATUS).is_empty());
}

#[test]
fn status_payload_carries_identity_and_readings() {
    let mut h = Harness::new();
    h.attach();
    h.provision(PEER);

    let body = h.mesh.sent_to(resource::STATUS)[0].json();
    assert_eq!(body["eui64"], "0011223344556677");
    assert_eq!(body["extaddr"], "aabbccddeeff0001");
    assert_eq!(body["addr"], "fd00:db8::1:2:3:4");
    assert_eq!(body["rloc16"], 0x2c01);
    assert_eq!(body["thread_version"], 4);
    assert_eq!(body["version"], "mock-stack/1.0");
    assert_eq!(body["report_intervel"], 300);
    assert_eq!(body["dev_fw_type"], "sensor_light");
    assert_eq!(body["data"]["temperature"], 22.25);
    assert_eq!(body["data"]["humidity"], 48.5);
    assert_eq!(body["data"]["press"], 101.25);
    assert_eq!(body["data"]["battery_level"], 100.0);
    assert_eq!(h.board.samples, 1);
}

#[test]
fn sleepy_device_boosts_poll_until_reply() {
    let mut h = Harness::new();
    h.attach();
    assert_eq!(h.mesh.poll_period_ms, 100, "boosted while waiting");

    h.provision(PEER);
    assert_eq!(h.mesh.poll_period_ms, 3_000);
    assert_eq!(h.mesh.poll_history, vec![100, 3_000]);
}

#[test]
fn malformed_reply_still_restores_poll() {
    let mut h = Harness::new();
    h.attach();
    h.handle(Event::Reply {
        kind: ReplyKind::Provisioning,
        payload: vec![1, 2, 3],
    });
    assert_eq!(h.mesh.poll_period_ms, 3_000);
}

#[test]
fn rx_on_device_keeps_poll_period() {
    let mut h = Harness::new();
    h.mesh.link_mode = LinkMode::from_flags("rdn").unwrap();
    h.attach();
    h.provision(PEER);
    assert!(h.mesh.poll_history.is_empty());
}

#[test]
fn failed_send_restores_poll() {
    let mut h = Harness::new();
    h.mesh.send_result = Err(TransportError::NoBufs);
    h.attach();
    assert!(h.mesh.sent.is_empty());
    assert_eq!(h.mesh.poll_period_ms, 3_000);
}

#[test]
fn status_report_pulses_indicator() {
    let mut h = Harness::new();
    h.attach();
    assert_eq!(h.board.last_indicator(), Some(IndicatorMode::On));

    h.provision(PEER);
    assert_eq!(h.mesh.sent_to(resource::STATUS).len(), 1);
    assert_eq!(
        h.board.last_indicator(),
        Some(IndicatorMode::Pulse { duration_ms: 100 })
    );
}

#[test]
fn unsent_status_does_not_pulse() {
    let mut h = Harness::new();
    h.attach();
    h.mesh.send_result = Err(TransportError::NoBufs);
    h.provision(PEER);
    assert_eq!(h.board.last_indicator(), Some(IndicatorMode::On));
}

#[test]
fn unanswered_request_restores_poll() {
    let mut h = Harness::new();
    h.attach();
    assert_eq!(h.mesh.poll_period_ms, 100);

    h.handle(Event::ReplyTimedOut(ReplyKind::Provisioning));
    assert_eq!(h.mesh.poll_period_ms, 3_000);
    assert_eq!(h.service.peer_address(), None);

    // A later retry boosts again.
    h.handle(Event::ReportRequested);
    assert_eq!(h.mesh.poll_history, vec![100, 3_000, 100]);
}

#[test]
fn other_timeouts_leave_poll_boosted() {
    let mut h = Harness::new();
    h.attach();
    h.handle(Event::ReplyTimedOut(ReplyKind::Status));
    h.handle(Event::ReplyTimedOut(ReplyKind::Trigger));
    assert_eq!(h.mesh.poll_period_ms, 100);
}

#[test]
fn detach_without_reply_restores_poll() {
    let mut h = Harness::new();
    h.attach();
    h.run_for(600_000);
    h.detach();
    h.run_for(600_000);
    assert_eq!(h.mesh.poll_period_ms, 3_000);

    h.attach();
    assert_eq!(h.mesh.poll_period_ms, 100, "boosted again on reconnect");
    h.provision(PEER);
    assert_eq!(h.mesh.poll_period_ms, 3_000);
}

#[test]
fn report_timer_starts_on_registration() {
    let mut h = Harness::new();
    h.connect_fully();
    assert_eq!(h.mesh.sent_to(resource::STATUS).len(), 1);

    h.run_for(2_900);
    assert_eq!(h.mesh.sent_to(resource::STATUS).len(), 1);
    h.run_for(100);
    assert_eq!(h.mesh.sent_to(resource::STATUS).len(), 2, "first tick after 3 s");

    h.run_for(299_900);
    assert_eq!(h.mesh.sent_to(resource::STATUS).len(), 2);
    h.run_for(100);
    assert_eq!(h.mesh.sent_to(resource::STATUS).len(), 3, "then every 300 s");
}

#[test]
fn report_without_peer_reprovisions() {
    let mut h = Harness::new();
    h.attach();
    h.handle(Event::RegistrationCompleted(RegistrationOutcome::Registered));
    assert_eq!(h.mesh.sent_to(resource::PROVISIONING).len(), 1);

    h.run_for(3_000);
    assert!(h.mesh.sent_to(resource::STATUS).is_empty());
    assert_eq!(h.mesh.sent_to(resource::PROVISIONING).len(), 2);
}

#[test]
fn report_button_sends_now() {
    let mut h = Harness::new();
    h.connect_fully();
    h.handle(Event::ReportRequested);
    assert_eq!(h.mesh.sent_to(resource::STATUS).len(), 2);
}

#[test]
fn timer_ticks_after_disconnect_send_nothing() {
    let mut h = Harness::new();
    h.connect_fully();
    h.detach();
    let before = h.mesh.sent.len();
    h.run_for(10_000);
    assert_eq!(h.mesh.sent.len(), before);
}
