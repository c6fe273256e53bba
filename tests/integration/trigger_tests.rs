//! Trigger routing in normal and testing mode.

use meshnode::app::events::AppEvent;
use meshnode::app::model::IndicatorMode;
use meshnode::app::trigger::{TriggerEvent, TriggerKind};
use meshnode::app::wire::{Destination, MESH_LOCAL_ALL_NODES, Method, ReplyKind, resource};
use meshnode::events::Event;
use meshnode::input::{self, Button};
use meshnode::drivers::button::ButtonGesture;

use crate::mock_platform::{Harness, PEER};

fn connected() -> Harness {
    let mut h = Harness::new();
    h.connect_fully();
    h
}

#[test]
fn trigger_goes_to_peer_and_pulses() {
    let mut h = connected();
    h.handle(Event::Trigger(TriggerEvent::infrared("infra_0")));

    let sent = h.mesh.sent_to(resource::TRIGGER);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].method, Method::Put);
    assert_eq!(sent[0].destination, Destination::Unicast(PEER));
    assert_eq!(sent[0].reply, Some(ReplyKind::Trigger));

    let body = sent[0].json();
    assert_eq!(body["eui64"], "0011223344556677");
    assert_eq!(body["event"]["trigger_type"], "infrared_sensor");
    assert_eq!(body["event"]["obj"], "infra_0");
    assert!(body["event"].get("value").is_none());

    assert_eq!(
        h.board.last_indicator(),
        Some(IndicatorMode::Pulse { duration_ms: 100 })
    );
}

#[test]
fn rotation_carries_value() {
    let mut h = connected();
    h.handle(input::rotation_event(-24));
    let body = h.mesh.sent_to(resource::TRIGGER)[0].json();
    assert_eq!(body["event"]["trigger_type"], "qdec_rotate");
    assert_eq!(body["event"]["value"], -24.0);
}

#[test]
fn trigger_without_peer_reprovisions() {
    let mut h = Harness::new();
    h.attach();
    h.handle(Event::Trigger(TriggerEvent::qdec_button("qdec_0")));

    assert!(h.mesh.sent_to(resource::TRIGGER).is_empty());
    assert_eq!(h.mesh.sent_to(resource::PROVISIONING).len(), 2);
}

#[test]
fn trigger_while_disconnected_is_dropped() {
    let mut h = Harness::new();
    h.handle(Event::Trigger(TriggerEvent::qdec_button("qdec_0")));
    assert!(h.mesh.sent.is_empty());
    assert!(h.board.indicator.is_empty());
}

#[test]
fn testing_mode_broadcasts_and_pauses_reports() {
    let mut h = connected();
    h.handle(Event::SetTestingMode(true));
    assert!(h.service.testing_mode());

    h.handle(Event::Trigger(TriggerEvent::qdec_button("qdec_0")));
    let sent = h.mesh.sent_to(resource::TESTING_LIGHT);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].destination, Destination::Multicast(MESH_LOCAL_ALL_NODES));
    assert_eq!(sent[0].reply, None);
    assert!(h.mesh.sent_to(resource::TRIGGER).is_empty());
    assert_eq!(
        h.sink.count(|e| *e
            == AppEvent::TriggerSent {
                kind: TriggerKind::QdecButton,
                broadcast: true
            }),
        1
    );

    let reports = h.mesh.sent_to(resource::STATUS).len();
    h.run_for(600_000);
    h.handle(Event::ReportRequested);
    assert_eq!(h.mesh.sent_to(resource::STATUS).len(), reports);
}

#[test]
fn testing_mode_needs_connection() {
    let mut h = Harness::new();
    h.handle(Event::SetTestingMode(true));
    assert!(!h.service.testing_mode());
}

#[test]
fn leaving_testing_mode_resumes_reports() {
    let mut h = connected();
    h.handle(Event::SetTestingMode(true));
    h.handle(Event::SetTestingMode(false));
    let reports = h.mesh.sent_to(resource::STATUS).len();
    h.run_for(3_000);
    assert_eq!(h.mesh.sent_to(resource::STATUS).len(), reports + 1);
}

#[test]
fn disconnect_clears_testing_mode() {
    let mut h = connected();
    h.handle(Event::SetTestingMode(true));
    h.detach();
    assert!(!h.service.testing_mode());
}

#[test]
fn long_press_toggles_testing_mode() {
    let mut h = connected();
    let event = input::button_event(Button::Report, ButtonGesture::Long, h.service.testing_mode())
        .unwrap();
    h.handle(event);
    assert!(h.service.testing_mode());

    let event = input::button_event(Button::Report, ButtonGesture::Long, h.service.testing_mode())
        .unwrap();
    h.handle(event);
    assert!(!h.service.testing_mode());
}
