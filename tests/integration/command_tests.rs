//! Inbound command dispatch: responses, actuator effects and the
//! disruptive commands that acknowledge before acting.

use meshnode::app::model::{LightGroup, LinkMode, Rgb};
use meshnode::app::report::ReportInterval;
use meshnode::app::wire::{Method, resource};
use meshnode::error::{ActuatorError, NetworkError};

use crate::mock_platform::{ActuatorCall, Harness, SrpCall};

fn connected() -> Harness {
    let mut h = Harness::new();
    h.connect_fully();
    h
}

// ── Lights ────────────────────────────────────────────────────

#[test]
fn onoff_switches_group() {
    let mut h = connected();
    let resp = h.command(r#"{"cmd":"onoff","obj":"all","val":true}"#);
    assert_eq!(resp["err_code"], 0);
    assert!(h.board.groups[0].on && h.board.groups[1].on);

    let resp = h.command(r#"{"cmd":"on_off","obj":"led_right","val":0}"#);
    assert_eq!(resp["err_code"], 0);
    assert!(h.board.groups[0].on);
    assert!(!h.board.groups[1].on);
}

#[test]
fn onoff_with_delay_turns_off_later() {
    let mut h = connected();
    let resp = h.command(r#"{"cmd":"onoff","obj":"led_left","val":1,"delay":5}"#);
    assert_eq!(resp["err_code"], 0);
    assert!(h.board.groups[0].on);

    h.run_for(4_900);
    assert!(h.board.groups[0].on);
    h.run_for(100);
    assert!(!h.board.groups[0].on, "switched off after 5 s");
}

#[test]
fn new_onoff_cancels_pending_delayed_off() {
    let mut h = connected();
    h.command(r#"{"cmd":"onoff","obj":"led_left","val":1,"delay":2}"#);
    h.command(r#"{"cmd":"onoff","obj":"led_left","val":1}"#);
    h.run_for(5_000);
    assert!(h.board.groups[0].on);
}

#[test]
fn failed_power_leaves_timers_alone() {
    let mut h = connected();
    h.board.power_result = Err(ActuatorError::StripUpdateFailed);
    let resp = h.command(r#"{"cmd":"onoff","obj":"led_left","val":1,"delay":2}"#);
    assert_eq!(resp["err_code"], -3);

    h.board.power_result = Ok(());
    h.run_for(5_000);
    assert!(h.board.calls.is_empty(), "no delayed off armed");

    h.command(r#"{"cmd":"onoff","obj":"led_left","val":1,"delay":2}"#);
    h.board.power_result = Err(ActuatorError::StripUpdateFailed);
    let resp = h.command(r#"{"cmd":"onoff","obj":"led_left","val":1}"#);
    assert_eq!(resp["err_code"], -3);

    h.board.power_result = Ok(());
    h.run_for(2_000);
    assert_eq!(
        h.board.calls.last(),
        Some(&ActuatorCall::Power(LightGroup::Left, false)),
        "pending delayed off still fires"
    );
}

#[test]
fn negative_delay_rejected() {
    let mut h = connected();
    let resp = h.command(r#"{"cmd":"onoff","obj":"all","val":1,"delay":-1}"#);
    assert_eq!(resp["err_code"], -1);
    assert!(h.board.calls.is_empty());
}

#[test]
fn change_color_applies_rgb() {
    let mut h = connected();
    let resp = h.command(r#"{"cmd":"change_color","obj":"led_left","r":10,"g":20,"b":30}"#);
    assert_eq!(resp["err_code"], 0);
    assert_eq!(
        h.board.calls,
        vec![ActuatorCall::Color(LightGroup::Left, Rgb::new(10, 20, 30))]
    );
}

#[test]
fn change_color_out_of_range_has_no_effect() {
    let mut h = connected();
    let resp = h.command(r#"{"cmd":"change_color","obj":"all","r":10,"g":256,"b":0}"#);
    assert_eq!(resp["err_code"], -1);
    assert!(h.board.calls.is_empty());
}

#[test]
fn unknown_group_is_invalid_object() {
    let mut h = connected();
    let resp = h.command(r#"{"cmd":"onoff","obj":"led_middle","val":1}"#);
    assert_eq!(resp["err_code"], -1);
    assert!(h.board.calls.is_empty());
}

#[test]
fn led_status_lists_both_groups() {
    let mut h = connected();
    h.command(r#"{"cmd":"change_color","obj":"led_right","r":1,"g":2,"b":3}"#);
    h.command(r#"{"cmd":"onoff","obj":"led_right","val":1}"#);

    let resp = h.command(r#"{"cmd":"get_led_status"}"#);
    assert_eq!(resp["err_code"], 0);
    let list = resp["led_strip_status"].as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["obj"], "led_left");
    assert_eq!(list[0]["on_off"], 0);
    assert_eq!(list[1]["obj"], "led_right");
    assert_eq!(list[1]["on_off"], 1);
    assert_eq!(list[1]["r"], 1);
    assert_eq!(list[1]["g"], 2);
    assert_eq!(list[1]["b"], 3);
}

// ── GPIO ──────────────────────────────────────────────────────

#[test]
fn set_gpio_and_read_back() {
    let mut h = connected();
    let resp = h.command(r#"{"cmd":"set_gpio","obj":"0.17","val":true}"#);
    assert_eq!(resp["err_code"], 0);

    let resp = h.command(r#"{"cmd":"get_gpio_status"}"#);
    let pins = resp["gpio_status"].as_array().unwrap();
    assert_eq!(pins.len(), 4);
    assert_eq!(pins[2]["obj"], "0.17");
    assert_eq!(pins[2]["val"], 1);
    assert_eq!(pins[0]["val"], 0);
}

#[test]
fn set_gpio_unknown_pin() {
    let mut h = connected();
    let resp = h.command(r#"{"cmd":"set_gpio","obj":"1.01","val":1}"#);
    assert_eq!(resp["err_code"], -1);
}

// ── Session settings ──────────────────────────────────────────

#[test]
fn set_report_interval_rearms_timer() {
    let mut h = connected();
    h.run_for(3_000);
    let base = h.mesh.sent_to(resource::STATUS).len();

    let resp = h.command(r#"{"cmd":"set_report_interval","val":60}"#);
    assert_eq!(resp["err_code"], 0);
    assert_eq!(h.service.report_interval().secs(), 60);

    h.run_for(2_900);
    assert_eq!(h.mesh.sent_to(resource::STATUS).len(), base, "not before 3 s");
    h.run_for(100);
    assert_eq!(h.mesh.sent_to(resource::STATUS).len(), base + 1);
    h.run_for(60_000);
    assert_eq!(h.mesh.sent_to(resource::STATUS).len(), base + 2);

    let body = h.mesh.sent_to(resource::STATUS).last().unwrap().json();
    assert_eq!(body["report_intervel"], 60);
}

#[test]
fn non_positive_interval_rejected_without_side_effects() {
    let mut h = connected();
    for body in [
        r#"{"cmd":"set_report_interval","val":0}"#,
        r#"{"cmd":"set_report_interval","val":-30}"#,
        r#"{"cmd":"set_report_interval"}"#,
    ] {
        let resp = h.command(body);
        assert_eq!(resp["err_code"], -1, "{body}");
    }
    assert_eq!(h.service.report_interval(), ReportInterval::DEFAULT);

    // The original 3 s / 300 s cadence is untouched.
    h.run_for(3_000);
    assert_eq!(h.mesh.sent_to(resource::STATUS).len(), 2);
}

#[test]
fn interval_stored_before_registration_applies_later() {
    let mut h = Harness::new();
    h.attach();
    h.provision(crate::mock_platform::PEER);
    let resp = h.command(r#"{"cmd":"set_report_interval","val":10}"#);
    assert_eq!(resp["err_code"], 0);
    h.handle(meshnode::events::Event::RegistrationCompleted(
        meshnode::app::registration::RegistrationOutcome::Registered,
    ));

    h.run_for(13_000);
    assert_eq!(h.mesh.sent_to(resource::STATUS).len(), 3);
}

#[test]
fn set_ot_mode_applies_flags() {
    let mut h = connected();
    let resp = h.command(r#"{"cmd":"set_ot_mode","val":"rn"}"#);
    assert_eq!(resp["err_code"], 0);
    assert_eq!(h.mesh.link_mode, LinkMode::from_flags("rn").unwrap());

    let resp = h.command(r#"{"cmd":"set_ot_mode","val":"rx"}"#);
    assert_eq!(resp["err_code"], -1);
    assert_eq!(h.mesh.link_mode, LinkMode::from_flags("rn").unwrap());
}

#[test]
fn set_ot_mode_maps_stack_errors() {
    let mut h = connected();
    h.mesh.link_mode_result = Err(NetworkError::InvalidArgs);
    assert_eq!(h.command(r#"{"cmd":"set_ot_mode","val":"d"}"#)["err_code"], -1);
    h.mesh.link_mode_result = Err(NetworkError::Failed);
    assert_eq!(h.command(r#"{"cmd":"set_ot_mode","val":"d"}"#)["err_code"], -3);
}

// ── Envelope handling ─────────────────────────────────────────

#[test]
fn unknown_command_touches_nothing() {
    let mut h = connected();
    let calls = (h.board.calls.len(), h.mesh.sent.len(), h.board.samples);
    let resp = h.command(r#"{"cmd":"self_destruct","obj":"all","val":1}"#);
    assert_eq!(resp["err_code"], -3);
    assert_eq!(
        (h.board.calls.len(), h.mesh.sent.len(), h.board.samples),
        calls
    );
}

#[test]
fn malformed_body_is_invalid_parameter() {
    let mut h = connected();
    for body in ["{", "[]", r#"{"obj":"all"}"#, r#"{"cmd":5}"#, ""] {
        assert_eq!(h.command(body)["err_code"], -1, "{body:?}");
    }
    assert!(h.board.calls.is_empty());
}

#[test]
fn trailing_nul_is_tolerated() {
    let mut h = connected();
    let resp = h
        .command_with(Method::Put, b"{\"cmd\":\"get_gpio_status\"}\0")
        .unwrap();
    assert_eq!(resp["err_code"], 0);
}

#[test]
fn non_put_requests_are_dropped() {
    let mut h = connected();
    for method in [Method::Get, Method::Post] {
        assert!(h.command_with(method, br#"{"cmd":"reboot"}"#).is_none());
    }
    assert_eq!(h.board.reboots, 0);
}

// ── Disruptive commands ───────────────────────────────────────

#[test]
fn reboot_acknowledges_then_restarts() {
    let mut h = connected();
    let resp = h.command(r#"{"cmd":"reboot"}"#);
    assert_eq!(resp["err_code"], 0);
    assert_eq!(h.board.delays_ms, vec![3_000]);
    assert_eq!(h.board.reboots, 1);
}

#[test]
fn factory_reset_deregisters_then_wipes() {
    let mut h = connected();
    let resp = h.command(r#"{"cmd":"factoryreset"}"#);
    assert_eq!(resp["err_code"], 0);
    assert_eq!(h.board.delays_ms, vec![1_000]);
    assert_eq!(
        h.mesh.srp.last(),
        Some(&SrpCall::RemoveAll { timeout_ms: 3_000 })
    );
    assert_eq!(h.mesh.factory_resets, 1);

    h.command(r#"{"cmd":"factory_reset"}"#);
    assert_eq!(h.mesh.factory_resets, 2);
}

#[test]
fn upgrade_starts_management() {
    let mut h = Harness::new();
    h.attach();
    let resp = h.command(r#"{"cmd":"upgrade"}"#);
    assert_eq!(resp["err_code"], 0);
    assert_eq!(h.board.management_starts, 1);
}
