//! Tests for the pure protocol layer: command selection, wire format and
//! inbound decoding.

mod common;

use common::inbound;
use hidpnp_lib::protocol::SessionState;
use hidpnp_lib::report::{Command, REPORT_FILL, REPORT_SIZE, Report};

#[test]
fn outbound_wire_format() {
    let report = Report::for_command(Command::ReadAnalog);
    let bytes = report.as_bytes();
    assert_eq!(bytes[0], 0x00, "report id must be zero");
    assert_eq!(bytes[1], 0x37);
    assert!(
        bytes[2..].iter().all(|&b| b == REPORT_FILL),
        "unused bytes are padded with 0xFF"
    );
    assert_eq!(bytes.len(), REPORT_SIZE);
}

#[test]
fn command_codes_match_firmware() {
    assert_eq!(u8::from(Command::ReadAnalog), 0x37);
    assert_eq!(u8::from(Command::ToggleLed), 0x80);
    assert_eq!(u8::from(Command::QueryButton), 0x81);
}

#[test]
fn alternation_starts_with_analog_read() {
    let mut state = SessionState::default();
    let commands: Vec<Command> = (0..3).map(|_| state.build_outbound().command()).collect();
    assert_eq!(
        commands,
        vec![
            Command::ReadAnalog,
            Command::QueryButton,
            Command::ReadAnalog
        ]
    );
}

#[test]
fn toggle_preempts_alternation_and_is_consumed_once() {
    let mut state = SessionState::default();
    assert!(state.request_led_toggle());
    // A second request while one is pending is a silent no-op.
    assert!(!state.request_led_toggle());
    assert!(state.led_toggle_pending());

    assert_eq!(state.build_outbound().command(), Command::ToggleLed);
    assert!(!state.led_toggle_pending());

    // After a toggle the engine falls through to the button query, as the
    // original demo did.
    assert_eq!(state.build_outbound().command(), Command::QueryButton);
    assert_eq!(state.build_outbound().command(), Command::ReadAnalog);
}

#[test]
fn toggle_is_fire_and_forget() {
    let mut state = SessionState::default();
    state.request_led_toggle();
    state.build_outbound();
    state.on_sent(true);
    assert!(
        !state.should_receive(),
        "no response is expected after a toggle"
    );
}

#[test]
fn query_waits_for_response_only_on_send_success() {
    let mut state = SessionState::default();
    state.build_outbound();
    state.on_sent(true);
    assert!(state.should_receive());

    state.build_outbound();
    state.on_sent(false);
    assert!(!state.should_receive());
}

#[test]
fn adc_response_decodes_little_endian() {
    let mut state = SessionState::default();
    state.build_outbound();
    state.on_sent(true);
    state.on_received(&inbound(0x37, 0x34, 0x01));
    assert_eq!(state.adc_value(), 308);
    assert!(!state.should_receive());
}

#[test]
fn button_response_uses_inverted_convention() {
    let mut state = SessionState::default();
    state.on_received(&inbound(0x81, 0x00, 0));
    assert!(state.pushbutton_pressed(), "0x00 means pressed");

    state.on_received(&inbound(0x81, 0x01, 0));
    assert!(!state.pushbutton_pressed(), "0x01 means not pressed");
}

#[test]
fn out_of_range_button_byte_leaves_state_unchanged() {
    let mut state = SessionState::default();
    state.on_received(&inbound(0x81, 0x00, 0));
    assert!(state.pushbutton_pressed());

    state.on_received(&inbound(0x81, 0x02, 0));
    assert!(state.pushbutton_pressed(), "0x02 is undefined, no update");
}

#[test]
fn unknown_echo_is_ignored_but_clears_waiting() {
    let mut state = SessionState::default();
    state.build_outbound();
    state.on_sent(true);
    state.on_received(&inbound(0x55, 0xAA, 0xAA));
    assert_eq!(state.adc_value(), 0);
    assert!(!state.pushbutton_pressed());
    assert!(!state.should_receive());
    assert_eq!(state.counters().rx, 1);
}

#[test]
fn counters_account_for_every_attempt() {
    let mut state = SessionState::default();
    let outcomes = [true, false, true, true, false];
    for sent in outcomes {
        state.build_outbound();
        state.on_sent(sent);
    }
    let counters = state.counters();
    assert_eq!(counters.tx, 3);
    assert_eq!(counters.tx_failed, 2);
    assert_eq!(
        counters.tx + counters.tx_failed,
        outcomes.len() as u64,
        "every completed write attempt is counted exactly once"
    );
}

#[test]
fn counters_serialize_for_front_ends() {
    let mut state = SessionState::default();
    state.build_outbound();
    state.on_sent(true);
    state.build_outbound();
    state.on_sent(false);
    let json = serde_json::to_value(state.counters()).unwrap();
    assert_eq!(json["tx"], 1);
    assert_eq!(json["tx_failed"], 1);
    assert_eq!(json["rx"], 0);
}

#[test]
fn failed_read_is_counted_and_clears_waiting() {
    let mut state = SessionState::default();
    state.build_outbound();
    state.on_sent(true);
    state.on_receive_failed();
    assert!(!state.should_receive());
    assert_eq!(state.counters().rx_failed, 1);
}

#[test]
fn reset_restores_defaults() {
    let mut state = SessionState::default();
    state.request_led_toggle();
    state.build_outbound();
    state.on_sent(true);
    state.on_received(&inbound(0x37, 0xFF, 0x03));

    state.reset();
    assert_eq!(state.counters().tx, 0);
    assert_eq!(state.adc_value(), 0);
    assert!(!state.led_toggle_pending());
    assert!(!state.should_receive());
    // The alternation restarts from the query-button default.
    assert_eq!(state.build_outbound().command(), Command::ReadAnalog);
}
