use crate::report::{Command, Report};
use serde::Serialize;
use std::time::{Duration, Instant};

/// Transfer statistics since the last transition into `Connected`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TransferCounters {
    pub tx: u64,
    pub tx_failed: u64,
    pub rx: u64,
    pub rx_failed: u64,
}

/// Pure protocol decision state. No I/O happens here; the polling engine
/// feeds transfer outcomes in and reads the next action out.
///
/// Reset to defaults on every connection-status transition, so all counters
/// and decoded values are connection-scoped.
#[derive(Debug, Clone)]
pub struct SessionState {
    last_command: Command,
    led_toggle_pending: bool,
    waiting_for_response: bool,
    adc_value: u16,
    pushbutton_pressed: bool,
    counters: TransferCounters,
    connected_since: Instant,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            last_command: Command::QueryButton,
            led_toggle_pending: false,
            waiting_for_response: false,
            adc_value: 0,
            pushbutton_pressed: false,
            counters: TransferCounters::default(),
            connected_since: Instant::now(),
        }
    }
}

impl SessionState {
    pub fn reset(&mut self) {
        *self = SessionState::default();
    }

    /// Decide the next outbound report.
    ///
    /// Priority: a pending LED toggle always wins and clears the pending
    /// flag; otherwise the engine alternates between the analog read and the
    /// button query. A toggle interrupts the alternation and the next cycle
    /// falls through to `QueryButton` (the original firmware demo's
    /// behavior, kept deliberately).
    pub fn build_outbound(&mut self) -> Report {
        let command = if self.led_toggle_pending {
            self.led_toggle_pending = false;
            Command::ToggleLed
        } else if self.last_command == Command::QueryButton {
            Command::ReadAnalog
        } else {
            Command::QueryButton
        };
        self.last_command = command;
        Report::for_command(command)
    }

    /// Record the outcome of the write for the report built last.
    pub fn on_sent(&mut self, success: bool) {
        if success {
            self.counters.tx += 1;
        } else {
            self.counters.tx_failed += 1;
        }
        // The LED toggle is fire-and-forget, no response follows.
        self.waiting_for_response = if self.last_command == Command::ToggleLed {
            false
        } else {
            success
        };
    }

    /// Whether the engine should attempt a read this cycle.
    pub fn should_receive(&self) -> bool {
        self.waiting_for_response
    }

    /// Decode an inbound report. Byte 1 echoes the command being answered;
    /// unrecognized echoes and out-of-range button bytes leave the decoded
    /// state untouched.
    pub fn on_received(&mut self, report: &Report) {
        self.counters.rx += 1;
        self.waiting_for_response = false;
        match report.command() {
            Command::ReadAnalog => self.adc_value = report.adc_value(),
            Command::QueryButton => {
                if let Some(pressed) = report.button_pressed() {
                    self.pushbutton_pressed = pressed;
                }
            }
            _ => {}
        }
    }

    /// Record a failed read attempt.
    pub fn on_receive_failed(&mut self) {
        self.counters.rx_failed += 1;
        self.waiting_for_response = false;
    }

    /// Request an LED toggle. Returns false (and changes nothing) while a
    /// toggle is already pending: single-outstanding-request semantics.
    pub fn request_led_toggle(&mut self) -> bool {
        if self.led_toggle_pending {
            return false;
        }
        self.led_toggle_pending = true;
        true
    }

    pub fn last_command(&self) -> Command {
        self.last_command
    }

    pub fn led_toggle_pending(&self) -> bool {
        self.led_toggle_pending
    }

    pub fn adc_value(&self) -> u16 {
        self.adc_value
    }

    pub fn pushbutton_pressed(&self) -> bool {
        self.pushbutton_pressed
    }

    pub fn counters(&self) -> TransferCounters {
        self.counters
    }

    /// Time since the state was last reset, i.e. since the current
    /// connection was established.
    pub fn uptime(&self) -> Duration {
        self.connected_since.elapsed()
    }
}
