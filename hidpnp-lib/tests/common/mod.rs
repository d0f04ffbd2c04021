//! Shared test helpers: a scripted in-memory bus standing in for the OS HID
//! transport.
#![allow(dead_code)]

use hidpnp_lib::device::Device;
use hidpnp_lib::error::HidError;
use hidpnp_lib::report::{Command, REPORT_SIZE, Report};
use hidpnp_lib::transport::{ReportPipe, Transport, TransportHandle};
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

pub fn device(system_id: &str, vendor_id: u16, product_id: u16) -> Device {
    Device {
        vendor_id,
        product_id,
        system_id: system_id.to_string(),
        display_name: format!("Test board {system_id}"),
        manufacturer: "Test vendor".to_string(),
    }
}

/// Inbound report with the echoed command at byte 1 and the two data bytes
/// the firmware uses.
pub fn inbound(command: u8, b2: u8, b3: u8) -> Report {
    let mut buf = [0u8; REPORT_SIZE];
    buf[1] = command;
    buf[2] = b2;
    buf[3] = b3;
    Report(buf)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenBehavior {
    Succeed,
    Partial,
    Fail,
}

pub struct BusState {
    pub attached: Vec<Device>,
    pub open_behavior: OpenBehavior,
    pub write_ok: bool,
    /// Scripted responses, served before any auto-generated echo.
    pub responses: VecDeque<Report>,
    /// Every report the engine wrote, in order.
    pub written: Vec<Report>,
    /// When true and no scripted response is queued, answer the last
    /// written command the way the demo firmware would.
    pub echo: bool,
    pub adc_value: u16,
    pub button_byte: u8,
    /// Simulated device response latency, to pace threaded tests.
    pub read_delay: Option<std::time::Duration>,
    last_command: Option<Command>,
}

impl Default for BusState {
    fn default() -> Self {
        Self {
            attached: Vec::new(),
            open_behavior: OpenBehavior::Succeed,
            write_ok: true,
            responses: VecDeque::new(),
            written: Vec::new(),
            echo: true,
            adc_value: 0x0155,
            button_byte: 0x01,
            read_delay: None,
            last_command: None,
        }
    }
}

#[derive(Clone)]
pub struct FakeBus(Arc<Mutex<BusState>>);

impl FakeBus {
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(BusState::default())))
    }

    pub fn with_device(device: Device) -> Self {
        let bus = Self::new();
        bus.state().attached.push(device);
        bus
    }

    pub fn state(&self) -> MutexGuard<'_, BusState> {
        self.0.lock().unwrap()
    }

    pub fn written_commands(&self) -> Vec<Command> {
        self.state().written.iter().map(|r| r.command()).collect()
    }

    pub fn transport(&self) -> Box<dyn Transport> {
        Box::new(FakeTransport { bus: self.clone() })
    }
}

struct FakeTransport {
    bus: FakeBus,
}

impl Transport for FakeTransport {
    fn enumerate(&mut self) -> Vec<Device> {
        self.bus.state().attached.clone()
    }

    fn open(&mut self, device: &Device) -> Result<TransportHandle, HidError> {
        match self.bus.state().open_behavior {
            OpenBehavior::Succeed => Ok(TransportHandle::new(
                device.system_id.clone(),
                Box::new(FakePipe {
                    bus: self.bus.clone(),
                }),
                Box::new(FakePipe {
                    bus: self.bus.clone(),
                }),
            )),
            OpenBehavior::Partial => Err(HidError::PartialOpen),
            OpenBehavior::Fail => Err(HidError::Io(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "open refused",
            ))),
        }
    }
}

struct FakePipe {
    bus: FakeBus,
}

impl ReportPipe for FakePipe {
    fn write_report(&mut self, report: &Report) -> bool {
        let mut state = self.bus.state();
        state.written.push(*report);
        state.last_command = Some(report.command());
        state.write_ok
    }

    fn read_report(&mut self) -> Result<Report, HidError> {
        let delay = self.bus.state().read_delay;
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        let mut state = self.bus.state();
        if let Some(report) = state.responses.pop_front() {
            return Ok(report);
        }
        if state.echo {
            match state.last_command {
                Some(Command::ReadAnalog) => {
                    let [lo, hi] = state.adc_value.to_le_bytes();
                    return Ok(inbound(Command::ReadAnalog.into(), lo, hi));
                }
                Some(Command::QueryButton) => {
                    return Ok(inbound(Command::QueryButton.into(), state.button_byte, 0));
                }
                _ => {}
            }
        }
        Err(HidError::Io(io::Error::new(
            io::ErrorKind::TimedOut,
            "no response scripted",
        )))
    }
}
