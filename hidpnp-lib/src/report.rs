use num_enum::{FromPrimitive, IntoPrimitive};
use std::fmt;
use strum_macros::Display;

/// Size of one HID report: 1 reserved report-id byte plus 64 payload bytes.
/// The report-id byte is stripped by the transport and is always zero here.
pub const REPORT_SIZE: usize = 65;

/// Fill value for unused outbound bytes. Binary '1' bits cause fewer D+/D-
/// transitions on the NRZI-encoded wire, so the firmware convention is to
/// pad with 0xFF.
pub const REPORT_FILL: u8 = 0xFF;

/// Command codes understood by the demo firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoPrimitive, FromPrimitive)]
#[repr(u8)]
pub enum Command {
    /// Read the 10-bit ADC value (READ_POT in the firmware sources).
    ReadAnalog = 0x37,
    /// Toggle the board LEDs. Fire-and-forget, the firmware never answers.
    ToggleLed = 0x80,
    /// Query the pushbutton state.
    QueryButton = 0x81,

    #[num_enum(catch_all)]
    Unknown(u8),
}

/// One fixed-size report, either direction. Transient per polling cycle.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Report(pub [u8; REPORT_SIZE]);

impl Report {
    /// Build an outbound report for `command`: report id 0, command at
    /// byte 1, everything else padded with [`REPORT_FILL`].
    pub fn for_command(command: Command) -> Self {
        let mut buf = [REPORT_FILL; REPORT_SIZE];
        buf[0] = 0x00;
        buf[1] = command.into();
        Report(buf)
    }

    /// Build an inbound report from the 64-byte payload the transport hands
    /// back (the report id has already been stripped).
    pub fn from_payload(payload: &[u8]) -> Self {
        let mut buf = [0u8; REPORT_SIZE];
        let n = payload.len().min(REPORT_SIZE - 1);
        buf[1..1 + n].copy_from_slice(&payload[..n]);
        Report(buf)
    }

    /// The command this report carries (outbound) or answers (inbound echo).
    pub fn command(&self) -> Command {
        Command::from_primitive(self.0[1])
    }

    /// Little-endian 16-bit ADC value from bytes 2..4. 10-bit range in
    /// practice.
    pub fn adc_value(&self) -> u16 {
        u16::from_le_bytes([self.0[2], self.0[3]])
    }

    /// Decoded pushbutton state. The firmware convention is inverted:
    /// 0x00 means pressed, 0x01 means not pressed. Anything else is
    /// undefined and yields `None`.
    pub fn button_pressed(&self) -> Option<bool> {
        match self.0[2] {
            0x00 => Some(true),
            0x01 => Some(false),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> &[u8; REPORT_SIZE] {
        &self.0
    }
}

impl fmt::Debug for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Report({} {:02X} {:02X} {:02X} ..)",
            self.command(),
            self.0[1],
            self.0[2],
            self.0[3]
        )
    }
}
