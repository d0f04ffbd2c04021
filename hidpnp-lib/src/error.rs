use std::ffi::NulError;
use std::io;
use thiserror::Error;

/// The primary error type for the `hidpnp-rs` library.
#[derive(Error, Debug)]
pub enum HidError {
    #[error("device is present but only one of the two pipes could be opened")]
    PartialOpen,

    #[error("device path contains an interior NUL byte")]
    InvalidDevicePath(#[from] NulError),

    #[error("HID backend error: {0}")]
    Backend(#[from] hidapi::HidError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
