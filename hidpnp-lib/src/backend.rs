//! hidapi-backed implementation of the [`Transport`] contract.
//!
//! The demo firmware answers every request promptly, so reads carry a
//! bounded timeout: a silent device degrades to a failed transfer instead of
//! wedging the polling engine on a blocked read.

use crate::device::Device;
use crate::error::HidError;
use crate::report::{REPORT_SIZE, Report};
use crate::transport::{ReportPipe, Transport, TransportHandle};
use hidapi::{HidApi, HidDevice};
use std::ffi::CString;
use std::io;
use tracing::{debug, warn};

const READ_TIMEOUT_MS: i32 = 500;

pub struct HidApiTransport {
    api: HidApi,
}

impl HidApiTransport {
    pub fn new() -> Result<Self, HidError> {
        Ok(Self {
            api: HidApi::new()?,
        })
    }
}

impl Transport for HidApiTransport {
    fn enumerate(&mut self) -> Vec<Device> {
        if let Err(err) = self.api.refresh_devices() {
            warn!(%err, "device enumeration failed, treating as zero devices");
            return Vec::new();
        }
        self.api
            .device_list()
            .map(|info| Device {
                vendor_id: info.vendor_id(),
                product_id: info.product_id(),
                system_id: info.path().to_string_lossy().into_owned(),
                display_name: info
                    .product_string()
                    .unwrap_or("Unknown device")
                    .to_string(),
                manufacturer: info.manufacturer_string().unwrap_or("").to_string(),
            })
            .collect()
    }

    fn open(&mut self, device: &Device) -> Result<TransportHandle, HidError> {
        let path = CString::new(device.system_id.as_bytes())?;
        // Two independent handles, as the firmware demo expects: one for the
        // OUT pipe, one for the IN pipe.
        let write_handle = self.api.open_path(&path);
        let read_handle = self.api.open_path(&path);
        match (write_handle, read_handle) {
            (Ok(write_handle), Ok(read_handle)) => {
                debug!(system_id = %device.system_id, "opened both pipes");
                Ok(TransportHandle::new(
                    device.system_id.clone(),
                    Box::new(HidPipe::new(write_handle)),
                    Box::new(HidPipe::new(read_handle)),
                ))
            }
            (Err(err), Err(_)) => Err(HidError::Backend(err)),
            // One pipe opened, the other failed. The survivor is dropped
            // (closed) here; the caller sees NotWorking.
            _ => {
                warn!(system_id = %device.system_id, "only one of two pipes opened");
                Err(HidError::PartialOpen)
            }
        }
    }
}

struct HidPipe {
    device: HidDevice,
}

impl HidPipe {
    fn new(device: HidDevice) -> Self {
        Self { device }
    }
}

impl ReportPipe for HidPipe {
    fn write_report(&mut self, report: &Report) -> bool {
        // hidapi consumes the leading report-id byte, so the full 65-byte
        // buffer goes down in one call.
        match self.device.write(report.as_bytes()) {
            Ok(written) => written == report.as_bytes().len(),
            Err(err) => {
                debug!(%err, "write failed");
                false
            }
        }
    }

    fn read_report(&mut self) -> Result<Report, HidError> {
        let mut payload = [0u8; REPORT_SIZE - 1];
        let read = self.device.read_timeout(&mut payload, READ_TIMEOUT_MS)?;
        if read == 0 {
            return Err(HidError::Io(io::Error::new(
                io::ErrorKind::TimedOut,
                "read timed out",
            )));
        }
        Ok(Report::from_payload(&payload[..read]))
    }
}
