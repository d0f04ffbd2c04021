use crate::device::Device;
use crate::error::HidError;
use crate::report::Report;

/// One direction of an open device connection. All operations are
/// synchronous and blocking; the polling engine runs them off any
/// responsiveness-critical thread.
pub trait ReportPipe: Send {
    /// Write one report. Returns true when all bytes were accepted.
    fn write_report(&mut self, report: &Report) -> bool;

    /// Read one report, blocking up to the backend's bounded timeout.
    fn read_report(&mut self) -> Result<Report, HidError>;
}

/// Device enumeration and connection establishment, as provided by the host
/// OS. Opaque to protocol semantics.
pub trait Transport: Send {
    /// All currently attached candidate devices. Enumeration failure is
    /// "no devices visible right now", never an error.
    fn enumerate(&mut self) -> Vec<Device>;

    /// Open both pipes to `device`. When only one of the two opens, the
    /// implementation must close the survivor and return
    /// [`HidError::PartialOpen`]; a half-open pair never escapes.
    fn open(&mut self, device: &Device) -> Result<TransportHandle, HidError>;
}

/// Exclusive ownership of the open write/read pipe pair bound to one
/// `system_id`. Invariant: both pipes are open or both are closed.
pub struct TransportHandle {
    system_id: String,
    pipes: Option<(Box<dyn ReportPipe>, Box<dyn ReportPipe>)>,
}

impl TransportHandle {
    pub fn new(
        system_id: String,
        write_pipe: Box<dyn ReportPipe>,
        read_pipe: Box<dyn ReportPipe>,
    ) -> Self {
        Self {
            system_id,
            pipes: Some((write_pipe, read_pipe)),
        }
    }

    pub fn system_id(&self) -> &str {
        &self.system_id
    }

    pub fn is_open(&self) -> bool {
        self.pipes.is_some()
    }

    /// Write one report. A closed handle reports failure rather than
    /// panicking.
    pub fn write(&mut self, report: &Report) -> bool {
        match &mut self.pipes {
            Some((write_pipe, _)) => write_pipe.write_report(report),
            None => false,
        }
    }

    pub fn read(&mut self) -> Result<Report, HidError> {
        match &mut self.pipes {
            Some((_, read_pipe)) => read_pipe.read_report(),
            None => Err(HidError::Io(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "transport handle is closed",
            ))),
        }
    }

    /// Close both pipes. Idempotent; safe on an already-closed handle.
    pub fn close(&mut self) {
        self.pipes = None;
    }
}

impl Drop for TransportHandle {
    fn drop(&mut self) {
        self.close();
    }
}
