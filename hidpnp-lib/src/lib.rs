pub mod backend;
pub mod device;
pub mod directory;
pub mod error;
pub mod protocol;
pub mod report;
pub mod session;
pub mod transport;

pub use device::{Device, DeviceSelector};
pub use error::HidError;
pub use report::{Command, REPORT_SIZE, Report};
pub use session::{ConnectionStatus, HidSession, SessionEvent};
