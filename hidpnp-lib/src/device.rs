use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity record for one physically attached HID device.
///
/// `system_id` is the opaque OS device identifier and is unique per
/// attachment instance. Two boards of the same product line share VID/PID
/// but never `system_id`, so list-diffing always keys on `system_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub vendor_id: u16,
    pub product_id: u16,
    pub system_id: String,
    pub display_name: String,
    pub manufacturer: String,
}

impl Device {
    pub fn matches(&self, selector: &DeviceSelector) -> bool {
        self.vendor_id == selector.vendor_id && self.product_id == selector.product_id
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (VID=0x{:04X} PID=0x{:04X})",
            self.display_name, self.vendor_id, self.product_id
        )
    }
}

/// The VID/PID pair the application wants to connect to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSelector {
    pub vendor_id: u16,
    pub product_id: u16,
}

impl DeviceSelector {
    pub fn new(vendor_id: u16, product_id: u16) -> Self {
        Self {
            vendor_id,
            product_id,
        }
    }
}

impl fmt::Display for DeviceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "VID=0x{:04X} PID=0x{:04X}",
            self.vendor_id, self.product_id
        )
    }
}
