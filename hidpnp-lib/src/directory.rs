use crate::device::{Device, DeviceSelector};
use std::collections::HashSet;

/// Added/removed devices produced by one directory refresh. No ordering
/// guarantees within one scan.
#[derive(Debug, Default, Clone)]
pub struct DirectoryDiff {
    pub added: Vec<Device>,
    pub removed: Vec<Device>,
}

impl DirectoryDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// The current set of known devices, diffed by `system_id` across scans.
#[derive(Debug, Default)]
pub struct DeviceDirectory {
    devices: Vec<Device>,
}

impl DeviceDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    /// First known device matching the selector's VID/PID, if any.
    pub fn find(&self, selector: &DeviceSelector) -> Option<&Device> {
        self.devices.iter().find(|d| d.matches(selector))
    }

    /// Replace the known set with `current` and report the symmetric
    /// difference, keyed by `system_id`.
    pub fn refresh(&mut self, current: Vec<Device>) -> DirectoryDiff {
        let old_ids: HashSet<&str> = self.devices.iter().map(|d| d.system_id.as_str()).collect();
        let new_ids: HashSet<&str> = current.iter().map(|d| d.system_id.as_str()).collect();

        let added = current
            .iter()
            .filter(|d| !old_ids.contains(d.system_id.as_str()))
            .cloned()
            .collect();
        let removed = self
            .devices
            .iter()
            .filter(|d| !new_ids.contains(d.system_id.as_str()))
            .cloned()
            .collect();

        self.devices = current;
        DirectoryDiff { added, removed }
    }
}
