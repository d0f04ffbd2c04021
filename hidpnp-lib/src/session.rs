//! Connection state machine, polling engine and the threaded session facade.
//!
//! One mutex guards `(ConnectionStatus, TransportHandle, SessionState)` as a
//! unit: the polling worker and the device-change watcher both go through
//! it, so the handle is never read or written concurrently with being
//! closed or reopened.

use crate::device::{Device, DeviceSelector};
use crate::directory::{DeviceDirectory, DirectoryDiff};
use crate::protocol::{SessionState, TransferCounters};
use crate::transport::{Transport, TransportHandle};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender, channel};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use strum_macros::Display;
use tracing::{debug, info, warn};

/// Sleep between idle checks while not connected, so the worker does not
/// busy-spin.
pub const IDLE_SLEEP: Duration = Duration::from_millis(5);

/// How often the watcher rescans the device directory. External device
/// notifications may force an immediate rescan in between.
pub const RESCAN_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
pub enum ConnectionStatus {
    /// No matching device attached, or none selected yet.
    #[strum(to_string = "Device not detected")]
    Disconnected,
    /// Both pipes open, the polling engine is running.
    #[strum(to_string = "Device found")]
    Connected,
    /// Device attached but the pipes could not be opened.
    #[strum(to_string = "Device found but not working")]
    NotWorking,
}

/// Typed events delivered to presentation-layer subscribers. Delivery order
/// across subscribers is unspecified.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    DeviceAdded(Device),
    DeviceRemoved(Device),
    ConnectionStatusChanged(ConnectionStatus),
}

/// The single-threaded core: state machine transitions, directory diffing
/// and one polling cycle at a time. [`HidSession`] wraps it in a mutex and
/// drives it from the worker threads; tests drive it directly.
pub struct SessionCore {
    transport: Box<dyn Transport>,
    directory: DeviceDirectory,
    selector: DeviceSelector,
    status: ConnectionStatus,
    handle: Option<TransportHandle>,
    state: SessionState,
    subscribers: Vec<Sender<SessionEvent>>,
}

impl SessionCore {
    /// Seeds the directory with an initial scan; no events are emitted and
    /// no connection is attempted yet.
    pub fn new(transport: Box<dyn Transport>, selector: DeviceSelector) -> Self {
        let mut core = Self {
            transport,
            directory: DeviceDirectory::new(),
            selector,
            status: ConnectionStatus::Disconnected,
            handle: None,
            state: SessionState::default(),
            subscribers: Vec::new(),
        };
        let current = core.transport.enumerate();
        core.directory.refresh(current);
        core
    }

    pub fn subscribe(&mut self) -> Receiver<SessionEvent> {
        let (tx, rx) = channel();
        self.subscribers.push(tx);
        rx
    }

    fn emit(&mut self, event: SessionEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Enter `status`, resetting session state and notifying subscribers.
    /// Every transition goes through here.
    fn transition(&mut self, status: ConnectionStatus) {
        info!(%status, "connection status changed");
        self.status = status;
        self.state.reset();
        self.emit(SessionEvent::ConnectionStatusChanged(status));
    }

    /// Close the handle if open and fall back to `Disconnected`. Idempotent.
    fn close_handle(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.close();
        }
        if self.status != ConnectionStatus::Disconnected {
            self.transition(ConnectionStatus::Disconnected);
        }
    }

    /// Re-enumerate and emit added/removed events for the difference.
    fn refresh_directory(&mut self) -> DirectoryDiff {
        let current = self.transport.enumerate();
        let diff = self.directory.refresh(current);
        for device in &diff.added {
            info!(%device, "device added");
        }
        for device in &diff.removed {
            info!(%device, "device removed");
        }
        for device in diff.added.clone() {
            self.emit(SessionEvent::DeviceAdded(device));
        }
        for device in diff.removed.clone() {
            self.emit(SessionEvent::DeviceRemoved(device));
        }
        diff
    }

    /// Close any open handle, resolve the selector against the directory and
    /// attempt to open. No match is not an error, just `Disconnected`.
    fn reconnect(&mut self) {
        self.close_handle();
        let Some(device) = self.directory.find(&self.selector).cloned() else {
            debug!(selector = %self.selector, "no matching device attached");
            return;
        };
        match self.transport.open(&device) {
            Ok(handle) => {
                self.handle = Some(handle);
                self.transition(ConnectionStatus::Connected);
            }
            Err(err) => {
                warn!(%device, %err, "device present but open failed");
                self.transition(ConnectionStatus::NotWorking);
            }
        }
    }

    /// Select `selector` and try to connect to it, unconditionally closing
    /// any current connection first.
    pub fn select_device(&mut self, selector: DeviceSelector) {
        self.selector = selector;
        self.refresh_directory();
        self.reconnect();
    }

    /// Change the selector. A selector equal to the current one is a no-op:
    /// no close/reopen cycle is triggered.
    pub fn set_selector(&mut self, vendor_id: u16, product_id: u16) {
        let selector = DeviceSelector::new(vendor_id, product_id);
        if selector != self.selector {
            self.select_device(selector);
        }
    }

    /// Rescan the directory and react to arrivals and removals. Called
    /// periodically by the watcher and on demand by external device-change
    /// notifications.
    pub fn rescan(&mut self) {
        let diff = self.refresh_directory();
        // Removal matters when it takes away the device we are connected to,
        // or, while NotWorking, when the selector no longer resolves at all.
        let connected_removed = match &self.handle {
            Some(handle) => diff
                .removed
                .iter()
                .any(|d| d.system_id == handle.system_id()),
            None => false,
        };
        let selector_gone = self.status != ConnectionStatus::Disconnected
            && self.directory.find(&self.selector).is_none();
        if connected_removed || selector_gone {
            self.close_handle();
        }
        // An arrival may be the device we are waiting for; a retry also
        // covers the NotWorking case where the pipes failed last time.
        if self.status != ConnectionStatus::Connected && !diff.added.is_empty() {
            self.reconnect();
        }
    }

    /// Run one polling cycle. Returns false when not connected, in which
    /// case the caller is expected to idle briefly.
    ///
    /// Within one cycle the order is strict: write, record outcome, then
    /// optionally read and record. A failed transfer is counted and
    /// tolerated; it never changes the connection status by itself.
    pub fn poll_cycle(&mut self) -> bool {
        if self.status != ConnectionStatus::Connected {
            return false;
        }
        let Some(handle) = self.handle.as_mut() else {
            return false;
        };
        let outbound = self.state.build_outbound();
        let sent = handle.write(&outbound);
        self.state.on_sent(sent);
        if self.state.should_receive() {
            match handle.read() {
                Ok(inbound) => self.state.on_received(&inbound),
                Err(err) => {
                    debug!(%err, "read failed");
                    self.state.on_receive_failed();
                }
            }
        }
        true
    }

    /// Drop any open connection, e.g. on shutdown.
    pub fn disconnect(&mut self) {
        self.close_handle();
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn selector(&self) -> DeviceSelector {
        self.selector
    }

    pub fn device_list(&self) -> Vec<Device> {
        self.directory.devices().to_vec()
    }

    pub fn request_led_toggle(&mut self) -> bool {
        self.state.request_led_toggle()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }
}

fn lock(core: &Arc<Mutex<SessionCore>>) -> MutexGuard<'_, SessionCore> {
    core.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Live communication session with one HID device: owns the polling worker
/// and the directory watcher, self-heals across unplug/replug, and exposes
/// the decoded state to front-ends.
pub struct HidSession {
    core: Arc<Mutex<SessionCore>>,
    stop: Arc<AtomicBool>,
    poller: Option<JoinHandle<()>>,
    watcher: Option<JoinHandle<()>>,
}

impl HidSession {
    /// Start a session against `selector`, attempting an initial connection
    /// immediately.
    pub fn start(transport: Box<dyn Transport>, selector: DeviceSelector) -> Self {
        let mut core = SessionCore::new(transport, selector);
        core.select_device(selector);
        let core = Arc::new(Mutex::new(core));
        let stop = Arc::new(AtomicBool::new(false));

        let poller = {
            let core = Arc::clone(&core);
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                while !stop.load(Ordering::Relaxed) {
                    let worked = lock(&core).poll_cycle();
                    if !worked {
                        thread::sleep(IDLE_SLEEP);
                    }
                }
            })
        };

        let watcher = {
            let core = Arc::clone(&core);
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                while !stop.load(Ordering::Relaxed) {
                    thread::sleep(RESCAN_INTERVAL);
                    if stop.load(Ordering::Relaxed) {
                        break;
                    }
                    lock(&core).rescan();
                }
            })
        };

        Self {
            core,
            stop,
            poller: Some(poller),
            watcher: Some(watcher),
        }
    }

    /// Subscribe to session events. Each subscriber gets its own channel.
    pub fn subscribe(&self) -> Receiver<SessionEvent> {
        lock(&self.core).subscribe()
    }

    /// Select a different VID/PID. No-op when equal to the current selector.
    pub fn set_selector(&self, vendor_id: u16, product_id: u16) {
        lock(&self.core).set_selector(vendor_id, product_id);
    }

    /// Request an LED toggle; false while one is already pending.
    pub fn request_led_toggle(&self) -> bool {
        lock(&self.core).request_led_toggle()
    }

    /// Poke the session from an external device-change notification source.
    pub fn notify_device_change(&self) {
        lock(&self.core).rescan();
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        lock(&self.core).status()
    }

    pub fn selector(&self) -> DeviceSelector {
        lock(&self.core).selector()
    }

    pub fn device_list(&self) -> Vec<Device> {
        lock(&self.core).device_list()
    }

    pub fn current_adc_value(&self) -> u16 {
        lock(&self.core).state().adc_value()
    }

    pub fn is_pushbutton_pressed(&self) -> bool {
        lock(&self.core).state().pushbutton_pressed()
    }

    pub fn is_led_toggle_pending(&self) -> bool {
        lock(&self.core).state().led_toggle_pending()
    }

    pub fn transfer_counters(&self) -> TransferCounters {
        lock(&self.core).state().counters()
    }

    pub fn uptime(&self) -> Duration {
        lock(&self.core).state().uptime()
    }

    /// Stop both worker threads and close the connection. Idempotent; also
    /// runs on drop.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.poller.take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.watcher.take() {
            let _ = handle.join();
        }
        lock(&self.core).disconnect();
    }
}

impl Drop for HidSession {
    fn drop(&mut self) {
        self.stop();
    }
}
