//! Library context
//!
//! A [`UsbContext`] owns everything that would otherwise be process-wide:
//! the node backend, the device registry and the open handles with their
//! poll interest. Contexts are independent of each other. Dropping a context
//! force-closes any handle the application left open.

use crate::config::HostConfig;
use crate::error::{HostError, Result};
use crate::usb::{
    Device, DeviceId, DeviceRegistry, HandleId, HandleManager, Interest, NodeBackend, PollEntry,
    ScanReport, ScanSettings, UsbfsBackend, scan_all,
};
use tracing::{debug, info, instrument, warn};

pub struct UsbContext<B: NodeBackend = UsbfsBackend> {
    backend: B,
    devices: DeviceRegistry,
    handles: HandleManager,
    scan: ScanSettings,
}

impl UsbContext<UsbfsBackend> {
    /// Context over the usbfs tree named by `config`
    pub fn new(config: &HostConfig) -> Self {
        Self::with_backend(UsbfsBackend::new(config.usbfs.root_path()), config)
    }
}

impl<B: NodeBackend> UsbContext<B> {
    pub fn with_backend(backend: B, config: &HostConfig) -> Self {
        debug!("Creating context rooted at {}", backend.root().display());
        Self {
            backend,
            devices: DeviceRegistry::new(),
            handles: HandleManager::new(config.poll.default_interest),
            scan: config.scan_settings(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Discover devices on every bus, appending them to the registry
    pub fn scan_all(&mut self) -> Result<ScanReport> {
        scan_all(&self.backend, &mut self.devices, &self.scan)
    }

    /// Earliest discovered device
    pub fn first(&self) -> Option<DeviceId> {
        self.devices.first()
    }

    /// Device discovered after `id`
    pub fn next(&self, id: DeviceId) -> Option<DeviceId> {
        self.devices.next(id)
    }

    pub fn device(&self, id: DeviceId) -> Option<&Device> {
        self.devices.get(id)
    }

    /// Devices in discovery order
    pub fn devices(&self) -> impl Iterator<Item = (DeviceId, &Device)> {
        self.devices.iter()
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    /// Forget every discovered device
    ///
    /// Open handles stay open; resolving their device reports
    /// [`HostError::DeviceGone`].
    pub fn reset_devices(&mut self) {
        if !self.handles.is_empty() {
            warn!(
                "Resetting device registry with {} handle(s) still open",
                self.handles.len()
            );
        }
        self.devices.clear();
    }

    pub fn open(&mut self, device: DeviceId) -> Result<HandleId> {
        self.handles.open(&self.backend, &self.devices, device)
    }

    pub fn close(&mut self, handle: HandleId) -> Result<()> {
        self.handles.close(handle)
    }

    pub fn claim_interface(&mut self, handle: HandleId, interface: u32) -> Result<()> {
        self.handles.claim_interface(handle, interface)
    }

    pub fn release_interface(&mut self, handle: HandleId, interface: u32) -> Result<()> {
        self.handles.release_interface(handle, interface)
    }

    pub fn claimed_interfaces(&self, handle: HandleId) -> Result<Vec<u32>> {
        self.handles.claimed_interfaces(handle)
    }

    /// Device a handle was opened from, if it is still registered
    pub fn handle_device(&self, handle: HandleId) -> Result<&Device> {
        let device = self.handles.get(handle)?.device();
        self.devices
            .get(device)
            .ok_or(HostError::DeviceGone(device))
    }

    pub fn set_interest(&mut self, handle: HandleId, interest: Interest) -> Result<()> {
        self.handles.set_interest(handle, interest)
    }

    /// Snapshot of (descriptor, interest) pairs for an external event loop
    pub fn poll_fds(&self) -> Vec<PollEntry> {
        self.handles.poll_fds()
    }

    pub fn open_handles(&self) -> Vec<HandleId> {
        self.handles.open_handles()
    }

    /// Close every handle still open, returning how many were left
    #[instrument(skip(self))]
    pub fn shutdown(&mut self) -> usize {
        if self.handles.is_empty() {
            return 0;
        }
        warn!(
            "Application left {} device handle(s) open, closing them",
            self.handles.len()
        );
        let closed = self.handles.close_all();
        info!("Force-closed {} handle(s)", closed);
        closed
    }
}

impl<B: NodeBackend> Drop for UsbContext<B> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
