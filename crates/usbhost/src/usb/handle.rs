//! Open handles and their lifecycle
//!
//! A handle is one open device node. [`HandleManager`] owns every live
//! handle together with the poll registry, so opening and closing keep the
//! two in step: interest is registered when a node opens and deregistered
//! before its descriptor is released.

use super::device::{DeviceId, DeviceRegistry};
use super::node::{ControlRequest, DeviceNode, NodeBackend};
use super::poll::{Interest, PollEntry, PollRegistry};
use crate::error::{HostError, Result};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::os::fd::RawFd;
use tracing::{debug, error, instrument, warn};

/// Handle identifier, unique within one context
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HandleId(pub u32);

/// A live session on a device
pub struct OpenHandle {
    device: DeviceId,
    node: Box<dyn DeviceNode>,
    claimed: BTreeSet<u32>,
}

impl fmt::Debug for OpenHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenHandle")
            .field("device", &self.device)
            .field("fd", &self.node.raw_fd())
            .field("claimed", &self.claimed)
            .finish()
    }
}

impl OpenHandle {
    pub fn device(&self) -> DeviceId {
        self.device
    }

    pub fn raw_fd(&self) -> RawFd {
        self.node.raw_fd()
    }
}

/// Registry of open handles plus their poll interest
#[derive(Debug)]
pub struct HandleManager {
    handles: HashMap<HandleId, OpenHandle>,
    poll: PollRegistry,
    default_interest: Interest,
    next_handle_id: u32,
}

impl HandleManager {
    pub fn new(default_interest: Interest) -> Self {
        Self {
            handles: HashMap::new(),
            poll: PollRegistry::new(),
            default_interest,
            next_handle_id: 1,
        }
    }

    /// Open `device_id`'s node and track the new handle
    ///
    /// On failure nothing is registered.
    #[instrument(level = "debug", skip(self, backend, devices))]
    pub fn open<B: NodeBackend + ?Sized>(
        &mut self,
        backend: &B,
        devices: &DeviceRegistry,
        device_id: DeviceId,
    ) -> Result<HandleId> {
        let device = devices
            .get(device_id)
            .ok_or(HostError::DeviceGone(device_id))?;
        debug!("open {:04x}:{:04x}", device.vendor_id(), device.product_id());

        let node = backend.open(&device.node_path).map_err(|source| {
            error!("open {} failed: {}", device.node_path.display(), source);
            HostError::Open {
                path: device.node_path.clone(),
                source,
            }
        })?;

        let id = HandleId(self.next_handle_id);
        self.next_handle_id += 1;

        self.poll.register(node.raw_fd(), self.default_interest);
        self.handles.insert(
            id,
            OpenHandle {
                device: device_id,
                node,
                claimed: BTreeSet::new(),
            },
        );

        debug!("Opened {:?} as {:?}", device_id, id);
        Ok(id)
    }

    /// Close a handle, releasing its descriptor exactly once
    #[instrument(level = "debug", skip(self))]
    pub fn close(&mut self, id: HandleId) -> Result<()> {
        let handle = self.handles.remove(&id).ok_or_else(|| {
            error!("close of {:?}, which is not open", id);
            HostError::HandleNotOpen(id)
        })?;
        self.release(id, handle);
        Ok(())
    }

    /// Force-close every remaining handle, returning how many there were
    pub fn close_all(&mut self) -> usize {
        let mut ids: Vec<HandleId> = self.handles.keys().copied().collect();
        ids.sort();

        for id in &ids {
            if let Some(handle) = self.handles.remove(id) {
                self.release(*id, handle);
            }
        }
        ids.len()
    }

    fn release(&mut self, id: HandleId, handle: OpenHandle) {
        let fd = handle.raw_fd();
        if !handle.claimed.is_empty() {
            debug!(
                "{:?} closing with interfaces {:?} still claimed",
                id, handle.claimed
            );
        }

        if !self.poll.deregister(fd) {
            warn!("{:?} had no poll entry for fd {}", id, fd);
        }
        // Dropping the node closes the descriptor
        drop(handle);
        debug!("Closed {:?} (fd {})", id, fd);
    }

    fn control(&mut self, id: HandleId, request: ControlRequest) -> Result<()> {
        let handle = self
            .handles
            .get_mut(&id)
            .ok_or(HostError::HandleNotOpen(id))?;

        handle.node.control(request).map_err(|source| {
            error!("{} failed: {}", request, source);
            HostError::Control {
                handle: id,
                request,
                source,
            }
        })?;

        match request {
            ControlRequest::ClaimInterface(i) => handle.claimed.insert(i),
            ControlRequest::ReleaseInterface(i) => handle.claimed.remove(&i),
        };
        Ok(())
    }

    #[instrument(level = "debug", skip(self))]
    pub fn claim_interface(&mut self, id: HandleId, interface: u32) -> Result<()> {
        debug!("interface {}", interface);
        self.control(id, ControlRequest::ClaimInterface(interface))
    }

    #[instrument(level = "debug", skip(self))]
    pub fn release_interface(&mut self, id: HandleId, interface: u32) -> Result<()> {
        debug!("interface {}", interface);
        self.control(id, ControlRequest::ReleaseInterface(interface))
    }

    /// Interfaces claimed through this handle, ascending
    pub fn claimed_interfaces(&self, id: HandleId) -> Result<Vec<u32>> {
        let handle = self.get(id)?;
        Ok(handle.claimed.iter().copied().collect())
    }

    /// Change what readiness the event loop should report for `id`
    pub fn set_interest(&mut self, id: HandleId, interest: Interest) -> Result<()> {
        let fd = self.get(id)?.raw_fd();
        self.poll.update(fd, interest);
        Ok(())
    }

    pub fn get(&self, id: HandleId) -> Result<&OpenHandle> {
        self.handles.get(&id).ok_or(HostError::HandleNotOpen(id))
    }

    /// Point-in-time copy of the poll set, in open order
    pub fn poll_fds(&self) -> Vec<PollEntry> {
        self.poll.snapshot()
    }

    /// Open handle ids, ascending
    pub fn open_handles(&self) -> Vec<HandleId> {
        let mut ids: Vec<HandleId> = self.handles.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}
