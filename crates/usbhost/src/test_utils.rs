//! Test utilities for usbhost
//!
//! [`MockBackend`] is an in-memory bus hierarchy. Each node yields a fixed
//! byte image, one read at a time, and the backend records every read length,
//! open, close and control request so tests can assert on exact I/O patterns.
//!
//! # Example
//!
//! ```
//! use common::test_utils::{config_descriptor_bytes, device_node_image};
//! use usbhost::test_utils::MockBackend;
//! use usbhost::{HostConfig, UsbContext};
//!
//! let backend = MockBackend::new();
//! let config = config_descriptor_bytes(1, &[&[0x81]]);
//! backend.add_node("001", "002", device_node_image(0x1234, 0x5678, &[config]));
//!
//! let mut ctx = UsbContext::with_backend(backend.clone(), &HostConfig::default());
//! let report = ctx.scan_all().unwrap();
//! assert_eq!(report.devices_added, 1);
//! assert!(backend.live_fds().is_empty());
//! ```

use crate::usb::{ControlRequest, DeviceNode, NodeBackend};
use nix::errno::Errno;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::io;
use std::os::fd::RawFd;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// First descriptor number handed out by the mock
pub const MOCK_FIRST_FD: RawFd = 100;

#[derive(Debug, Default)]
struct MockState {
    /// Bus name -> device entry names, both in listing order
    buses: Vec<(String, Vec<String>)>,
    images: HashMap<PathBuf, Vec<u8>>,
    unlistable_buses: HashSet<String>,
    root_unlistable: bool,
    claim_failures: HashMap<u32, Errno>,
    read_log: HashMap<PathBuf, Vec<usize>>,
    live_fds: BTreeSet<RawFd>,
    closed_fds: Vec<RawFd>,
    controls: Vec<(RawFd, ControlRequest)>,
    opens: usize,
    next_fd: RawFd,
}

/// In-memory device node hierarchy
#[derive(Debug, Clone)]
pub struct MockBackend {
    root: PathBuf,
    state: Arc<Mutex<MockState>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            root: PathBuf::from(crate::usb::DEFAULT_USBFS_ROOT),
            state: Arc::new(Mutex::new(MockState {
                next_fd: MOCK_FIRST_FD,
                ..MockState::default()
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Path of a node under this backend's root
    pub fn path(&self, bus: &str, name: &str) -> PathBuf {
        self.node_path(bus, name)
    }

    /// Add an empty bus directory
    pub fn add_bus(&self, bus: &str) {
        let mut state = self.state();
        if !state.buses.iter().any(|(b, _)| b == bus) {
            state.buses.push((bus.to_string(), Vec::new()));
        }
    }

    /// Add a listed entry with no node behind it (opening fails)
    pub fn add_entry(&self, bus: &str, name: &str) {
        self.add_bus(bus);
        let mut state = self.state();
        if let Some((_, entries)) = state.buses.iter_mut().find(|(b, _)| b == bus)
            && !entries.iter().any(|e| e == name)
        {
            entries.push(name.to_string());
        }
    }

    /// Add a node yielding `image` when read
    pub fn add_node(&self, bus: &str, name: &str, image: Vec<u8>) {
        self.add_entry(bus, name);
        let path = self.path(bus, name);
        self.state().images.insert(path, image);
    }

    /// Remove the node but keep its directory entry, as a racing unplug would
    pub fn unplug(&self, bus: &str, name: &str) {
        let path = self.path(bus, name);
        self.state().images.remove(&path);
    }

    pub fn fail_listing(&self, bus: &str) {
        self.state().unlistable_buses.insert(bus.to_string());
    }

    pub fn fail_root_listing(&self) {
        self.state().root_unlistable = true;
    }

    /// Make claims of `interface` fail with `errno`
    pub fn fail_claims(&self, interface: u32, errno: Errno) {
        self.state().claim_failures.insert(interface, errno);
    }

    /// Requested length of every read issued on `path`, across all opens
    pub fn read_log(&self, path: &Path) -> Vec<usize> {
        self.state().read_log.get(path).cloned().unwrap_or_default()
    }

    /// Successful opens so far
    pub fn open_count(&self) -> usize {
        self.state().opens
    }

    /// Descriptors currently open
    pub fn live_fds(&self) -> Vec<RawFd> {
        self.state().live_fds.iter().copied().collect()
    }

    /// Descriptors released so far, in close order
    pub fn closed_fds(&self) -> Vec<RawFd> {
        self.state().closed_fds.clone()
    }

    /// Every control request issued, in order
    pub fn controls(&self) -> Vec<(RawFd, ControlRequest)> {
        self.state().controls.clone()
    }
}

impl NodeBackend for MockBackend {
    fn root(&self) -> &Path {
        &self.root
    }

    fn list_buses(&self) -> io::Result<Vec<String>> {
        let state = self.state();
        if state.root_unlistable {
            return Err(io::Error::from(io::ErrorKind::NotFound));
        }
        Ok(state.buses.iter().map(|(b, _)| b.clone()).collect())
    }

    fn list_devices(&self, bus: &str) -> io::Result<Vec<String>> {
        let state = self.state();
        if state.unlistable_buses.contains(bus) {
            return Err(io::Error::from(io::ErrorKind::NotFound));
        }
        state
            .buses
            .iter()
            .find(|(b, _)| b == bus)
            .map(|(_, entries)| entries.clone())
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
    }

    fn open(&self, path: &Path) -> io::Result<Box<dyn DeviceNode>> {
        let mut state = self.state();
        let data = state
            .images
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))?;

        let fd = state.next_fd;
        state.next_fd += 1;
        state.opens += 1;
        state.live_fds.insert(fd);

        Ok(Box::new(MockNode {
            fd,
            path: path.to_path_buf(),
            data,
            position: 0,
            state: Arc::clone(&self.state),
        }))
    }
}

/// One open mock node
#[derive(Debug)]
pub struct MockNode {
    fd: RawFd,
    path: PathBuf,
    data: Vec<u8>,
    position: usize,
    state: Arc<Mutex<MockState>>,
}

impl MockNode {
    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl DeviceNode for MockNode {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.state()
            .read_log
            .entry(self.path.clone())
            .or_default()
            .push(buf.len());

        let available = self.data.len() - self.position;
        let n = buf.len().min(available);
        buf[..n].copy_from_slice(&self.data[self.position..self.position + n]);
        self.position += n;
        Ok(n)
    }

    fn raw_fd(&self) -> RawFd {
        self.fd
    }

    fn control(&mut self, request: ControlRequest) -> io::Result<()> {
        let mut state = self.state();
        state.controls.push((self.fd, request));
        if let ControlRequest::ClaimInterface(interface) = request
            && let Some(errno) = state.claim_failures.get(&interface)
        {
            return Err(io::Error::from(*errno));
        }
        Ok(())
    }
}

impl Drop for MockNode {
    fn drop(&mut self) {
        let fd = self.fd;
        let mut state = self.state();
        state.live_fds.remove(&fd);
        state.closed_fds.push(fd);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_are_logged_and_short_at_end() {
        let backend = MockBackend::new();
        backend.add_node("001", "001", vec![1, 2, 3, 4, 5]);
        let path = backend.path("001", "001");

        let mut node = backend.open(&path).unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(node.read(&mut buf).unwrap(), 4);
        assert_eq!(node.read(&mut buf).unwrap(), 1);
        assert_eq!(node.read(&mut buf).unwrap(), 0);
        assert_eq!(backend.read_log(&path), vec![4, 4, 4]);

        assert_eq!(backend.live_fds(), vec![MOCK_FIRST_FD]);
        drop(node);
        assert!(backend.live_fds().is_empty());
        assert_eq!(backend.closed_fds(), vec![MOCK_FIRST_FD]);
    }

    #[test]
    fn test_unplugged_node_fails_to_open() {
        let backend = MockBackend::new();
        backend.add_node("001", "002", vec![0; 18]);
        backend.unplug("001", "002");

        assert_eq!(backend.list_devices("001").unwrap(), vec!["002".to_string()]);
        let err = backend.open(&backend.path("001", "002")).err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert_eq!(backend.open_count(), 0);
    }

    #[test]
    fn test_listing_failures() {
        let backend = MockBackend::new();
        backend.add_bus("001");
        backend.fail_listing("001");
        assert!(backend.list_devices("001").is_err());
        assert!(backend.list_devices("999").is_err());

        backend.fail_root_listing();
        assert!(backend.list_buses().is_err());
    }

    #[test]
    fn test_claim_failure_injection() {
        let backend = MockBackend::new();
        backend.add_node("001", "001", Vec::new());
        backend.fail_claims(1, Errno::EBUSY);

        let mut node = backend.open(&backend.path("001", "001")).unwrap();
        assert!(node.control(ControlRequest::ClaimInterface(0)).is_ok());
        let err = node.control(ControlRequest::ClaimInterface(1)).unwrap_err();
        assert_eq!(err.raw_os_error(), Some(Errno::EBUSY as i32));
        assert!(node.control(ControlRequest::ReleaseInterface(1)).is_ok());
        assert_eq!(backend.controls().len(), 3);
    }
}
