//! Device node backend abstraction
//!
//! The core never touches the filesystem directly. A [`NodeBackend`] lists
//! the two-level bus/device hierarchy and opens nodes; a [`DeviceNode`] is one
//! open node, read sequentially and closed when dropped.

use std::fmt;
use std::io;
use std::os::fd::RawFd;
use std::path::{Path, PathBuf};

/// Device-control request issued on an open node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlRequest {
    ClaimInterface(u32),
    ReleaseInterface(u32),
}

impl ControlRequest {
    /// Interface number the request targets
    pub fn interface(&self) -> u32 {
        match self {
            ControlRequest::ClaimInterface(i) | ControlRequest::ReleaseInterface(i) => *i,
        }
    }
}

impl fmt::Display for ControlRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlRequest::ClaimInterface(i) => write!(f, "claim interface {}", i),
            ControlRequest::ReleaseInterface(i) => write!(f, "release interface {}", i),
        }
    }
}

/// One open device node
///
/// Dropping the node releases its OS descriptor.
pub trait DeviceNode {
    /// Issue a single read; may return fewer bytes than requested
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Descriptor for event-loop registration
    fn raw_fd(&self) -> RawFd;

    /// Issue a device-control request
    fn control(&mut self, request: ControlRequest) -> io::Result<()>;
}

/// Source of device nodes
pub trait NodeBackend {
    /// Root of the bus hierarchy
    fn root(&self) -> &Path;

    /// Raw entry names under the root, in listing order
    fn list_buses(&self) -> io::Result<Vec<String>>;

    /// Raw entry names under one bus, in listing order
    fn list_devices(&self, bus: &str) -> io::Result<Vec<String>>;

    /// Path of a device node
    fn node_path(&self, bus: &str, device: &str) -> PathBuf {
        self.root().join(bus).join(device)
    }

    /// Open a node for reading and writing
    fn open(&self, path: &Path) -> io::Result<Box<dyn DeviceNode>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_request_display() {
        assert_eq!(
            ControlRequest::ClaimInterface(2).to_string(),
            "claim interface 2"
        );
        assert_eq!(ControlRequest::ReleaseInterface(0).interface(), 0);
    }
}
