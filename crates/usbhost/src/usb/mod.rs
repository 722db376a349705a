//! USB subsystem
//!
//! Device discovery, descriptor fetching and handle lifecycle:
//! - `node` / `usbfs`: the device node seam and its Linux implementation
//! - `fetch`: two-phase descriptor reads for one device node
//! - `scan`: walking every bus and filling the device registry
//! - `device`: discovered devices and the registry holding them
//! - `handle` / `poll`: open handles and the poll set exported to event loops

pub mod device;
pub mod fetch;
pub mod handle;
pub mod node;
pub mod poll;
pub mod scan;
pub mod usbfs;

// Re-export public types
pub use device::{Device, DeviceId, DeviceRegistry};
pub use fetch::fetch_device;
pub use handle::{HandleId, HandleManager, OpenHandle};
pub use node::{ControlRequest, DeviceNode, NodeBackend};
pub use poll::{Interest, PollEntry, PollRegistry};
pub use scan::{ScanReport, ScanSettings, scan_all};
pub use usbfs::{DEFAULT_USBFS_ROOT, UsbfsBackend, UsbfsNode};
