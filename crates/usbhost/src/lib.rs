//! Host-side USB access over usbfs
//!
//! This crate discovers USB devices through the device node hierarchy
//! (`/dev/bus/usb/<bus>/<device>` on Linux), reads and decodes their
//! descriptor trees, and manages open handles on them:
//!
//! - [`UsbContext::scan_all`] walks every bus and registers each device whose
//!   descriptors could be read, skipping (and counting) nodes that fail
//! - [`UsbContext::open`] / [`UsbContext::close`] manage handles, each backed
//!   by one OS descriptor
//! - [`UsbContext::poll_fds`] exports the open descriptors and their interest
//!   for integration into an external event loop
//!
//! # Example
//!
//! ```no_run
//! use usbhost::{HostConfig, UsbContext};
//!
//! let mut ctx = UsbContext::new(&HostConfig::default());
//! let report = ctx.scan_all()?;
//! println!("{} devices on {} buses", report.devices_added, report.buses_visited);
//!
//! if let Some(id) = ctx.first() {
//!     let handle = ctx.open(id)?;
//!     ctx.claim_interface(handle, 0)?;
//!     for entry in ctx.poll_fds() {
//!         println!("fd {} events {:?}", entry.fd, entry.events());
//!     }
//!     ctx.close(handle)?;
//! }
//! # Ok::<(), usbhost::HostError>(())
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod test_utils;
pub mod usb;

pub use config::HostConfig;
pub use context::UsbContext;
pub use error::{HostError, ReadPhase, Result};
pub use usb::{
    ControlRequest, Device, DeviceId, HandleId, Interest, PollEntry, ScanReport, ScanSettings,
};
