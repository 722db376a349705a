//! Host-side USB error types

use crate::usb::{ControlRequest, DeviceId, HandleId};
use descriptor::DescriptorError;
use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Which read of the descriptor protocol came up short
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadPhase {
    /// The fixed-length device descriptor
    DeviceDescriptor,
    /// The 8-byte probe of configuration `n`
    ConfigHeader(u8),
    /// The remaining `total_length - 8` bytes of configuration `n`
    ConfigBody(u8),
}

impl fmt::Display for ReadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadPhase::DeviceDescriptor => write!(f, "device descriptor"),
            ReadPhase::ConfigHeader(i) => write!(f, "configuration {} header", i),
            ReadPhase::ConfigBody(i) => write!(f, "configuration {} body", i),
        }
    }
}

#[derive(Debug, Error)]
pub enum HostError {
    /// The bus root itself could not be listed
    #[error("Failed to list bus root {path}: {source}")]
    ListRoot {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A single bus directory could not be listed
    #[error("Failed to list bus {bus}: {source}")]
    ListBus {
        bus: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Read of {phase} from {path} failed: {source}")]
    Read {
        path: PathBuf,
        phase: ReadPhase,
        #[source]
        source: io::Error,
    },

    #[error("Short read of {phase} from {path}: {actual}/{expected} bytes")]
    ShortRead {
        path: PathBuf,
        phase: ReadPhase,
        expected: usize,
        actual: usize,
    },

    #[error("Device reports {count} configurations (allowed: 1..={max})")]
    InvalidConfigurationCount { count: u8, max: u8 },

    #[error("Configuration {index} declares total length {total_length} (minimum {minimum})")]
    InvalidTotalLength {
        index: u8,
        total_length: u16,
        minimum: usize,
    },

    #[error("Failed to allocate {size} bytes for configuration {index}")]
    Allocation { index: u8, size: usize },

    #[error("Descriptor decode error: {0}")]
    Descriptor(#[from] DescriptorError),

    /// The device was removed from the registry
    #[error("Device {0:?} is no longer present")]
    DeviceGone(DeviceId),

    /// Closed, never opened, or belonging to another context
    #[error("Handle {0:?} is not open")]
    HandleNotOpen(HandleId),

    #[error("{request} on handle {handle:?} failed: {source}")]
    Control {
        handle: HandleId,
        request: ControlRequest,
        #[source]
        source: io::Error,
    },
}

impl HostError {
    /// True for failures that mean the node vanished (unplug race)
    pub fn is_disconnect(&self) -> bool {
        let source = match self {
            HostError::Open { source, .. }
            | HostError::Read { source, .. }
            | HostError::ListBus { source, .. }
            | HostError::Control { source, .. } => source,
            _ => return false,
        };
        matches!(source.kind(), io::ErrorKind::NotFound)
            || source.raw_os_error() == Some(nix::errno::Errno::ENODEV as i32)
    }
}

pub type Result<T> = std::result::Result<T, HostError>;
