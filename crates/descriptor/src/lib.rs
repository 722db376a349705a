//! USB descriptor codec
//!
//! Turns raw descriptor bytes, as read from a device node, into typed
//! descriptors and back. Fixed-size records are described by a layout string
//! (see [`layout`]); configuration descriptors, whose nested interfaces and
//! endpoints make them variable-length, are decoded with
//! [`parse_configuration`].
//!
//! # Example
//!
//! ```
//! use descriptor::{DeviceDescriptor, DEVICE_DESC_LENGTH, parse_descriptor};
//!
//! let raw: [u8; DEVICE_DESC_LENGTH] = [
//!     18, 1, 0x00, 0x02, 0, 0, 0, 64, 0x6d, 0x04, 0x2b, 0xc5, 0x01, 0x12, 1, 2, 0, 1,
//! ];
//! let desc: DeviceDescriptor = parse_descriptor(&raw).unwrap();
//! assert_eq!(desc.vendor_id, 0x046d);
//! assert_eq!(desc.product_id, 0xc52b);
//! assert_eq!(desc.num_configurations, 1);
//! ```

pub mod config;
pub mod error;
pub mod layout;
pub mod types;

pub use config::{ConfigDescriptor, Interface, ParsedConfig, parse_configuration};
pub use error::{DescriptorError, Result};
pub use layout::{encode_fields, layout_len, parse_fields};
pub use types::{
    CONFIG_DESC_LENGTH, CONFIG_PROBE_LENGTH, ClassCode, ConfigHeader, DEVICE_DESC_LENGTH,
    Descriptor, DeviceDescriptor, Direction, ENDPOINT_AUDIO_DESC_LENGTH, ENDPOINT_DESC_LENGTH,
    EndpointDescriptor, INTERFACE_DESC_LENGTH, InterfaceDescriptor, MAX_ALTSETTINGS,
    MAX_CONFIGURATIONS, MAX_ENDPOINTS, MAX_INTERFACES, TransferType, descriptor_type,
    encode_descriptor, parse_descriptor,
};
