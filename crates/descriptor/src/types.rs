//! Fixed-size USB descriptor types
//!
//! Each type here has a fixed wire layout and implements [`Descriptor`], so it
//! can be decoded with [`parse_descriptor`] and encoded with
//! [`encode_descriptor`].

use crate::error::Result;
use crate::layout::{encode_fields, parse_fields};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Length of a device descriptor on the wire
pub const DEVICE_DESC_LENGTH: usize = 18;

/// Bytes read to discover a configuration's total length
pub const CONFIG_PROBE_LENGTH: usize = 8;

/// Length of the fixed part of a configuration descriptor
pub const CONFIG_DESC_LENGTH: usize = 9;

/// Length of an interface descriptor
pub const INTERFACE_DESC_LENGTH: usize = 9;

/// Length of a standard endpoint descriptor
pub const ENDPOINT_DESC_LENGTH: usize = 7;

/// Length of an audio-class endpoint descriptor
pub const ENDPOINT_AUDIO_DESC_LENGTH: usize = 9;

/// Upper bound on configurations per device
pub const MAX_CONFIGURATIONS: u8 = 8;

/// Upper bound on interfaces per configuration
pub const MAX_INTERFACES: usize = 32;

/// Upper bound on alternate settings per interface
pub const MAX_ALTSETTINGS: usize = 128;

/// Upper bound on endpoints per alternate setting
pub const MAX_ENDPOINTS: usize = 32;

/// Descriptor type codes
pub mod descriptor_type {
    pub const DEVICE: u8 = 0x01;
    pub const CONFIGURATION: u8 = 0x02;
    pub const STRING: u8 = 0x03;
    pub const INTERFACE: u8 = 0x04;
    pub const ENDPOINT: u8 = 0x05;
}

/// A record with a fixed little-endian layout
pub trait Descriptor: Sized {
    /// Field layout, see [`crate::layout`]
    const LAYOUT: &'static str;

    /// Build the record from decoded fields (one per layout letter)
    fn from_fields(fields: &[u32]) -> Self;

    /// Flatten the record into fields (one per layout letter)
    fn to_fields(&self) -> Vec<u32>;
}

/// Decode a fixed-size descriptor
///
/// # Example
/// ```
/// use descriptor::{parse_descriptor, ConfigHeader};
///
/// let header: ConfigHeader = parse_descriptor(&[9, 2, 0x22, 0, 1, 1, 0, 0x80]).unwrap();
/// assert_eq!(header.total_length, 0x22);
/// ```
pub fn parse_descriptor<T: Descriptor>(bytes: &[u8]) -> Result<T> {
    let fields = parse_fields(bytes, T::LAYOUT)?;
    Ok(T::from_fields(&fields))
}

/// Encode a fixed-size descriptor
pub fn encode_descriptor<T: Descriptor>(descriptor: &T) -> Result<Vec<u8>> {
    encode_fields(&descriptor.to_fields(), T::LAYOUT)
}

/// Standard USB device descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    pub length: u8,
    pub descriptor_type: u8,
    /// bcdUSB
    pub usb_version: u16,
    pub class: u8,
    pub subclass: u8,
    pub protocol: u8,
    pub max_packet_size0: u8,
    pub vendor_id: u16,
    pub product_id: u16,
    /// bcdDevice
    pub device_version: u16,
    pub manufacturer_index: u8,
    pub product_index: u8,
    pub serial_number_index: u8,
    pub num_configurations: u8,
}

impl Descriptor for DeviceDescriptor {
    const LAYOUT: &'static str = "bbwbbbbwwwbbbb";

    fn from_fields(f: &[u32]) -> Self {
        Self {
            length: f[0] as u8,
            descriptor_type: f[1] as u8,
            usb_version: f[2] as u16,
            class: f[3] as u8,
            subclass: f[4] as u8,
            protocol: f[5] as u8,
            max_packet_size0: f[6] as u8,
            vendor_id: f[7] as u16,
            product_id: f[8] as u16,
            device_version: f[9] as u16,
            manufacturer_index: f[10] as u8,
            product_index: f[11] as u8,
            serial_number_index: f[12] as u8,
            num_configurations: f[13] as u8,
        }
    }

    fn to_fields(&self) -> Vec<u32> {
        vec![
            self.length.into(),
            self.descriptor_type.into(),
            self.usb_version.into(),
            self.class.into(),
            self.subclass.into(),
            self.protocol.into(),
            self.max_packet_size0.into(),
            self.vendor_id.into(),
            self.product_id.into(),
            self.device_version.into(),
            self.manufacturer_index.into(),
            self.product_index.into(),
            self.serial_number_index.into(),
            self.num_configurations.into(),
        ]
    }
}

impl DeviceDescriptor {
    /// Device class as a named code
    pub fn class_code(&self) -> ClassCode {
        ClassCode::from(self.class)
    }
}

/// Leading fields of a configuration descriptor
///
/// Enough to learn how many bytes the whole configuration occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigHeader {
    pub length: u8,
    pub descriptor_type: u8,
    /// wTotalLength: configuration plus all nested descriptors
    pub total_length: u16,
}

impl Descriptor for ConfigHeader {
    const LAYOUT: &'static str = "bbw";

    fn from_fields(f: &[u32]) -> Self {
        Self {
            length: f[0] as u8,
            descriptor_type: f[1] as u8,
            total_length: f[2] as u16,
        }
    }

    fn to_fields(&self) -> Vec<u32> {
        vec![
            self.length.into(),
            self.descriptor_type.into(),
            self.total_length.into(),
        ]
    }
}

/// Endpoint transfer direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Host to device
    Out,
    /// Device to host
    In,
}

/// Endpoint transfer type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferType {
    Control,
    Isochronous,
    Bulk,
    Interrupt,
}

/// Endpoint descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointDescriptor {
    pub length: u8,
    pub descriptor_type: u8,
    pub address: u8,
    pub attributes: u8,
    pub max_packet_size: u16,
    pub interval: u8,
    /// Audio endpoints only
    pub refresh: u8,
    /// Audio endpoints only
    pub synch_address: u8,
    /// Class-specific descriptors following this endpoint
    pub extra: Vec<u8>,
}

impl Descriptor for EndpointDescriptor {
    const LAYOUT: &'static str = "bbbbwb";

    fn from_fields(f: &[u32]) -> Self {
        Self {
            length: f[0] as u8,
            descriptor_type: f[1] as u8,
            address: f[2] as u8,
            attributes: f[3] as u8,
            max_packet_size: f[4] as u16,
            interval: f[5] as u8,
            refresh: 0,
            synch_address: 0,
            extra: Vec::new(),
        }
    }

    fn to_fields(&self) -> Vec<u32> {
        vec![
            self.length.into(),
            self.descriptor_type.into(),
            self.address.into(),
            self.attributes.into(),
            self.max_packet_size.into(),
            self.interval.into(),
        ]
    }
}

impl EndpointDescriptor {
    /// Endpoint number without the direction bit
    pub fn number(&self) -> u8 {
        self.address & 0x0f
    }

    pub fn direction(&self) -> Direction {
        if self.address & 0x80 != 0 {
            Direction::In
        } else {
            Direction::Out
        }
    }

    pub fn transfer_type(&self) -> TransferType {
        match self.attributes & 0x03 {
            0 => TransferType::Control,
            1 => TransferType::Isochronous,
            2 => TransferType::Bulk,
            _ => TransferType::Interrupt,
        }
    }
}

/// Interface descriptor (one alternate setting)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceDescriptor {
    pub length: u8,
    pub descriptor_type: u8,
    pub interface_number: u8,
    pub alternate_setting: u8,
    pub num_endpoints: u8,
    pub class: u8,
    pub subclass: u8,
    pub protocol: u8,
    pub interface_index: u8,
    pub endpoints: Vec<EndpointDescriptor>,
    /// Class-specific descriptors between this interface and its first endpoint
    pub extra: Vec<u8>,
}

impl Descriptor for InterfaceDescriptor {
    const LAYOUT: &'static str = "bbbbbbbbb";

    fn from_fields(f: &[u32]) -> Self {
        Self {
            length: f[0] as u8,
            descriptor_type: f[1] as u8,
            interface_number: f[2] as u8,
            alternate_setting: f[3] as u8,
            num_endpoints: f[4] as u8,
            class: f[5] as u8,
            subclass: f[6] as u8,
            protocol: f[7] as u8,
            interface_index: f[8] as u8,
            endpoints: Vec::new(),
            extra: Vec::new(),
        }
    }

    fn to_fields(&self) -> Vec<u32> {
        vec![
            self.length.into(),
            self.descriptor_type.into(),
            self.interface_number.into(),
            self.alternate_setting.into(),
            self.num_endpoints.into(),
            self.class.into(),
            self.subclass.into(),
            self.protocol.into(),
            self.interface_index.into(),
        ]
    }
}

impl InterfaceDescriptor {
    pub fn class_code(&self) -> ClassCode {
        ClassCode::from(self.class)
    }
}

/// Named USB class codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClassCode {
    /// Class defined per interface
    PerInterface,
    Audio,
    Communications,
    Hid,
    Physical,
    Image,
    Printer,
    MassStorage,
    Hub,
    CdcData,
    SmartCard,
    ContentSecurity,
    Video,
    PersonalHealthcare,
    AudioVideo,
    Billboard,
    Diagnostic,
    Wireless,
    Miscellaneous,
    ApplicationSpecific,
    VendorSpecific,
    Unknown(u8),
}

impl From<u8> for ClassCode {
    fn from(code: u8) -> Self {
        match code {
            0x00 => Self::PerInterface,
            0x01 => Self::Audio,
            0x02 => Self::Communications,
            0x03 => Self::Hid,
            0x05 => Self::Physical,
            0x06 => Self::Image,
            0x07 => Self::Printer,
            0x08 => Self::MassStorage,
            0x09 => Self::Hub,
            0x0a => Self::CdcData,
            0x0b => Self::SmartCard,
            0x0d => Self::ContentSecurity,
            0x0e => Self::Video,
            0x0f => Self::PersonalHealthcare,
            0x10 => Self::AudioVideo,
            0x11 => Self::Billboard,
            0xdc => Self::Diagnostic,
            0xe0 => Self::Wireless,
            0xef => Self::Miscellaneous,
            0xfe => Self::ApplicationSpecific,
            0xff => Self::VendorSpecific,
            other => Self::Unknown(other),
        }
    }
}

impl fmt::Display for ClassCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PerInterface => "(Defined at Interface level)",
            Self::Audio => "Audio",
            Self::Communications => "Communications",
            Self::Hid => "Human Interface Device",
            Self::Physical => "Physical Interface Device",
            Self::Image => "Imaging",
            Self::Printer => "Printer",
            Self::MassStorage => "Mass Storage",
            Self::Hub => "Hub",
            Self::CdcData => "CDC Data",
            Self::SmartCard => "Chip/SmartCard",
            Self::ContentSecurity => "Content Security",
            Self::Video => "Video",
            Self::PersonalHealthcare => "Personal Healthcare",
            Self::AudioVideo => "Audio/Video",
            Self::Billboard => "Billboard",
            Self::Diagnostic => "Diagnostic",
            Self::Wireless => "Wireless",
            Self::Miscellaneous => "Miscellaneous Device",
            Self::ApplicationSpecific => "Application Specific Interface",
            Self::VendorSpecific => "Vendor Specific Class",
            Self::Unknown(code) => return write!(f, "Unknown ({:#04x})", code),
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_device() -> DeviceDescriptor {
        DeviceDescriptor {
            length: 18,
            descriptor_type: descriptor_type::DEVICE,
            usb_version: 0x0200,
            class: 0,
            subclass: 0,
            protocol: 0,
            max_packet_size0: 64,
            vendor_id: 0x046d,
            product_id: 0xc52b,
            device_version: 0x1201,
            manufacturer_index: 1,
            product_index: 2,
            serial_number_index: 0,
            num_configurations: 1,
        }
    }

    #[test]
    fn test_device_descriptor_wire_layout() {
        let bytes = encode_descriptor(&sample_device()).unwrap();
        assert_eq!(bytes.len(), DEVICE_DESC_LENGTH);
        // idVendor lives at offset 8, little-endian
        assert_eq!(&bytes[8..10], &[0x6d, 0x04]);
        assert_eq!(bytes[17], 1);
    }

    #[test]
    fn test_device_descriptor_decode() {
        let bytes = encode_descriptor(&sample_device()).unwrap();
        let decoded: DeviceDescriptor = parse_descriptor(&bytes).unwrap();
        assert_eq!(decoded, sample_device());
        assert_eq!(decoded.class_code(), ClassCode::PerInterface);
    }

    #[test]
    fn test_config_header_from_probe() {
        let probe = [0x09, 0x02, 0x19, 0x00, 0x01, 0x01, 0x00, 0xe0];
        let header: ConfigHeader = parse_descriptor(&probe).unwrap();
        assert_eq!(header.length, 9);
        assert_eq!(header.descriptor_type, descriptor_type::CONFIGURATION);
        assert_eq!(header.total_length, 25);
    }

    #[test]
    fn test_endpoint_helpers() {
        let mut ep: EndpointDescriptor =
            parse_descriptor(&[7, 5, 0x81, 0x03, 0x08, 0x00, 10]).unwrap();
        assert_eq!(ep.number(), 1);
        assert_eq!(ep.direction(), Direction::In);
        assert_eq!(ep.transfer_type(), TransferType::Interrupt);
        assert_eq!(ep.max_packet_size, 8);

        ep.address = 0x02;
        ep.attributes = 0x02;
        assert_eq!(ep.direction(), Direction::Out);
        assert_eq!(ep.transfer_type(), TransferType::Bulk);
    }

    #[test]
    fn test_class_code_display() {
        assert_eq!(ClassCode::from(0x09).to_string(), "Hub");
        assert_eq!(ClassCode::from(0x03), ClassCode::Hid);
        assert_eq!(ClassCode::from(0x42).to_string(), "Unknown (0x42)");
    }
}
