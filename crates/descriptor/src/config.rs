//! Configuration descriptor tree parsing
//!
//! A configuration descriptor is followed by a variable number of interface,
//! endpoint and class-specific descriptors, `total_length` bytes in all.
//! [`parse_configuration`] walks those sub-descriptors by their own length
//! byte and builds the tree.

use crate::error::{DescriptorError, Result};
use crate::types::{
    CONFIG_DESC_LENGTH, Descriptor, ENDPOINT_AUDIO_DESC_LENGTH, ENDPOINT_DESC_LENGTH,
    EndpointDescriptor, INTERFACE_DESC_LENGTH, InterfaceDescriptor, MAX_ALTSETTINGS,
    MAX_ENDPOINTS, MAX_INTERFACES, descriptor_type, parse_descriptor,
};
use serde::{Deserialize, Serialize};

/// Configuration descriptor with its nested interfaces
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigDescriptor {
    pub length: u8,
    pub descriptor_type: u8,
    pub total_length: u16,
    pub num_interfaces: u8,
    pub configuration_value: u8,
    pub configuration_index: u8,
    pub attributes: u8,
    /// In 2 mA units
    pub max_power: u8,
    pub interfaces: Vec<Interface>,
    /// Class-specific descriptors before the first interface
    pub extra: Vec<u8>,
}

impl Descriptor for ConfigDescriptor {
    const LAYOUT: &'static str = "bbwbbbbb";

    fn from_fields(f: &[u32]) -> Self {
        Self {
            length: f[0] as u8,
            descriptor_type: f[1] as u8,
            total_length: f[2] as u16,
            num_interfaces: f[3] as u8,
            configuration_value: f[4] as u8,
            configuration_index: f[5] as u8,
            attributes: f[6] as u8,
            max_power: f[7] as u8,
            interfaces: Vec::new(),
            extra: Vec::new(),
        }
    }

    fn to_fields(&self) -> Vec<u32> {
        vec![
            self.length.into(),
            self.descriptor_type.into(),
            self.total_length.into(),
            self.num_interfaces.into(),
            self.configuration_value.into(),
            self.configuration_index.into(),
            self.attributes.into(),
            self.max_power.into(),
        ]
    }
}

impl ConfigDescriptor {
    pub fn self_powered(&self) -> bool {
        self.attributes & 0x40 != 0
    }

    pub fn remote_wakeup(&self) -> bool {
        self.attributes & 0x20 != 0
    }

    /// Maximum bus power draw in milliamps
    pub fn max_power_ma(&self) -> u16 {
        u16::from(self.max_power) * 2
    }
}

/// All alternate settings sharing one interface number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interface {
    pub altsettings: Vec<InterfaceDescriptor>,
}

impl Interface {
    /// Interface number shared by every alternate setting
    pub fn number(&self) -> Option<u8> {
        self.altsettings.first().map(|alt| alt.interface_number)
    }
}

/// Result of [`parse_configuration`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedConfig {
    pub config: ConfigDescriptor,
    /// Trailing bytes the parser did not consume
    pub leftover: usize,
}

/// Where class-specific bytes currently attach
#[derive(Debug, Clone, Copy)]
enum Level {
    Config,
    Interface { iface: usize, alt: usize },
    Endpoint { iface: usize, alt: usize, ep: usize },
}

impl Level {
    fn extra_mut(self, config: &mut ConfigDescriptor) -> &mut Vec<u8> {
        match self {
            Level::Config => &mut config.extra,
            Level::Interface { iface, alt } => &mut config.interfaces[iface].altsettings[alt].extra,
            Level::Endpoint { iface, alt, ep } => {
                &mut config.interfaces[iface].altsettings[alt].endpoints[ep].extra
            }
        }
    }

    fn altsetting(self) -> Option<(usize, usize)> {
        match self {
            Level::Config => None,
            Level::Interface { iface, alt } | Level::Endpoint { iface, alt, .. } => {
                Some((iface, alt))
            }
        }
    }
}

/// Parse a complete configuration buffer (`total_length` bytes)
///
/// Parsing stops early at zero padding, at fewer than two remaining bytes, or
/// at an interface beyond the declared interface count; whatever was not
/// consumed is reported as `leftover`.
///
/// # Example
/// ```
/// use descriptor::parse_configuration;
///
/// // Configuration with one interface and no endpoints
/// let bytes = [
///     9, 2, 18, 0, 1, 1, 0, 0x80, 50,
///     9, 4, 0, 0, 0, 0xff, 0, 0, 0,
/// ];
/// let parsed = parse_configuration(&bytes).unwrap();
/// assert_eq!(parsed.config.interfaces.len(), 1);
/// assert_eq!(parsed.leftover, 0);
/// ```
pub fn parse_configuration(bytes: &[u8]) -> Result<ParsedConfig> {
    let mut config: ConfigDescriptor = parse_descriptor(bytes)?;

    if config.descriptor_type != descriptor_type::CONFIGURATION {
        return Err(DescriptorError::UnexpectedType {
            expected: descriptor_type::CONFIGURATION,
            found: config.descriptor_type,
        });
    }
    if usize::from(config.length) < CONFIG_DESC_LENGTH {
        return Err(DescriptorError::InvalidLength {
            length: config.length.into(),
            minimum: CONFIG_DESC_LENGTH,
        });
    }
    if usize::from(config.num_interfaces) > MAX_INTERFACES {
        return Err(DescriptorError::TooMany {
            what: "interfaces",
            count: config.num_interfaces.into(),
            max: MAX_INTERFACES,
        });
    }

    let end = bytes.len().min(usize::from(config.total_length));
    let mut offset = usize::from(config.length);
    if offset > end {
        return Err(DescriptorError::Truncated {
            offset: 0,
            length: offset,
            remaining: end,
        });
    }

    let mut level = Level::Config;
    while end - offset >= 2 {
        let remaining = end - offset;
        let length = usize::from(bytes[offset]);
        if length == 0 {
            break;
        }
        if length < 2 {
            return Err(DescriptorError::InvalidLength { length, minimum: 2 });
        }
        if length > remaining {
            return Err(DescriptorError::Truncated {
                offset,
                length,
                remaining,
            });
        }

        let body = &bytes[offset..offset + length];
        match (body[1], level.altsetting()) {
            (descriptor_type::INTERFACE, _) => {
                if length < INTERFACE_DESC_LENGTH {
                    return Err(DescriptorError::InvalidLength {
                        length,
                        minimum: INTERFACE_DESC_LENGTH,
                    });
                }
                let alt: InterfaceDescriptor = parse_descriptor(body)?;
                let existing = config
                    .interfaces
                    .iter()
                    .position(|i| i.number() == Some(alt.interface_number));

                let iface = match existing {
                    Some(iface) => {
                        let count = config.interfaces[iface].altsettings.len();
                        if count >= MAX_ALTSETTINGS {
                            return Err(DescriptorError::TooMany {
                                what: "alternate settings",
                                count: count + 1,
                                max: MAX_ALTSETTINGS,
                            });
                        }
                        iface
                    }
                    None => {
                        if config.interfaces.len() >= usize::from(config.num_interfaces) {
                            break;
                        }
                        config.interfaces.push(Interface {
                            altsettings: Vec::new(),
                        });
                        config.interfaces.len() - 1
                    }
                };

                config.interfaces[iface].altsettings.push(alt);
                let alt = config.interfaces[iface].altsettings.len() - 1;
                level = Level::Interface { iface, alt };
            }
            (descriptor_type::ENDPOINT, Some((iface, alt))) => {
                if length < ENDPOINT_DESC_LENGTH {
                    return Err(DescriptorError::InvalidLength {
                        length,
                        minimum: ENDPOINT_DESC_LENGTH,
                    });
                }
                let mut endpoint: EndpointDescriptor = parse_descriptor(body)?;
                if length >= ENDPOINT_AUDIO_DESC_LENGTH {
                    endpoint.refresh = body[7];
                    endpoint.synch_address = body[8];
                }

                let endpoints = &mut config.interfaces[iface].altsettings[alt].endpoints;
                if endpoints.len() >= MAX_ENDPOINTS {
                    return Err(DescriptorError::TooMany {
                        what: "endpoints",
                        count: endpoints.len() + 1,
                        max: MAX_ENDPOINTS,
                    });
                }
                endpoints.push(endpoint);
                level = Level::Endpoint {
                    iface,
                    alt,
                    ep: endpoints.len() - 1,
                };
            }
            _ => level.extra_mut(&mut config).extend_from_slice(body),
        }

        offset += length;
    }

    Ok(ParsedConfig {
        config,
        leftover: bytes.len() - offset,
    })
}
