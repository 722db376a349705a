//! Discovered devices and the device registry
//!
//! Devices live in an arena keyed by [`DeviceId`]. Ids are handed out in
//! discovery order and never reused, so a stale id simply stops resolving.

use descriptor::{ConfigDescriptor, DeviceDescriptor};
use serde::Serialize;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::path::PathBuf;

/// Registry-assigned device identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct DeviceId(pub u32);

/// A USB device found on the bus, with its full descriptor tree
#[derive(Debug, Clone, Serialize)]
pub struct Device {
    /// Bus directory name
    pub bus: String,
    /// Device node name within the bus
    pub name: String,
    /// Path used to reopen the device
    pub node_path: PathBuf,
    pub descriptor: DeviceDescriptor,
    /// One entry per configuration, in index order
    pub configurations: Vec<ConfigDescriptor>,
}

impl Device {
    pub fn vendor_id(&self) -> u16 {
        self.descriptor.vendor_id
    }

    pub fn product_id(&self) -> u16 {
        self.descriptor.product_id
    }

    /// Bus number parsed from the bus directory name
    pub fn bus_number(&self) -> Option<u8> {
        self.bus.parse().ok()
    }

    /// Device address parsed from the node name
    pub fn address(&self) -> Option<u8> {
        self.name.parse().ok()
    }

    /// Configuration with the given bConfigurationValue
    pub fn configuration(&self, value: u8) -> Option<&ConfigDescriptor> {
        self.configurations
            .iter()
            .find(|c| c.configuration_value == value)
    }
}

/// Ordered collection of discovered devices
#[derive(Debug)]
pub struct DeviceRegistry {
    devices: BTreeMap<DeviceId, Device>,
    next_id: u32,
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self {
            devices: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Append a device, returning its new id
    pub fn insert(&mut self, device: Device) -> DeviceId {
        let id = DeviceId(self.next_id);
        self.next_id += 1;
        self.devices.insert(id, device);
        id
    }

    pub fn get(&self, id: DeviceId) -> Option<&Device> {
        self.devices.get(&id)
    }

    pub fn contains(&self, id: DeviceId) -> bool {
        self.devices.contains_key(&id)
    }

    /// Earliest discovered device
    pub fn first(&self) -> Option<DeviceId> {
        self.devices.keys().next().copied()
    }

    /// Device discovered immediately after `id`
    ///
    /// `None` at the end of the registry or when `id` is no longer present.
    pub fn next(&self, id: DeviceId) -> Option<DeviceId> {
        if !self.contains(id) {
            return None;
        }
        self.devices
            .range((Bound::Excluded(id), Bound::Unbounded))
            .next()
            .map(|(id, _)| *id)
    }

    /// Devices in discovery order
    pub fn iter(&self) -> impl Iterator<Item = (DeviceId, &Device)> {
        self.devices.iter().map(|(id, device)| (*id, device))
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Drop every device; ids handed out so far stay dead
    pub fn clear(&mut self) {
        self.devices.clear();
    }
}
