//! Descriptor fetcher
//!
//! Reads a device's complete descriptor tree from a freshly opened node.
//! Configuration descriptors are self-describing in length, so each one is
//! read in two phases: an 8-byte probe holding `total_length`, then exactly
//! `total_length - 8` more bytes. Any short read is fatal for the device.

use super::device::Device;
use super::node::{DeviceNode, NodeBackend};
use crate::error::{HostError, ReadPhase, Result};
use descriptor::{
    CONFIG_PROBE_LENGTH, ConfigDescriptor, ConfigHeader, DEVICE_DESC_LENGTH, DeviceDescriptor,
    MAX_CONFIGURATIONS, parse_configuration, parse_descriptor,
};
use std::path::Path;
use tracing::{debug, error, instrument, warn};

/// Issue one read that must fill `buf` completely
fn read_full(
    node: &mut dyn DeviceNode,
    buf: &mut [u8],
    path: &Path,
    phase: ReadPhase,
) -> Result<()> {
    let actual = node.read(buf).map_err(|source| {
        error!("read of {} failed: {}", phase, source);
        HostError::Read {
            path: path.to_path_buf(),
            phase,
            source,
        }
    })?;

    if actual < buf.len() {
        error!("short descriptor read ({}/{}) of {}", actual, buf.len(), phase);
        return Err(HostError::ShortRead {
            path: path.to_path_buf(),
            phase,
            expected: buf.len(),
            actual,
        });
    }

    Ok(())
}

/// Check bNumConfigurations before anything is sized by it
fn validate_configuration_count(count: u8, max_configurations: u8) -> Result<()> {
    let max = max_configurations.min(MAX_CONFIGURATIONS);
    if count > max {
        error!("too many configurations ({} > {})", count, max);
        return Err(HostError::InvalidConfigurationCount { count, max });
    }
    if count < 1 {
        debug!("no configurations");
        return Err(HostError::InvalidConfigurationCount { count, max });
    }
    Ok(())
}

/// Read configuration `index` from the node's current position
fn fetch_configuration(
    node: &mut dyn DeviceNode,
    path: &Path,
    index: u8,
) -> Result<ConfigDescriptor> {
    let mut probe = [0u8; CONFIG_PROBE_LENGTH];
    read_full(node, &mut probe, path, ReadPhase::ConfigHeader(index))?;

    let header: ConfigHeader = parse_descriptor(&probe)?;
    let total_length = usize::from(header.total_length);
    if total_length < CONFIG_PROBE_LENGTH {
        error!(
            "configuration {} total length {} is shorter than its header",
            index, total_length
        );
        return Err(HostError::InvalidTotalLength {
            index,
            total_length: header.total_length,
            minimum: CONFIG_PROBE_LENGTH,
        });
    }

    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(total_length)
        .map_err(|_| HostError::Allocation {
            index,
            size: total_length,
        })?;
    buffer.extend_from_slice(&probe);
    buffer.resize(total_length, 0);

    if total_length > CONFIG_PROBE_LENGTH {
        read_full(
            node,
            &mut buffer[CONFIG_PROBE_LENGTH..],
            path,
            ReadPhase::ConfigBody(index),
        )?;
    }

    let parsed = parse_configuration(&buffer)?;
    if parsed.leftover > 0 {
        warn!(
            "descriptor data still left: {} bytes after configuration {}",
            parsed.leftover, index
        );
    }

    Ok(parsed.config)
}

/// Fetch and decode the device behind `bus`/`name`
///
/// The node is closed before returning, on success and on failure alike.
#[instrument(level = "debug", skip(backend, max_configurations))]
pub fn fetch_device<B: NodeBackend + ?Sized>(
    backend: &B,
    bus: &str,
    name: &str,
    max_configurations: u8,
) -> Result<Device> {
    let node_path = backend.node_path(bus, name);
    debug!("{}", node_path.display());

    let mut node = backend.open(&node_path).map_err(|source| {
        debug!("open '{}' failed: {}", node_path.display(), source);
        HostError::Open {
            path: node_path.clone(),
            source,
        }
    })?;

    let mut raw = [0u8; DEVICE_DESC_LENGTH];
    read_full(node.as_mut(), &mut raw, &node_path, ReadPhase::DeviceDescriptor)?;
    let descriptor: DeviceDescriptor = parse_descriptor(&raw)?;

    validate_configuration_count(descriptor.num_configurations, max_configurations)?;

    let mut configurations = Vec::with_capacity(usize::from(descriptor.num_configurations));
    for index in 0..descriptor.num_configurations {
        configurations.push(fetch_configuration(node.as_mut(), &node_path, index)?);
    }

    debug!(
        "found device {:04x}:{:04x}",
        descriptor.vendor_id, descriptor.product_id
    );

    Ok(Device {
        bus: bus.to_string(),
        name: name.to_string(),
        node_path,
        descriptor,
        configurations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_count_bounds() {
        assert!(validate_configuration_count(1, 8).is_ok());
        assert!(validate_configuration_count(8, 8).is_ok());
        assert!(matches!(
            validate_configuration_count(0, 8),
            Err(HostError::InvalidConfigurationCount { count: 0, max: 8 })
        ));
        assert!(matches!(
            validate_configuration_count(9, 8),
            Err(HostError::InvalidConfigurationCount { count: 9, max: 8 })
        ));
    }

    #[test]
    fn test_configured_cap_never_exceeds_protocol_cap() {
        assert!(matches!(
            validate_configuration_count(9, 200),
            Err(HostError::InvalidConfigurationCount { max: 8, .. })
        ));
        assert!(validate_configuration_count(3, 2).is_err());
    }
}
