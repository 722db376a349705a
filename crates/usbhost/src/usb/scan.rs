//! Bus scanner
//!
//! Walks `<root>/<bus>/<device>`, fetching every device node it finds.
//! Devices can be unplugged while the scan runs, so a failure on one bus or
//! one device is logged, counted in the [`ScanReport`] and skipped. Only a
//! root that cannot be listed fails the scan.

use super::device::DeviceRegistry;
use super::fetch::fetch_device;
use super::node::NodeBackend;
use crate::error::{HostError, Result};
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

/// Knobs for a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSettings {
    /// Entries starting with this prefix are skipped; empty skips nothing
    pub hidden_prefix: String,
    /// Upper bound on bNumConfigurations
    pub max_configurations: u8,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            hidden_prefix: ".".to_string(),
            max_configurations: descriptor::MAX_CONFIGURATIONS,
        }
    }
}

impl ScanSettings {
    fn is_hidden(&self, name: &str) -> bool {
        !self.hidden_prefix.is_empty() && name.starts_with(&self.hidden_prefix)
    }
}

/// Outcome of one scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    /// Non-hidden bus entries attempted (listed or not)
    pub buses_visited: usize,
    /// Buses that could not be listed
    pub buses_failed: usize,
    /// Hidden bus entries
    pub buses_skipped: usize,
    /// Devices fetched and appended to the registry
    pub devices_added: usize,
    /// Device nodes that failed to open, read or decode
    pub devices_failed: usize,
    /// Hidden device entries
    pub entries_skipped: usize,
}

/// Scan every bus under the backend's root
///
/// Appends to `registry` without clearing it; repeated scans are additive.
#[instrument(skip_all, fields(root = %backend.root().display()))]
pub fn scan_all<B: NodeBackend + ?Sized>(
    backend: &B,
    registry: &mut DeviceRegistry,
    settings: &ScanSettings,
) -> Result<ScanReport> {
    let buses = backend.list_buses().map_err(|source| {
        error!("opendir buses failed: {}", source);
        HostError::ListRoot {
            path: backend.root().to_path_buf(),
            source,
        }
    })?;

    let mut report = ScanReport::default();
    for bus in &buses {
        if settings.is_hidden(bus) {
            report.buses_skipped += 1;
            continue;
        }
        report.buses_visited += 1;

        // A hub unplugged mid-scan takes its bus entry with it
        if let Err(e) = scan_bus(backend, registry, settings, bus, &mut report) {
            report.buses_failed += 1;
            warn!("Skipping bus: {}", e);
        }
    }

    info!(
        "Scan complete: {} buses, {} devices added, {} failed",
        report.buses_visited, report.devices_added, report.devices_failed
    );
    Ok(report)
}

#[instrument(skip(backend, registry, settings, report))]
fn scan_bus<B: NodeBackend + ?Sized>(
    backend: &B,
    registry: &mut DeviceRegistry,
    settings: &ScanSettings,
    bus: &str,
    report: &mut ScanReport,
) -> Result<()> {
    let entries = backend
        .list_devices(bus)
        .map_err(|source| HostError::ListBus {
            bus: bus.to_string(),
            source,
        })?;

    for name in &entries {
        if settings.is_hidden(name) {
            report.entries_skipped += 1;
            continue;
        }

        match fetch_device(backend, bus, name, settings.max_configurations) {
            Ok(device) => {
                let id = registry.insert(device);
                report.devices_added += 1;
                debug!("Registered {}/{} as {:?}", bus, name, id);
            }
            Err(e) if e.is_disconnect() => {
                report.devices_failed += 1;
                debug!("Device {}/{} vanished during scan: {}", bus, name, e);
            }
            Err(e) => {
                report.devices_failed += 1;
                warn!("Skipping device {}/{}: {}", bus, name, e);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_prefix() {
        let settings = ScanSettings::default();
        assert!(settings.is_hidden("."));
        assert!(settings.is_hidden(".."));
        assert!(settings.is_hidden(".devices"));
        assert!(!settings.is_hidden("001"));

        let none = ScanSettings {
            hidden_prefix: String::new(),
            ..ScanSettings::default()
        };
        assert!(!none.is_hidden(".devices"));
    }
}
