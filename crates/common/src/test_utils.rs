//! Test utilities for usbhost
//!
//! Builders for the raw byte images a device node yields, plus a logging
//! hook for tests.
//!
//! # Example
//!
//! ```
//! use common::test_utils::{config_descriptor_bytes, device_node_image};
//!
//! let config = config_descriptor_bytes(1, &[&[0x81]]);
//! let image = device_node_image(0x1234, 0x5678, &[config.clone()]);
//! assert_eq!(image.len(), 18 + config.len());
//! ```

use descriptor::{DeviceDescriptor, descriptor_type, encode_descriptor};

/// Install a test-writer subscriber once per test binary
///
/// Honors `RUST_LOG`; later calls are no-ops.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Create a device descriptor for testing
///
/// # Arguments
/// * `vendor_id` - USB Vendor ID
/// * `product_id` - USB Product ID
/// * `num_configurations` - Value of bNumConfigurations
pub fn mock_device_descriptor(
    vendor_id: u16,
    product_id: u16,
    num_configurations: u8,
) -> DeviceDescriptor {
    DeviceDescriptor {
        length: 18,
        descriptor_type: descriptor_type::DEVICE,
        usb_version: 0x0200,
        class: 0x00,
        subclass: 0x00,
        protocol: 0x00,
        max_packet_size0: 64,
        vendor_id,
        product_id,
        device_version: 0x0100,
        manufacturer_index: 1,
        product_index: 2,
        serial_number_index: 3,
        num_configurations,
    }
}

/// Encoded device descriptor (18 bytes)
pub fn device_descriptor_bytes(vendor_id: u16, product_id: u16, num_configurations: u8) -> Vec<u8> {
    encode_descriptor(&mock_device_descriptor(
        vendor_id,
        product_id,
        num_configurations,
    ))
    .expect("device descriptor layout is valid")
}

/// Configuration descriptor header with an arbitrary total length
///
/// Only the 9-byte fixed part; useful for describing bodies that never arrive.
pub fn config_header_bytes(total_length: u16, num_interfaces: u8) -> Vec<u8> {
    let [lo, hi] = total_length.to_le_bytes();
    vec![
        9,
        descriptor_type::CONFIGURATION,
        lo,
        hi,
        num_interfaces,
        1,
        0,
        0x80,
        50,
    ]
}

/// Complete configuration descriptor
///
/// Each entry of `interfaces` is one interface (alternate setting 0) holding
/// bulk endpoints with the given addresses.
pub fn config_descriptor_bytes(configuration_value: u8, interfaces: &[&[u8]]) -> Vec<u8> {
    let mut body = Vec::new();
    for (number, endpoints) in interfaces.iter().enumerate() {
        body.extend([
            9,
            descriptor_type::INTERFACE,
            number as u8,
            0,
            endpoints.len() as u8,
            0xff,
            0x00,
            0x00,
            0,
        ]);
        for address in endpoints.iter() {
            body.extend([7, descriptor_type::ENDPOINT, *address, 0x02, 0x00, 0x02, 0]);
        }
    }

    let total = (9 + body.len()) as u16;
    let mut bytes = config_header_bytes(total, interfaces.len() as u8);
    bytes[5] = configuration_value;
    bytes.extend(body);
    bytes
}

/// Everything a freshly opened device node yields, in read order
///
/// The device descriptor's configuration count is `configs.len()`.
pub fn device_node_image(vendor_id: u16, product_id: u16, configs: &[Vec<u8>]) -> Vec<u8> {
    let mut image = device_descriptor_bytes(vendor_id, product_id, configs.len() as u8);
    for config in configs {
        image.extend_from_slice(config);
    }
    image
}
