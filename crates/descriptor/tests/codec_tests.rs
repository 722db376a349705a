//! Integration tests for the descriptor codec
//!
//! Covers:
//! - Deterministic decoding of arbitrary byte buffers
//! - Fixed-size descriptor encode/decode identity
//! - Configuration trees as real devices report them

use descriptor::{
    ConfigHeader, DEVICE_DESC_LENGTH, DescriptorError, DeviceDescriptor, Direction, TransferType,
    encode_descriptor, parse_configuration, parse_descriptor,
};
use proptest::prelude::*;

mod properties {
    use super::*;

    proptest! {
        #[test]
        fn device_descriptor_decoding_is_deterministic(
            bytes in proptest::collection::vec(any::<u8>(), DEVICE_DESC_LENGTH..64)
        ) {
            let first: DeviceDescriptor = parse_descriptor(&bytes).unwrap();
            let second: DeviceDescriptor = parse_descriptor(&bytes).unwrap();
            prop_assert_eq!(first, second);
        }

        #[test]
        fn device_descriptor_round_trips(raw in proptest::array::uniform18(any::<u8>())) {
            let desc: DeviceDescriptor = parse_descriptor(&raw).unwrap();
            let encoded = encode_descriptor(&desc).unwrap();
            prop_assert_eq!(&encoded[..], &raw[..]);
        }

        #[test]
        fn short_device_buffers_are_rejected(
            bytes in proptest::collection::vec(any::<u8>(), 0..DEVICE_DESC_LENGTH)
        ) {
            let result: Result<DeviceDescriptor, _> = parse_descriptor(&bytes);
            prop_assert_eq!(
                result,
                Err(DescriptorError::BufferTooSmall {
                    needed: DEVICE_DESC_LENGTH,
                    available: bytes.len(),
                })
            );
        }

        #[test]
        fn configuration_parser_never_panics(
            bytes in proptest::collection::vec(any::<u8>(), 0..256)
        ) {
            let _ = parse_configuration(&bytes);
        }

        #[test]
        fn configuration_leftover_is_bounded(
            bytes in proptest::collection::vec(any::<u8>(), 9..256)
        ) {
            if let Ok(parsed) = parse_configuration(&bytes) {
                prop_assert!(parsed.leftover <= bytes.len());
            }
        }
    }
}

mod real_devices {
    use super::*;

    /// Configuration descriptor of a USB mass storage stick
    const MASS_STORAGE_CONFIG: [u8; 32] = [
        0x09, 0x02, 0x20, 0x00, 0x01, 0x01, 0x00, 0x80, 0x32, // config
        0x09, 0x04, 0x00, 0x00, 0x02, 0x08, 0x06, 0x50, 0x00, // interface
        0x07, 0x05, 0x81, 0x02, 0x00, 0x02, 0x00, // bulk in
        0x07, 0x05, 0x02, 0x02, 0x00, 0x02, 0x00, // bulk out
    ];

    #[test]
    fn test_mass_storage_tree() {
        let header: ConfigHeader = parse_descriptor(&MASS_STORAGE_CONFIG[..8]).unwrap();
        assert_eq!(header.total_length as usize, MASS_STORAGE_CONFIG.len());

        let parsed = parse_configuration(&MASS_STORAGE_CONFIG).unwrap();
        assert_eq!(parsed.leftover, 0);

        let alt = &parsed.config.interfaces[0].altsettings[0];
        assert_eq!(alt.class, 0x08);
        assert_eq!(alt.endpoints.len(), 2);
        assert_eq!(alt.endpoints[0].direction(), Direction::In);
        assert_eq!(alt.endpoints[1].direction(), Direction::Out);
        assert!(
            alt.endpoints
                .iter()
                .all(|ep| ep.transfer_type() == TransferType::Bulk)
        );
        assert_eq!(alt.endpoints[0].max_packet_size, 512);
    }

    #[test]
    fn test_padded_configuration_still_decodes() {
        let mut padded = MASS_STORAGE_CONFIG.to_vec();
        padded.extend([0u8; 3]);
        padded[2] = padded.len() as u8;

        let parsed = parse_configuration(&padded).unwrap();
        assert_eq!(parsed.leftover, 3);
        assert_eq!(parsed.config.interfaces[0].altsettings[0].endpoints.len(), 2);
    }
}
