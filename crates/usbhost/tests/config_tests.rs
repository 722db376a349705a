//! Integration tests for configuration parsing
//!
//! Tests host configuration parsing, including:
//! - Minimal and full documents
//! - Interest and log format variants
//! - Loading and saving through the filesystem
//! - Invalid configuration handling

use common::LogFormat;
use std::fs;
use tempfile::TempDir;
use usbhost::{HostConfig, Interest};

mod parsing {
    use super::*;

    const FULL_CONFIG: &str = r#"
[usbfs]
root = "/tmp/fake-usbfs"
hidden_prefix = "_"
max_configurations = 4

[poll]
default_interest = "read_write"

[logging]
level = "debug"
format = "compact"
"#;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = HostConfig::from_toml("").unwrap();
        assert_eq!(config.usbfs.root, "/dev/bus/usb");
        assert_eq!(config.usbfs.hidden_prefix, ".");
        assert_eq!(config.usbfs.max_configurations, 8);
        assert_eq!(config.poll.default_interest, Interest::Write);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Full);
    }

    #[test]
    fn test_full_document() {
        let config = HostConfig::from_toml(FULL_CONFIG).unwrap();
        assert_eq!(config.usbfs.root, "/tmp/fake-usbfs");
        assert_eq!(config.usbfs.hidden_prefix, "_");
        assert_eq!(config.usbfs.max_configurations, 4);
        assert_eq!(config.poll.default_interest, Interest::ReadWrite);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Compact);

        let settings = config.scan_settings();
        assert_eq!(settings.hidden_prefix, "_");
        assert_eq!(settings.max_configurations, 4);
    }

    #[test]
    fn test_partial_section() {
        let config = HostConfig::from_toml(
            r#"
[usbfs]
hidden_prefix = ""
"#,
        )
        .unwrap();
        assert_eq!(config.usbfs.root, "/dev/bus/usb");
        assert_eq!(config.usbfs.hidden_prefix, "");
    }

    #[test]
    fn test_interest_variants() {
        for (text, expected) in [
            ("read", Interest::Read),
            ("write", Interest::Write),
            ("read_write", Interest::ReadWrite),
        ] {
            let doc = format!("[poll]\ndefault_interest = \"{}\"\n", text);
            let config = HostConfig::from_toml(&doc).unwrap();
            assert_eq!(config.poll.default_interest, expected);
        }
    }
}

mod invalid {
    use super::*;

    #[test]
    fn test_unknown_interest() {
        assert!(HostConfig::from_toml("[poll]\ndefault_interest = \"sometimes\"\n").is_err());
    }

    #[test]
    fn test_bad_log_level() {
        assert!(HostConfig::from_toml("[logging]\nlevel = \"loud\"\n").is_err());
    }

    #[test]
    fn test_max_configurations_out_of_range() {
        assert!(HostConfig::from_toml("[usbfs]\nmax_configurations = 0\n").is_err());
        assert!(HostConfig::from_toml("[usbfs]\nmax_configurations = 9\n").is_err());
        assert!(HostConfig::from_toml("[usbfs]\nmax_configurations = 300\n").is_err());
    }

    #[test]
    fn test_empty_root() {
        assert!(HostConfig::from_toml("[usbfs]\nroot = \"  \"\n").is_err());
    }

    #[test]
    fn test_malformed_toml() {
        assert!(HostConfig::from_toml("[usbfs\nroot = ").is_err());
    }
}

mod files {
    use super::*;

    #[test]
    fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.toml");

        let mut config = HostConfig::default();
        config.usbfs.root = "/srv/usbfs".to_string();
        config.poll.default_interest = Interest::Read;
        config.save(&path).unwrap();

        let loaded = HostConfig::load(Some(path)).unwrap();
        assert_eq!(loaded.usbfs.root, "/srv/usbfs");
        assert_eq!(loaded.poll.default_interest, Interest::Read);
    }

    #[test]
    fn test_load_missing_file() {
        let temp = TempDir::new().unwrap();
        assert!(HostConfig::load(Some(temp.path().join("absent.toml"))).is_err());
    }

    #[test]
    fn test_load_invalid_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "[logging]\nlevel = \"chatty\"\n").unwrap();

        let err = HostConfig::load(Some(path)).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse config file"));
    }
}
