//! Host configuration management

use crate::usb::{DEFAULT_USBFS_ROOT, Interest, ScanSettings};
use anyhow::{Context, Result, anyhow};
use common::LogFormat;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostConfig {
    #[serde(default)]
    pub usbfs: UsbfsSettings,
    #[serde(default)]
    pub poll: PollSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Where and how device nodes are discovered
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsbfsSettings {
    /// Root of the bus hierarchy; `~` is expanded
    #[serde(default = "UsbfsSettings::default_root")]
    pub root: String,
    /// Entries whose names start with this prefix are skipped
    #[serde(default = "UsbfsSettings::default_hidden_prefix")]
    pub hidden_prefix: String,
    /// Devices reporting more configurations than this are rejected (1-8)
    #[serde(default = "UsbfsSettings::default_max_configurations")]
    pub max_configurations: u8,
}

impl Default for UsbfsSettings {
    fn default() -> Self {
        Self {
            root: Self::default_root(),
            hidden_prefix: Self::default_hidden_prefix(),
            max_configurations: Self::default_max_configurations(),
        }
    }
}

impl UsbfsSettings {
    fn default_root() -> String {
        DEFAULT_USBFS_ROOT.to_string()
    }

    fn default_hidden_prefix() -> String {
        ".".to_string()
    }

    fn default_max_configurations() -> u8 {
        descriptor::MAX_CONFIGURATIONS
    }

    /// Root path with `~` expanded
    pub fn root_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.root).as_ref())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PollSettings {
    /// Interest registered for newly opened handles
    #[serde(default)]
    pub default_interest: Interest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "LoggingSettings::default_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            format: LogFormat::default(),
        }
    }
}

impl LoggingSettings {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl HostConfig {
    /// Load configuration from the specified path
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = if let Some(p) = path {
            p
        } else {
            // Try standard locations in order
            let candidates = vec![
                Self::default_path(),
                PathBuf::from("/etc/usbhost/config.toml"),
            ];

            candidates
                .into_iter()
                .find(|p| p.exists())
                .ok_or_else(|| anyhow!("No configuration file found, using defaults"))?
        };

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config = Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        tracing::info!("Loaded configuration from: {}", config_path.display());
        Ok(config)
    }

    /// Parse and validate a TOML document
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: HostConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration or return defaults if not found
    pub fn load_or_default() -> Self {
        match Self::load(None) {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!("Failed to load config: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Save configuration to the specified path
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::info!("Saved configuration to: {}", path.display());
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("usbhost").join("config.toml")
        } else {
            PathBuf::from(".config/usbhost/config.toml")
        }
    }

    /// Scanner settings derived from `[usbfs]`
    pub fn scan_settings(&self) -> ScanSettings {
        ScanSettings {
            hidden_prefix: self.usbfs.hidden_prefix.clone(),
            max_configurations: self.usbfs.max_configurations,
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(anyhow!(
                "Invalid log level '{}', must be one of: {}",
                self.logging.level,
                valid_levels.join(", ")
            ));
        }

        if self.usbfs.root.trim().is_empty() {
            return Err(anyhow!("usbfs root must not be empty"));
        }

        let max = self.usbfs.max_configurations;
        if !(1..=descriptor::MAX_CONFIGURATIONS).contains(&max) {
            return Err(anyhow!(
                "Invalid max_configurations {}, must be 1-{}",
                max,
                descriptor::MAX_CONFIGURATIONS
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HostConfig::default();
        assert_eq!(config.usbfs.root, "/dev/bus/usb");
        assert_eq!(config.usbfs.hidden_prefix, ".");
        assert_eq!(config.usbfs.max_configurations, 8);
        assert_eq!(config.poll.default_interest, Interest::Write);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_max_configurations() {
        let mut config = HostConfig::default();
        config.usbfs.max_configurations = 0;
        assert!(config.validate().is_err());

        config.usbfs.max_configurations = 9;
        assert!(config.validate().is_err());

        config.usbfs.max_configurations = 1;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_log_level() {
        let mut config = HostConfig::default();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());

        config.logging.level = "debug".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = HostConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed = HostConfig::from_toml(&toml_str).unwrap();

        assert_eq!(config.usbfs.root, parsed.usbfs.root);
        assert_eq!(config.poll.default_interest, parsed.poll.default_interest);
    }

    #[test]
    fn test_root_tilde_expansion() {
        let mut config = HostConfig::default();
        config.usbfs.root = "~/fake-usbfs".to_string();
        let root = config.usbfs.root_path();
        assert!(!root.to_string_lossy().starts_with('~'));
        assert!(root.ends_with("fake-usbfs"));
    }

    #[test]
    fn test_scan_settings() {
        let mut config = HostConfig::default();
        config.usbfs.hidden_prefix = "_".to_string();
        config.usbfs.max_configurations = 2;
        let settings = config.scan_settings();
        assert_eq!(settings.hidden_prefix, "_");
        assert_eq!(settings.max_configurations, 2);
    }
}
