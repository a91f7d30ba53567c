//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every section is optional; a missing section takes its defaults, so an
//! empty file is a valid configuration.

use serde::de::Error;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::controller::controls::{ControlCode, GAMEPAD_CONTROLS};
use crate::controller::layout::{default_bindings, Binding};
use crate::discovery::{DEFAULT_SERVICE_TYPE, DEFAULT_TTL_SECS};
use crate::error::{BridgeError, Result};
use crate::output::{BackendKind, DeviceSpec, BUS_VIRTUAL};
use crate::session::SessionSettings;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub assets: AssetsConfig,
    #[serde(default)]
    pub mapping: MappingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// UDP session configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    /// Address to bind; unset picks the default-route address
    #[serde(default)]
    pub bind_address: Option<IpAddr>,

    /// 0 lets the OS choose
    #[serde(default)]
    pub port: u16,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_recv_buffer_bytes")]
    pub recv_buffer_bytes: usize,

    #[serde(default = "default_max_datagram_bytes")]
    pub max_datagram_bytes: usize,
}

/// Virtual device configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DeviceConfig {
    #[serde(default = "default_device_name")]
    pub name: String,

    #[serde(default = "default_device_id")]
    pub id: u32,

    #[serde(default)]
    pub backend: BackendKind,

    #[serde(default = "default_controls")]
    pub controls: Vec<ControlCode>,

    #[serde(default = "default_bus")]
    pub bus: u16,
}

/// Network advertisement configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DiscoveryConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_service_type")]
    pub service_type: String,

    #[serde(default = "default_ttl_s")]
    pub ttl_s: u32,
}

/// Client asset server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AssetsConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_assets_root")]
    pub root: PathBuf,
}

/// Channel-to-control mapping
#[derive(Debug, Deserialize, Clone)]
pub struct MappingConfig {
    #[serde(default = "default_bindings")]
    pub bindings: Vec<Binding>,
}

/// Log output configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Empty logs to the console only
    #[serde(default)]
    pub directory: String,

    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
}

// Default value functions
fn default_timeout_ms() -> u64 { 3000 }
fn default_poll_interval_ms() -> u64 { 20 }
fn default_recv_buffer_bytes() -> usize { 128 }
fn default_max_datagram_bytes() -> usize { 512 }

fn default_device_name() -> String { "Yoke".to_string() }
fn default_device_id() -> u32 { 1 }
fn default_controls() -> Vec<ControlCode> { GAMEPAD_CONTROLS.to_vec() }
fn default_bus() -> u16 { BUS_VIRTUAL }

fn default_enabled() -> bool { true }
fn default_service_type() -> String { DEFAULT_SERVICE_TYPE.to_string() }
fn default_ttl_s() -> u32 { DEFAULT_TTL_SECS }

fn default_assets_root() -> PathBuf { PathBuf::from("assets/joypad") }

fn default_file_prefix() -> String { "yoke-bridge.log".to_string() }

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            bind_address: None,
            port: 0,
            timeout_ms: default_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            recv_buffer_bytes: default_recv_buffer_bytes(),
            max_datagram_bytes: default_max_datagram_bytes(),
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: default_device_name(),
            id: default_device_id(),
            backend: BackendKind::default(),
            controls: default_controls(),
            bus: default_bus(),
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            service_type: default_service_type(),
            ttl_s: default_ttl_s(),
        }
    }
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            root: default_assets_root(),
        }
    }
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            bindings: default_bindings(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: String::new(),
            file_prefix: default_file_prefix(),
        }
    }
}

fn invalid(msg: impl std::fmt::Display) -> BridgeError {
    BridgeError::Config(toml::de::Error::custom(msg))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use yoke_bridge::config::Config;
    ///
    /// let config = Config::load("config/yoke.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// Called by `load`; call again after applying command line overrides.
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        let session = &self.session;

        if !(100..=60000).contains(&session.timeout_ms) {
            return Err(invalid("timeout_ms must be between 100 and 60000"));
        }

        if !(1..=1000).contains(&session.poll_interval_ms) {
            return Err(invalid("poll_interval_ms must be between 1 and 1000"));
        }

        if session.poll_interval_ms >= session.timeout_ms {
            return Err(invalid("poll_interval_ms must be below timeout_ms"));
        }

        if session.recv_buffer_bytes == 0 {
            return Err(invalid("recv_buffer_bytes must be at least 1"));
        }

        if !(16..=65507).contains(&session.max_datagram_bytes) {
            return Err(invalid("max_datagram_bytes must be between 16 and 65507"));
        }

        let device = &self.device;

        if device.name.trim().is_empty() {
            return Err(invalid("device name cannot be empty"));
        }

        if device.name.contains('/') || device.name.contains('\n') {
            return Err(invalid("device name cannot contain '/' or newlines"));
        }

        if device.controls.is_empty() {
            return Err(invalid("device controls cannot be empty"));
        }

        let mut seen = HashSet::new();
        for code in &device.controls {
            if !seen.insert(code) {
                return Err(invalid(format!("control {} is declared twice", code)));
            }
        }

        if self.discovery.enabled {
            if !self.discovery.service_type.ends_with("._udp.local.") {
                return Err(invalid("service_type must end with \"._udp.local.\""));
            }

            if self.discovery.ttl_s == 0 {
                return Err(invalid("ttl_s must be greater than 0"));
            }
        }

        if self.assets.enabled && self.assets.root.as_os_str().is_empty() {
            return Err(invalid("assets root cannot be empty when enabled"));
        }

        for binding in &self.mapping.bindings {
            if !seen.contains(&binding.control) {
                return Err(invalid(format!(
                    "binding for channel {} uses undeclared control {}",
                    binding.channel, binding.control
                )));
            }

            if let Some(threshold) = binding.threshold {
                if !threshold.is_finite() {
                    return Err(invalid(format!(
                        "binding for channel {} has a non-finite threshold",
                        binding.channel
                    )));
                }
            }
        }

        if !self.logging.directory.is_empty() && self.logging.file_prefix.is_empty() {
            return Err(invalid("file_prefix cannot be empty when logging to a directory"));
        }

        Ok(())
    }

    /// Inactivity timeout and poll tick
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            timeout: Duration::from_millis(self.session.timeout_ms),
            poll_interval: Duration::from_millis(self.session.poll_interval_ms),
        }
    }

    /// Output device description
    pub fn device_spec(&self) -> DeviceSpec {
        let mut spec = DeviceSpec::new(&self.device.name, self.device.controls.clone());
        spec.bus = self.device.bus;
        spec
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_valid_config() -> Config {
        Config {
            session: SessionConfig::default(),
            device: DeviceConfig {
                name: default_device_name(),
                id: default_device_id(),
                backend: BackendKind::DryRun,
                controls: default_controls(),
                bus: default_bus(),
            },
            discovery: DiscoveryConfig::default(),
            assets: AssetsConfig::default(),
            mapping: MappingConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    fn load_str(toml_content: &str) -> Result<Config> {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();
        Config::load(temp_file.path())
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.session.timeout_ms, 3000);
        assert_eq!(config.session.poll_interval_ms, 20);
        assert_eq!(config.device.name, "Yoke");
        assert_eq!(config.device.id, 1);
        assert_eq!(config.device.bus, BUS_VIRTUAL);
        assert_eq!(config.discovery.service_type, "_yoke._udp.local.");
        assert_eq!(config.mapping.bindings, default_bindings());
    }

    #[test]
    fn test_load_empty_file() {
        let config = load_str("").unwrap();
        assert_eq!(config.session.port, 0);
        assert!(config.session.bind_address.is_none());
        assert!(config.discovery.enabled);
    }

    #[test]
    fn test_load_config_from_file() {
        let toml_content = r#"
[session]
bind_address = "127.0.0.1"
port = 5005
timeout_ms = 1500

[device]
name = "Wheel"
id = 2
backend = "dry-run"
controls = ["ABS_X", "ABS_Y", "BTN_SOUTH", "ABS_HAT0X"]

[discovery]
enabled = false

[mapping]
bindings = [
    { channel = 0, control = "ABS_X", invert = true },
    { channel = 1, control = "ABS_Y" },
    { channel = 4, control = "BTN_SOUTH", threshold = 0.2 },
    { channel = 2, control = "ABS_HAT0X" },
]

[logging]
directory = "./logs"
"#;

        let config = load_str(toml_content).unwrap();
        assert_eq!(config.session.bind_address, Some("127.0.0.1".parse().unwrap()));
        assert_eq!(config.session.port, 5005);
        assert_eq!(config.session_settings().timeout, Duration::from_millis(1500));
        assert_eq!(config.device.backend, BackendKind::DryRun);
        assert_eq!(config.device.controls.len(), 4);
        assert!(config.mapping.bindings[0].invert);
        assert_eq!(config.mapping.bindings[2].threshold, Some(0.2));
        assert_eq!(config.logging.file_prefix, default_file_prefix());

        let spec = config.device_spec();
        assert_eq!(spec.name, "Wheel");
        assert_eq!(spec.controls, config.device.controls);
    }

    #[test]
    fn test_shipped_config_matches_defaults() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/yoke.toml");
        let config = Config::load(path).unwrap();
        let defaults = Config::default();

        assert_eq!(config.session.timeout_ms, defaults.session.timeout_ms);
        assert_eq!(config.device.controls, defaults.device.controls);
        assert_eq!(config.device.bus, defaults.device.bus);
        assert_eq!(config.mapping.bindings, defaults.mapping.bindings);
    }

    #[test]
    fn test_load_rejects_unknown_control() {
        let result = load_str("[device]\ncontrols = [\"ABS_W\"]\n");
        assert!(matches!(result, Err(BridgeError::Config(_))));
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let result = load_str("[session]\ntimeout_ms = 5\n");
        assert!(matches!(result, Err(BridgeError::Config(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/nonexistent/yoke.toml");
        assert!(matches!(result, Err(BridgeError::Io(_))));
    }

    #[test]
    fn test_timeout_too_low() {
        let mut config = create_valid_config();
        config.session.timeout_ms = 99;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_timeout_too_high() {
        let mut config = create_valid_config();
        config.session.timeout_ms = 60001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_poll_interval_zero() {
        let mut config = create_valid_config();
        config.session.poll_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_poll_interval_not_below_timeout() {
        let mut config = create_valid_config();
        config.session.timeout_ms = 500;
        config.session.poll_interval_ms = 500;
        assert!(config.validate().is_err());

        config.session.poll_interval_ms = 499;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_recv_buffer_zero() {
        let mut config = create_valid_config();
        config.session.recv_buffer_bytes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_max_datagram_bounds() {
        let mut config = create_valid_config();
        config.session.max_datagram_bytes = 15;
        assert!(config.validate().is_err());

        config.session.max_datagram_bytes = 65508;
        assert!(config.validate().is_err());

        config.session.max_datagram_bytes = 65507;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_device_name() {
        let mut config = create_valid_config();
        config.device.name = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_device_name_with_slash() {
        let mut config = create_valid_config();
        config.device.name = "a/b".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_controls() {
        let mut config = create_valid_config();
        config.device.controls.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_controls() {
        let mut config = create_valid_config();
        config.device.controls.push(ControlCode::AbsX);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_service_type() {
        let mut config = create_valid_config();
        config.discovery.service_type = "_yoke._tcp.local.".to_string();
        assert!(config.validate().is_err());

        // Not checked when discovery is off
        config.discovery.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_ttl_zero() {
        let mut config = create_valid_config();
        config.discovery.ttl_s = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_assets_root_when_enabled() {
        let mut config = create_valid_config();
        config.assets.root = PathBuf::new();
        assert!(config.validate().is_err());

        config.assets.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_binding_to_undeclared_control() {
        let mut config = create_valid_config();
        config.device.controls = vec![ControlCode::AbsX, ControlCode::AbsY];
        assert!(config.validate().is_err());

        config.mapping.bindings = vec![
            Binding::new(0, ControlCode::AbsX),
            Binding::new(1, ControlCode::AbsY),
        ];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_non_finite_threshold() {
        let mut config = create_valid_config();
        let mut binding = Binding::new(4, ControlCode::BtnSouth);
        binding.threshold = Some(f32::NAN);
        config.mapping.bindings.push(binding);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_file_prefix_with_directory() {
        let mut config = create_valid_config();
        config.logging.directory = "./logs".to_string();
        config.logging.file_prefix = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_session_settings() {
        let config = create_valid_config();
        let settings = config.session_settings();
        assert_eq!(settings.timeout, Duration::from_secs(3));
        assert_eq!(settings.poll_interval, Duration::from_millis(20));
    }

    #[test]
    fn test_default_functions() {
        assert_eq!(default_recv_buffer_bytes(), 128);
        assert_eq!(default_max_datagram_bytes(), 512);
        assert_eq!(default_ttl_s(), 10);
        assert_eq!(default_assets_root(), PathBuf::from("assets/joypad"));
        assert_eq!(default_controls(), GAMEPAD_CONTROLS.to_vec());
    }
}
