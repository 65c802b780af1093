//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{Result, SentMonitorError};
use crate::sent::protocol::{
    DEFAULT_SETTLE_FRAMES, DEFAULT_WARMUP_FRAMES, NIBBLE_MAX, SENT_DATA_NIBBLES, TLE4998_CRC_SEED,
    TLE4998_FRAME_LENGTH,
};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub sent: SentConfig,
    #[serde(default)]
    pub redundancy: RedundancyConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Capture bridge serial port configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    #[serde(default = "default_serial_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,
}

/// SENT frame configuration of the sensor
#[derive(Debug, Deserialize, Clone)]
pub struct SentConfig {
    /// Number of data nibbles per fast-channel frame
    #[serde(default = "default_frame_length")]
    pub frame_length: usize,

    #[serde(default = "default_crc_seed")]
    pub crc_seed: u8,
}

/// Redundancy monitor windows
#[derive(Debug, Deserialize, Clone)]
pub struct RedundancyConfig {
    #[serde(default = "default_warmup_frames")]
    pub warmup_frames: u32,

    #[serde(default = "default_settle_frames")]
    pub settle_frames: u32,
}

/// Telemetry configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    #[serde(default = "default_telemetry_enabled")]
    pub enabled: bool,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_max_records_per_file")]
    pub max_records_per_file: usize,

    #[serde(default = "default_max_files_to_keep")]
    pub max_files_to_keep: usize,

    #[serde(default = "default_log_interval_ms")]
    pub log_interval_ms: u64,

    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_serial_port() -> String { "/dev/ttyACM0".to_string() }
fn default_baud_rate() -> u32 { 921600 }
fn default_timeout_ms() -> u64 { 100 }
fn default_reconnect_interval_ms() -> u64 { 1000 }

fn default_frame_length() -> usize { TLE4998_FRAME_LENGTH }
fn default_crc_seed() -> u8 { TLE4998_CRC_SEED }

fn default_warmup_frames() -> u32 { DEFAULT_WARMUP_FRAMES }
fn default_settle_frames() -> u32 { DEFAULT_SETTLE_FRAMES }

fn default_telemetry_enabled() -> bool { true }
fn default_log_dir() -> String { "./logs".to_string() }
fn default_max_records_per_file() -> usize { 10000 }
fn default_max_files_to_keep() -> usize { 10 }
fn default_log_interval_ms() -> u64 { 1000 }
fn default_log_format() -> String { "jsonl".to_string() }

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_serial_port(),
            baud_rate: default_baud_rate(),
            timeout_ms: default_timeout_ms(),
            reconnect_interval_ms: default_reconnect_interval_ms(),
        }
    }
}

impl Default for SentConfig {
    fn default() -> Self {
        Self {
            frame_length: default_frame_length(),
            crc_seed: default_crc_seed(),
        }
    }
}

impl Default for RedundancyConfig {
    fn default() -> Self {
        Self {
            warmup_frames: default_warmup_frames(),
            settle_frames: default_settle_frames(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: default_telemetry_enabled(),
            log_dir: default_log_dir(),
            max_records_per_file: default_max_records_per_file(),
            max_files_to_keep: default_max_files_to_keep(),
            log_interval_ms: default_log_interval_ms(),
            format: default_log_format(),
        }
    }
}

/// Baud rates the capture bridge firmware supports
const SUPPORTED_BAUD_RATES: [u32; 4] = [115200, 230400, 460800, 921600];

/// Upper bound for the warm-up and settle windows
const MAX_WINDOW_FRAMES: u32 = 10_000;

fn invalid(message: impl std::fmt::Display) -> SentMonitorError {
    SentMonitorError::Config(toml::de::Error::custom(message))
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
    /// use sent_redundancy::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
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
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.serial.port.is_empty() {
            return Err(invalid("serial port cannot be empty"));
        }

        if !SUPPORTED_BAUD_RATES.contains(&self.serial.baud_rate) {
            return Err(invalid("baud_rate must be one of: 115200, 230400, 460800, 921600"));
        }

        if self.serial.timeout_ms == 0 || self.serial.timeout_ms > 10000 {
            return Err(invalid("timeout_ms must be between 1 and 10000"));
        }

        if self.serial.reconnect_interval_ms == 0 || self.serial.reconnect_interval_ms > 60000 {
            return Err(invalid("reconnect_interval_ms must be between 1 and 60000"));
        }

        // CRC covers the status nibble plus every data nibble
        if self.sent.frame_length == 0 || self.sent.frame_length > SENT_DATA_NIBBLES {
            return Err(invalid(format!(
                "frame_length must be between 1 and {}",
                SENT_DATA_NIBBLES
            )));
        }

        if self.sent.crc_seed > NIBBLE_MAX {
            return Err(invalid("crc_seed must be a nibble (0-15)"));
        }

        for (name, value) in [
            ("warmup_frames", self.redundancy.warmup_frames),
            ("settle_frames", self.redundancy.settle_frames),
        ] {
            if value > MAX_WINDOW_FRAMES {
                return Err(invalid(format!(
                    "{} must be at most {}",
                    name, MAX_WINDOW_FRAMES
                )));
            }
        }

        if self.telemetry.enabled && self.telemetry.log_dir.is_empty() {
            return Err(invalid("telemetry log_dir cannot be empty when enabled"));
        }

        if self.telemetry.log_interval_ms == 0 || self.telemetry.log_interval_ms > 60000 {
            return Err(invalid("log_interval_ms must be between 1 and 60000"));
        }

        if self.telemetry.max_records_per_file == 0 {
            return Err(invalid("max_records_per_file must be greater than 0"));
        }

        if self.telemetry.max_files_to_keep == 0 {
            return Err(invalid("max_files_to_keep must be greater than 0"));
        }

        if self.telemetry.format != "jsonl" {
            return Err(invalid("log format must be 'jsonl' (only supported format)"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_valid_config() -> Config {
        Config::default()
    }

    #[test]
    fn test_default_config() {
        assert!(create_valid_config().validate().is_ok());
    }

    #[test]
    fn test_load_config_from_file() {
        let toml_content = r#"
[serial]
port = "/dev/ttyUSB0"

[sent]

[redundancy]
settle_frames = 5

[telemetry]
enabled = false
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.serial.port, "/dev/ttyUSB0");
        assert_eq!(config.serial.baud_rate, 921600);
        assert_eq!(config.sent.crc_seed, 0x05);
        assert_eq!(config.redundancy.warmup_frames, 3);
        assert_eq!(config.redundancy.settle_frames, 5);
        assert!(!config.telemetry.enabled);
    }

    #[test]
    fn test_load_empty_file_uses_defaults() {
        let temp_file = NamedTempFile::new().unwrap();
        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.sent.frame_length, 6);
        assert_eq!(config.telemetry.format, "jsonl");
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"[sent]\ncrc_seed = 16\n").unwrap();
        temp_file.flush().unwrap();

        let result = Config::load(temp_file.path());
        assert!(matches!(result, Err(SentMonitorError::Config(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/nonexistent/sent-redundancy.toml");
        assert!(matches!(result, Err(SentMonitorError::Io(_))));
    }

    #[test]
    fn test_load_malformed_toml() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"[serial\nport = ").unwrap();
        temp_file.flush().unwrap();

        assert!(Config::load(temp_file.path()).is_err());
    }

    #[test]
    fn test_empty_serial_port() {
        let mut config = create_valid_config();
        config.serial.port = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_baud_rate() {
        let mut config = create_valid_config();
        config.serial.baud_rate = 9600;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_valid_baud_rates() {
        for &baud in &SUPPORTED_BAUD_RATES {
            let mut config = create_valid_config();
            config.serial.baud_rate = baud;
            assert!(config.validate().is_ok(), "Baud rate {} should be valid", baud);
        }
    }

    #[test]
    fn test_timeout_ms_bounds() {
        let mut config = create_valid_config();
        config.serial.timeout_ms = 0;
        assert!(config.validate().is_err());
        config.serial.timeout_ms = 10001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reconnect_interval_bounds() {
        let mut config = create_valid_config();
        config.serial.reconnect_interval_ms = 0;
        assert!(config.validate().is_err());
        config.serial.reconnect_interval_ms = 60001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_frame_length_bounds() {
        let mut config = create_valid_config();
        config.sent.frame_length = 0;
        assert!(config.validate().is_err());
        config.sent.frame_length = 7;
        assert!(config.validate().is_err());
        config.sent.frame_length = 4;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_crc_seed_must_be_nibble() {
        let mut config = create_valid_config();
        config.sent.crc_seed = 0x0F;
        assert!(config.validate().is_ok());
        config.sent.crc_seed = 0x10;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_window_limits() {
        let mut config = create_valid_config();
        config.redundancy.warmup_frames = 0;
        config.redundancy.settle_frames = 0;
        assert!(config.validate().is_ok());

        config.redundancy.settle_frames = MAX_WINDOW_FRAMES + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_log_dir_when_enabled() {
        let mut config = create_valid_config();
        config.telemetry.enabled = true;
        config.telemetry.log_dir = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_log_dir_when_disabled() {
        let mut config = create_valid_config();
        config.telemetry.enabled = false;
        config.telemetry.log_dir = String::new();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_log_interval_bounds() {
        let mut config = create_valid_config();
        config.telemetry.log_interval_ms = 0;
        assert!(config.validate().is_err());
        config.telemetry.log_interval_ms = 60001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_max_records_per_file_zero() {
        let mut config = create_valid_config();
        config.telemetry.max_records_per_file = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_max_files_to_keep_zero() {
        let mut config = create_valid_config();
        config.telemetry.max_files_to_keep = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_log_format() {
        let mut config = create_valid_config();
        config.telemetry.format = "csv".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_functions() {
        assert_eq!(default_serial_port(), "/dev/ttyACM0");
        assert_eq!(default_baud_rate(), 921600);
        assert_eq!(default_timeout_ms(), 100);
        assert_eq!(default_reconnect_interval_ms(), 1000);
        assert_eq!(default_frame_length(), 6);
        assert_eq!(default_crc_seed(), 0x05);
        assert_eq!(default_warmup_frames(), 3);
        assert_eq!(default_settle_frames(), 3);
        assert!(default_telemetry_enabled());
        assert_eq!(default_log_dir(), "./logs");
        assert_eq!(default_max_records_per_file(), 10000);
        assert_eq!(default_max_files_to_keep(), 10);
        assert_eq!(default_log_interval_ms(), 1000);
        assert_eq!(default_log_format(), "jsonl");
    }
}
