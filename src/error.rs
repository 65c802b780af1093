//! # Error Types
//!
//! Custom error types for the SENT redundancy monitor using `thiserror`.
//!
//! Transport faults and checksum mismatches are observable conditions, not
//! errors: they end up in counters and indicator levels. Only structural
//! input violations and host I/O surface through this type.

use thiserror::Error;

/// Main error type for the SENT redundancy monitor
#[derive(Debug, Error)]
pub enum SentMonitorError {
    /// A frame carried a nibble outside 0-15 or a raw value wider than 24 bits
    #[error("Invalid SENT frame: {0}")]
    InvalidFrame(String),

    /// Capture bridge record errors
    #[error("Bridge protocol error: {0}")]
    Protocol(String),

    /// Serial port errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// None of the candidate bridge devices could be opened
    #[error("No SENT capture bridge found (tried: {0})")]
    SerialPortNotFound(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Telemetry serialization errors
    #[error("Telemetry error: {0}")]
    Telemetry(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for the SENT redundancy monitor
pub type Result<T> = std::result::Result<T, SentMonitorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_frame_message() {
        let err = SentMonitorError::InvalidFrame("status nibble 0x1F out of range".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid SENT frame: status nibble 0x1F out of range"
        );
    }

    #[test]
    fn test_port_not_found_lists_paths() {
        let err = SentMonitorError::SerialPortNotFound("/dev/ttyACM0, /dev/ttyUSB0".to_string());
        assert!(err.to_string().contains("/dev/ttyUSB0"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: SentMonitorError = io.into();
        assert!(matches!(err, SentMonitorError::Io(_)));
    }
}
