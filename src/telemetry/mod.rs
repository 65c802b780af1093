//! # Telemetry Module
//!
//! Handles diagnostics logging to JSONL files with rotation.
//!
//! This module handles:
//! - Stamping channel snapshots (counters, last checksum pair, alarm state)
//! - Formatting as JSONL (JSON Lines)
//! - Writing to rotating log files
//! - Managing file rotation (max N records per file)
//! - Retaining only last M files

pub mod logger;

pub use logger::{TelemetryLogger, TelemetryRecord};
