//! # SENT Redundancy Library
//!
//! Decode SENT frames from a TLE4998 linear Hall sensor and watch their
//! checksums.
//!
//! This library provides the receive-side core (CRC-4, frame decoding, fault
//! counters, redundancy monitor) and the host plumbing around it: the capture
//! bridge serial link, indicator outputs and JSONL telemetry.

pub mod config;
pub mod error;
pub mod indicator;
pub mod sent;
pub mod serial;
pub mod telemetry;
