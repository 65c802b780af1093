//! # SENT Receive Module
//!
//! Passive decoding of SENT fast-channel frames from a TLE4998 linear Hall
//! sensor and the checksum redundancy decision built on top of it.
//!
//! This module handles:
//! - CRC-4 calculation over the status and data nibbles
//! - Frame decoding into position/temperature fields
//! - Counting receiver fault flags per kind
//! - Warm-up, settling and CRC comparison with alarm/heartbeat outputs

pub mod protocol;
pub mod crc;
pub mod decoder;
pub mod classifier;
pub mod redundancy;
pub mod session;
pub mod channel;
