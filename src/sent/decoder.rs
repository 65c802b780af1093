//! # SENT Frame Decoder
//!
//! Turns a captured TLE4998 frame into its measurement fields and the
//! canonical nibble order the sensor used when it computed its CRC.
//!
//! The TLE4998 transmits the 16-bit output big-endian and the temperature
//! byte last, while the receiver stores nibbles by arrival position. The CRC
//! message therefore reorders the capture as:
//!
//! ```text
//! index:   0       1   2   3   4   5   6
//! nibble:  status  n3  n2  n1  n0  n5  n4
//! ```
//!
//! This permutation is part of the wire contract.

use super::protocol::*;
use crate::error::Result;

/// Capture nibble placed at canonical positions 1..=6
const CANONICAL_ORDER: [usize; SENT_DATA_NIBBLES] = [3, 2, 1, 0, 5, 4];

/// Decode a captured frame
///
/// # Arguments
///
/// * `frame` - Validated frame (status nibble + 6 data nibbles)
///
/// # Returns
///
/// * `(DecodedPayload, CanonicalMessage)` - Measurement fields and CRC input
///
/// # Examples
///
/// ```
/// use sent_redundancy::sent::decoder::decode;
/// use sent_redundancy::sent::protocol::RawFrame;
///
/// let frame = RawFrame::from_raw(0x0, 0x12_3456).unwrap();
/// let (payload, message) = decode(&frame);
///
/// assert_eq!(payload.primary, 0x3456);
/// assert_eq!(payload.secondary, 0x12);
/// assert_eq!(message, [0x0, 0x3, 0x4, 0x5, 0x6, 0x1, 0x2]);
/// ```
pub fn decode(frame: &RawFrame) -> (DecodedPayload, CanonicalMessage) {
    (decode_payload(frame), canonical_message(frame))
}

/// Validate raw receiver values and decode them
///
/// # Errors
///
/// Returns `InvalidFrame` if the status exceeds 4 bits or the capture exceeds 24 bits.
pub fn decode_raw(status: u8, raw: u32) -> Result<(DecodedPayload, CanonicalMessage)> {
    let frame = RawFrame::from_raw(status, raw)?;
    Ok(decode(&frame))
}

/// Extract the measurement fields
pub fn decode_payload(frame: &RawFrame) -> DecodedPayload {
    let raw = frame.raw_value();

    DecodedPayload {
        primary: (raw & 0xFFFF) as u16,
        secondary: (raw >> 16) as u8,
        status: frame.status(),
    }
}

/// Reorder the frame into the sensor's CRC message
pub fn canonical_message(frame: &RawFrame) -> CanonicalMessage {
    let mut message = [0u8; CRC_MESSAGE_LEN];
    message[0] = frame.status();

    for (slot, &capture_index) in message[1..].iter_mut().zip(CANONICAL_ORDER.iter()) {
        *slot = frame.nibble(capture_index);
    }

    message
}

/// Rebuild the captured frame from a canonical message
///
/// # Errors
///
/// Returns `InvalidFrame` if any nibble exceeds 4 bits.
pub fn frame_from_canonical(message: &CanonicalMessage) -> Result<RawFrame> {
    let mut data = [0u8; SENT_DATA_NIBBLES];

    for (&nibble, &capture_index) in message[1..].iter().zip(CANONICAL_ORDER.iter()) {
        data[capture_index] = nibble;
    }

    RawFrame::new(message[0], data)
}
