//! # SENT Protocol Constants and Types
//!
//! Core definitions for TLE4998 fast-channel SENT frames.

use bitflags::bitflags;
use serde::Serialize;

use crate::error::{Result, SentMonitorError};

/// Number of data nibbles in a TLE4998 fast-channel frame
pub const SENT_DATA_NIBBLES: usize = 6;

/// Frame length as configured on the receiver (data nibbles only)
pub const TLE4998_FRAME_LENGTH: usize = 6;

/// Number of nibbles covered by the CRC (status + data)
pub const CRC_MESSAGE_LEN: usize = TLE4998_FRAME_LENGTH + 1;

/// CRC seed used by the TLE4998 fast-channel checksum
pub const TLE4998_CRC_SEED: u8 = 0x05;

/// Largest value a nibble can carry
pub const NIBBLE_MAX: u8 = 0x0F;

/// Largest raw capture value (6 nibbles = 24 bits)
pub const RAW_VALUE_MAX: u32 = 0x00FF_FFFF;

/// Frames ignored before the settling window starts counting
pub const DEFAULT_WARMUP_FRAMES: u32 = 3;

/// Frames ignored after warm-up before checksums are compared
pub const DEFAULT_SETTLE_FRAMES: u32 = 3;

/// Canonical message fed to the CRC: status followed by the reordered data nibbles
pub type CanonicalMessage = [u8; CRC_MESSAGE_LEN];

/// One received fast-channel frame: status nibble plus six data nibbles.
///
/// `data[i]` holds nibble *i* of the 24-bit raw capture, i.e. `data[0]` is
/// bits 0-3 and `data[5]` is bits 20-23.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawFrame {
    status: u8,
    data: [u8; SENT_DATA_NIBBLES],
}

impl RawFrame {
    /// Build a frame from individual nibbles
    ///
    /// # Errors
    ///
    /// Returns `InvalidFrame` if the status or any data nibble exceeds 15.
    pub fn new(status: u8, data: [u8; SENT_DATA_NIBBLES]) -> Result<Self> {
        check_status(status)?;
        if let Some(index) = data.iter().position(|&nibble| nibble > NIBBLE_MAX) {
            return Err(SentMonitorError::InvalidFrame(format!(
                "nibble{} value 0x{:02X} exceeds 4 bits",
                index, data[index]
            )));
        }

        Ok(Self { status, data })
    }

    /// Build a frame from the receiver's 24-bit capture register value
    ///
    /// # Errors
    ///
    /// Returns `InvalidFrame` if the status exceeds 15 or the raw value is wider than 24 bits.
    ///
    /// # Examples
    ///
    /// ```
    /// use sent_redundancy::sent::protocol::RawFrame;
    ///
    /// let frame = RawFrame::from_raw(0x0, 0x12_3456).unwrap();
    /// assert_eq!(frame.nibble(0), 0x6);
    /// assert_eq!(frame.nibble(5), 0x1);
    /// assert_eq!(frame.raw_value(), 0x12_3456);
    /// ```
    pub fn from_raw(status: u8, raw: u32) -> Result<Self> {
        check_status(status)?;
        if raw > RAW_VALUE_MAX {
            return Err(SentMonitorError::InvalidFrame(format!(
                "raw value 0x{:X} exceeds 24 bits",
                raw
            )));
        }

        let mut data = [0u8; SENT_DATA_NIBBLES];
        for (index, nibble) in data.iter_mut().enumerate() {
            *nibble = ((raw >> (4 * index)) & u32::from(NIBBLE_MAX)) as u8;
        }

        Ok(Self { status, data })
    }

    /// Status and communication nibble
    pub fn status(&self) -> u8 {
        self.status
    }

    /// Data nibble by capture position (0 = least significant)
    ///
    /// # Panics
    ///
    /// Panics if `index >= 6`.
    pub fn nibble(&self, index: usize) -> u8 {
        self.data[index]
    }

    /// All six data nibbles in capture order
    pub fn data(&self) -> [u8; SENT_DATA_NIBBLES] {
        self.data
    }

    /// Reassemble the 24-bit capture value
    pub fn raw_value(&self) -> u32 {
        self.data
            .iter()
            .enumerate()
            .fold(0u32, |acc, (index, &nibble)| acc | (u32::from(nibble) << (4 * index)))
    }
}

fn check_status(status: u8) -> Result<()> {
    if status > NIBBLE_MAX {
        return Err(SentMonitorError::InvalidFrame(format!(
            "status value 0x{:02X} exceeds 4 bits",
            status
        )));
    }
    Ok(())
}

/// Measurement fields extracted from a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DecodedPayload {
    /// 16-bit position output (bits 0-15 of the capture)
    pub primary: u16,

    /// 8-bit temperature output (bits 16-23 of the capture)
    pub secondary: u8,

    /// Status and communication nibble the frame arrived with
    pub status: u8,
}

/// Software-computed and sensor-reported checksum of one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ChecksumPair {
    /// CRC recomputed from the canonical message
    pub calculated: u8,

    /// CRC nibble reported by the receiver
    pub received: u8,
}

impl ChecksumPair {
    pub fn new(calculated: u8, received: u8) -> Self {
        Self { calculated, received }
    }

    /// True when both checksums agree
    pub fn is_match(&self) -> bool {
        self.calculated == self.received
    }
}

bitflags! {
    /// Conditions reported by the receiver for one interrupt event.
    ///
    /// Ten fault flags plus the transaction flags. The bit values match the
    /// capture bridge record layout; the core only tests membership.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct InterruptStatus: u16 {
        /// Frame received successfully (frame complete)
        const RECEIVE_SUCCESS      = 1 << 0;
        /// Frame moved to the receive data register
        const RECEIVE_DATA         = 1 << 1;
        /// Frame received while the previous one was unread
        const RX_BUFFER_OVERFLOW   = 1 << 2;
        /// Transmit data moved internally
        const TRANSFER_DATA        = 1 << 3;
        /// Transmit buffer ran empty
        const TX_BUFFER_UNDERFLOW  = 1 << 4;
        /// Calibration pulse deviated more than 25% from nominal
        const FREQUENCY_RANGE      = 1 << 5;
        /// Calibration pulse drifted more than 1/64 from its predecessor
        const FREQUENCY_DRIFT      = 1 << 6;
        /// Too many or too few nibbles between calibration pulses
        const WRONG_NIBBLE_COUNT   = 1 << 7;
        /// Nibble pulse too short or too long
        const NIBBLE_VALUE_RANGE   = 1 << 8;
        /// Receiver CRC check failed
        const CRC_MISMATCH         = 1 << 9;
        /// Status nibble start bit in an unexpected frame
        const WRONG_STATUS_NIBBLE  = 1 << 10;
        /// All serial message bits received
        const SERIAL_DATA_RECEIVED = 1 << 11;
        /// Serial message CRC failed
        const SERIAL_CRC           = 1 << 12;
        /// Channel watchdog expired
        const WATCHDOG_TIMEOUT     = 1 << 13;

        /// All fault flags
        const FAULTS = Self::RX_BUFFER_OVERFLOW.bits()
            | Self::TX_BUFFER_UNDERFLOW.bits()
            | Self::FREQUENCY_RANGE.bits()
            | Self::FREQUENCY_DRIFT.bits()
            | Self::WRONG_NIBBLE_COUNT.bits()
            | Self::NIBBLE_VALUE_RANGE.bits()
            | Self::CRC_MISMATCH.bits()
            | Self::WRONG_STATUS_NIBBLE.bits()
            | Self::SERIAL_CRC.bits()
            | Self::WATCHDOG_TIMEOUT.bits();
    }
}

/// A completed frame as read back from the receiver registers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceivedFrame {
    frame: RawFrame,
    received_crc: u8,
}

impl ReceivedFrame {
    pub fn new(frame: RawFrame, received_crc: u8) -> Self {
        Self { frame, received_crc }
    }

    /// Captured frame
    pub fn read_frame(&self) -> RawFrame {
        self.frame
    }

    /// Status and communication nibble of the frame
    pub fn read_status_nibble(&self) -> u8 {
        self.frame.status()
    }

    /// CRC value the receiver reported with the frame
    pub fn read_received_checksum(&self) -> u8 {
        self.received_crc
    }
}

/// Immutable record of one receiver interrupt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterruptEvent {
    /// Conditions flagged for this event
    pub status: InterruptStatus,

    /// Frame read back when `RECEIVE_SUCCESS` is set
    pub frame: Option<ReceivedFrame>,
}

impl InterruptEvent {
    /// Event carrying only status flags
    pub fn flags(status: InterruptStatus) -> Self {
        Self { status, frame: None }
    }

    /// Frame-complete event
    pub fn frame_complete(frame: RawFrame, received_crc: u8) -> Self {
        Self {
            status: InterruptStatus::RECEIVE_SUCCESS | InterruptStatus::RECEIVE_DATA,
            frame: Some(ReceivedFrame::new(frame, received_crc)),
        }
    }

    /// Add further flags to the event
    pub fn with_flags(mut self, extra: InterruptStatus) -> Self {
        self.status |= extra;
        self
    }

    /// True when the receiver signalled a complete frame
    pub fn is_frame_complete(&self) -> bool {
        self.status.contains(InterruptStatus::RECEIVE_SUCCESS)
    }
}
