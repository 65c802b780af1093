//! # Capture Bridge Records
//!
//! The SENT capture bridge forwards each receiver interrupt as a fixed
//! 8-byte record:
//!
//! | Offset | Size | Field |
//! |--------|------|-------|
//! | 0 | 1 | Sync byte (0xA5) |
//! | 1 | 2 | Interrupt status flags, little-endian |
//! | 3 | 1 | Status nibble |
//! | 4 | 3 | 24-bit data capture, little-endian |
//! | 7 | 1 | Received CRC |
//!
//! Frame fields are only meaningful when `RECEIVE_SUCCESS` is set. Records
//! carry no checksum, so [`RecordDecoder`] only locks onto a sync byte that
//! is followed by another one a record later; bytes in front of it are
//! discarded so the stream resynchronises after line noise.

use bytes::{Buf, BufMut, BytesMut};
use tracing::{debug, warn};

use crate::error::{Result, SentMonitorError};
use crate::sent::protocol::{InterruptEvent, InterruptStatus, RawFrame, ReceivedFrame};

/// First byte of every record
pub const RECORD_SYNC: u8 = 0xA5;

/// Size of one record in bytes
pub const RECORD_LEN: usize = 8;

/// Parse exactly one record
///
/// # Errors
///
/// - `Protocol` if the sync byte is wrong
/// - `InvalidFrame` if a frame-complete record carries a status byte above 15
pub fn parse_record(record: &[u8; RECORD_LEN]) -> Result<InterruptEvent> {
    let mut bytes = &record[..];

    let sync = bytes.get_u8();
    if sync != RECORD_SYNC {
        return Err(SentMonitorError::Protocol(format!(
            "Invalid sync byte: 0x{:02X}",
            sync
        )));
    }

    let status = InterruptStatus::from_bits_truncate(bytes.get_u16_le());
    let status_nibble = bytes.get_u8();
    let raw = bytes.get_uint_le(3) as u32;
    let received_crc = bytes.get_u8();

    if !status.contains(InterruptStatus::RECEIVE_SUCCESS) {
        return Ok(InterruptEvent::flags(status));
    }

    let frame = RawFrame::from_raw(status_nibble, raw)?;
    Ok(InterruptEvent {
        status,
        frame: Some(ReceivedFrame::new(frame, received_crc)),
    })
}

/// Splits a receive buffer into records, tracking record sync
///
/// Until sync is acquired a sync byte is only trusted when another sync
/// byte follows exactly one record later. A data byte that happens to equal
/// [`RECORD_SYNC`] (e.g. when the port opens mid-record) is skipped instead of
/// being decoded as an event. Once synced, records are taken back to back and
/// any record not starting with a sync byte drops back to searching.
#[derive(Debug, Default)]
pub struct RecordDecoder {
    synced: bool,
}

impl RecordDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once two consecutive records have been seen
    pub fn is_synced(&self) -> bool {
        self.synced
    }

    /// Take the next record out of a receive buffer
    ///
    /// Returns `None` until a full record (plus the following sync byte,
    /// while unsynchronised) is buffered. A frame that fails validation is
    /// dropped but its status flags are still delivered.
    pub fn decode(&mut self, buffer: &mut BytesMut) -> Option<InterruptEvent> {
        loop {
            if self.synced {
                match buffer.first() {
                    None => return None,
                    Some(&RECORD_SYNC) => {
                        if buffer.len() < RECORD_LEN {
                            return None;
                        }
                        return Some(take_record(buffer));
                    }
                    Some(_) => {
                        warn!("Lost bridge record sync, resynchronising");
                        self.synced = false;
                    }
                }
            }

            if !discard_to_sync(buffer) || buffer.len() <= RECORD_LEN {
                return None;
            }

            if buffer[RECORD_LEN] != RECORD_SYNC {
                debug!("Sync byte not followed by another record, skipping");
                buffer.advance(1);
                continue;
            }

            debug!("Bridge record sync acquired");
            self.synced = true;
            return Some(take_record(buffer));
        }
    }
}

/// Drop bytes in front of the first sync byte; true if one is at the front
fn discard_to_sync(buffer: &mut BytesMut) -> bool {
    match buffer.iter().position(|&byte| byte == RECORD_SYNC) {
        Some(0) => true,
        Some(skip) => {
            debug!("Discarding {} bytes before sync", skip);
            buffer.advance(skip);
            true
        }
        None => {
            if !buffer.is_empty() {
                debug!("Discarding {} bytes without sync", buffer.len());
                buffer.clear();
            }
            false
        }
    }
}

/// Remove one record from the front of `buffer` and parse it
fn take_record(buffer: &mut BytesMut) -> InterruptEvent {
    let mut record = [0u8; RECORD_LEN];
    buffer.copy_to_slice(&mut record);

    match parse_record(&record) {
        Ok(event) => event,
        Err(e) => {
            warn!("Dropping frame from bridge record: {}", e);
            let status = InterruptStatus::from_bits_truncate(u16::from_le_bytes([record[1], record[2]]));
            InterruptEvent::flags(status)
        }
    }
}

/// Serialize an event in the bridge record format
pub fn encode_record(event: &InterruptEvent) -> [u8; RECORD_LEN] {
    let mut out = BytesMut::with_capacity(RECORD_LEN);
    out.put_u8(RECORD_SYNC);
    out.put_u16_le(event.status.bits());

    match event.frame {
        Some(received) => {
            let frame = received.read_frame();
            out.put_u8(frame.status());
            out.put_uint_le(u64::from(frame.raw_value()), 3);
            out.put_u8(received.read_received_checksum());
        }
        None => out.put_bytes(0, 5),
    }

    let mut record = [0u8; RECORD_LEN];
    record.copy_from_slice(&out);
    record
}
