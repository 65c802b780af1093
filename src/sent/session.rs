//! Per-channel receive state: the latest frame and what was derived from it.

use super::protocol::{ChecksumPair, DecodedPayload, RawFrame};

/// Latest frame, payload and checksum pair of one SENT channel
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SensorSession {
    last_frame: Option<RawFrame>,
    payload: DecodedPayload,
    checksum: ChecksumPair,
    frames_received: u64,
    serial_messages_received: u64,
}

impl SensorSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a successfully received frame and bump the frame tally
    pub fn record_frame(&mut self, frame: RawFrame, payload: DecodedPayload, checksum: ChecksumPair) {
        self.last_frame = Some(frame);
        self.payload = payload;
        self.checksum = checksum;
        self.frames_received += 1;
    }

    /// Count a completed slow-channel (serial) message; its content is not decoded
    pub fn record_serial_message(&mut self) {
        self.serial_messages_received += 1;
    }

    pub fn last_frame(&self) -> Option<RawFrame> {
        self.last_frame
    }

    pub fn payload(&self) -> DecodedPayload {
        self.payload
    }

    pub fn checksum(&self) -> ChecksumPair {
        self.checksum
    }

    /// Successfully received frames since start (or last reset)
    pub fn frames_received(&self) -> u64 {
        self.frames_received
    }

    pub fn serial_messages_received(&self) -> u64 {
        self.serial_messages_received
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_empty() {
        let session = SensorSession::new();
        assert!(session.last_frame().is_none());
        assert_eq!(session.frames_received(), 0);
        assert_eq!(session.checksum(), ChecksumPair::default());
    }

    #[test]
    fn test_record_frame_overwrites_previous() {
        let mut session = SensorSession::new();
        let first = RawFrame::from_raw(0x1, 0x00_1111).unwrap();
        let second = RawFrame::from_raw(0x2, 0x22_2222).unwrap();

        session.record_frame(first, DecodedPayload::default(), ChecksumPair::new(1, 1));
        session.record_frame(
            second,
            DecodedPayload { primary: 0x2222, secondary: 0x22, status: 0x2 },
            ChecksumPair::new(3, 4),
        );

        assert_eq!(session.last_frame(), Some(second));
        assert_eq!(session.payload().primary, 0x2222);
        assert_eq!(session.checksum(), ChecksumPair::new(3, 4));
        assert_eq!(session.frames_received(), 2);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut session = SensorSession::new();
        session.record_frame(RawFrame::default(), DecodedPayload::default(), ChecksumPair::new(5, 5));
        session.record_serial_message();

        session.reset();
        assert_eq!(session, SensorSession::new());
    }
}
