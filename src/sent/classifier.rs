//! # Receiver Fault Classification
//!
//! Maps the fault flags of an interrupt event onto per-kind counters.
//!
//! Each flag is counted at most once per event, no matter how many frames
//! the event stands for. Counters only grow; nothing in the crate clears them.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::fmt;
use tracing::debug;

use super::protocol::InterruptStatus;

/// Fault conditions reported by the SENT receiver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    RxBufferOverflow,
    TxBufferUnderflow,
    FrequencyRangeError,
    FrequencyDriftError,
    WrongNibbleCount,
    NibbleValueOutOfRange,
    /// CRC failure detected by the receiver hardware
    CrcMismatch,
    WrongStatusNibble,
    SerialCrcError,
    WatchdogTimeout,
}

impl FaultKind {
    /// Number of fault kinds
    pub const COUNT: usize = 10;

    /// All fault kinds in counter order
    pub const ALL: [FaultKind; Self::COUNT] = [
        FaultKind::RxBufferOverflow,
        FaultKind::TxBufferUnderflow,
        FaultKind::FrequencyRangeError,
        FaultKind::FrequencyDriftError,
        FaultKind::WrongNibbleCount,
        FaultKind::NibbleValueOutOfRange,
        FaultKind::CrcMismatch,
        FaultKind::WrongStatusNibble,
        FaultKind::SerialCrcError,
        FaultKind::WatchdogTimeout,
    ];

    /// Status flag that signals this fault
    pub fn flag(self) -> InterruptStatus {
        match self {
            FaultKind::RxBufferOverflow => InterruptStatus::RX_BUFFER_OVERFLOW,
            FaultKind::TxBufferUnderflow => InterruptStatus::TX_BUFFER_UNDERFLOW,
            FaultKind::FrequencyRangeError => InterruptStatus::FREQUENCY_RANGE,
            FaultKind::FrequencyDriftError => InterruptStatus::FREQUENCY_DRIFT,
            FaultKind::WrongNibbleCount => InterruptStatus::WRONG_NIBBLE_COUNT,
            FaultKind::NibbleValueOutOfRange => InterruptStatus::NIBBLE_VALUE_RANGE,
            FaultKind::CrcMismatch => InterruptStatus::CRC_MISMATCH,
            FaultKind::WrongStatusNibble => InterruptStatus::WRONG_STATUS_NIBBLE,
            FaultKind::SerialCrcError => InterruptStatus::SERIAL_CRC,
            FaultKind::WatchdogTimeout => InterruptStatus::WATCHDOG_TIMEOUT,
        }
    }

    /// Stable snake_case name used in logs and telemetry
    pub fn name(self) -> &'static str {
        match self {
            FaultKind::RxBufferOverflow => "rx_buffer_overflow",
            FaultKind::TxBufferUnderflow => "tx_buffer_underflow",
            FaultKind::FrequencyRangeError => "frequency_range_error",
            FaultKind::FrequencyDriftError => "frequency_drift_error",
            FaultKind::WrongNibbleCount => "wrong_nibble_count",
            FaultKind::NibbleValueOutOfRange => "nibble_value_out_of_range",
            FaultKind::CrcMismatch => "crc_mismatch",
            FaultKind::WrongStatusNibble => "wrong_status_nibble",
            FaultKind::SerialCrcError => "serial_crc_error",
            FaultKind::WatchdogTimeout => "watchdog_timeout",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-kind fault counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ErrorCounters {
    counts: [u32; FaultKind::COUNT],
}

impl ErrorCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current count for one fault kind
    pub fn get(&self, kind: FaultKind) -> u32 {
        self.counts[kind.index()]
    }

    /// Sum over all kinds
    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&count| u64::from(count)).sum()
    }

    /// (kind, count) pairs in counter order
    pub fn iter(&self) -> impl Iterator<Item = (FaultKind, u32)> + '_ {
        FaultKind::ALL.iter().map(move |&kind| (kind, self.get(kind)))
    }

    /// Saturates at `u32::MAX` rather than wrapping
    fn increment(&mut self, kind: FaultKind) {
        let slot = &mut self.counts[kind.index()];
        *slot = slot.saturating_add(1);
    }
}

impl Serialize for ErrorCounters {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(FaultKind::COUNT))?;
        for (kind, count) in self.iter() {
            map.serialize_entry(kind.name(), &count)?;
        }
        map.end()
    }
}

/// Count every fault flag set in `status`
///
/// # Arguments
///
/// * `status` - Flags of one interrupt event
/// * `counters` - Counters to increment
///
/// # Returns
///
/// * `usize` - Number of counters incremented (one per set fault flag)
///
/// # Examples
///
/// ```
/// use sent_redundancy::sent::classifier::{classify, ErrorCounters, FaultKind};
/// use sent_redundancy::sent::protocol::InterruptStatus;
///
/// let mut counters = ErrorCounters::new();
/// let flags = InterruptStatus::FREQUENCY_DRIFT | InterruptStatus::CRC_MISMATCH;
///
/// assert_eq!(classify(flags, &mut counters), 2);
/// assert_eq!(counters.get(FaultKind::CrcMismatch), 1);
/// ```
pub fn classify(status: InterruptStatus, counters: &mut ErrorCounters) -> usize {
    if !status.intersects(InterruptStatus::FAULTS) {
        return 0;
    }

    let mut incremented = 0;
    for kind in FaultKind::ALL {
        if status.contains(kind.flag()) {
            counters.increment(kind);
            incremented += 1;
            debug!("SENT receiver fault: {} (total {})", kind, counters.get(kind));
        }
    }

    incremented
}
