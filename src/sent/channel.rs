//! # SENT Channel Event Handling
//!
//! Entry point for receiver interrupt events. One [`SentChannel`] owns all
//! mutable state of a channel (session, fault counters, redundancy monitor)
//! and is driven by exactly one caller through `&mut self`, which makes the
//! receiver's no-reentrancy guarantee a compile-time property.
//!
//! Readers outside the event path subscribe to [`ChannelSnapshot`]s, a copy
//! published after every event, and never see partially updated state.

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::classifier::{classify, ErrorCounters};
use super::crc::Crc4;
use super::decoder::decode;
use super::protocol::*;
use super::redundancy::{MonitorPhase, RedundancyMonitor};
use super::session::SensorSession;
use crate::indicator::AlarmSink;

/// Read-only view of a channel after an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChannelSnapshot {
    /// Interrupt events handled
    pub interrupts_handled: u64,

    /// Frames successfully received and judged
    pub frames_received: u64,

    /// Slow-channel messages completed
    pub serial_messages_received: u64,

    /// Fields of the latest frame
    pub payload: DecodedPayload,

    /// Checksums of the latest frame
    pub checksum: ChecksumPair,

    /// Receiver fault counters
    pub counters: ErrorCounters,

    /// Redundancy phase after the latest frame
    pub phase: MonitorPhase,

    /// Alarm flag of the redundancy monitor
    pub alarm_active: bool,
}

/// What one event changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventOutcome {
    /// Fault counters incremented
    pub faults: usize,

    /// Phase the frame was judged in, if the event completed a frame
    pub phase: Option<MonitorPhase>,
}

/// State and event handler of one SENT receive channel
#[derive(Debug)]
pub struct SentChannel {
    crc: Crc4,
    session: SensorSession,
    counters: ErrorCounters,
    monitor: RedundancyMonitor,
    interrupts_handled: u64,
    snapshots: watch::Sender<ChannelSnapshot>,
}

impl Default for SentChannel {
    fn default() -> Self {
        Self::new(Crc4::tle4998(), RedundancyMonitor::default())
    }
}

impl SentChannel {
    /// Create a channel with the given checksum engine and redundancy monitor
    pub fn new(crc: Crc4, monitor: RedundancyMonitor) -> Self {
        let mut channel = Self {
            crc,
            session: SensorSession::new(),
            counters: ErrorCounters::new(),
            monitor,
            interrupts_handled: 0,
            snapshots: watch::channel(ChannelSnapshot::empty()).0,
        };
        channel.publish();
        channel
    }

    /// Handle one receiver interrupt event
    ///
    /// Fault flags are counted first. A frame-complete event then runs
    /// decode, CRC and the redundancy decision, driving `sink`.
    ///
    /// # Examples
    ///
    /// ```
    /// use sent_redundancy::indicator::TracingIndicators;
    /// use sent_redundancy::sent::channel::SentChannel;
    /// use sent_redundancy::sent::protocol::{InterruptEvent, InterruptStatus, RawFrame};
    ///
    /// let mut channel = SentChannel::default();
    /// let mut indicators = TracingIndicators::new();
    ///
    /// let frame = RawFrame::from_raw(0x0, 0x12_3456).unwrap();
    /// let event = InterruptEvent::frame_complete(frame, 0x1)
    ///     .with_flags(InterruptStatus::FREQUENCY_DRIFT);
    ///
    /// let outcome = channel.handle_event(&event, &mut indicators);
    /// assert_eq!(outcome.faults, 1);
    /// assert_eq!(channel.session().checksum().calculated, 0x1);
    /// ```
    pub fn handle_event<S: AlarmSink + ?Sized>(&mut self, event: &InterruptEvent, sink: &mut S) -> EventOutcome {
        self.interrupts_handled += 1;

        let faults = classify(event.status, &mut self.counters);

        if event.status.contains(InterruptStatus::SERIAL_DATA_RECEIVED) {
            self.session.record_serial_message();
        }

        let phase = if event.is_frame_complete() {
            match event.frame {
                Some(received) => Some(self.process_frame(received, sink)),
                None => {
                    warn!("Frame-complete event without a valid frame, dropped");
                    None
                }
            }
        } else {
            None
        };

        self.publish();
        EventOutcome { faults, phase }
    }

    fn process_frame<S: AlarmSink + ?Sized>(&mut self, received: ReceivedFrame, sink: &mut S) -> MonitorPhase {
        let frame = received.read_frame();
        let (payload, message) = decode(&frame);
        let checksum = ChecksumPair::new(self.crc.compute(&message), received.read_received_checksum());

        self.session.record_frame(frame, payload, checksum);
        debug!(
            "SENT frame {}: out=0x{:04X} temp=0x{:02X} status=0x{:X} crc={:X}/{:X}",
            self.session.frames_received(),
            payload.primary,
            payload.secondary,
            payload.status,
            checksum.calculated,
            checksum.received
        );

        self.monitor.observe(checksum, sink)
    }

    /// Restart the session and the redundancy monitor, keeping fault counters
    ///
    /// The alarm indicator goes low immediately so it agrees with the
    /// published snapshot even if no further frame arrives.
    pub fn reset<S: AlarmSink + ?Sized>(&mut self, sink: &mut S) {
        self.session.reset();
        self.monitor.reset(sink);
        self.publish();
    }

    /// Receiver for snapshots published after every event
    pub fn subscribe(&self) -> watch::Receiver<ChannelSnapshot> {
        self.snapshots.subscribe()
    }

    /// Current state as a snapshot
    pub fn snapshot(&self) -> ChannelSnapshot {
        ChannelSnapshot {
            interrupts_handled: self.interrupts_handled,
            frames_received: self.session.frames_received(),
            serial_messages_received: self.session.serial_messages_received(),
            payload: self.session.payload(),
            checksum: self.session.checksum(),
            counters: self.counters,
            phase: self.monitor.phase(),
            alarm_active: self.monitor.alarm_active(),
        }
    }

    pub fn session(&self) -> &SensorSession {
        &self.session
    }

    pub fn counters(&self) -> &ErrorCounters {
        &self.counters
    }

    pub fn monitor(&self) -> &RedundancyMonitor {
        &self.monitor
    }

    fn publish(&mut self) {
        let snapshot = self.snapshot();
        self.snapshots.send_replace(snapshot);
    }
}

impl ChannelSnapshot {
    fn empty() -> Self {
        Self {
            interrupts_handled: 0,
            frames_received: 0,
            serial_messages_received: 0,
            payload: DecodedPayload::default(),
            checksum: ChecksumPair::default(),
            counters: ErrorCounters::new(),
            phase: MonitorPhase::Warmup,
            alarm_active: false,
        }
    }
}
