//! # Redundancy Monitor
//!
//! Compares the sensor-reported CRC with the recomputed one and drives the
//! alarm and heartbeat indicators.
//!
//! ## Phases
//!
//! ```text
//! WARMUP ──(warm-up count reached)──▶ SETTLING ──(settle count done)──▶ MONITORING
//!                                                                      ├─ OK
//!                                                                      └─ ALARM
//! ```
//!
//! - **Warm-up**: frames before the warm-up threshold are ignored while the
//!   receiver synchronises. The alarm indicator is held low.
//! - **Settling**: the frame that reaches the threshold and the following
//!   ones, `settle` frames in total, are also ignored. Alarm held low.
//! - **Monitoring**: every frame is judged on its own. A mismatch asserts the
//!   alarm, a match clears it; the heartbeat toggles either way.
//!
//! There is no way back to warm-up except an explicit [`RedundancyMonitor::reset`].

use serde::Serialize;
use tracing::{debug, info, warn};

use super::protocol::{ChecksumPair, DEFAULT_SETTLE_FRAMES, DEFAULT_WARMUP_FRAMES};
use crate::indicator::AlarmSink;

/// Result of the last monitored comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Health {
    Ok,
    Alarm,
}

/// Phase of the redundancy decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorPhase {
    Warmup,
    Settling,
    Monitoring(Health),
}

/// Countdown and alarm state of the monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RedundancyState {
    /// Frames left until warm-up ends (the frame that reaches zero settles)
    pub warmup_remaining: u32,

    /// Settling frames still to ignore
    pub settle_remaining: u32,

    /// Outcome of the latest monitored comparison
    pub alarm_active: bool,
}

impl Default for RedundancyState {
    fn default() -> Self {
        Self::new(DEFAULT_WARMUP_FRAMES, DEFAULT_SETTLE_FRAMES)
    }
}

impl RedundancyState {
    pub fn new(warmup_frames: u32, settle_frames: u32) -> Self {
        Self {
            warmup_remaining: warmup_frames,
            settle_remaining: settle_frames,
            alarm_active: false,
        }
    }
}

/// Checksum redundancy state machine
#[derive(Debug, Clone)]
pub struct RedundancyMonitor {
    initial: RedundancyState,
    state: RedundancyState,
    phase: MonitorPhase,
}

impl Default for RedundancyMonitor {
    fn default() -> Self {
        Self::with_state(RedundancyState::default())
    }
}

impl RedundancyMonitor {
    /// Create a monitor with the given warm-up threshold and settle count
    ///
    /// # Examples
    ///
    /// ```
    /// use sent_redundancy::sent::redundancy::{MonitorPhase, RedundancyMonitor};
    ///
    /// let monitor = RedundancyMonitor::new(3, 3);
    /// assert_eq!(monitor.phase(), MonitorPhase::Warmup);
    /// assert!(!monitor.alarm_active());
    /// ```
    pub fn new(warmup_frames: u32, settle_frames: u32) -> Self {
        Self::with_state(RedundancyState::new(warmup_frames, settle_frames))
    }

    fn with_state(initial: RedundancyState) -> Self {
        Self {
            initial,
            state: initial,
            phase: MonitorPhase::Warmup,
        }
    }

    pub fn phase(&self) -> MonitorPhase {
        self.phase
    }

    pub fn state(&self) -> RedundancyState {
        self.state
    }

    pub fn alarm_active(&self) -> bool {
        self.state.alarm_active
    }

    /// Judge one successfully decoded frame
    ///
    /// # Arguments
    ///
    /// * `pair` - Recomputed and received checksum of the frame
    /// * `sink` - Indicator outputs
    ///
    /// # Returns
    ///
    /// * `MonitorPhase` - Phase the frame was handled in
    pub fn observe<S: AlarmSink + ?Sized>(&mut self, pair: ChecksumPair, sink: &mut S) -> MonitorPhase {
        self.state.warmup_remaining = self.state.warmup_remaining.saturating_sub(1);

        if self.state.warmup_remaining > 0 {
            sink.set_alarm_indicator(false);
            self.phase = MonitorPhase::Warmup;
            return self.phase;
        }

        if self.state.settle_remaining > 0 {
            if self.phase == MonitorPhase::Warmup {
                info!(
                    "SENT warm-up complete, settling for {} frames",
                    self.state.settle_remaining
                );
            }
            self.state.settle_remaining -= 1;
            sink.set_alarm_indicator(false);
            self.phase = MonitorPhase::Settling;
            return self.phase;
        }

        if !matches!(self.phase, MonitorPhase::Monitoring(_)) {
            info!("SENT redundancy monitoring active");
        }

        let mismatch = !pair.is_match();
        sink.set_alarm_indicator(mismatch);
        sink.toggle_heartbeat_indicator();

        if mismatch && !self.state.alarm_active {
            warn!(
                "CRC mismatch: calculated 0x{:X}, received 0x{:X}",
                pair.calculated, pair.received
            );
        } else if !mismatch && self.state.alarm_active {
            info!("CRC match restored (0x{:X})", pair.calculated);
        } else {
            debug!(
                "CRC check: calculated 0x{:X}, received 0x{:X}",
                pair.calculated, pair.received
            );
        }

        self.state.alarm_active = mismatch;
        self.phase = MonitorPhase::Monitoring(if mismatch { Health::Alarm } else { Health::Ok });
        self.phase
    }

    /// Restart from warm-up with the initial counts
    ///
    /// Used when the sensor session restarts (e.g. the sensor was re-plugged).
    /// The alarm indicator is driven low right away, not on the next frame.
    pub fn reset<S: AlarmSink + ?Sized>(&mut self, sink: &mut S) {
        info!("SENT redundancy monitor reset");
        self.state = self.initial;
        self.phase = MonitorPhase::Warmup;
        sink.set_alarm_indicator(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicator::{MockAlarmSink, TracingIndicators};
    use mockall::predicate::eq;
    use mockall::Sequence;

    const GOOD: ChecksumPair = ChecksumPair { calculated: 0x7, received: 0x7 };
    const BAD: ChecksumPair = ChecksumPair { calculated: 0x7, received: 0x6 };

    #[test]
    fn test_warmup_frames_ignore_checksum() {
        let mut monitor = RedundancyMonitor::default();
        let mut sink = MockAlarmSink::new();
        sink.expect_set_alarm_indicator().with(eq(false)).times(2).return_const(());
        sink.expect_toggle_heartbeat_indicator().never();

        assert_eq!(monitor.observe(BAD, &mut sink), MonitorPhase::Warmup);
        assert_eq!(monitor.observe(BAD, &mut sink), MonitorPhase::Warmup);
        assert!(!monitor.alarm_active());
    }

    #[test]
    fn test_settling_frames_ignore_checksum() {
        let mut monitor = RedundancyMonitor::default();
        let mut sink = MockAlarmSink::new();
        sink.expect_set_alarm_indicator().with(eq(false)).times(5).return_const(());
        sink.expect_toggle_heartbeat_indicator().never();

        let phases: Vec<_> = (0..5).map(|_| monitor.observe(BAD, &mut sink)).collect();
        assert_eq!(
            phases,
            vec![
                MonitorPhase::Warmup,
                MonitorPhase::Warmup,
                MonitorPhase::Settling,
                MonitorPhase::Settling,
                MonitorPhase::Settling,
            ]
        );
        assert_eq!(monitor.state().warmup_remaining, 0);
        assert_eq!(monitor.state().settle_remaining, 0);
        assert!(!monitor.alarm_active());
    }

    #[test]
    fn test_first_monitored_frame_is_sixth() {
        let mut monitor = RedundancyMonitor::default();
        let mut sink = MockAlarmSink::new();
        let mut seq = Sequence::new();

        sink.expect_set_alarm_indicator()
            .with(eq(false))
            .times(5)
            .in_sequence(&mut seq)
            .return_const(());
        sink.expect_set_alarm_indicator()
            .with(eq(true))
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        sink.expect_toggle_heartbeat_indicator()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());

        for _ in 0..5 {
            monitor.observe(BAD, &mut sink);
        }
        assert_eq!(monitor.observe(BAD, &mut sink), MonitorPhase::Monitoring(Health::Alarm));
        assert!(monitor.alarm_active());
    }

    #[test]
    fn test_matching_stream_keeps_alarm_clear() {
        let mut monitor = RedundancyMonitor::default();
        let mut indicators = TracingIndicators::new();

        for _ in 0..5 {
            monitor.observe(GOOD, &mut indicators);
        }
        assert_eq!(indicators.heartbeat_toggles(), 0);

        assert_eq!(monitor.observe(GOOD, &mut indicators), MonitorPhase::Monitoring(Health::Ok));
        assert!(!indicators.alarm());
        assert_eq!(indicators.heartbeat_toggles(), 1);

        for frame in 7..=10 {
            monitor.observe(GOOD, &mut indicators);
            assert!(!indicators.alarm());
            assert_eq!(indicators.heartbeat_toggles(), frame - 5);
        }
    }

    #[test]
    fn test_single_bad_frame_raises_then_clears() {
        let mut monitor = RedundancyMonitor::default();
        let mut indicators = TracingIndicators::new();

        for _ in 0..6 {
            monitor.observe(GOOD, &mut indicators);
        }
        assert!(!indicators.alarm());

        let flipped = ChecksumPair::new(GOOD.calculated, GOOD.calculated ^ 0x1);
        assert_eq!(monitor.observe(flipped, &mut indicators), MonitorPhase::Monitoring(Health::Alarm));
        assert!(indicators.alarm());
        assert!(monitor.alarm_active());

        assert_eq!(monitor.observe(GOOD, &mut indicators), MonitorPhase::Monitoring(Health::Ok));
        assert!(!indicators.alarm());
        assert!(!monitor.alarm_active());
        assert_eq!(indicators.heartbeat_toggles(), 3);
    }

    #[test]
    fn test_decision_is_frame_local() {
        let mut monitor = RedundancyMonitor::default();
        let mut indicators = TracingIndicators::new();

        for _ in 0..5 {
            monitor.observe(GOOD, &mut indicators);
        }
        for _ in 0..10 {
            monitor.observe(BAD, &mut indicators);
        }
        assert!(monitor.alarm_active());

        // One good frame clears the alarm regardless of the preceding run
        monitor.observe(GOOD, &mut indicators);
        assert!(!monitor.alarm_active());
        assert!(!indicators.alarm());
    }

    #[test]
    fn test_reset_returns_to_warmup() {
        let mut monitor = RedundancyMonitor::default();
        let mut indicators = TracingIndicators::new();

        for _ in 0..6 {
            monitor.observe(BAD, &mut indicators);
        }
        assert!(monitor.alarm_active());
        assert!(indicators.alarm());

        monitor.reset(&mut indicators);
        assert!(!indicators.alarm());
        assert_eq!(monitor.phase(), MonitorPhase::Warmup);
        assert_eq!(monitor.state(), RedundancyState::default());

        assert_eq!(monitor.observe(BAD, &mut indicators), MonitorPhase::Warmup);
        assert!(!indicators.alarm());
    }

    #[test]
    fn test_reset_drives_alarm_low() {
        let mut monitor = RedundancyMonitor::default();
        let mut sink = MockAlarmSink::new();
        sink.expect_set_alarm_indicator().with(eq(false)).times(1).return_const(());
        sink.expect_toggle_heartbeat_indicator().never();

        monitor.reset(&mut sink);
        assert_eq!(monitor.phase(), MonitorPhase::Warmup);
    }

    #[test]
    fn test_custom_windows() {
        let mut monitor = RedundancyMonitor::new(1, 0);
        let mut indicators = TracingIndicators::new();

        // Threshold of one is reached on the first frame and there is nothing to settle
        assert_eq!(monitor.observe(BAD, &mut indicators), MonitorPhase::Monitoring(Health::Alarm));
    }

    #[test]
    fn test_zero_warmup_goes_straight_to_settling() {
        let mut monitor = RedundancyMonitor::new(0, 2);
        let mut indicators = TracingIndicators::new();

        assert_eq!(monitor.observe(GOOD, &mut indicators), MonitorPhase::Settling);
        assert_eq!(monitor.observe(GOOD, &mut indicators), MonitorPhase::Settling);
        assert_eq!(monitor.observe(GOOD, &mut indicators), MonitorPhase::Monitoring(Health::Ok));
    }

    #[test]
    fn test_phase_serializes_snake_case() {
        let json = serde_json::to_string(&MonitorPhase::Monitoring(Health::Alarm)).unwrap();
        assert_eq!(json, r#"{"monitoring":"alarm"}"#);
        assert_eq!(serde_json::to_string(&MonitorPhase::Warmup).unwrap(), r#""warmup""#);
    }
}
