//! # Indicator Outputs
//!
//! The redundancy monitor reports through two outputs: an alarm level and a
//! heartbeat that toggles on every monitored frame. On the evaluation board
//! these are LEDs; the host build logs them instead.

use tracing::{info, warn};

/// Physical indicator outputs driven by the redundancy monitor
#[cfg_attr(test, mockall::automock)]
pub trait AlarmSink {
    /// Drive the alarm indicator to the given level
    fn set_alarm_indicator(&mut self, active: bool);

    /// Flip the heartbeat indicator
    fn toggle_heartbeat_indicator(&mut self);
}

/// Indicator levels mirrored into the log
#[derive(Debug, Default)]
pub struct TracingIndicators {
    alarm: bool,
    heartbeat: bool,
    heartbeat_toggles: u64,
}

impl TracingIndicators {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current alarm level
    pub fn alarm(&self) -> bool {
        self.alarm
    }

    /// Current heartbeat level
    pub fn heartbeat(&self) -> bool {
        self.heartbeat
    }

    /// Number of heartbeat toggles since start
    pub fn heartbeat_toggles(&self) -> u64 {
        self.heartbeat_toggles
    }
}

impl AlarmSink for TracingIndicators {
    fn set_alarm_indicator(&mut self, active: bool) {
        if active != self.alarm {
            if active {
                warn!("Alarm indicator ON");
            } else {
                info!("Alarm indicator OFF");
            }
        }
        self.alarm = active;
    }

    fn toggle_heartbeat_indicator(&mut self) {
        self.heartbeat = !self.heartbeat;
        self.heartbeat_toggles += 1;
    }
}
