//! # SENT Redundancy Monitor
//!
//! Watches the SENT output of a TLE4998 linear Hall sensor through a capture
//! bridge and raises an alarm when the sensor's CRC disagrees with the
//! recomputed one.

use anyhow::{Context, Result};
use std::path::Path;
use tokio::sync::mpsc;
use tokio::time::{interval, Duration};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use sent_redundancy::config::Config;
use sent_redundancy::indicator::TracingIndicators;
use sent_redundancy::sent::channel::SentChannel;
use sent_redundancy::sent::crc::Crc4;
use sent_redundancy::sent::redundancy::RedundancyMonitor;
use sent_redundancy::serial::{run_bridge, BridgeMessage};
use sent_redundancy::telemetry::TelemetryLogger;

/// Configuration file used when no path is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Number of frames between status log messages
const LOG_INTERVAL_FRAMES: u64 = 1000;

/// Main entry point for the SENT redundancy monitor
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Set up logging with a non-blocking tracing subscriber
///    - Load configuration (first argument, or `config/default.toml`)
///    - Spawn the bridge task, which connects and reconnects on its own
///
/// 2. **Main Loop**
///    - Hand every bridge event to the SENT channel
///    - Restart the sensor session when the bridge reconnects
///    - Write a telemetry snapshot every `log_interval_ms`
///    - Handle Ctrl+C for graceful shutdown
///
/// # Errors
///
/// Returns error if the configuration is invalid or the telemetry directory
/// cannot be created.
///
/// # Examples
///
/// ```bash
/// RUST_LOG=sent_redundancy=debug cargo run --release -- config/default.toml
/// ```
#[tokio::main]
async fn main() -> Result<()> {
    let (writer, _log_guard) = tracing_appender::non_blocking(std::io::stdout());
    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    info!("SENT redundancy monitor v{} starting...", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = if Path::new(&config_path).exists() {
        Config::load(&config_path).with_context(|| format!("loading {}", config_path))?
    } else {
        warn!("Configuration {} not found, using defaults", config_path);
        Config::default()
    };

    let mut channel = SentChannel::new(
        Crc4::new(config.sent.crc_seed, config.sent.frame_length + 1),
        RedundancyMonitor::new(config.redundancy.warmup_frames, config.redundancy.settle_frames),
    );
    let snapshots = channel.subscribe();
    let mut indicators = TracingIndicators::new();

    let mut telemetry = if config.telemetry.enabled {
        Some(TelemetryLogger::new(&config.telemetry).context("creating telemetry logger")?)
    } else {
        None
    };
    let mut telemetry_interval = interval(Duration::from_millis(config.telemetry.log_interval_ms));

    // Single slot: the bridge waits until the previous event has been handled
    let (tx, mut rx) = mpsc::channel(1);
    let bridge = tokio::spawn(run_bridge(config.serial.clone(), tx));

    info!(
        "Monitoring SENT frames (warm-up {} frames, settling {} frames)",
        config.redundancy.warmup_frames, config.redundancy.settle_frames
    );
    info!("Press Ctrl+C to exit");

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let mut last_log_frames: u64 = 0;

    loop {
        tokio::select! {
            message = rx.recv() => {
                match message {
                    Some(BridgeMessage::Event(event)) => {
                        channel.handle_event(&event, &mut indicators);

                        let frames = channel.session().frames_received();
                        if frames - last_log_frames >= LOG_INTERVAL_FRAMES {
                            let checksum = channel.session().checksum();
                            info!(
                                "Received {} frames, {} receiver faults, CRC {:X}/{:X}, alarm {}",
                                frames,
                                channel.counters().total(),
                                checksum.calculated,
                                checksum.received,
                                if channel.monitor().alarm_active() { "ON" } else { "off" }
                            );
                            last_log_frames = frames;
                        }
                    }
                    Some(BridgeMessage::Reconnected) => {
                        info!("Capture bridge reconnected, restarting sensor session");
                        channel.reset(&mut indicators);
                        last_log_frames = 0;
                    }
                    None => {
                        warn!("Bridge task stopped");
                        break;
                    }
                }
            }

            _ = telemetry_interval.tick() => {
                if let Some(logger) = telemetry.as_mut() {
                    let snapshot = *snapshots.borrow();
                    if let Err(e) = logger.log(&snapshot) {
                        warn!("Failed to write telemetry: {}", e);
                    }
                }
            }

            _ = &mut shutdown => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    bridge.abort();

    info!(
        "Total frames received: {}, heartbeat toggles: {}",
        channel.session().frames_received(),
        indicators.heartbeat_toggles()
    );
    for (kind, count) in channel.counters().iter() {
        if count > 0 {
            info!("  {}: {}", kind, count);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_interval_constant() {
        assert_eq!(LOG_INTERVAL_FRAMES, 1000);
    }

    #[test]
    fn test_shipped_config_is_valid() {
        let config = Config::load(DEFAULT_CONFIG_PATH).unwrap();
        assert_eq!(config.sent.frame_length + 1, 7);
        assert_eq!(config.sent.crc_seed, 0x05);
        assert_eq!(config.redundancy.warmup_frames, 3);
        assert_eq!(config.redundancy.settle_frames, 3);
    }

    #[test]
    fn test_crc_from_default_config_matches_tle4998() {
        let config = Config::default();
        assert_eq!(
            Crc4::new(config.sent.crc_seed, config.sent.frame_length + 1),
            Crc4::tle4998()
        );
    }
}
