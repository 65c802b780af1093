//! # Serial Communication Module
//!
//! Handles the serial link to the SENT capture bridge.
//!
//! This module handles:
//! - Opening the bridge serial port (configured path first, then common defaults)
//! - Framing the byte stream into interrupt event records
//! - Forwarding events to the core through a single-slot channel
//! - Reconnecting after the bridge disappears

pub mod record;

use bytes::BytesMut;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

use crate::config::SerialConfig;
use crate::error::{Result, SentMonitorError};
use crate::sent::protocol::InterruptEvent;
use self::record::{RecordDecoder, RECORD_LEN};

/// Default bridge device paths to try after the configured one
const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyACM0", // USB CDC bridges
    "/dev/ttyUSB0", // USB-to-serial adapters
];

/// Read buffer size (a few hundred records)
const READ_BUFFER_SIZE: usize = 256 * RECORD_LEN;

/// Messages from the bridge task to the core
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeMessage {
    /// One receiver interrupt
    Event(InterruptEvent),

    /// The bridge came back after a disconnect; the sensor session restarts
    Reconnected,
}

/// Why forwarding stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardEnd {
    /// The bridge closed the stream
    EndOfStream,

    /// The core stopped listening
    ReceiverClosed,
}

/// SENT capture bridge serial port handler
pub struct BridgeSerial {
    /// Serial port handle
    port: tokio_serial::SerialStream,
    /// Device path (e.g., /dev/ttyACM0)
    device_path: String,
}

impl std::fmt::Debug for BridgeSerial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeSerial")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl BridgeSerial {
    /// Open the bridge using the serial configuration
    ///
    /// Tries the configured port first, then the default device paths.
    ///
    /// # Errors
    ///
    /// Returns `SerialPortNotFound` if no candidate could be opened
    pub fn open(config: &SerialConfig) -> Result<Self> {
        let mut paths = vec![config.port.as_str()];
        for &path in DEFAULT_DEVICE_PATHS {
            if !paths.contains(&path) {
                paths.push(path);
            }
        }

        Self::open_with_paths(&paths, config.baud_rate, Duration::from_millis(config.timeout_ms))
    }

    /// Open the bridge trying each path in order
    ///
    /// # Arguments
    ///
    /// * `paths` - Device paths to try (e.g., &["/dev/ttyACM0"])
    /// * `baud_rate` - Bridge baud rate
    /// * `timeout` - Port read/write timeout
    pub fn open_with_paths(paths: &[&str], baud_rate: u32, timeout: Duration) -> Result<Self> {
        for path in paths {
            debug!("Trying to open serial port: {}", path);

            match Self::open_port(path, baud_rate, timeout) {
                Ok(port) => {
                    info!("Opened SENT capture bridge at {}", path);
                    return Ok(Self {
                        port,
                        device_path: path.to_string(),
                    });
                }
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                    continue;
                }
            }
        }

        Err(SentMonitorError::SerialPortNotFound(paths.join(", ")))
    }

    /// Open a specific serial port with 8N1 settings
    fn open_port(path: &str, baud_rate: u32, timeout: Duration) -> Result<tokio_serial::SerialStream> {
        let port = tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .timeout(timeout)
            .open_native_async()
            .map_err(|e| SentMonitorError::Serial(format!("Failed to open {}: {}", path, e)))?;

        Ok(port)
    }

    /// Device path of the opened port
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Turn the port into an event reader
    pub fn into_reader(self) -> EventReader<tokio_serial::SerialStream> {
        EventReader::new(self.port)
    }
}

/// Reads bridge records from a byte stream
#[derive(Debug)]
pub struct EventReader<R> {
    reader: R,
    buffer: BytesMut,
    decoder: RecordDecoder,
}

impl<R: AsyncRead + Unpin> EventReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: BytesMut::with_capacity(READ_BUFFER_SIZE),
            decoder: RecordDecoder::new(),
        }
    }

    /// Next interrupt event, or `None` once the stream has ended
    ///
    /// # Errors
    ///
    /// Returns `Io` if reading from the stream fails
    pub async fn next_event(&mut self) -> Result<Option<InterruptEvent>> {
        loop {
            if let Some(event) = self.decoder.decode(&mut self.buffer) {
                return Ok(Some(event));
            }

            let read = self.reader.read_buf(&mut self.buffer).await?;
            if read == 0 {
                if !self.buffer.is_empty() {
                    debug!("Stream ended with {} bytes of partial record", self.buffer.len());
                }
                return Ok(None);
            }
        }
    }
}

/// Forward every event from `reader` into the core channel
///
/// # Errors
///
/// Returns `Io` if reading from the stream fails
pub async fn forward_events<R: AsyncRead + Unpin>(
    reader: &mut EventReader<R>,
    tx: &mpsc::Sender<BridgeMessage>,
) -> Result<ForwardEnd> {
    while let Some(event) = reader.next_event().await? {
        if tx.send(BridgeMessage::Event(event)).await.is_err() {
            return Ok(ForwardEnd::ReceiverClosed);
        }
    }

    Ok(ForwardEnd::EndOfStream)
}

/// Bridge task: connect, forward events, reconnect on loss
///
/// Runs until the core drops its receiver.
pub async fn run_bridge(config: SerialConfig, tx: mpsc::Sender<BridgeMessage>) {
    let reconnect_interval = Duration::from_millis(config.reconnect_interval_ms);
    let mut connected_before = false;

    loop {
        match BridgeSerial::open(&config) {
            Ok(bridge) => {
                if connected_before && tx.send(BridgeMessage::Reconnected).await.is_err() {
                    return;
                }
                connected_before = true;

                let mut reader = bridge.into_reader();
                match forward_events(&mut reader, &tx).await {
                    Ok(ForwardEnd::ReceiverClosed) => return,
                    Ok(ForwardEnd::EndOfStream) => warn!("SENT capture bridge closed the stream"),
                    Err(e) => warn!("SENT capture bridge read failed: {}", e),
                }
            }
            Err(e) => warn!("{}", e),
        }

        if tx.is_closed() {
            return;
        }
        tokio::time::sleep(reconnect_interval).await;
    }
}
