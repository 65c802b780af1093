//! # Telemetry Logger
//!
//! Appends timestamped [`ChannelSnapshot`]s to JSONL files under the
//! configured directory. A new file is started after `max_records_per_file`
//! records and only the newest `max_files_to_keep` files are retained.

use chrono::Utc;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::TelemetryConfig;
use crate::error::Result;
use crate::sent::channel::ChannelSnapshot;

/// Telemetry file name prefix
const FILE_PREFIX: &str = "sent_telemetry_";

/// Telemetry file extension
const FILE_EXTENSION: &str = ".jsonl";

/// One line of the telemetry log
#[derive(Debug, Clone, Serialize)]
pub struct TelemetryRecord {
    /// RFC 3339 UTC timestamp
    pub timestamp: String,

    #[serde(flatten)]
    pub snapshot: ChannelSnapshot,
}

impl TelemetryRecord {
    /// Stamp a snapshot with the current time
    pub fn now(snapshot: ChannelSnapshot) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            snapshot,
        }
    }
}

/// Rotating JSONL writer for channel snapshots
#[derive(Debug)]
pub struct TelemetryLogger {
    dir: PathBuf,
    max_records_per_file: usize,
    max_files_to_keep: usize,
    writer: Option<BufWriter<File>>,
    records_in_file: usize,
    file_sequence: u64,
}

impl TelemetryLogger {
    /// Create a logger writing into `config.log_dir`
    ///
    /// # Errors
    ///
    /// Returns `Io` if the directory cannot be created
    pub fn new(config: &TelemetryConfig) -> Result<Self> {
        let dir = PathBuf::from(&config.log_dir);
        fs::create_dir_all(&dir)?;
        info!("Telemetry logging to {}", dir.display());

        Ok(Self {
            dir,
            max_records_per_file: config.max_records_per_file.max(1),
            max_files_to_keep: config.max_files_to_keep.max(1),
            writer: None,
            records_in_file: 0,
            file_sequence: 0,
        })
    }

    /// Append one snapshot
    ///
    /// # Errors
    ///
    /// Returns `Io` or `Telemetry` if the record cannot be written
    pub fn log(&mut self, snapshot: &ChannelSnapshot) -> Result<()> {
        self.write_record(&TelemetryRecord::now(*snapshot))
    }

    /// Append one prepared record
    pub fn write_record(&mut self, record: &TelemetryRecord) -> Result<()> {
        if self.writer.is_none() || self.records_in_file >= self.max_records_per_file {
            self.rotate()?;
        }

        if let Some(writer) = self.writer.as_mut() {
            serde_json::to_writer(&mut *writer, record)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
        }
        self.records_in_file += 1;

        Ok(())
    }

    /// Directory the logger writes into
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn rotate(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }

        let name = format!(
            "{}{}_{:04}{}",
            FILE_PREFIX,
            Utc::now().format("%Y%m%d_%H%M%S"),
            self.file_sequence,
            FILE_EXTENSION
        );
        self.file_sequence += 1;

        let path = self.dir.join(&name);
        debug!("Opening telemetry file {}", path.display());
        self.writer = Some(BufWriter::new(File::create(&path)?));
        self.records_in_file = 0;

        self.prune()
    }

    /// Delete the oldest telemetry files beyond `max_files_to_keep`
    fn prune(&self) -> Result<()> {
        let mut files = telemetry_files(&self.dir)?;
        if files.len() <= self.max_files_to_keep {
            return Ok(());
        }

        let excess = files.len() - self.max_files_to_keep;
        for path in files.drain(..excess) {
            debug!("Removing old telemetry file {}", path.display());
            fs::remove_file(&path)?;
        }

        Ok(())
    }
}

/// Telemetry files in `dir`, oldest first
fn telemetry_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_telemetry = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.starts_with(FILE_PREFIX) && name.ends_with(FILE_EXTENSION))
            .unwrap_or(false);

        if is_telemetry {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}
