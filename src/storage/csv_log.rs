//! Per-channel CSV signal logs.
//!
//! One file per selected channel, opened when receiving starts and closed
//! when it stops:
//!
//! ```text
//! Time(s),CH1_Data(V),Marker
//! 0.2500,1.234567,1
//! 0.5000,1.240000,0
//! ```

use crate::error::{AppResult, DaqError};
use crate::serial::channel::{Channel, ChannelSet};
use crate::serial::pipeline::{SampleRecord, SampleSink};
use std::path::{Path, PathBuf};

#[cfg(feature = "storage_csv")]
use super::naming;
#[cfg(feature = "storage_csv")]
use crate::serial::channel::ChannelMap;
#[cfg(feature = "storage_csv")]
use std::fs::File;
#[cfg(feature = "storage_csv")]
use tracing::info;

/// Header row of a channel's log.
pub fn header(channel: Channel) -> [String; 3] {
    [
        "Time(s)".to_string(),
        format!("{channel}_Data(V)"),
        "Marker".to_string(),
    ]
}

/// Data row for one sample.
pub fn row(record: &SampleRecord) -> [String; 3] {
    [
        format!("{:.4}", record.time),
        format!("{:.6}", record.voltage),
        if record.marker { "1" } else { "0" }.to_string(),
    ]
}

#[cfg(feature = "storage_csv")]
struct ChannelLog {
    path: PathBuf,
    writer: csv::Writer<File>,
    rows: u64,
}

/// Open log files of one receive session.
pub struct SignalLog {
    #[cfg(feature = "storage_csv")]
    logs: ChannelMap<Option<ChannelLog>>,
    paths: Vec<PathBuf>,
}

impl SignalLog {
    /// Create `dir` and open one log per channel in `channels`, headers written.
    ///
    /// Fails without leaving any log open if a single file cannot be created.
    #[cfg(feature = "storage_csv")]
    pub fn create(dir: &Path, channels: ChannelSet, stamp: &str) -> AppResult<Self> {
        if channels.is_empty() {
            return Err(DaqError::NoChannelSelected);
        }
        naming::ensure_dir(dir)?;

        let mut logs = ChannelMap::<Option<ChannelLog>>::default();
        let mut paths = Vec::new();
        for channel in channels.iter() {
            let path = naming::signal_path(dir, channel, stamp);
            let file = File::create(&path).map_err(|e| {
                DaqError::Storage(format!("Failed to create '{}': {}", path.display(), e))
            })?;
            let mut writer = csv::WriterBuilder::new()
                .terminator(csv::Terminator::Any(b'\n'))
                .from_writer(file);
            writer.write_record(header(channel))?;
            writer.flush()?;

            info!(%channel, path = %path.display(), "Signal log opened");
            paths.push(path.clone());
            logs[channel] = Some(ChannelLog {
                path,
                writer,
                rows: 0,
            });
        }
        Ok(Self { logs, paths })
    }

    #[cfg(not(feature = "storage_csv"))]
    pub fn create(_dir: &Path, _channels: ChannelSet, _stamp: &str) -> AppResult<Self> {
        Err(DaqError::FeatureNotEnabled("storage_csv".to_string()))
    }

    /// Append one row to the record's channel log.
    ///
    /// Returns `false` when that channel has no open log.
    #[cfg(feature = "storage_csv")]
    pub fn write(&mut self, record: &SampleRecord) -> AppResult<bool> {
        let Some(log) = self.logs[record.channel].as_mut() else {
            return Ok(false);
        };
        log.writer.write_record(row(record))?;
        log.rows += 1;
        Ok(true)
    }

    #[cfg(not(feature = "storage_csv"))]
    pub fn write(&mut self, _record: &SampleRecord) -> AppResult<bool> {
        Ok(false)
    }

    /// Rows written to `channel`'s log, header excluded.
    #[cfg(feature = "storage_csv")]
    pub fn rows(&self, channel: Channel) -> u64 {
        self.logs[channel].as_ref().map_or(0, |log| log.rows)
    }

    #[cfg(not(feature = "storage_csv"))]
    pub fn rows(&self, _channel: Channel) -> u64 {
        0
    }

    /// Paths of every log opened by this session.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Flush and close every open log. Closing twice is a no-op.
    ///
    /// Every log is closed even if flushing one fails.
    #[cfg(feature = "storage_csv")]
    pub fn close(&mut self) -> AppResult<()> {
        let mut first_error = None;
        for (channel, slot) in self.logs.iter_mut() {
            let Some(mut log) = slot.take() else {
                continue;
            };
            match log.writer.flush() {
                Ok(()) => info!(
                    %channel,
                    rows = log.rows,
                    path = %log.path.display(),
                    "Signal log saved"
                ),
                Err(e) => {
                    first_error.get_or_insert(DaqError::Io(e));
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    #[cfg(not(feature = "storage_csv"))]
    pub fn close(&mut self) -> AppResult<()> {
        Ok(())
    }
}

impl SampleSink for SignalLog {
    fn accept(&mut self, record: &SampleRecord) -> AppResult<()> {
        self.write(record).map(|_| ())
    }

    fn close(&mut self) -> AppResult<()> {
        SignalLog::close(self)
    }
}
