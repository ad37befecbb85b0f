//! Container encoders.
//!
//! [`VideoEncoder`] is the seam between the paced writer and whatever turns raw
//! frames into a file. The production encoder pipes packed BGR24 frames into an
//! external `ffmpeg` process that muxes a fixed-frame-rate container.
//! [`MemoryEncoder`] keeps frames in memory and backs the test-suite and dry runs.

use super::frame::{CapturedFrame, Resolution};
use crate::config::VideoConfig;
use crate::error::{AppResult, DaqError};
use parking_lot::Mutex;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::Arc;
use tracing::{debug, info};

/// Sink for paced output frames of one recording.
pub trait VideoEncoder: Send {
    /// Append one frame to the output stream.
    fn write_frame(&mut self, frame: &CapturedFrame) -> AppResult<()>;

    /// Flush and close the container. Calling it twice is a no-op.
    fn finish(&mut self) -> AppResult<()>;
}

/// Opens one encoder per recording session.
pub trait EncoderFactory: Send + Sync {
    /// Open an encoder writing `path` at a fixed `fps`.
    fn open(
        &self,
        path: &Path,
        resolution: Resolution,
        fps: u32,
    ) -> AppResult<Box<dyn VideoEncoder>>;
}

// =============================================================================
// FfmpegEncoder
// =============================================================================

/// Encoder backed by an `ffmpeg` child process reading raw frames on stdin.
pub struct FfmpegEncoder {
    path: PathBuf,
    child: Option<Child>,
    stdin: Option<BufWriter<ChildStdin>>,
}

impl FfmpegEncoder {
    /// Spawn the encoder process.
    pub fn spawn(
        program: &str,
        codec: &str,
        fourcc: &str,
        path: &Path,
        resolution: Resolution,
        fps: u32,
    ) -> AppResult<Self> {
        let size = resolution.to_string();
        let rate = fps.to_string();
        let mut child = Command::new(program)
            .args(["-hide_banner", "-loglevel", "error", "-y"])
            .args(["-f", "rawvideo", "-pix_fmt", "bgr24"])
            .args(["-s", size.as_str(), "-r", rate.as_str(), "-i", "-"])
            .args(["-c:v", codec, "-vtag", fourcc, "-r", rate.as_str()])
            .arg(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                DaqError::VideoOutput(format!(
                    "cannot start encoder '{}' for {}: {}",
                    program,
                    path.display(),
                    e
                ))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| DaqError::VideoOutput("encoder stdin unavailable".into()))?;

        debug!(path = %path.display(), %resolution, fps, "Encoder process started");
        Ok(Self {
            path: path.to_path_buf(),
            child: Some(child),
            stdin: Some(BufWriter::new(stdin)),
        })
    }
}

impl VideoEncoder for FfmpegEncoder {
    fn write_frame(&mut self, frame: &CapturedFrame) -> AppResult<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| DaqError::VideoOutput("encoder already finished".into()))?;
        stdin.write_all(frame.data()).map_err(|e| {
            DaqError::VideoOutput(format!("write to {} failed: {}", self.path.display(), e))
        })
    }

    fn finish(&mut self) -> AppResult<()> {
        if let Some(mut stdin) = self.stdin.take() {
            // Closing stdin tells ffmpeg the stream ended.
            stdin.flush()?;
        }
        let Some(child) = self.child.take() else {
            return Ok(());
        };

        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(DaqError::VideoOutput(format!(
                "encoder exited with {} for {}: {}",
                output.status,
                self.path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        info!(path = %self.path.display(), "Video file finalized");
        Ok(())
    }
}

/// Factory for [`FfmpegEncoder`] using the `[video]` settings.
#[derive(Debug, Clone)]
pub struct FfmpegEncoderFactory {
    program: String,
    codec: String,
    fourcc: String,
}

impl FfmpegEncoderFactory {
    /// Build from configuration.
    pub fn from_config(config: &VideoConfig) -> Self {
        Self {
            program: config.encoder.clone(),
            codec: config.codec.clone(),
            fourcc: config.fourcc.clone(),
        }
    }
}

impl EncoderFactory for FfmpegEncoderFactory {
    fn open(
        &self,
        path: &Path,
        resolution: Resolution,
        fps: u32,
    ) -> AppResult<Box<dyn VideoEncoder>> {
        let encoder = FfmpegEncoder::spawn(
            &self.program,
            &self.codec,
            &self.fourcc,
            path,
            resolution,
            fps,
        )?;
        Ok(Box::new(encoder))
    }
}

// =============================================================================
// MemoryEncoder
// =============================================================================

/// Everything a [`MemoryEncoder`] received.
#[derive(Debug, Default)]
pub struct RecordedStream {
    /// Output path the encoder was opened for
    pub path: PathBuf,
    /// Declared frame rate
    pub fps: u32,
    /// Frames in output order
    pub frames: Vec<CapturedFrame>,
    /// Whether `finish` was called
    pub finished: bool,
}

/// Shared handle to the streams recorded by a [`MemoryEncoderFactory`].
pub type RecordedStreams = Arc<Mutex<Vec<Arc<Mutex<RecordedStream>>>>>;

/// In-memory encoder.
pub struct MemoryEncoder {
    stream: Arc<Mutex<RecordedStream>>,
}

impl VideoEncoder for MemoryEncoder {
    fn write_frame(&mut self, frame: &CapturedFrame) -> AppResult<()> {
        let mut stream = self.stream.lock();
        if stream.finished {
            return Err(DaqError::VideoOutput("encoder already finished".into()));
        }
        stream.frames.push(frame.clone());
        Ok(())
    }

    fn finish(&mut self) -> AppResult<()> {
        self.stream.lock().finished = true;
        Ok(())
    }
}

/// Factory producing [`MemoryEncoder`]s, optionally failing to open.
#[derive(Clone, Default)]
pub struct MemoryEncoderFactory {
    streams: RecordedStreams,
    fail_open: bool,
}

impl MemoryEncoderFactory {
    /// Factory whose encoders always open.
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory whose `open` always fails, to exercise setup-failure paths.
    pub fn failing() -> Self {
        Self {
            fail_open: true,
            ..Self::default()
        }
    }

    /// Streams opened so far, in open order.
    pub fn streams(&self) -> RecordedStreams {
        Arc::clone(&self.streams)
    }
}

impl EncoderFactory for MemoryEncoderFactory {
    fn open(
        &self,
        path: &Path,
        _resolution: Resolution,
        fps: u32,
    ) -> AppResult<Box<dyn VideoEncoder>> {
        if self.fail_open {
            return Err(DaqError::VideoOutput(format!(
                "cannot open {}",
                path.display()
            )));
        }
        let stream = Arc::new(Mutex::new(RecordedStream {
            path: path.to_path_buf(),
            fps,
            ..RecordedStream::default()
        }));
        self.streams.lock().push(Arc::clone(&stream));
        Ok(Box::new(MemoryEncoder { stream }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::time::Instant;

    #[test]
    fn memory_encoder_rejects_writes_after_finish() {
        let factory = MemoryEncoderFactory::new();
        let mut encoder = factory
            .open(Path::new("CAM1.avi"), Resolution::new(1, 1), 30)
            .unwrap();
        let frame =
            CapturedFrame::with_timestamp(Bytes::from_static(&[0, 0, 0]), Resolution::new(1, 1), Instant::now());

        encoder.write_frame(&frame).unwrap();
        encoder.finish().unwrap();
        encoder.finish().unwrap();
        assert!(encoder.write_frame(&frame).is_err());

        let streams = factory.streams();
        let streams = streams.lock();
        let stream = streams[0].lock();
        assert_eq!(stream.frames.len(), 1);
        assert_eq!(stream.fps, 30);
        assert!(stream.finished);
    }

    #[test]
    fn missing_encoder_program_is_a_setup_failure() {
        let result = FfmpegEncoder::spawn(
            "definitely-not-an-encoder-binary",
            "mpeg4",
            "XVID",
            Path::new("out.avi"),
            Resolution::new(4, 4),
            30,
        );
        match result {
            Err(DaqError::VideoOutput(msg)) => assert!(msg.contains("cannot start encoder")),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("spawning a missing program succeeded"),
        }
    }
}
