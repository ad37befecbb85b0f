//! One camera's recording: frame buffer, writer thread and output file.

use super::encoder::EncoderFactory;
use super::frame::{CapturedFrame, Resolution};
use super::frame_buffer::FrameBuffer;
use super::writer::{PacedVideoWriter, RecordingStats};
use crate::config::VideoConfig;
use crate::error::{AppResult, DaqError};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::info;

/// A running (or finished) recording of one camera.
///
/// Created by [`RecordingSession::start`], which only returns once the output
/// container is open and the writer thread is running. [`stop`](Self::stop)
/// blocks until every queued frame is written and the file is closed.
pub struct RecordingSession {
    camera: usize,
    path: PathBuf,
    resolution: Resolution,
    buffer: Arc<FrameBuffer>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<AppResult<RecordingStats>>>,
    final_stats: Option<RecordingStats>,
}

impl RecordingSession {
    /// Open the output for camera slot `camera` and start its writer thread.
    pub fn start(
        camera: usize,
        path: &Path,
        resolution: Resolution,
        config: &VideoConfig,
        encoders: &dyn EncoderFactory,
    ) -> AppResult<Self> {
        let encoder = encoders.open(path, resolution, config.target_fps)?;
        let buffer = Arc::new(FrameBuffer::new(camera, config.buffer_capacity()));
        let stop = Arc::new(AtomicBool::new(false));

        let writer = PacedVideoWriter::new(
            Arc::clone(&buffer),
            encoder,
            resolution,
            config.target_fps,
            config.dequeue_timeout(),
            Arc::clone(&stop),
        );
        let handle = thread::Builder::new()
            .name(format!("cam{}-writer", camera))
            .spawn(move || writer.run())?;

        info!(
            camera,
            path = %path.display(),
            %resolution,
            fps = config.target_fps,
            "Recording started"
        );
        Ok(Self {
            camera,
            path: path.to_path_buf(),
            resolution,
            buffer,
            stop,
            handle: Some(handle),
            final_stats: None,
        })
    }

    /// Hand a captured frame to the writer. Never blocks.
    pub fn submit(&self, frame: CapturedFrame) -> bool {
        self.buffer.submit(frame)
    }

    /// Producer handle for capture loops.
    pub fn frame_buffer(&self) -> Arc<FrameBuffer> {
        Arc::clone(&self.buffer)
    }

    /// Signal the writer, wait for it to drain and close the file.
    ///
    /// Stopping an already stopped session returns the stats of the first stop.
    pub fn stop(&mut self) -> AppResult<RecordingStats> {
        let Some(handle) = self.handle.take() else {
            return Ok(self.final_stats.unwrap_or_default());
        };
        self.stop.store(true, Ordering::Release);

        let stats = handle
            .join()
            .map_err(|_| DaqError::ThreadPanicked(format!("cam{}-writer", self.camera)))??;
        info!(
            camera = self.camera,
            path = %self.path.display(),
            frames = stats.frames_written,
            "Recording saved"
        );
        self.final_stats = Some(stats);
        Ok(stats)
    }

    /// Whether the writer thread is still owned by this session.
    pub fn is_active(&self) -> bool {
        self.handle.is_some()
    }

    /// Camera slot.
    pub fn camera(&self) -> usize {
        self.camera
    }

    /// Output file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Recording resolution.
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }
}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        if self.handle.is_some() {
            let _ = self.stop();
        }
    }
}
