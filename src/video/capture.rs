//! Per-camera capture thread.
//!
//! A [`CaptureLoop`] keeps pulling frames from its [`FrameSource`] for as long
//! as the camera is open. Each frame replaces the preview slot and, while a
//! recording is attached, is also submitted to that recording's
//! [`FrameBuffer`]. Attaching or detaching a recording never interrupts
//! capture.

use super::frame::{CapturedFrame, Resolution};
use super::frame_buffer::FrameBuffer;
use crate::error::{AppResult, DaqError};
use crate::hardware::FrameSource;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, trace};

const FAILED_READ_BACKOFF: Duration = Duration::from_millis(10);

#[derive(Default)]
struct Shared {
    recording: Mutex<Option<Arc<FrameBuffer>>>,
    preview: Mutex<Option<CapturedFrame>>,
    stop: AtomicBool,
    frames: AtomicU64,
    failed_reads: AtomicU64,
}

/// Running capture thread of one camera slot.
pub struct CaptureLoop {
    camera: usize,
    resolution: Resolution,
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl CaptureLoop {
    /// Start capturing from `source` for camera slot `camera`.
    pub fn spawn(camera: usize, mut source: Box<dyn FrameSource>) -> AppResult<Self> {
        let resolution = source.resolution();
        let shared = Arc::new(Shared::default());

        let thread_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name(format!("cam{}-capture", camera))
            .spawn(move || capture(camera, source.as_mut(), &thread_shared))?;

        info!(camera, %resolution, "Camera capture started");
        Ok(Self {
            camera,
            resolution,
            shared,
            handle: Some(handle),
        })
    }

    /// Route frames into `buffer` from now on.
    pub fn attach(&self, buffer: Arc<FrameBuffer>) {
        *self.shared.recording.lock() = Some(buffer);
    }

    /// Stop routing frames into the recording buffer.
    pub fn detach(&self) -> Option<Arc<FrameBuffer>> {
        self.shared.recording.lock().take()
    }

    /// Whether a recording buffer is attached.
    pub fn is_recording(&self) -> bool {
        self.shared.recording.lock().is_some()
    }

    /// Take the most recent frame, if one arrived since the last call.
    pub fn latest_frame(&self) -> Option<CapturedFrame> {
        self.shared.preview.lock().take()
    }

    /// Camera slot.
    pub fn camera(&self) -> usize {
        self.camera
    }

    /// Capture resolution.
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Frames captured so far.
    pub fn frames_captured(&self) -> u64 {
        self.shared.frames.load(Ordering::Relaxed)
    }

    /// Reads that returned no frame.
    pub fn failed_reads(&self) -> u64 {
        self.shared.failed_reads.load(Ordering::Relaxed)
    }

    /// Stop and join the capture thread. Idempotent.
    pub fn stop(&mut self) -> AppResult<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        self.shared.stop.store(true, Ordering::Release);
        self.detach();
        handle
            .join()
            .map_err(|_| DaqError::ThreadPanicked(format!("cam{}-capture", self.camera)))?;
        info!(
            camera = self.camera,
            frames = self.frames_captured(),
            failed_reads = self.failed_reads(),
            "Camera capture stopped"
        );
        Ok(())
    }
}

impl Drop for CaptureLoop {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

fn capture(camera: usize, source: &mut dyn FrameSource, shared: &Shared) {
    while !shared.stop.load(Ordering::Acquire) {
        let Some(frame) = source.next_frame() else {
            let failed = shared.failed_reads.fetch_add(1, Ordering::Relaxed) + 1;
            trace!(camera, failed, "Camera read returned no frame");
            thread::sleep(FAILED_READ_BACKOFF);
            continue;
        };
        shared.frames.fetch_add(1, Ordering::Relaxed);

        if let Some(buffer) = shared.recording.lock().as_ref() {
            buffer.submit(frame.clone());
        }
        *shared.preview.lock() = Some(frame);
    }
    debug!(camera, "Capture thread exiting");
}
