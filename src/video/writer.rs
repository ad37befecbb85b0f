//! Paced video writer thread.
//!
//! Drains one camera's [`FrameBuffer`] and emits frames to a [`VideoEncoder`]
//! at a fixed rate, repeating the previously written frame wherever the capture
//! stream left a gap. See [`Pacer`] for the slot arithmetic.

use super::encoder::VideoEncoder;
use super::frame::{CapturedFrame, Resolution};
use super::frame_buffer::FrameBuffer;
use super::pacer::Pacer;
use crate::error::AppResult;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Counters reported when a writer finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordingStats {
    /// Frames handed to the encoder, duplicates included
    pub frames_written: u64,
    /// Of those, repeats of an earlier frame
    pub duplicates: u64,
    /// Frames dropped by the full frame buffer
    pub dropped: u64,
    /// Frames skipped because their size did not match the session
    pub rejected: u64,
}

/// Consumer side of one recording session.
pub struct PacedVideoWriter {
    buffer: Arc<FrameBuffer>,
    encoder: Box<dyn VideoEncoder>,
    resolution: Resolution,
    target_fps: u32,
    dequeue_timeout: Duration,
    stop: Arc<AtomicBool>,
    stats: RecordingStats,
}

impl PacedVideoWriter {
    /// Create a writer. It does nothing until [`run`](Self::run) is called.
    pub fn new(
        buffer: Arc<FrameBuffer>,
        encoder: Box<dyn VideoEncoder>,
        resolution: Resolution,
        target_fps: u32,
        dequeue_timeout: Duration,
        stop: Arc<AtomicBool>,
    ) -> Self {
        Self {
            buffer,
            encoder,
            resolution,
            target_fps,
            dequeue_timeout,
            stop,
            stats: RecordingStats::default(),
        }
    }

    /// Writer loop. Returns once the stop flag is set and the buffer is drained.
    ///
    /// The encoder is finalized on every exit path, including encoder errors.
    pub fn run(mut self) -> AppResult<RecordingStats> {
        let camera = self.buffer.camera();
        let outcome = self.pace();
        let finished = self.encoder.finish();
        self.stats.dropped = self.buffer.dropped();

        if let Err(e) = &outcome {
            error!(camera, error = %e, "Video writer aborted");
        }
        outcome?;
        finished?;

        info!(
            camera,
            frames = self.stats.frames_written,
            duplicates = self.stats.duplicates,
            dropped = self.stats.dropped,
            "Video writer finished"
        );
        Ok(self.stats)
    }

    fn pace(&mut self) -> AppResult<()> {
        let mut pacer = Pacer::new(Instant::now(), self.target_fps);
        let mut last_written: Option<CapturedFrame> = None;

        while !self.stop.load(Ordering::Acquire) {
            match self.buffer.pop_timeout(self.dequeue_timeout) {
                Some(frame) => {
                    if !self.accepts(&frame) {
                        continue;
                    }
                    let backfill = pacer.admit(frame.captured_at());
                    if backfill > 0 {
                        // Before the first frame there is nothing earlier to repeat.
                        let filler = last_written.as_ref().unwrap_or(&frame).clone();
                        for _ in 0..backfill {
                            self.emit(&filler, true)?;
                        }
                    }
                    self.emit(&frame, false)?;
                    last_written = Some(frame);
                }
                None => {
                    if self.stop.load(Ordering::Acquire) {
                        break;
                    }
                    if let Some(last) = last_written.clone() {
                        while pacer.idle(Instant::now()) {
                            self.emit(&last, true)?;
                        }
                    }
                }
            }
        }

        let mut drained = 0u64;
        while let Some(frame) = self.buffer.try_pop() {
            if self.accepts(&frame) {
                self.emit(&frame, false)?;
                drained += 1;
            }
        }
        debug!(camera = self.buffer.camera(), drained, "Drained frame buffer");
        Ok(())
    }

    fn accepts(&mut self, frame: &CapturedFrame) -> bool {
        let ok = frame.resolution() == self.resolution
            && frame.data().len() == self.resolution.bgr24_len();
        if !ok {
            self.stats.rejected += 1;
            warn!(
                camera = self.buffer.camera(),
                expected = %self.resolution,
                got = %frame.resolution(),
                bytes = frame.data().len(),
                "Skipping frame with unexpected size"
            );
        }
        ok
    }

    fn emit(&mut self, frame: &CapturedFrame, duplicate: bool) -> AppResult<()> {
        self.encoder.write_frame(frame)?;
        self.stats.frames_written += 1;
        if duplicate {
            self.stats.duplicates += 1;
        }
        Ok(())
    }
}
