//! Bounded per-camera frame queue.
//!
//! The capture loop is the only producer and the paced writer the only
//! consumer. The producer never blocks: when the queue is full the incoming
//! frame is discarded and counted, so the frames already queued keep their
//! capture order.

use super::frame::CapturedFrame;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::warn;

/// Thread-safe bounded FIFO of captured frames with drop-newest overflow.
pub struct FrameBuffer {
    camera: usize,
    capacity: usize,
    tx: Sender<CapturedFrame>,
    rx: Receiver<CapturedFrame>,
    dropped: AtomicU64,
}

impl FrameBuffer {
    /// Create a buffer for camera slot `camera` holding at most `capacity` frames.
    ///
    /// A capacity of 0 is bumped to 1 so the writer can always make progress.
    pub fn new(camera: usize, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = bounded(capacity);
        Self {
            camera,
            capacity,
            tx,
            rx,
            dropped: AtomicU64::new(0),
        }
    }

    /// Enqueue a frame without blocking.
    ///
    /// Returns `false` when the buffer was full and the frame was dropped.
    pub fn submit(&self, frame: CapturedFrame) -> bool {
        match self.tx.try_send(frame) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(
                    camera = self.camera,
                    dropped,
                    capacity = self.capacity,
                    "Frame buffer is full, dropping frame"
                );
                false
            }
        }
    }

    /// Dequeue the oldest frame, waiting at most `timeout`.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<CapturedFrame> {
        match self.rx.recv_timeout(timeout) {
            Ok(frame) => Some(frame),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Dequeue the oldest frame if one is waiting.
    pub fn try_pop(&self) -> Option<CapturedFrame> {
        self.rx.try_recv().ok()
    }

    /// Frames currently queued.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Whether no frame is queued.
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Maximum number of queued frames.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Frames discarded because the buffer was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Camera slot this buffer belongs to.
    pub fn camera(&self) -> usize {
        self.camera
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::frame::Resolution;
    use bytes::Bytes;
    use std::time::Instant;

    fn frame(tag: u8, at: Instant) -> CapturedFrame {
        CapturedFrame::with_timestamp(Bytes::from(vec![tag]), Resolution::new(1, 1), at)
    }

    #[test]
    fn overflow_drops_newest_and_keeps_order() {
        let buffer = FrameBuffer::new(1, 3);
        let t0 = Instant::now();
        for tag in 0..6u8 {
            buffer.submit(frame(tag, t0 + Duration::from_millis(tag as u64)));
        }

        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.dropped(), 3);

        let tags: Vec<u8> = std::iter::from_fn(|| buffer.try_pop())
            .map(|f| f.data()[0])
            .collect();
        assert_eq!(tags, vec![0, 1, 2]);
    }

    #[test]
    fn submit_never_blocks_when_full() {
        let buffer = FrameBuffer::new(2, 1);
        let start = Instant::now();
        for tag in 0..1000u16 {
            buffer.submit(frame((tag % 256) as u8, start));
        }
        assert!(start.elapsed() < Duration::from_secs(1));
        assert_eq!(buffer.dropped(), 999);
    }

    #[test]
    fn pop_timeout_returns_none_when_empty() {
        let buffer = FrameBuffer::new(1, 4);
        let start = Instant::now();
        assert!(buffer.pop_timeout(Duration::from_millis(20)).is_none());
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[tracing_test::traced_test]
    #[test]
    fn drop_is_logged_with_running_count() {
        let buffer = FrameBuffer::new(2, 1);
        let t0 = Instant::now();
        assert!(buffer.submit(frame(0, t0)));
        assert!(!buffer.submit(frame(1, t0)));
        assert!(logs_contain("Frame buffer is full"));
        assert!(logs_contain("dropped=1"));
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let buffer = FrameBuffer::new(1, 0);
        assert_eq!(buffer.capacity(), 1);
        assert!(buffer.submit(frame(7, Instant::now())));
    }
}
