//! Captured frame types shared by capture, buffering and encoding.

use bytes::Bytes;
use std::fmt;
use std::time::Instant;

/// Frame size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resolution {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Resolution {
    /// Create a resolution.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Byte length of one packed BGR24 frame at this resolution.
    pub fn bgr24_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// One image grabbed from a capture source.
///
/// The pixel data is an owned copy: capture backends reuse their internal
/// buffer between reads. Cloning is cheap (`Bytes` is reference counted), which
/// is what lets the writer re-emit the last frame without copying pixels.
#[derive(Clone)]
pub struct CapturedFrame {
    data: Bytes,
    resolution: Resolution,
    captured_at: Instant,
}

impl CapturedFrame {
    /// Copy `pixels` into a new frame stamped with the current monotonic time.
    pub fn copy_from(pixels: &[u8], resolution: Resolution) -> Self {
        Self::with_timestamp(Bytes::copy_from_slice(pixels), resolution, Instant::now())
    }

    /// Build a frame from already-owned bytes and an explicit capture time.
    pub fn with_timestamp(data: Bytes, resolution: Resolution, captured_at: Instant) -> Self {
        Self {
            data,
            resolution,
            captured_at,
        }
    }

    /// Packed BGR24 pixel data.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Frame size.
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Monotonic capture time.
    pub fn captured_at(&self) -> Instant {
        self.captured_at
    }
}

impl fmt::Debug for CapturedFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapturedFrame")
            .field("bytes", &self.data.len())
            .field("resolution", &self.resolution)
            .field("captured_at", &self.captured_at)
            .finish()
    }
}
