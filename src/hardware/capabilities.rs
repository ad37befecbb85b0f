//! Hardware Capabilities
//!
//! The acquisition pipeline talks to hardware through two narrow traits:
//!
//! - [`FrameSource`]: a camera that yields one captured frame per call
//! - [`ByteTransport`]: a byte link that yields whatever bytes have arrived
//!
//! Both are blocking and `Send`: each source is driven by its own dedicated
//! thread (capture loop or serial reader), never by an async runtime. Keeping
//! the traits this small is what lets tests swap in synthetic cameras and
//! scripted byte streams.

use crate::video::frame::{CapturedFrame, Resolution};
use bytes::Bytes;
use std::io;

/// A camera that can be polled for frames.
pub trait FrameSource: Send {
    /// Negotiated capture resolution.
    fn resolution(&self) -> Resolution;

    /// Grab the next frame.
    ///
    /// May block for up to one frame period. `None` means the read failed;
    /// callers count it and try again.
    fn next_frame(&mut self) -> Option<CapturedFrame>;
}

/// A raw byte link to the acquisition board.
pub trait ByteTransport: Send {
    /// Return the bytes received since the last call.
    ///
    /// Returns an empty buffer when nothing is waiting. An `Err` means the link
    /// is gone and the reading session must disconnect.
    fn read_available(&mut self) -> io::Result<Bytes>;

    /// Send raw bytes to the device.
    fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Human-readable description for logs.
    fn describe(&self) -> String;
}

impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    fn resolution(&self) -> Resolution {
        (**self).resolution()
    }

    fn next_frame(&mut self) -> Option<CapturedFrame> {
        (**self).next_frame()
    }
}

impl<T: ByteTransport + ?Sized> ByteTransport for Box<T> {
    fn read_available(&mut self) -> io::Result<Bytes> {
        (**self).read_available()
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        (**self).write_all(data)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
