//! Camera recording: capture threads, frame buffers and paced writers.
//!
//! ```text
//! FrameSource → CaptureLoop → FrameBuffer → PacedVideoWriter → VideoEncoder
//!                    └→ preview slot
//! ```

pub mod capture;
pub mod encoder;
pub mod frame;
pub mod frame_buffer;
pub mod pacer;
pub mod session;
pub mod writer;

pub use capture::CaptureLoop;
pub use encoder::{EncoderFactory, FfmpegEncoderFactory, MemoryEncoderFactory, VideoEncoder};
pub use frame::{CapturedFrame, Resolution};
pub use frame_buffer::FrameBuffer;
pub use pacer::Pacer;
pub use session::RecordingSession;
pub use writer::{PacedVideoWriter, RecordingStats};
