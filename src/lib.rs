//! # Rig DAQ
//!
//! Acquisition core for a dual-camera rig with a serial-connected analog
//! board. Two pipelines run side by side:
//!
//! - **Video**: each open camera is captured on its own thread. While
//!   recording, frames go through a bounded [`video::FrameBuffer`] to a
//!   [`video::PacedVideoWriter`] that emits a constant-rate stream,
//!   repeating frames to cover capture gaps.
//! - **Telemetry**: a [`serial::SerialLink`] reader thread feeds raw bytes
//!   through framing, decoding and time interpolation into CSV logs and a
//!   live plot buffer, tagging operator markers on the way.
//!
//! [`rig::RigController`] owns both and enforces the session rules.
//!
//! ## Crate Structure
//!
//! - **`config`**: figment-based [`config::Settings`]
//! - **`error`**: the crate-wide [`error::DaqError`]
//! - **`logging`**: tracing subscriber setup
//! - **`hardware`**: camera and byte-transport capability traits, serial
//!   port transport and simulated devices
//! - **`video`**: capture loops, frame buffers, pacing and encoders
//! - **`serial`**: board protocol and the receive pipeline
//! - **`storage`**: output naming and CSV signal logs
//! - **`plot`**: plot events and the windowed plot buffer
//! - **`session`**: session states and status events
//! - **`rig`**: the controller

pub mod config;
pub mod error;
pub mod hardware;
pub mod logging;
pub mod plot;
pub mod rig;
pub mod serial;
pub mod session;
pub mod storage;
pub mod video;

pub use error::{AppResult, DaqError};
pub use rig::RigController;
