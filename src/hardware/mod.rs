//! Hardware access for the rig.
//!
//! - [`capabilities`]: the `FrameSource` / `ByteTransport` traits
//! - [`serial_port`]: `ByteTransport` over a real serial port (feature `instrument_serial`)
//! - [`mock`]: synthetic cameras and scripted serial devices for tests and dry runs

pub mod capabilities;
pub mod mock;
pub mod serial_port;

pub use capabilities::{ByteTransport, FrameSource};
pub use serial_port::SerialPortTransport;
