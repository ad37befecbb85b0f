//! Serial telemetry: board protocol, receive pipeline and reader thread.
//!
//! Data flows `SerialLink` reader → [`PacketFramer`] → [`decode_payload`] →
//! [`TimeInterpolator`] (+ [`MarkerGate`]) → [`SampleSink`]s.

pub mod channel;
pub mod command;
pub mod decoder;
pub mod framer;
pub mod interpolator;
pub mod link;
pub mod marker;
pub mod pipeline;

pub use channel::{Channel, ChannelMap, ChannelSet};
pub use command::{CommandCode, DeviceCommand, LedMode};
pub use decoder::{decode_payload, raw_to_volts, Sample};
pub use framer::{Packet, PacketFramer};
pub use interpolator::TimeInterpolator;
pub use link::SerialLink;
pub use marker::MarkerGate;
pub use pipeline::{PipelineStats, ReceivePipeline, SampleRecord, SampleSink};
