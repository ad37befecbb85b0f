//! Receive pipeline: raw bytes in, timestamped samples out to the sinks.
//!
//! Runs on the serial reader thread. One call to [`ReceivePipeline::ingest`]
//! handles one delivery from the transport:
//!
//! 1. append the bytes to the framer and pull every complete packet,
//! 2. decode each packet, concatenating the samples into one batch,
//! 3. timestamp the batch, attach a pending marker to its first sample,
//! 4. hand samples of selected channels to every sink in arrival order.

use super::channel::{Channel, ChannelSet};
use super::decoder::{decode_payload, Sample};
use super::framer::PacketFramer;
use super::interpolator::TimeInterpolator;
use super::marker::MarkerGate;
use crate::error::AppResult;
use std::time::Instant;
use tracing::{debug, trace, warn};

/// A sample on its way to the sinks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleRecord {
    /// Source channel
    pub channel: Channel,
    /// Seconds since the receive session started
    pub time: f64,
    /// Voltage
    pub voltage: f64,
    /// Whether the operator marked this sample
    pub marker: bool,
}

/// Consumer of timestamped samples.
///
/// Implementations must not block: they run on the serial reader thread.
pub trait SampleSink: Send {
    /// Take one sample.
    fn accept(&mut self, record: &SampleRecord) -> AppResult<()>;

    /// Called once after every non-empty batch.
    fn end_batch(&mut self) -> AppResult<()> {
        Ok(())
    }

    /// Release resources at the end of the session.
    fn close(&mut self) -> AppResult<()> {
        Ok(())
    }
}

/// Running counters of one receive session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Packets extracted by the framer
    pub packets: u64,
    /// Packets dropped for an odd field count
    pub malformed_packets: u64,
    /// Packets dropped because the payload was not ASCII
    pub undecodable_packets: u64,
    /// Hex pairs skipped inside otherwise valid packets
    pub bad_pairs: u64,
    /// Samples handed to the sinks
    pub samples_forwarded: u64,
    /// Sink calls that returned an error
    pub sink_errors: u64,
}

/// Framing, decoding, timing and fan-out for one receive session.
pub struct ReceivePipeline {
    framer: PacketFramer,
    interpolator: TimeInterpolator,
    marker: MarkerGate,
    channels: ChannelSet,
    sinks: Vec<Box<dyn SampleSink>>,
    batch: Vec<Sample>,
    stats: PipelineStats,
}

impl ReceivePipeline {
    /// Pipeline for a session started at `start`, forwarding `channels`.
    pub fn new(channels: ChannelSet, start: Instant, marker: MarkerGate) -> Self {
        Self {
            framer: PacketFramer::new(),
            interpolator: TimeInterpolator::new(start),
            marker,
            channels,
            sinks: Vec::new(),
            batch: Vec::new(),
            stats: PipelineStats::default(),
        }
    }

    /// Add a sink; sinks see samples in the order they were added.
    pub fn with_sink(mut self, sink: Box<dyn SampleSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Process one delivery of raw bytes received at `now`.
    ///
    /// Returns the number of samples forwarded to the sinks.
    pub fn ingest(&mut self, bytes: &[u8], now: Instant) -> usize {
        self.framer.extend(bytes);
        self.batch.clear();

        while let Some(packet) = self.framer.next_packet() {
            self.stats.packets += 1;
            match decode_payload(packet.channel, &packet.payload) {
                Ok(decoded) => {
                    self.stats.bad_pairs += decoded.bad_pairs as u64;
                    self.batch.extend(decoded.samples);
                }
                Err(err) => {
                    self.stats.malformed_packets += 1;
                    debug!(channel = %packet.channel, error = %err, "Discarding malformed packet");
                }
            }
        }
        self.stats.undecodable_packets = self.framer.undecodable();

        if self.batch.is_empty() {
            return 0;
        }

        let times = self.interpolator.assign(self.batch.len(), now);
        let marked = self.marker.take();
        let mut forwarded = 0;

        for (index, (sample, time)) in self.batch.iter().zip(times).enumerate() {
            if !self.channels.contains(sample.channel) {
                continue;
            }
            let record = SampleRecord {
                channel: sample.channel,
                time,
                voltage: sample.voltage,
                marker: marked && index == 0,
            };
            for sink in self.sinks.iter_mut() {
                if let Err(err) = sink.accept(&record) {
                    self.stats.sink_errors += 1;
                    warn!(channel = %record.channel, error = %err, "Sink rejected sample");
                }
            }
            forwarded += 1;
        }

        for sink in self.sinks.iter_mut() {
            if let Err(err) = sink.end_batch() {
                self.stats.sink_errors += 1;
                warn!(error = %err, "Sink failed to finish batch");
            }
        }

        self.stats.samples_forwarded += forwarded as u64;
        trace!(
            decoded = self.batch.len(),
            forwarded,
            buffered = self.framer.buffered(),
            "Processed serial batch"
        );
        forwarded
    }

    /// Seconds since the session started, as of `now`.
    pub fn relative_time(&self, now: Instant) -> f64 {
        self.interpolator.relative(now)
    }

    /// Channels forwarded to the sinks.
    pub fn channels(&self) -> ChannelSet {
        self.channels
    }

    /// Counters so far.
    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    /// Close every sink, returning the final counters.
    ///
    /// All sinks are closed even if one fails; the first failure is returned.
    pub fn finish(mut self) -> AppResult<PipelineStats> {
        let mut first_error = None;
        for sink in self.sinks.iter_mut() {
            if let Err(err) = sink.close() {
                warn!(error = %err, "Sink failed to close");
                first_error.get_or_insert(err);
            }
        }
        debug!(buffered = self.framer.buffered(), "Discarding partial packet bytes");
        match first_error {
            Some(err) => Err(err),
            None => Ok(self.stats),
        }
    }
}
