//! Packet framing for the board's ASCII stream.
//!
//! Packets have no end marker. A packet opens with `H` (channel 1) or `I`
//! (channel 2) and runs until the next marker of either kind, which in turn
//! opens the following packet. A packet is therefore only complete once the
//! next marker has arrived; until then its bytes stay in the accumulator.

use super::channel::Channel;
use bytes::{Buf, BytesMut};
use tracing::debug;

/// One complete packet: its channel and the ASCII text between the markers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Channel named by the opening marker
    pub channel: Channel,
    /// Payload text, markers excluded
    pub payload: String,
}

/// Stateful extractor of packets from the raw byte stream.
///
/// Owned by the serial reader thread; nothing else touches the accumulator.
#[derive(Debug, Default)]
pub struct PacketFramer {
    accumulator: BytesMut,
    packets: u64,
    undecodable: u64,
}

impl PacketFramer {
    /// Empty framer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append freshly received bytes.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.accumulator.extend_from_slice(bytes);
    }

    /// Pull the next complete packet, if any.
    ///
    /// Packets whose payload is not ASCII are consumed and skipped. The marker
    /// closing a packet is left in place to open the next one.
    pub fn next_packet(&mut self) -> Option<Packet> {
        loop {
            let start = self.accumulator.iter().position(|b| is_marker(*b))?;
            let end = start
                + 1
                + self.accumulator[start + 1..]
                    .iter()
                    .position(|b| is_marker(*b))?;

            let channel = Channel::from_marker(self.accumulator[start])?;
            let payload = &self.accumulator[start + 1..end];
            let decoded = payload
                .is_ascii()
                .then(|| String::from_utf8_lossy(payload).into_owned());
            self.accumulator.advance(end);

            match decoded {
                Some(payload) => {
                    self.packets += 1;
                    return Some(Packet { channel, payload });
                }
                None => {
                    self.undecodable += 1;
                    debug!(%channel, bytes = end - start - 1, "Discarding non-ASCII packet");
                }
            }
        }
    }

    /// Pull every complete packet currently buffered.
    pub fn drain_packets(&mut self) -> Vec<Packet> {
        std::iter::from_fn(|| self.next_packet()).collect()
    }

    /// Bytes waiting for the rest of their packet.
    pub fn buffered(&self) -> usize {
        self.accumulator.len()
    }

    /// Drop everything buffered.
    pub fn clear(&mut self) {
        self.accumulator.clear();
    }

    /// Packets extracted so far.
    pub fn packets(&self) -> u64 {
        self.packets
    }

    /// Packets skipped because their payload was not ASCII.
    pub fn undecodable(&self) -> u64 {
        self.undecodable
    }
}

fn is_marker(byte: u8) -> bool {
    Channel::from_marker(byte).is_some()
}
