//! Sample decoding for packet payloads.
//!
//! A payload is a `-` separated list of two-digit hex fields. Every pair of
//! fields forms one 16-bit reading, high byte first:
//!
//! ```text
//! 0A-1B-2C-3D-   ->   0x0A1B, 0x2C3D
//! ```
//!
//! Readings are offset-binary around 32767 and scaled by [`VOLTS_PER_COUNT`].

use super::channel::Channel;
use thiserror::Error;

/// Field separator inside a payload.
pub const SEPARATOR: char = '-';

/// Raw reading that maps to 0 V.
pub const ZERO_OFFSET: u16 = 32767;

/// Volts represented by one count of the raw reading.
pub const VOLTS_PER_COUNT: f64 = 3.6 / 1024.0;

/// Convert a raw reading to volts.
pub fn raw_to_volts(raw: u16) -> f64 {
    (f64::from(raw) - f64::from(ZERO_OFFSET)) * VOLTS_PER_COUNT
}

/// One decoded reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Channel of the packet the reading came from
    pub channel: Channel,
    /// Reading as sent by the board
    pub raw: u16,
    /// Reading converted to volts
    pub voltage: f64,
}

impl Sample {
    /// Sample for `raw` on `channel`.
    pub fn new(channel: Channel, raw: u16) -> Self {
        Self {
            channel,
            raw,
            voltage: raw_to_volts(raw),
        }
    }
}

/// Payload-level decode failure. The whole packet is discarded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Fields cannot be paired up
    #[error("odd number of fields ({0})")]
    OddFieldCount(usize),
}

/// Readings decoded from one payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedPayload {
    /// Samples in payload order
    pub samples: Vec<Sample>,
    /// Field pairs that did not join to four hex digits and got skipped
    pub bad_pairs: usize,
}

/// Decode one packet payload.
///
/// Trailing separators are ignored. An empty payload decodes to no samples.
/// An odd field count rejects the packet; a single unparsable pair only
/// drops that pair.
pub fn decode_payload(channel: Channel, payload: &str) -> Result<DecodedPayload, DecodeError> {
    let body = payload.trim_end_matches(SEPARATOR);
    if body.is_empty() {
        return Ok(DecodedPayload::default());
    }

    let fields: Vec<&str> = body.split(SEPARATOR).collect();
    if fields.len() % 2 != 0 {
        return Err(DecodeError::OddFieldCount(fields.len()));
    }

    let mut decoded = DecodedPayload {
        samples: Vec::with_capacity(fields.len() / 2),
        bad_pairs: 0,
    };
    for pair in fields.chunks_exact(2) {
        match parse_pair(pair[0], pair[1]) {
            Some(raw) => decoded.samples.push(Sample::new(channel, raw)),
            None => decoded.bad_pairs += 1,
        }
    }
    Ok(decoded)
}

fn parse_pair(high: &str, low: &str) -> Option<u16> {
    let hex = format!("{}{}", high.trim(), low.trim());
    if hex.len() != 4 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u16::from_str_radix(&hex, 16).ok()
}
