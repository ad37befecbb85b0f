//! Mock Hardware Implementations
//!
//! Simulated devices for testing and dry runs without physical hardware.
//!
//! # Available Mocks
//!
//! - `SyntheticCamera` - moving gradient frames at a fixed rate, with optional stalls
//! - `ScriptedTransport` - replays fixed byte chunks, then idles or fails
//! - `SimulatedBoard` - answers start/stop commands and streams sample packets
//!
//! All of them block with `std::thread::sleep`, since they are driven by
//! dedicated acquisition threads.

use super::capabilities::{ByteTransport, FrameSource};
use crate::serial::channel::Channel;
use crate::serial::command::{CommandCode, DeviceCommand};
use crate::serial::decoder::VOLTS_PER_COUNT;
use crate::video::frame::{CapturedFrame, Resolution};
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

// =============================================================================
// SyntheticCamera
// =============================================================================

/// Camera producing a horizontally scrolling BGR gradient.
pub struct SyntheticCamera {
    resolution: Resolution,
    interval: Duration,
    next_due: Option<Instant>,
    frame_count: u64,
    stall: Option<(u64, Duration)>,
    fail_every: Option<u64>,
    scratch: Vec<u8>,
}

impl SyntheticCamera {
    /// Camera at `width × height` delivering `fps` frames per second.
    pub fn new(width: u32, height: u32, fps: u32) -> Self {
        let resolution = Resolution::new(width, height);
        Self {
            resolution,
            interval: Duration::from_secs_f64(1.0 / f64::from(fps.max(1))),
            next_due: None,
            frame_count: 0,
            stall: None,
            fail_every: None,
            scratch: vec![0; resolution.bgr24_len()],
        }
    }

    /// Freeze for `duration` once `after_frames` frames were delivered.
    pub fn with_stall(mut self, after_frames: u64, duration: Duration) -> Self {
        self.stall = Some((after_frames, duration));
        self
    }

    /// Report a failed read on every `n`-th call.
    pub fn with_failure_every(mut self, n: u64) -> Self {
        self.fail_every = Some(n.max(1));
        self
    }

    /// Frames delivered so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    fn render(&mut self) {
        let width = self.resolution.width.max(1) as u64;
        let shift = self.frame_count;
        for (i, px) in self.scratch.chunks_exact_mut(3).enumerate() {
            let x = (i as u64 % width + shift) % 256;
            px[0] = x as u8;
            px[1] = (255 - x) as u8;
            px[2] = (shift % 256) as u8;
        }
    }
}

impl FrameSource for SyntheticCamera {
    fn resolution(&self) -> Resolution {
        self.resolution
    }

    fn next_frame(&mut self) -> Option<CapturedFrame> {
        let due = *self.next_due.get_or_insert_with(Instant::now);
        let now = Instant::now();
        if due > now {
            thread::sleep(due - now);
        }
        self.next_due = Some(due + self.interval);

        if let Some((after, duration)) = self.stall {
            if self.frame_count == after {
                self.stall = None;
                thread::sleep(duration);
                self.next_due = Some(Instant::now() + self.interval);
            }
        }

        let call = self.frame_count + 1;
        if let Some(n) = self.fail_every {
            if call % n == 0 {
                self.frame_count += 1;
                return None;
            }
        }

        self.render();
        self.frame_count += 1;
        Some(CapturedFrame::copy_from(&self.scratch, self.resolution))
    }
}

// =============================================================================
// ScriptedTransport
// =============================================================================

/// What a [`ScriptedTransport`] does after its last chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptEnd {
    /// Keep returning empty reads
    Idle,
    /// Fail every further read, as an unplugged adapter would
    Fail,
}

/// Transport replaying a fixed list of byte chunks, one per read.
pub struct ScriptedTransport {
    chunks: VecDeque<Bytes>,
    end: ScriptEnd,
    written: Arc<Mutex<Vec<u8>>>,
}

impl ScriptedTransport {
    /// Replay `chunks` in order, then behave as `end` says.
    pub fn new<I, B>(chunks: I, end: ScriptEnd) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        Self {
            chunks: chunks.into_iter().map(Into::into).collect(),
            end,
            written: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Everything written to the transport so far.
    pub fn written(&self) -> Arc<Mutex<Vec<u8>>> {
        Arc::clone(&self.written)
    }
}

impl ByteTransport for ScriptedTransport {
    fn read_available(&mut self) -> io::Result<Bytes> {
        match self.chunks.pop_front() {
            Some(chunk) => Ok(chunk),
            None => match self.end {
                ScriptEnd::Idle => Ok(Bytes::new()),
                ScriptEnd::Fail => Err(io::Error::new(
                    io::ErrorKind::BrokenPipe,
                    "scripted transport unplugged",
                )),
            },
        }
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.written.lock().extend_from_slice(data);
        Ok(())
    }

    fn describe(&self) -> String {
        format!("ScriptedTransport({} chunks left)", self.chunks.len())
    }
}

// =============================================================================
// SimulatedBoard
// =============================================================================

/// Acquisition board simulator.
///
/// Channels stream only between a start (`J`) and stop (`K`) command. Each
/// read returns one packet per streaming channel holding every sample due
/// since the previous read, shaped as a slow sine around 1.65 V.
pub struct SimulatedBoard {
    streaming: [bool; 2],
    sample_rate_hz: f64,
    last_read: Instant,
    sample_index: u64,
    pending_command: Vec<u8>,
}

impl SimulatedBoard {
    /// Board producing `sample_rate_hz` samples per second per channel.
    pub fn new(sample_rate_hz: f64) -> Self {
        Self {
            streaming: [false; 2],
            sample_rate_hz,
            last_read: Instant::now(),
            sample_index: 0,
            pending_command: Vec::new(),
        }
    }

    fn sample(&self, channel: Channel, index: u64) -> u16 {
        let t = index as f64 / self.sample_rate_hz;
        let phase = if channel == Channel::One { 0.0 } else { 1.5 };
        let volts = 1.65 + 1.0 * (2.0 * std::f64::consts::PI * 0.5 * t + phase).sin();
        let raw = 32767.0 + volts / VOLTS_PER_COUNT;
        raw.clamp(0.0, 65535.0) as u16
    }
}

impl ByteTransport for SimulatedBoard {
    fn read_available(&mut self) -> io::Result<Bytes> {
        let now = Instant::now();
        let due = (now.duration_since(self.last_read).as_secs_f64() * self.sample_rate_hz) as u64;
        if due == 0 {
            return Ok(Bytes::new());
        }
        self.last_read = now;

        let mut out = Vec::new();
        for channel in Channel::ALL {
            if !self.streaming[channel.index()] {
                continue;
            }
            out.push(channel.marker());
            for i in 0..due {
                let raw = self.sample(channel, self.sample_index + i);
                let [hi, lo] = raw.to_be_bytes();
                out.extend_from_slice(format!("{:02X}-{:02X}-", hi, lo).as_bytes());
            }
        }
        self.sample_index += due;
        Ok(Bytes::from(out))
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.pending_command.extend_from_slice(data);
        while let Some(end) = self.pending_command.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending_command.drain(..=end).collect();
            let Ok(text) = std::str::from_utf8(&line) else {
                continue;
            };
            if let Some(command) = DeviceCommand::parse(text) {
                match command.code {
                    CommandCode::StartStream => self.streaming[command.channel.index()] = true,
                    CommandCode::StopStream => self.streaming[command.channel.index()] = false,
                    _ => {}
                }
            }
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("SimulatedBoard({} Hz)", self.sample_rate_hz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_camera_paces_and_fails_on_schedule() {
        let mut camera = SyntheticCamera::new(4, 2, 200).with_failure_every(3);
        let results: Vec<bool> = (0..6).map(|_| camera.next_frame().is_some()).collect();
        assert_eq!(results, vec![true, true, false, true, true, false]);

        let frame = camera.next_frame().unwrap();
        assert_eq!(frame.data().len(), 4 * 2 * 3);
        assert_eq!(frame.resolution(), Resolution::new(4, 2));
    }

    #[test]
    fn scripted_transport_replays_then_fails() {
        let mut transport = ScriptedTransport::new(vec![&b"H0A-"[..], &b"1B-I"[..]], ScriptEnd::Fail);
        assert_eq!(transport.read_available().unwrap().as_ref(), b"H0A-");
        assert_eq!(transport.read_available().unwrap().as_ref(), b"1B-I");
        assert!(transport.read_available().is_err());

        transport.write_all(b"0100000000CCJ\r\n").unwrap();
        assert_eq!(transport.written().lock().as_slice(), b"0100000000CCJ\r\n");
    }

    #[test]
    fn simulated_board_streams_only_started_channels() {
        let mut board = SimulatedBoard::new(1000.0);
        thread::sleep(Duration::from_millis(5));
        assert!(board.read_available().unwrap().is_empty());

        board
            .write_all(DeviceCommand::new(Channel::Two, CommandCode::StartStream).to_wire().as_bytes())
            .unwrap();
        thread::sleep(Duration::from_millis(5));
        let bytes = board.read_available().unwrap();
        assert_eq!(bytes[0], b'I');
        assert!(!bytes.contains(&b'H'));
    }
}
