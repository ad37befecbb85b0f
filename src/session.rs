//! Session state for the rig's recording and receiving sessions.
//!
//! Each session walks `Idle → Armed → Active → Idle`:
//!
//! - **`Armed`**: output resources (files, writer threads, encoder processes)
//!   were allocated. A failure while allocating drops back to `Idle` and
//!   releases whatever had already been created.
//! - **`Active`**: data is flowing to the outputs.
//! - **`Idle`**: reached again only through an explicit stop. Stopping an idle
//!   session is a no-op.
//!
//! Status updates for the operator go out as [`StatusEvent`] messages.

use crate::serial::channel::Channel;
use std::fmt;
use std::path::PathBuf;

/// Lifecycle state of one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing allocated
    #[default]
    Idle,
    /// Outputs allocated, data not yet flowing
    Armed,
    /// Data flowing to the outputs
    Active,
}

impl SessionState {
    /// Whether a start request is allowed.
    pub fn can_start(self) -> bool {
        self == SessionState::Idle
    }

    /// Whether the session holds resources that a stop must release.
    pub fn is_running(self) -> bool {
        self != SessionState::Idle
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Armed => "armed",
            SessionState::Active => "active",
        };
        f.write_str(name)
    }
}

/// Operator-facing status notifications.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusEvent {
    /// Recording started, one file per camera
    RecordingStarted {
        /// Output files
        paths: Vec<PathBuf>,
    },
    /// A camera could not start recording; the others kept going
    CameraFailed {
        /// Camera slot (1-based)
        camera: usize,
        /// Why its encoder did not open
        reason: String,
    },
    /// Recording stopped
    RecordingStopped {
        /// Frames written across all cameras
        frames_written: u64,
        /// Frames dropped on full buffers across all cameras
        dropped: u64,
    },
    /// Serial link opened
    SerialConnected {
        /// Transport description
        port: String,
    },
    /// Serial link closed by request
    SerialDisconnected,
    /// Serial link failed while reading
    LinkLost {
        /// Transport error
        reason: String,
    },
    /// Receive session started
    ReceiveStarted {
        /// Channels being logged
        channels: Vec<Channel>,
        /// Log files
        paths: Vec<PathBuf>,
    },
    /// Receive session stopped, log files closed
    ReceiveStopped {
        /// Samples written to the logs
        samples: u64,
    },
    /// Operator marker placed
    MarkerAdded {
        /// Seconds since receive start
        time: f64,
    },
    /// Command written to the board
    CommandSent {
        /// Wire form without terminator
        command: String,
    },
}

impl fmt::Display for StatusEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusEvent::RecordingStarted { paths } => {
                write!(f, "Recording started: ")?;
                write_paths(f, paths)
            }
            StatusEvent::CameraFailed { camera, reason } => {
                write!(f, "Camera {camera} not recording: {reason}")
            }
            StatusEvent::RecordingStopped {
                frames_written,
                dropped,
            } => write!(
                f,
                "Recording stopped ({frames_written} frames written, {dropped} dropped)"
            ),
            StatusEvent::SerialConnected { port } => write!(f, "Connected to {port}"),
            StatusEvent::SerialDisconnected => write!(f, "Serial disconnected"),
            StatusEvent::LinkLost { reason } => write!(f, "Serial link lost: {reason}"),
            StatusEvent::ReceiveStarted { channels, paths } => {
                let names: Vec<String> = channels.iter().map(ToString::to_string).collect();
                write!(f, "Receiving {}: ", names.join(", "))?;
                write_paths(f, paths)
            }
            StatusEvent::ReceiveStopped { samples } => {
                write!(f, "Receiving stopped ({samples} samples saved)")
            }
            StatusEvent::MarkerAdded { time } => write!(f, "Marker at {time:.2} s"),
            StatusEvent::CommandSent { command } => write!(f, "Sent {command}"),
        }
    }
}

fn write_paths(f: &mut fmt::Formatter<'_>, paths: &[PathBuf]) -> fmt::Result {
    for (i, path) in paths.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", path.display())?;
    }
    Ok(())
}
