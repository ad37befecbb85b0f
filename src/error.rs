//! Custom error types for the application.
//!
//! This module defines the primary error type, `DaqError`, for the acquisition rig.
//! Using the `thiserror` crate, it provides one place for every failure that can
//! leave a session boundary: configuration problems, file and encoder setup
//! failures, serial link faults and session-state conflicts.
//!
//! ## Error Hierarchy
//!
//! - **Setup failures** (`Io`, `Storage`, `Csv`, `VideoOutput`, `Configuration`):
//!   a session could not allocate its output resources. The session stays `Idle`.
//! - **Session conflicts** (`SessionActive`, `SerialPortNotConnected`, ...):
//!   the caller asked for a transition the current state does not allow.
//! - **Link failures** (`SerialRead`, `SerialOpen`): the serial transport
//!   failed. The reading session is force-disconnected.
//!
//! Malformed serial data never becomes a `DaqError`. It is discarded inside the
//! receive pipeline and only shows up in its counters and debug logs.

use thiserror::Error;

/// Convenience alias for results using the application error type.
pub type AppResult<T> = std::result::Result<T, DaqError>;

/// Primary error type for the acquisition rig.
#[derive(Error, Debug)]
pub enum DaqError {
    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("Configuration validation error: {0}")]
    Configuration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[cfg(feature = "storage_csv")]
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Video output error: {0}")]
    VideoOutput(String),

    #[error("Serial port not connected")]
    SerialPortNotConnected,

    #[error("Failed to open serial port '{port}': {message}")]
    SerialOpen { port: String, message: String },

    #[error("Serial read error: {0}")]
    SerialRead(String),

    #[error("Serial support not enabled. Rebuild with --features instrument_serial")]
    SerialFeatureDisabled,

    #[error("{0} session is already active")]
    SessionActive(&'static str),

    #[error("No camera is capturing")]
    NoActiveCamera,

    #[error("No receive channel selected")]
    NoChannelSelected,

    #[error("Invalid channel number {0}; expected 1 or 2")]
    InvalidChannel(u8),

    #[error("Invalid camera slot {0}; expected 1 or 2")]
    InvalidCamera(usize),

    #[error("Worker thread '{0}' panicked")]
    ThreadPanicked(String),

    #[error("Feature '{0}' is not enabled. Please build with --features {0}")]
    FeatureNotEnabled(String),

    #[error("Shutdown failed with errors")]
    ShutdownFailed(Vec<DaqError>),
}

impl From<figment::Error> for DaqError {
    fn from(value: figment::Error) -> Self {
        DaqError::Config(Box::new(value))
    }
}

impl DaqError {
    /// Whether the rig can keep running after this error.
    ///
    /// Recoverable errors leave the affected session `Idle` and the rest of the
    /// rig untouched. Non-recoverable ones mean the process configuration or
    /// build has to change.
    pub fn can_recover(&self) -> bool {
        match self {
            DaqError::Config(_)
            | DaqError::Configuration(_)
            | DaqError::SerialFeatureDisabled
            | DaqError::FeatureNotEnabled(_)
            | DaqError::ThreadPanicked(_) => false,
            DaqError::ShutdownFailed(errors) => errors.iter().all(DaqError::can_recover),
            _ => true,
        }
    }
}
