//! Configuration System using Figment
//!
//! Strongly-typed settings for the acquisition rig. Configuration is loaded from:
//! 1. a TOML file (base configuration, optional)
//! 2. Environment variables (prefixed with `RIG_DAQ_`, nested keys split on `__`)
//!
//! Every field carries a default, so `Settings::default()` and loading from a
//! missing file both produce a usable rig configuration.
//!
//! # Example
//! ```no_run
//! use rig_daq::config::Settings;
//!
//! let settings = Settings::load_from("config/rig.toml")?;
//! println!("Recording at {} fps", settings.video.target_fps);
//! # Ok::<(), rig_daq::error::DaqError>(())
//! ```

use crate::error::{AppResult, DaqError};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level rig configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Application settings
    #[serde(default)]
    pub application: ApplicationConfig,
    /// Camera recording settings
    #[serde(default)]
    pub video: VideoConfig,
    /// Serial link settings
    #[serde(default)]
    pub serial: SerialConfig,
    /// Signal logging and plotting settings
    #[serde(default)]
    pub signal: SignalConfig,
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Application name
    #[serde(default = "default_name")]
    pub name: String,
    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log output format (pretty, compact, json)
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

/// Per-camera recording configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoConfig {
    /// Output frame rate of every recorded file
    #[serde(default = "default_target_fps")]
    pub target_fps: u32,
    /// Seconds of frames the frame buffer can hold before dropping
    #[serde(default = "default_buffer_seconds")]
    pub buffer_seconds: u32,
    /// How long the writer waits for a frame before considering a stall
    #[serde(default = "default_dequeue_timeout_ms")]
    pub dequeue_timeout_ms: u64,
    /// Directory receiving `CAM<n>_<timestamp>` files
    #[serde(default = "default_video_dir")]
    pub output_dir: PathBuf,
    /// Encoder executable
    #[serde(default = "default_encoder")]
    pub encoder: String,
    /// Encoder codec name
    #[serde(default = "default_codec")]
    pub codec: String,
    /// Four-character code written into the container
    #[serde(default = "default_fourcc")]
    pub fourcc: String,
    /// Container file extension
    #[serde(default = "default_container")]
    pub container: String,
}

/// Serial link configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Port path (e.g. "/dev/ttyUSB0", "COM3")
    #[serde(default)]
    pub port: Option<String>,
    /// Baud rate
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Blocking read timeout of the transport
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    /// Sleep between polls when no bytes are waiting
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

/// Signal logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalConfig {
    /// Directory receiving `CH<n>_<timestamp>.csv` files
    #[serde(default = "default_signal_dir")]
    pub output_dir: PathBuf,
    /// Channels logged by default when receiving
    #[serde(default = "default_receive_channels")]
    pub receive_channels: Vec<u8>,
    /// Visible time span of the live plot in seconds
    #[serde(default = "default_plot_window")]
    pub plot_window_secs: f64,
}

// Default value functions
fn default_name() -> String {
    "Rig DAQ".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_target_fps() -> u32 {
    30
}

fn default_buffer_seconds() -> u32 {
    5
}

fn default_dequeue_timeout_ms() -> u64 {
    100
}

fn default_video_dir() -> PathBuf {
    PathBuf::from("data").join("video")
}

fn default_encoder() -> String {
    "ffmpeg".to_string()
}

fn default_codec() -> String {
    "mpeg4".to_string()
}

fn default_fourcc() -> String {
    "XVID".to_string()
}

fn default_container() -> String {
    "avi".to_string()
}

fn default_baud_rate() -> u32 {
    9600
}

fn default_read_timeout_ms() -> u64 {
    1000
}

fn default_poll_interval_ms() -> u64 {
    10
}

fn default_signal_dir() -> PathBuf {
    PathBuf::from("data").join("signal")
}

fn default_receive_channels() -> Vec<u8> {
    vec![1, 2]
}

fn default_plot_window() -> f64 {
    180.0
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            target_fps: default_target_fps(),
            buffer_seconds: default_buffer_seconds(),
            dequeue_timeout_ms: default_dequeue_timeout_ms(),
            output_dir: default_video_dir(),
            encoder: default_encoder(),
            codec: default_codec(),
            fourcc: default_fourcc(),
            container: default_container(),
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: default_baud_rate(),
            read_timeout_ms: default_read_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            output_dir: default_signal_dir(),
            receive_channels: default_receive_channels(),
            plot_window_secs: default_plot_window(),
        }
    }
}

impl VideoConfig {
    /// Frame buffer capacity: `target_fps × buffer_seconds`.
    pub fn buffer_capacity(&self) -> usize {
        (self.target_fps as usize) * (self.buffer_seconds as usize)
    }

    /// Nominal playback time between two output frames.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.target_fps.max(1)))
    }

    /// Writer dequeue timeout.
    pub fn dequeue_timeout(&self) -> Duration {
        Duration::from_millis(self.dequeue_timeout_ms)
    }
}

impl SerialConfig {
    /// Transport read timeout.
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Reader thread idle sleep.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Settings {
    /// Load configuration from `config/rig.toml` and environment variables
    ///
    /// Environment variables can override configuration with prefix RIG_DAQ_
    /// Example: RIG_DAQ_VIDEO__TARGET_FPS=60
    pub fn load() -> AppResult<Self> {
        Self::load_from("config/rig.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let settings: Settings = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("RIG_DAQ_").split("__"))
            .extract()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> AppResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| DaqError::Configuration(format!("Cannot render settings: {}", e)))
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> AppResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.to_lowercase().as_str()) {
            return Err(DaqError::Configuration(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            )));
        }

        let valid_formats = ["pretty", "compact", "json"];
        if !valid_formats.contains(&self.application.log_format.as_str()) {
            return Err(DaqError::Configuration(format!(
                "Invalid log_format '{}'. Must be one of: {}",
                self.application.log_format,
                valid_formats.join(", ")
            )));
        }

        if self.video.target_fps == 0 {
            return Err(DaqError::Configuration(
                "video.target_fps must be greater than 0".into(),
            ));
        }

        if self.video.buffer_seconds == 0 {
            return Err(DaqError::Configuration(
                "video.buffer_seconds must be greater than 0".into(),
            ));
        }

        if self.signal.receive_channels.is_empty() {
            return Err(DaqError::Configuration(
                "signal.receive_channels must name at least one channel".into(),
            ));
        }

        if let Some(bad) = self
            .signal
            .receive_channels
            .iter()
            .find(|ch| !(1..=2).contains(*ch))
        {
            return Err(DaqError::Configuration(format!(
                "Invalid receive channel {}. Must be 1 or 2",
                bad
            )));
        }

        let window = self.signal.plot_window_secs;
        if window.is_nan() || window <= 0.0 {
            return Err(DaqError::Configuration(format!(
                "signal.plot_window_secs must be positive, got {}",
                self.signal.plot_window_secs
            )));
        }

        Ok(())
    }
}
