//! Global subscriber installation
//!
//! Runs in its own test binary: installing the global subscriber inside the
//! library's unit tests would shadow the capture subscriber of log assertions.

use rig_daq::config::Settings;
use rig_daq::logging::{self, LogConfig, LogFormat};

#[test]
fn init_twice_is_harmless() {
    let config = LogConfig {
        format: LogFormat::Compact,
        ..LogConfig::default()
    };
    assert!(logging::init(&config).is_ok());
    assert!(logging::init(&config).is_ok());
    assert!(logging::init_from_settings(&Settings::default()).is_ok());
    tracing::info!(camera = 1, "Logged through the installed subscriber");
}
