//! On-disk outputs: file naming and CSV signal logs.

pub mod csv_log;
pub mod naming;

pub use csv_log::SignalLog;
