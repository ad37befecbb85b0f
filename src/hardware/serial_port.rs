//! Serial port transport for the acquisition board.
//!
//! Wraps the `serialport` crate behind [`ByteTransport`]. Reads are
//! non-blocking polls: the waiting byte count is queried first and only that
//! many bytes are read, so a writer sharing the port never waits on a read
//! timeout.

use super::capabilities::ByteTransport;
use crate::error::{AppResult, DaqError};
use bytes::Bytes;
use std::io;
use std::time::Duration;
use tracing::debug;

#[cfg(feature = "instrument_serial")]
use serialport::SerialPort;

/// `ByteTransport` over an RS-232 / USB-serial port.
pub struct SerialPortTransport {
    /// Port name (e.g., "/dev/ttyUSB0", "COM3")
    port_name: String,

    /// Baud rate (e.g., 9600, 115200)
    baud_rate: u32,

    #[cfg(feature = "instrument_serial")]
    port: Box<dyn SerialPort>,
}

impl SerialPortTransport {
    /// Open `port_name` at `baud_rate` (8N1, no flow control).
    #[cfg(feature = "instrument_serial")]
    pub fn open(port_name: &str, baud_rate: u32, timeout: Duration) -> AppResult<Self> {
        let port = serialport::new(port_name, baud_rate)
            .timeout(timeout)
            .open()
            .map_err(|e| DaqError::SerialOpen {
                port: port_name.to_string(),
                message: e.to_string(),
            })?;

        debug!(port = port_name, baud_rate, "Serial port opened");
        Ok(Self {
            port_name: port_name.to_string(),
            baud_rate,
            port,
        })
    }

    #[cfg(not(feature = "instrument_serial"))]
    pub fn open(_port_name: &str, _baud_rate: u32, _timeout: Duration) -> AppResult<Self> {
        Err(DaqError::SerialFeatureDisabled)
    }

    /// Names of the serial ports visible to the system.
    #[cfg(feature = "instrument_serial")]
    pub fn available_ports() -> AppResult<Vec<String>> {
        let ports = serialport::available_ports().map_err(|e| DaqError::SerialOpen {
            port: "<enumerate>".to_string(),
            message: e.to_string(),
        })?;
        Ok(ports.into_iter().map(|p| p.port_name).collect())
    }

    #[cfg(not(feature = "instrument_serial"))]
    pub fn available_ports() -> AppResult<Vec<String>> {
        Err(DaqError::SerialFeatureDisabled)
    }
}

#[cfg(feature = "instrument_serial")]
impl ByteTransport for SerialPortTransport {
    fn read_available(&mut self) -> io::Result<Bytes> {
        let waiting = self.port.bytes_to_read().map_err(io::Error::from)? as usize;
        if waiting == 0 {
            return Ok(Bytes::new());
        }

        let mut buf = vec![0u8; waiting];
        match io::Read::read(&mut self.port, &mut buf) {
            Ok(n) => {
                buf.truncate(n);
                Ok(Bytes::from(buf))
            }
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(Bytes::new()),
            Err(e) => Err(e),
        }
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        io::Write::write_all(&mut self.port, data)?;
        io::Write::flush(&mut self.port)
    }

    fn describe(&self) -> String {
        format!("SerialPort({} @ {} baud)", self.port_name, self.baud_rate)
    }
}

#[cfg(not(feature = "instrument_serial"))]
impl ByteTransport for SerialPortTransport {
    fn read_available(&mut self) -> io::Result<Bytes> {
        Err(io::Error::new(io::ErrorKind::Unsupported, "serial support not enabled"))
    }

    fn write_all(&mut self, _data: &[u8]) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::Unsupported, "serial support not enabled"))
    }

    fn describe(&self) -> String {
        format!("SerialPort({} @ {} baud, disabled)", self.port_name, self.baud_rate)
    }
}
