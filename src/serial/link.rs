//! Serial link: one transport plus its dedicated reader thread.
//!
//! The reader polls the transport, and whenever bytes arrive hands them to
//! the attached [`ReceivePipeline`]. Without an attached pipeline the bytes
//! are discarded. A transport error ends the thread, marks the link as
//! disconnected and reports [`StatusEvent::LinkLost`]; the owner is expected
//! to call [`SerialLink::disconnect`] and close any receive session.

use super::command::DeviceCommand;
use super::pipeline::ReceivePipeline;
use crate::error::{AppResult, DaqError};
use crate::hardware::ByteTransport;
use crate::session::StatusEvent;
use crossbeam_channel::Sender;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

type SharedTransport = Arc<Mutex<Box<dyn ByteTransport>>>;
type PipelineSlot = Arc<Mutex<Option<ReceivePipeline>>>;

/// A connected serial link.
pub struct SerialLink {
    description: String,
    transport: SharedTransport,
    pipeline: PipelineSlot,
    stop: Arc<AtomicBool>,
    connected: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl SerialLink {
    /// Take ownership of `transport` and start the reader thread.
    pub fn connect(
        transport: Box<dyn ByteTransport>,
        poll_interval: Duration,
        status: Option<Sender<StatusEvent>>,
    ) -> AppResult<Self> {
        let description = transport.describe();
        let transport: SharedTransport = Arc::new(Mutex::new(transport));
        let pipeline: PipelineSlot = Arc::new(Mutex::new(None));
        let stop = Arc::new(AtomicBool::new(false));
        let connected = Arc::new(AtomicBool::new(true));

        let reader = Reader {
            transport: Arc::clone(&transport),
            pipeline: Arc::clone(&pipeline),
            stop: Arc::clone(&stop),
            connected: Arc::clone(&connected),
            poll_interval,
            status,
        };
        let handle = thread::Builder::new()
            .name("serial-reader".into())
            .spawn(move || reader.run())?;

        info!(link = %description, "Serial link connected");
        Ok(Self {
            description,
            transport,
            pipeline,
            stop,
            connected,
            handle: Some(handle),
        })
    }

    /// Whether the reader thread is still running on a healthy transport.
    pub fn is_connected(&self) -> bool {
        self.handle.is_some() && self.connected.load(Ordering::Acquire)
    }

    /// Transport description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Write raw bytes to the device.
    pub fn write(&self, data: &[u8]) -> AppResult<()> {
        if !self.is_connected() {
            return Err(DaqError::SerialPortNotConnected);
        }
        self.transport.lock().write_all(data)?;
        Ok(())
    }

    /// Write one board command.
    pub fn send_command(&self, command: DeviceCommand) -> AppResult<()> {
        debug!(command = %command.to_wire().trim_end(), "Sending board command");
        self.write(command.to_wire().as_bytes())
    }

    /// Start feeding received bytes into `pipeline`.
    pub fn attach(&self, pipeline: ReceivePipeline) -> AppResult<()> {
        let mut slot = self.pipeline.lock();
        if slot.is_some() {
            return Err(DaqError::SessionActive("Receive"));
        }
        *slot = Some(pipeline);
        Ok(())
    }

    /// Stop feeding bytes and hand back the pipeline, if one was attached.
    ///
    /// Waits for a batch that is being processed to finish.
    pub fn detach(&self) -> Option<ReceivePipeline> {
        self.pipeline.lock().take()
    }

    /// Whether a pipeline is attached.
    pub fn is_receiving(&self) -> bool {
        self.pipeline.lock().is_some()
    }

    /// Stop and join the reader thread. Calling it again is a no-op.
    ///
    /// An attached pipeline is dropped without closing its sinks; detach it
    /// first to close them.
    pub fn disconnect(&mut self) -> AppResult<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        self.stop.store(true, Ordering::Release);
        let joined = handle.join();
        self.connected.store(false, Ordering::Release);
        self.pipeline.lock().take();

        joined.map_err(|_| DaqError::ThreadPanicked("serial-reader".into()))?;
        info!(link = %self.description, "Serial link disconnected");
        Ok(())
    }
}

impl Drop for SerialLink {
    fn drop(&mut self) {
        let _ = self.disconnect();
    }
}

struct Reader {
    transport: SharedTransport,
    pipeline: PipelineSlot,
    stop: Arc<AtomicBool>,
    connected: Arc<AtomicBool>,
    poll_interval: Duration,
    status: Option<Sender<StatusEvent>>,
}

impl Reader {
    fn run(self) {
        while !self.stop.load(Ordering::Acquire) {
            let read = self.transport.lock().read_available();
            match read {
                Ok(bytes) if !bytes.is_empty() => {
                    let now = Instant::now();
                    if let Some(pipeline) = self.pipeline.lock().as_mut() {
                        pipeline.ingest(&bytes, now);
                    }
                }
                Ok(_) => {}
                Err(err) => {
                    error!(error = %err, "Serial read failed, closing link");
                    self.connected.store(false, Ordering::Release);
                    if let Some(status) = &self.status {
                        let _ = status.try_send(StatusEvent::LinkLost {
                            reason: err.to_string(),
                        });
                    }
                    return;
                }
            }
            thread::sleep(self.poll_interval);
        }
    }
}
