//! Rig controller: the session object tying cameras, recordings, the serial
//! link and the receive session together.
//!
//! All state transitions go through [`RigController`]. It is owned by one
//! thread (the CLI or a UI); the acquisition threads it starts report back
//! only through [`StatusEvent`] and [`PlotEvent`] channels.
//!
//! ## Rules
//!
//! - Recording needs at least one open camera; every open camera is recorded.
//!   A camera whose encoder cannot open is reported and skipped, and the
//!   start fails only when no camera could start.
//! - Receiving needs a connected serial link and at least one channel.
//! - A failed start leaves the session `Idle` with nothing allocated, and a
//!   failed receive start removes the log files it had created.
//! - Event channels are bounded. When nobody drains them, new events are
//!   dropped instead of piling up.
//! - Every stop is idempotent and returns only once files are closed.
//! - Disconnecting the link stops a running receive session first.

use crate::config::Settings;
use crate::error::{AppResult, DaqError};
use crate::hardware::{ByteTransport, FrameSource, SerialPortTransport};
use crate::plot::{PlotEvent, PlotFeed};
use crate::serial::channel::{Channel, ChannelSet};
use crate::serial::command::{CommandCode, DeviceCommand, LedMode};
use crate::serial::link::SerialLink;
use crate::serial::marker::MarkerGate;
use crate::serial::pipeline::{PipelineStats, ReceivePipeline};
use crate::session::{SessionState, StatusEvent};
use crate::storage::{naming, SignalLog};
use crate::video::capture::CaptureLoop;
use crate::video::encoder::{EncoderFactory, FfmpegEncoderFactory};
use crate::video::session::RecordingSession;
use crate::video::writer::RecordingStats;
use crossbeam_channel::{bounded, Receiver, Sender};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};

/// Number of camera slots.
pub const CAMERA_SLOTS: usize = 2;

/// Status events held for a slow or absent reader.
pub const STATUS_EVENT_CAPACITY: usize = 256;

/// Plot events held for a slow or absent display.
pub const PLOT_EVENT_CAPACITY: usize = 16_384;

struct ReceiveSession {
    channels: ChannelSet,
    started_at: Instant,
    paths: Vec<PathBuf>,
}

/// Explicit state of the whole rig.
pub struct RigController {
    settings: Settings,
    encoders: Box<dyn EncoderFactory>,
    cameras: [Option<CaptureLoop>; CAMERA_SLOTS],
    recordings: Vec<RecordingSession>,
    recording_state: SessionState,
    link: Option<SerialLink>,
    receive: Option<ReceiveSession>,
    receive_state: SessionState,
    marker: MarkerGate,
    status_tx: Sender<StatusEvent>,
    status_rx: Receiver<StatusEvent>,
    plot_tx: Sender<PlotEvent>,
    plot_rx: Receiver<PlotEvent>,
}

impl RigController {
    /// Controller writing video through `encoders`.
    pub fn new(settings: Settings, encoders: Box<dyn EncoderFactory>) -> Self {
        let (status_tx, status_rx) = bounded(STATUS_EVENT_CAPACITY);
        let (plot_tx, plot_rx) = bounded(PLOT_EVENT_CAPACITY);
        Self {
            settings,
            encoders,
            cameras: [None, None],
            recordings: Vec::new(),
            recording_state: SessionState::Idle,
            link: None,
            receive: None,
            receive_state: SessionState::Idle,
            marker: MarkerGate::new(),
            status_tx,
            status_rx,
            plot_tx,
            plot_rx,
        }
    }

    /// Controller encoding video with the configured external encoder.
    pub fn with_ffmpeg(settings: Settings) -> Self {
        let encoders = Box::new(FfmpegEncoderFactory::from_config(&settings.video));
        Self::new(settings, encoders)
    }

    // ==========================================================================
    // Cameras
    // ==========================================================================

    /// Start capturing from `source` in camera slot `slot` (1-based).
    pub fn open_camera(&mut self, slot: usize, source: Box<dyn FrameSource>) -> AppResult<()> {
        let index = camera_index(slot)?;
        if self.cameras[index].is_some() {
            return Err(DaqError::SessionActive("Camera"));
        }
        if self.recording_state.is_running() {
            return Err(DaqError::SessionActive("Recording"));
        }
        self.cameras[index] = Some(CaptureLoop::spawn(slot, source)?);
        Ok(())
    }

    /// Stop capturing in `slot`. Not allowed while recording.
    pub fn close_camera(&mut self, slot: usize) -> AppResult<()> {
        let index = camera_index(slot)?;
        if self.recording_state.is_running() {
            return Err(DaqError::SessionActive("Recording"));
        }
        match self.cameras[index].take() {
            Some(mut capture) => capture.stop(),
            None => Ok(()),
        }
    }

    /// Capture loop of `slot`, if the camera is open.
    pub fn camera(&self, slot: usize) -> Option<&CaptureLoop> {
        camera_index(slot)
            .ok()
            .and_then(|index| self.cameras[index].as_ref())
    }

    // ==========================================================================
    // Recording
    // ==========================================================================

    /// Start recording every open camera, one file each.
    ///
    /// Cameras whose encoder fails to open are skipped and reported through
    /// [`StatusEvent::CameraFailed`]; the others keep recording. Returns the
    /// files being written. Fails, leaving the session `Idle`, only when no
    /// camera could start.
    pub fn start_recording(&mut self) -> AppResult<Vec<PathBuf>> {
        if !self.recording_state.can_start() {
            return Err(DaqError::SessionActive("Recording"));
        }
        if self.cameras.iter().all(Option::is_none) {
            return Err(DaqError::NoActiveCamera);
        }

        let dir = self.settings.video.output_dir.clone();
        naming::ensure_dir(&dir)?;
        let stamp = naming::session_stamp();

        let mut sessions = Vec::new();
        let mut failures = Vec::new();
        for capture in self.cameras.iter().flatten() {
            let camera = capture.camera();
            let path = naming::video_path(&dir, camera, &stamp, &self.settings.video.container);
            match RecordingSession::start(
                camera,
                &path,
                capture.resolution(),
                &self.settings.video,
                self.encoders.as_ref(),
            ) {
                Ok(session) => sessions.push(session),
                Err(e) => {
                    warn!(camera, error = %e, "Camera could not start recording");
                    failures.push((camera, e));
                }
            }
        }
        if sessions.is_empty() {
            // Every failure was logged above; the first one is returned
            return Err(failures
                .into_iter()
                .next()
                .map_or(DaqError::NoActiveCamera, |(_, e)| e));
        }
        self.recording_state = SessionState::Armed;

        for session in &sessions {
            if let Some(capture) = self.cameras[session.camera() - 1].as_ref() {
                capture.attach(session.frame_buffer());
            }
        }
        let paths: Vec<PathBuf> = sessions.iter().map(|s| s.path().to_path_buf()).collect();
        self.recordings = sessions;
        self.recording_state = SessionState::Active;

        self.notify(StatusEvent::RecordingStarted {
            paths: paths.clone(),
        });
        for (camera, e) in failures {
            self.notify(StatusEvent::CameraFailed {
                camera,
                reason: e.to_string(),
            });
        }
        Ok(paths)
    }

    /// Stop every recording and wait for the files to close.
    ///
    /// Returns the combined counters of all cameras. A no-op when idle.
    pub fn stop_recording(&mut self) -> AppResult<RecordingStats> {
        if !self.recording_state.is_running() {
            return Ok(RecordingStats::default());
        }
        for capture in self.cameras.iter().flatten() {
            capture.detach();
        }

        let mut total = RecordingStats::default();
        let mut errors = Vec::new();
        for mut session in self.recordings.drain(..) {
            match session.stop() {
                Ok(stats) => {
                    total.frames_written += stats.frames_written;
                    total.duplicates += stats.duplicates;
                    total.dropped += stats.dropped;
                    total.rejected += stats.rejected;
                }
                Err(e) => errors.push(e),
            }
        }
        self.recording_state = SessionState::Idle;

        self.notify(StatusEvent::RecordingStopped {
            frames_written: total.frames_written,
            dropped: total.dropped,
        });
        combine(errors)?;
        Ok(total)
    }

    // ==========================================================================
    // Serial link
    // ==========================================================================

    /// Connect over an already opened transport.
    pub fn connect_serial(&mut self, transport: Box<dyn ByteTransport>) -> AppResult<()> {
        if self.is_serial_connected() {
            return Err(DaqError::SessionActive("Serial link"));
        }
        // A link that died on its own is cleaned up before reconnecting
        self.disconnect_serial()?;

        let link = SerialLink::connect(
            transport,
            self.settings.serial.poll_interval(),
            Some(self.status_tx.clone()),
        )?;
        self.notify(StatusEvent::SerialConnected {
            port: link.description().to_string(),
        });
        self.link = Some(link);
        Ok(())
    }

    /// Open the serial port named in the settings (or `port`) and connect.
    pub fn connect_serial_port(&mut self, port: Option<&str>) -> AppResult<()> {
        let port = port
            .map(str::to_string)
            .or_else(|| self.settings.serial.port.clone())
            .ok_or_else(|| DaqError::Configuration("No serial port configured".into()))?;
        let transport = SerialPortTransport::open(
            &port,
            self.settings.serial.baud_rate,
            self.settings.serial.read_timeout(),
        )?;
        self.connect_serial(Box::new(transport))
    }

    /// Stop receiving if needed, then close the link. A no-op when not connected.
    pub fn disconnect_serial(&mut self) -> AppResult<()> {
        let mut errors = Vec::new();
        if let Err(e) = self.stop_receive() {
            errors.push(e);
        }
        if let Some(mut link) = self.link.take() {
            if let Err(e) = link.disconnect() {
                errors.push(e);
            }
            self.notify(StatusEvent::SerialDisconnected);
        }
        combine(errors)
    }

    /// Whether the serial link is up.
    pub fn is_serial_connected(&self) -> bool {
        self.link.as_ref().is_some_and(SerialLink::is_connected)
    }

    /// Tear down a link whose reader thread stopped on a transport error.
    ///
    /// Closes the receive session's files. Returns `true` if a lost link was
    /// cleaned up.
    pub fn handle_link_loss(&mut self) -> AppResult<bool> {
        let lost = self.link.as_ref().is_some_and(|link| !link.is_connected());
        if lost {
            warn!("Serial link lost, closing receive session");
            self.disconnect_serial()?;
        }
        Ok(lost)
    }

    /// Write one command to the board.
    pub fn send_command(&self, command: DeviceCommand) -> AppResult<()> {
        let link = self.link.as_ref().ok_or(DaqError::SerialPortNotConnected)?;
        link.send_command(command)?;
        self.notify(StatusEvent::CommandSent {
            command: command.to_wire().trim_end().to_string(),
        });
        Ok(())
    }

    fn send_to_channels(&self, channels: ChannelSet, code: CommandCode) -> AppResult<()> {
        if channels.is_empty() {
            return Err(DaqError::NoChannelSelected);
        }
        for channel in channels.iter() {
            self.send_command(DeviceCommand::new(channel, code))?;
        }
        Ok(())
    }

    /// Switch the LED on for `channels`.
    pub fn led_on(&self, channels: ChannelSet) -> AppResult<()> {
        self.send_to_channels(channels, CommandCode::LedOn)
    }

    /// Switch the LED off for `channels`.
    pub fn led_off(&self, channels: ChannelSet) -> AppResult<()> {
        self.send_to_channels(channels, CommandCode::LedOff)
    }

    /// Change the LED pattern for `channels`.
    pub fn set_led_mode(&self, channels: ChannelSet, mode: LedMode) -> AppResult<()> {
        self.send_to_channels(channels, CommandCode::LedMode(mode))
    }

    // ==========================================================================
    // Receiving
    // ==========================================================================

    /// Open log files for `channels`, attach the pipeline and start streaming.
    pub fn start_receive(&mut self, channels: ChannelSet) -> AppResult<Vec<PathBuf>> {
        if !self.receive_state.can_start() {
            return Err(DaqError::SessionActive("Receive"));
        }
        let Some(link) = self.link.as_ref().filter(|link| link.is_connected()) else {
            return Err(DaqError::SerialPortNotConnected);
        };
        if channels.is_empty() {
            return Err(DaqError::NoChannelSelected);
        }

        let stamp = naming::session_stamp();
        let log = SignalLog::create(&self.settings.signal.output_dir, channels, &stamp)?;
        let paths = log.paths().to_vec();
        self.receive_state = SessionState::Armed;

        let started_at = Instant::now();
        self.marker.clear();
        let pipeline = ReceivePipeline::new(channels, started_at, self.marker.clone())
            .with_sink(Box::new(log))
            .with_sink(Box::new(PlotFeed::new(self.plot_tx.clone())));
        let _ = self.plot_tx.try_send(PlotEvent::Clear);

        let started = link.attach(pipeline).and_then(|()| {
            channels
                .iter()
                .try_for_each(|ch| link.send_command(DeviceCommand::new(ch, CommandCode::StartStream)))
        });
        if let Err(e) = started {
            if let Some(pipeline) = link.detach() {
                let _ = pipeline.finish();
            }
            for path in &paths {
                if let Err(remove_err) = std::fs::remove_file(path) {
                    warn!(path = %path.display(), error = %remove_err, "Could not remove unused log file");
                }
            }
            self.receive_state = SessionState::Idle;
            return Err(e);
        }

        self.receive = Some(ReceiveSession {
            channels,
            started_at,
            paths: paths.clone(),
        });
        self.receive_state = SessionState::Active;
        info!(channels = ?channels.iter().collect::<Vec<_>>(), "Receiving started");
        self.notify(StatusEvent::ReceiveStarted {
            channels: channels.iter().collect(),
            paths: paths.clone(),
        });
        Ok(paths)
    }

    /// Stop streaming and close the log files. A no-op when not receiving.
    pub fn stop_receive(&mut self) -> AppResult<PipelineStats> {
        let Some(session) = self.receive.take() else {
            self.receive_state = SessionState::Idle;
            return Ok(PipelineStats::default());
        };

        let mut result = Ok(PipelineStats::default());
        if let Some(link) = self.link.as_ref() {
            for channel in session.channels.iter() {
                let stop = DeviceCommand::new(channel, CommandCode::StopStream);
                if let Err(e) = link.send_command(stop) {
                    warn!(%channel, error = %e, "Could not send stop command");
                }
            }
            if let Some(pipeline) = link.detach() {
                result = pipeline.finish();
            }
        }
        self.marker.clear();
        self.receive_state = SessionState::Idle;

        let samples = result.as_ref().map_or(0, |stats| stats.samples_forwarded);
        info!(samples, files = session.paths.len(), "Receiving stopped");
        self.notify(StatusEvent::ReceiveStopped { samples });
        result
    }

    /// Flag the next processed sample and drop a marker on the plot.
    ///
    /// Ignored (returns `None`) while not receiving; otherwise returns the
    /// marker time in seconds since receive start.
    pub fn add_marker(&self) -> Option<f64> {
        let session = self.receive.as_ref()?;
        self.marker.arm();
        let time = Instant::now()
            .saturating_duration_since(session.started_at)
            .as_secs_f64();
        let _ = self.plot_tx.try_send(PlotEvent::Marker { time });
        self.notify(StatusEvent::MarkerAdded { time });
        Some(time)
    }

    // ==========================================================================
    // Combined
    // ==========================================================================

    /// Start recording and receiving together.
    ///
    /// If receiving cannot start, the recording is stopped again.
    pub fn start_record_receive(&mut self, channels: ChannelSet) -> AppResult<Vec<PathBuf>> {
        if !self.is_serial_connected() {
            return Err(DaqError::SerialPortNotConnected);
        }
        let mut paths = self.start_recording()?;
        match self.start_receive(channels) {
            Ok(logs) => {
                paths.extend(logs);
                Ok(paths)
            }
            Err(e) => {
                if let Err(stop_err) = self.stop_recording() {
                    warn!(error = %stop_err, "Rollback of recording failed");
                }
                Err(e)
            }
        }
    }

    /// Stop recording and receiving.
    pub fn stop_record_receive(&mut self) -> AppResult<()> {
        let errors = [self.stop_recording().err(), self.stop_receive().err()];
        combine(errors.into_iter().flatten().collect())
    }

    /// Stop every session, close the link and every camera.
    pub fn shutdown(&mut self) -> AppResult<()> {
        let mut errors = Vec::new();
        if let Err(e) = self.stop_recording() {
            errors.push(e);
        }
        if let Err(e) = self.disconnect_serial() {
            errors.push(e);
        }
        for capture in self.cameras.iter_mut() {
            if let Some(mut capture) = capture.take() {
                if let Err(e) = capture.stop() {
                    errors.push(e);
                }
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(DaqError::ShutdownFailed(errors))
        }
    }

    // ==========================================================================
    // State
    // ==========================================================================

    /// Recording session state.
    pub fn recording_state(&self) -> SessionState {
        self.recording_state
    }

    /// Receive session state.
    pub fn receive_state(&self) -> SessionState {
        self.receive_state
    }

    /// Channels being received, if receiving.
    pub fn receive_channels(&self) -> Option<ChannelSet> {
        self.receive.as_ref().map(|session| session.channels)
    }

    /// Status notifications.
    ///
    /// Holds at most [`STATUS_EVENT_CAPACITY`] undelivered events.
    pub fn status_events(&self) -> Receiver<StatusEvent> {
        self.status_rx.clone()
    }

    /// Plot events for the display owner.
    ///
    /// Holds at most [`PLOT_EVENT_CAPACITY`] undelivered events.
    pub fn plot_events(&self) -> Receiver<PlotEvent> {
        self.plot_rx.clone()
    }

    /// Active settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn notify(&self, event: StatusEvent) {
        info!(status = %event);
        let _ = self.status_tx.try_send(event);
    }
}

impl Drop for RigController {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!(error = %e, "Rig shutdown reported errors");
        }
    }
}

fn camera_index(slot: usize) -> AppResult<usize> {
    match slot {
        1..=CAMERA_SLOTS => Ok(slot - 1),
        other => Err(DaqError::InvalidCamera(other)),
    }
}

fn combine(mut errors: Vec<DaqError>) -> AppResult<()> {
    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.remove(0)),
        _ => Err(DaqError::ShutdownFailed(errors)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::mock::{ScriptEnd, ScriptedTransport, SyntheticCamera};
    use crate::video::encoder::MemoryEncoderFactory;
    use std::time::Duration;

    fn settings(root: &std::path::Path) -> Settings {
        let mut settings = Settings::default();
        settings.video.output_dir = root.join("video");
        settings.signal.output_dir = root.join("signal");
        settings.serial.poll_interval_ms = 1;
        settings
    }

    #[test]
    fn recording_requires_a_camera() {
        let dir = tempfile::tempdir().unwrap();
        let mut rig = RigController::new(settings(dir.path()), Box::new(MemoryEncoderFactory::new()));
        assert!(matches!(rig.start_recording(), Err(DaqError::NoActiveCamera)));
        assert_eq!(rig.recording_state(), SessionState::Idle);
        assert!(rig.stop_recording().is_ok());
    }

    #[test]
    fn receive_requires_connection() {
        let dir = tempfile::tempdir().unwrap();
        let mut rig = RigController::new(settings(dir.path()), Box::new(MemoryEncoderFactory::new()));
        assert!(matches!(
            rig.start_receive(ChannelSet::all()),
            Err(DaqError::SerialPortNotConnected)
        ));
        assert!(rig.add_marker().is_none());
        assert!(matches!(
            rig.send_command(DeviceCommand::new(Channel::One, CommandCode::LedOn)),
            Err(DaqError::SerialPortNotConnected)
        ));
    }

    #[test]
    fn record_receive_rolls_back_recording() {
        let dir = tempfile::tempdir().unwrap();
        let mut rig = RigController::new(settings(dir.path()), Box::new(MemoryEncoderFactory::new()));
        rig.open_camera(1, Box::new(SyntheticCamera::new(4, 4, 60)))
            .unwrap();
        rig.connect_serial(Box::new(ScriptedTransport::new(
            Vec::<Vec<u8>>::new(),
            ScriptEnd::Idle,
        )))
        .unwrap();

        let result = rig.start_record_receive(ChannelSet::none());
        assert!(matches!(result, Err(DaqError::NoChannelSelected)));
        assert_eq!(rig.recording_state(), SessionState::Idle);
        assert_eq!(rig.receive_state(), SessionState::Idle);
        rig.shutdown().unwrap();
    }

    #[test]
    fn receive_sends_start_and_stop_commands() {
        let dir = tempfile::tempdir().unwrap();
        let mut rig = RigController::new(settings(dir.path()), Box::new(MemoryEncoderFactory::new()));
        let transport = ScriptedTransport::new(Vec::<Vec<u8>>::new(), ScriptEnd::Idle);
        let written = transport.written();
        rig.connect_serial(Box::new(transport)).unwrap();

        let paths = rig.start_receive(ChannelSet::from_numbers(&[2]).unwrap()).unwrap();
        assert_eq!(paths.len(), 1);
        assert!(matches!(
            rig.start_receive(ChannelSet::all()),
            Err(DaqError::SessionActive(_))
        ));
        assert!(rig.add_marker().is_some());

        rig.stop_receive().unwrap();
        rig.stop_receive().unwrap();
        assert_eq!(
            written.lock().as_slice(),
            b"0200000000CCJ\r\n0200000000CCK\r\n"
        );
        assert_eq!(rig.receive_state(), SessionState::Idle);
    }

    #[test]
    fn lost_link_closes_receive_session() {
        let dir = tempfile::tempdir().unwrap();
        let mut rig = RigController::new(settings(dir.path()), Box::new(MemoryEncoderFactory::new()));
        let status = rig.status_events();
        let mut chunks = vec![Vec::new(); 200];
        chunks.push(b"H80-00-80-00-H".to_vec());
        rig.connect_serial(Box::new(ScriptedTransport::new(chunks, ScriptEnd::Fail)))
            .unwrap();
        rig.start_receive(ChannelSet::all()).unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        let mut lost = false;
        while !lost && Instant::now() < deadline {
            if let Ok(StatusEvent::LinkLost { .. }) = status.recv_timeout(Duration::from_millis(50)) {
                lost = true;
            }
        }
        assert!(lost);
        assert!(rig.handle_link_loss().unwrap());
        assert_eq!(rig.receive_state(), SessionState::Idle);
        assert!(!rig.is_serial_connected());
        assert!(!rig.handle_link_loss().unwrap());
    }

    /// Link that reads nothing and refuses every write.
    struct WriteRefusingTransport;

    impl ByteTransport for WriteRefusingTransport {
        fn read_available(&mut self) -> std::io::Result<bytes::Bytes> {
            Ok(bytes::Bytes::new())
        }

        fn write_all(&mut self, _data: &[u8]) -> std::io::Result<()> {
            Err(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "board not answering",
            ))
        }

        fn describe(&self) -> String {
            "WriteRefusingTransport".into()
        }
    }

    #[test]
    fn failed_receive_start_removes_its_logs() {
        let dir = tempfile::tempdir().unwrap();
        let mut rig = RigController::new(settings(dir.path()), Box::new(MemoryEncoderFactory::new()));
        rig.connect_serial(Box::new(WriteRefusingTransport)).unwrap();

        assert!(rig.start_receive(ChannelSet::all()).is_err());
        assert_eq!(rig.receive_state(), SessionState::Idle);
        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("signal"))
            .map(|entries| entries.flatten().map(|e| e.path()).collect())
            .unwrap_or_default();
        assert!(leftovers.is_empty(), "left behind {leftovers:?}");
        rig.shutdown().unwrap();
    }

    #[test]
    fn undrained_status_events_stay_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let mut rig = RigController::new(settings(dir.path()), Box::new(MemoryEncoderFactory::new()));
        let status = rig.status_events();
        rig.connect_serial(Box::new(ScriptedTransport::new(
            Vec::<Vec<u8>>::new(),
            ScriptEnd::Idle,
        )))
        .unwrap();

        let led_on = DeviceCommand::new(Channel::One, CommandCode::LedOn);
        for _ in 0..STATUS_EVENT_CAPACITY * 2 {
            rig.send_command(led_on).unwrap();
        }
        assert_eq!(status.len(), STATUS_EVENT_CAPACITY);

        // Draining makes room again
        assert!(matches!(status.recv(), Ok(StatusEvent::SerialConnected { .. })));
        rig.send_command(led_on).unwrap();
        assert_eq!(status.len(), STATUS_EVENT_CAPACITY);
        rig.shutdown().unwrap();
    }

    #[test]
    fn camera_slots_are_validated() {
        let dir = tempfile::tempdir().unwrap();
        let mut rig = RigController::new(settings(dir.path()), Box::new(MemoryEncoderFactory::new()));
        assert!(matches!(
            rig.open_camera(3, Box::new(SyntheticCamera::new(1, 1, 10))),
            Err(DaqError::InvalidCamera(3))
        ));
        assert!(rig.close_camera(2).is_ok());
    }
}
