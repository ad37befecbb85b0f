//! Integration tests for the recording pipeline
//!
//! These tests drive recording sessions with real threads and real clocks,
//! using the in-memory encoder to inspect exactly which frames were written.

use bytes::Bytes;
use rig_daq::config::{Settings, VideoConfig};
use rig_daq::hardware::mock::SyntheticCamera;
use rig_daq::session::{SessionState, StatusEvent};
use rig_daq::video::{
    CapturedFrame, EncoderFactory, MemoryEncoderFactory, RecordingSession, Resolution, VideoEncoder,
};
use rig_daq::{DaqError, RigController};
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

fn video_config(fps: u32) -> VideoConfig {
    VideoConfig {
        target_fps: fps,
        dequeue_timeout_ms: 10,
        ..VideoConfig::default()
    }
}

fn tagged(tag: u8, resolution: Resolution) -> CapturedFrame {
    CapturedFrame::with_timestamp(
        Bytes::from(vec![tag; resolution.bgr24_len()]),
        resolution,
        Instant::now(),
    )
}

// =============================================================================
// Pacing
// =============================================================================

#[test]
fn output_frame_count_tracks_recording_duration() {
    let fps = 20;
    let res = Resolution::new(2, 2);
    let factory = MemoryEncoderFactory::new();

    let started = Instant::now();
    let mut session =
        RecordingSession::start(1, Path::new("CAM1.avi"), res, &video_config(fps), &factory)
            .unwrap();

    // Irregular arrivals, never faster than the target rate
    let gaps_ms = [50u64, 80, 140, 55, 230, 60, 95, 300, 50];
    session.submit(tagged(0, res));
    for (i, gap) in gaps_ms.iter().enumerate() {
        thread::sleep(Duration::from_millis(*gap));
        session.submit(tagged(i as u8 + 1, res));
    }
    thread::sleep(Duration::from_millis(100));
    let stats = session.stop().unwrap();
    let elapsed = started.elapsed().as_secs_f64();

    let expected = (elapsed * f64::from(fps)).ceil() as u64;
    assert!(
        stats.frames_written.abs_diff(expected) <= 3,
        "wrote {} frames for {:.3}s, expected ~{}",
        stats.frames_written,
        elapsed,
        expected
    );
    assert!(stats.duplicates > 0);
    assert_eq!(stats.dropped, 0);

    let streams = factory.streams();
    let streams = streams.lock();
    let stream = streams[0].lock();
    assert_eq!(stream.fps, fps);
    assert!(stream.finished);
    assert_eq!(stream.frames.len() as u64, stats.frames_written);

    // Every captured frame appears, in capture order, possibly repeated
    let mut tags: Vec<u8> = stream.frames.iter().map(|f| f.data()[0]).collect();
    assert!(tags.windows(2).all(|w| w[0] <= w[1]));
    tags.dedup();
    assert_eq!(tags, (0..=gaps_ms.len() as u8).collect::<Vec<_>>());
}

#[test]
fn stalled_source_keeps_stream_moving() {
    let fps = 25;
    let res = Resolution::new(1, 1);
    let factory = MemoryEncoderFactory::new();
    let mut session =
        RecordingSession::start(2, Path::new("CAM2.avi"), res, &video_config(fps), &factory)
            .unwrap();

    session.submit(tagged(9, res));
    thread::sleep(Duration::from_millis(400));
    let stats = session.stop().unwrap();

    // One real frame, the rest repeats covering the stall (~10 slots)
    assert!(stats.frames_written >= 7, "wrote {}", stats.frames_written);
    assert_eq!(stats.duplicates, stats.frames_written - 1);
}

#[test]
fn stop_without_frames_writes_nothing() {
    let factory = MemoryEncoderFactory::new();
    let mut session = RecordingSession::start(
        1,
        Path::new("CAM1.avi"),
        Resolution::new(1, 1),
        &video_config(30),
        &factory,
    )
    .unwrap();
    thread::sleep(Duration::from_millis(50));
    let stats = session.stop().unwrap();
    assert_eq!(stats.frames_written, 0);
    assert!(factory.streams().lock()[0].lock().finished);
}

// =============================================================================
// Rig-level recording
// =============================================================================

fn rig(root: &Path, factory: MemoryEncoderFactory) -> RigController {
    let mut settings = Settings::default();
    settings.video.output_dir = root.join("video");
    settings.video.target_fps = 30;
    RigController::new(settings, Box::new(factory))
}

#[test]
fn every_open_camera_gets_its_own_file() {
    let dir = tempfile::tempdir().unwrap();
    let factory = MemoryEncoderFactory::new();
    let mut rig = rig(dir.path(), factory.clone());
    rig.open_camera(1, Box::new(SyntheticCamera::new(8, 6, 30)))
        .unwrap();
    rig.open_camera(2, Box::new(SyntheticCamera::new(4, 4, 30)))
        .unwrap();

    let paths = rig.start_recording().unwrap();
    assert_eq!(rig.recording_state(), SessionState::Active);
    assert!(dir.path().join("video").is_dir());
    let names: Vec<String> = paths
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert!(names[0].starts_with("CAM1_") && names[0].ends_with(".avi"));
    assert!(names[1].starts_with("CAM2_") && names[1].ends_with(".avi"));

    assert!(matches!(
        rig.start_recording(),
        Err(DaqError::SessionActive(_))
    ));

    thread::sleep(Duration::from_millis(300));
    let stats = rig.stop_recording().unwrap();
    assert!(stats.frames_written > 0);
    assert_eq!(rig.recording_state(), SessionState::Idle);
    assert_eq!(rig.stop_recording().unwrap(), Default::default());

    let streams = factory.streams();
    let streams = streams.lock();
    assert_eq!(streams.len(), 2);
    for (stream, res) in streams.iter().zip([Resolution::new(8, 6), Resolution::new(4, 4)]) {
        let stream = stream.lock();
        assert!(stream.finished);
        assert!(stream.frames.iter().all(|f| f.resolution() == res));
    }

    // Capture keeps running after the recording ended
    let capture = rig.camera(1).unwrap();
    assert!(!capture.is_recording());
    let before = capture.frames_captured();
    thread::sleep(Duration::from_millis(100));
    assert!(rig.camera(1).unwrap().frames_captured() > before);
    rig.shutdown().unwrap();
}

/// Encoder factory refusing files whose name starts with `prefix`.
struct RefusingFactory {
    inner: MemoryEncoderFactory,
    prefix: &'static str,
}

impl EncoderFactory for RefusingFactory {
    fn open(
        &self,
        path: &Path,
        resolution: Resolution,
        fps: u32,
    ) -> Result<Box<dyn VideoEncoder>, DaqError> {
        let name = path.file_name().unwrap_or_default().to_string_lossy();
        if name.starts_with(self.prefix) {
            return Err(DaqError::VideoOutput(format!("cannot open {name}")));
        }
        self.inner.open(path, resolution, fps)
    }
}

#[test]
fn one_failing_encoder_leaves_other_camera_recording() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = Settings::default();
    settings.video.output_dir = dir.path().join("video");
    settings.video.dequeue_timeout_ms = 10;
    let inner = MemoryEncoderFactory::new();
    let factory = RefusingFactory {
        inner: inner.clone(),
        prefix: "CAM2_",
    };
    let mut rig = RigController::new(settings, Box::new(factory));
    let status = rig.status_events();
    rig.open_camera(1, Box::new(SyntheticCamera::new(4, 4, 30)))
        .unwrap();
    rig.open_camera(2, Box::new(SyntheticCamera::new(4, 4, 30)))
        .unwrap();

    let paths = rig.start_recording().unwrap();
    assert_eq!(paths.len(), 1);
    assert!(paths[0]
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("CAM1_"));
    assert_eq!(rig.recording_state(), SessionState::Active);
    assert!(rig.camera(1).unwrap().is_recording());
    assert!(!rig.camera(2).unwrap().is_recording());

    let events: Vec<StatusEvent> = status.try_iter().collect();
    assert!(events
        .iter()
        .any(|e| matches!(e, StatusEvent::CameraFailed { camera: 2, .. })));

    thread::sleep(Duration::from_millis(150));
    let stats = rig.stop_recording().unwrap();
    assert!(stats.frames_written > 0);
    assert_eq!(rig.recording_state(), SessionState::Idle);

    let streams = inner.streams();
    let streams = streams.lock();
    assert_eq!(streams.len(), 1);
    assert!(streams[0].lock().finished);
    rig.shutdown().unwrap();
}

#[test]
fn encoder_failure_on_every_camera_leaves_rig_idle() {
    let dir = tempfile::tempdir().unwrap();
    let mut rig = rig(dir.path(), MemoryEncoderFactory::failing());
    rig.open_camera(1, Box::new(SyntheticCamera::new(4, 4, 30)))
        .unwrap();

    let result = rig.start_recording();
    assert!(matches!(result, Err(DaqError::VideoOutput(_))));
    assert_eq!(rig.recording_state(), SessionState::Idle);
    assert!(!rig.camera(1).unwrap().is_recording());

    rig.open_camera(2, Box::new(SyntheticCamera::new(4, 4, 30)))
        .unwrap();
    assert!(matches!(
        rig.start_recording(),
        Err(DaqError::VideoOutput(_))
    ));
    assert_eq!(rig.recording_state(), SessionState::Idle);
    assert!(!rig.camera(2).unwrap().is_recording());
    rig.shutdown().unwrap();
}
