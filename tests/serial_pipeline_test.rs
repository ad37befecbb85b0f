//! Integration tests for the serial telemetry pipeline
//!
//! Byte streams are replayed through `ScriptedTransport`, so every test knows
//! exactly which packets were sent and can check what reached the CSV logs.

use rig_daq::config::Settings;
use rig_daq::error::AppResult;
use rig_daq::hardware::mock::{ScriptEnd, ScriptedTransport};
use rig_daq::plot::PlotEvent;
use rig_daq::serial::{
    raw_to_volts, Channel, ChannelSet, MarkerGate, ReceivePipeline, SampleRecord, SampleSink,
};
use rig_daq::session::StatusEvent;
use rig_daq::video::MemoryEncoderFactory;
use rig_daq::RigController;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Raw readings sent on each channel, in order.
fn readings(channel: Channel) -> Vec<u16> {
    let base: u16 = match channel {
        Channel::One => 0x8000,
        Channel::Two => 0x7000,
    };
    (0..12).map(|i| base + i * 0x0111).collect()
}

/// Alternating two-sample packets of both channels, closed by a final marker.
fn stream() -> Vec<u8> {
    let mut out = String::new();
    let one = readings(Channel::One);
    let two = readings(Channel::Two);
    for (a, b) in one.chunks(2).zip(two.chunks(2)) {
        out.push('H');
        for raw in a {
            out.push_str(&format!("{:02X}-{:02X}-", raw >> 8, raw & 0xFF));
        }
        out.push('I');
        for raw in b {
            out.push_str(&format!("{:02X}-{:02X}-", raw >> 8, raw & 0xFF));
        }
    }
    out.push('H');
    out.into_bytes()
}

fn rig(root: &Path) -> RigController {
    let mut settings = Settings::default();
    settings.signal.output_dir = root.join("signal");
    settings.serial.poll_interval_ms = 1;
    RigController::new(settings, Box::new(MemoryEncoderFactory::new()))
}

struct Row {
    time: f64,
    value: f64,
    marker: bool,
}

fn read_log(path: &PathBuf) -> (Vec<String>, Vec<Row>) {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let header = reader
        .headers()
        .unwrap()
        .iter()
        .map(str::to_string)
        .collect();
    let rows = reader
        .records()
        .map(|r| {
            let r = r.unwrap();
            Row {
                time: r[0].parse().unwrap(),
                value: r[1].parse().unwrap(),
                marker: match &r[2] {
                    "1" => true,
                    "0" => false,
                    other => panic!("bad marker {other}"),
                },
            }
        })
        .collect();
    (header, rows)
}

// =============================================================================
// End to end
// =============================================================================

#[test]
fn scripted_stream_round_trips_through_csv() {
    let dir = tempfile::tempdir().unwrap();
    let mut rig = rig(dir.path());
    let plot = rig.plot_events();

    // Idle reads first so receiving is set up before data arrives
    let mut chunks: Vec<Vec<u8>> = vec![Vec::new(); 100];
    chunks.extend(stream().chunks(7).map(<[u8]>::to_vec));
    rig.connect_serial(Box::new(ScriptedTransport::new(chunks, ScriptEnd::Idle)))
        .unwrap();

    let paths = rig.start_receive(ChannelSet::all()).unwrap();
    assert!(rig.add_marker().is_some());

    let expected = readings(Channel::One).len() + readings(Channel::Two).len();
    let deadline = Instant::now() + Duration::from_secs(5);
    let mut samples = 0;
    while samples < expected && Instant::now() < deadline {
        if let Ok(PlotEvent::Sample { .. }) = plot.recv_timeout(Duration::from_millis(50)) {
            samples += 1;
        }
    }
    assert_eq!(samples, expected);

    let stats = rig.stop_receive().unwrap();
    assert_eq!(stats.samples_forwarded, expected as u64);
    assert_eq!(stats.malformed_packets, 0);

    let mut markers = 0;
    for (path, channel) in paths.iter().zip(Channel::ALL) {
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(&format!("CH{}_", channel.number())));

        let (header, rows) = read_log(path);
        let expected_header = [
            "Time(s)".to_string(),
            format!("CH{}_Data(V)", channel.number()),
            "Marker".to_string(),
        ];
        assert_eq!(header, expected_header);

        let sent = readings(channel);
        assert_eq!(rows.len(), sent.len());
        for (row, raw) in rows.iter().zip(sent) {
            assert!((row.value - raw_to_volts(raw)).abs() < 1e-6);
        }
        assert!(rows.windows(2).all(|w| w[0].time <= w[1].time));
        markers += rows.iter().filter(|r| r.marker).count();
    }
    assert_eq!(markers, 1);
    rig.shutdown().unwrap();
}

#[test]
fn lost_link_still_closes_logs() {
    let dir = tempfile::tempdir().unwrap();
    let mut rig = rig(dir.path());
    let status = rig.status_events();

    let mut chunks: Vec<Vec<u8>> = vec![Vec::new(); 100];
    chunks.push(b"H80-00-81-00-H".to_vec());
    rig.connect_serial(Box::new(ScriptedTransport::new(chunks, ScriptEnd::Fail)))
        .unwrap();
    let paths = rig
        .start_receive(ChannelSet::from_numbers(&[1]).unwrap())
        .unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    let mut lost = false;
    while !lost && Instant::now() < deadline {
        lost = matches!(
            status.recv_timeout(Duration::from_millis(50)),
            Ok(StatusEvent::LinkLost { .. })
        );
    }
    assert!(lost);
    assert!(rig.handle_link_loss().unwrap());
    assert!(!rig.is_serial_connected());

    let (_, rows) = read_log(&paths[0]);
    assert_eq!(rows.len(), 2);
    assert!(rows[0].time <= rows[1].time);
}

// =============================================================================
// Pipeline
// =============================================================================

#[derive(Clone, Default)]
struct Collect(Arc<Mutex<Vec<SampleRecord>>>);

impl SampleSink for Collect {
    fn accept(&mut self, record: &SampleRecord) -> AppResult<()> {
        self.0.lock().unwrap().push(*record);
        Ok(())
    }
}

fn run(chunks: &[&[u8]], channels: ChannelSet) -> (Vec<(Channel, f64)>, ReceivePipeline) {
    let sink = Collect::default();
    let t0 = Instant::now();
    let mut pipeline =
        ReceivePipeline::new(channels, t0, MarkerGate::new()).with_sink(Box::new(sink.clone()));
    for (i, chunk) in chunks.iter().enumerate() {
        pipeline.ingest(chunk, t0 + Duration::from_millis(10 * (i as u64 + 1)));
    }
    let out = sink
        .0
        .lock()
        .unwrap()
        .iter()
        .map(|r| (r.channel, r.voltage))
        .collect();
    (out, pipeline)
}

#[test]
fn chunk_boundaries_do_not_change_samples() {
    let bytes = stream();
    let (whole, _) = run(&[&bytes], ChannelSet::all());
    assert_eq!(whole.len(), 24);

    for size in [1, 2, 3, 5, 8, 13] {
        let chunks: Vec<&[u8]> = bytes.chunks(size).collect();
        let (split, _) = run(&chunks, ChannelSet::all());
        assert_eq!(split, whole, "chunk size {size}");
    }
}

#[test]
fn malformed_input_does_not_stop_the_stream() {
    let chunks: [&[u8]; 4] = [
        b"\r\ngarbageH01-02-03",
        b"I\x80\x81-H10-00-20-00-",
        b"IZZ-YY-30-00-",
        b"H",
    ];
    let (samples, pipeline) = run(&chunks, ChannelSet::all());

    let raws: Vec<(Channel, f64)> = vec![
        (Channel::One, raw_to_volts(0x1000)),
        (Channel::One, raw_to_volts(0x2000)),
        (Channel::Two, raw_to_volts(0x3000)),
    ];
    assert_eq!(samples, raws);

    let stats = pipeline.stats();
    assert_eq!(stats.malformed_packets, 1);
    assert_eq!(stats.undecodable_packets, 1);
    assert_eq!(stats.bad_pairs, 1);
    assert_eq!(stats.samples_forwarded, 3);
}

#[test]
fn unselected_channel_never_reaches_sinks() {
    let bytes = stream();
    let (samples, pipeline) = run(&[&bytes], ChannelSet::from_numbers(&[2]).unwrap());
    assert_eq!(samples.len(), 12);
    assert!(samples.iter().all(|(ch, _)| *ch == Channel::Two));
    assert_eq!(pipeline.stats().samples_forwarded, 12);
}
