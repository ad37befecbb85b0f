//! CLI entry point for rig_daq
//!
//! Subcommands:
//! - `config`: print the effective configuration
//! - `ports`: list serial ports
//! - `record`: record synthetic camera streams
//! - `receive`: log board channels from a serial port
//! - `led`: drive the board LEDs
//! - `simulate`: full record-and-receive run against simulated devices
//!
//! Every run ends on Ctrl-C or after `--duration` seconds, and always goes
//! through the rig's stop path so files are closed.
//!
//! # Usage
//!
//! ```bash
//! rig_daq receive --port /dev/ttyUSB0 --channels 1,2 --duration 60
//! rig_daq simulate --duration 10 --dry-run
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rig_daq::config::Settings;
use rig_daq::hardware::mock::{SimulatedBoard, SyntheticCamera};
use rig_daq::hardware::SerialPortTransport;
use rig_daq::logging;
use rig_daq::plot::PlotBuffer;
use rig_daq::serial::{ChannelSet, LedMode};
use rig_daq::video::MemoryEncoderFactory;
use rig_daq::RigController;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::{interval, Instant};

#[derive(Parser)]
#[command(name = "rig_daq")]
#[command(about = "Dual-camera recording and serial telemetry logging", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(long, short, default_value = "config/rig.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the effective configuration as TOML
    Config,

    /// List serial ports visible to the system
    Ports,

    /// Record synthetic camera streams
    Record {
        /// Number of cameras (1 or 2)
        #[arg(long, default_value_t = 1)]
        cameras: usize,

        /// Frame width
        #[arg(long, default_value_t = 640)]
        width: u32,

        /// Frame height
        #[arg(long, default_value_t = 480)]
        height: u32,

        /// Stop after this many seconds instead of waiting for Ctrl-C
        #[arg(long)]
        duration: Option<f64>,
    },

    /// Log board channels from a serial port
    Receive {
        /// Serial port; defaults to `serial.port` from the configuration
        #[arg(long)]
        port: Option<String>,

        /// Channels to log, e.g. `1,2`
        #[arg(long, value_delimiter = ',')]
        channels: Vec<u8>,

        /// Stop after this many seconds instead of waiting for Ctrl-C
        #[arg(long)]
        duration: Option<f64>,
    },

    /// Switch board LEDs
    Led {
        /// Serial port; defaults to `serial.port` from the configuration
        #[arg(long)]
        port: Option<String>,

        /// Channels to address, e.g. `1,2`
        #[arg(long, value_delimiter = ',', default_value = "1")]
        channels: Vec<u8>,

        /// LED pattern, e.g. `50Hz/40%`
        #[arg(long)]
        mode: Option<String>,

        /// Switch the LEDs off instead of on
        #[arg(long)]
        off: bool,
    },

    /// Record and receive against simulated cameras and board
    Simulate {
        /// Run time in seconds
        #[arg(long, default_value_t = 10.0)]
        duration: f64,

        /// Board sample rate per channel
        #[arg(long, default_value_t = 100.0)]
        rate_hz: f64,

        /// Number of cameras (1 or 2)
        #[arg(long, default_value_t = 2)]
        cameras: usize,

        /// Keep video in memory instead of running the encoder
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load_from(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    logging::init_from_settings(&settings)?;

    match cli.command {
        Commands::Config => {
            print!("{}", settings.to_toml()?);
            Ok(())
        }
        Commands::Ports => list_ports(),
        Commands::Record {
            cameras,
            width,
            height,
            duration,
        } => record(settings, cameras, width, height, duration).await,
        Commands::Receive {
            port,
            channels,
            duration,
        } => receive(settings, port, channels, duration).await,
        Commands::Led {
            port,
            channels,
            mode,
            off,
        } => led(settings, port, channels, mode, off),
        Commands::Simulate {
            duration,
            rate_hz,
            cameras,
            dry_run,
        } => simulate(settings, duration, rate_hz, cameras, dry_run).await,
    }
}

fn list_ports() -> Result<()> {
    let ports = SerialPortTransport::available_ports()?;
    if ports.is_empty() {
        println!("No serial ports found");
    }
    for port in ports {
        println!("{port}");
    }
    Ok(())
}

async fn record(
    settings: Settings,
    cameras: usize,
    width: u32,
    height: u32,
    duration: Option<f64>,
) -> Result<()> {
    let fps = settings.video.target_fps;
    let mut rig = RigController::with_ffmpeg(settings);
    for slot in 1..=cameras {
        rig.open_camera(slot, Box::new(SyntheticCamera::new(width, height, fps)))?;
    }
    rig.start_recording().context("Failed to start recording")?;

    run_until_done(&mut rig, duration, None).await?;

    let stats = rig.stop_recording()?;
    println!(
        "Wrote {} frames ({} repeated, {} dropped)",
        stats.frames_written, stats.duplicates, stats.dropped
    );
    rig.shutdown()?;
    Ok(())
}

async fn receive(
    settings: Settings,
    port: Option<String>,
    channels: Vec<u8>,
    duration: Option<f64>,
) -> Result<()> {
    let channels = selected_channels(&settings, &channels)?;
    let mut plot = PlotBuffer::new(settings.signal.plot_window_secs);
    let mut rig = RigController::with_ffmpeg(settings);

    rig.connect_serial_port(port.as_deref())?;
    rig.start_receive(channels).context("Failed to start receiving")?;

    run_until_done(&mut rig, duration, Some(&mut plot)).await?;

    let stats = rig.stop_receive()?;
    println!(
        "Saved {} samples ({} packets, {} malformed)",
        stats.samples_forwarded, stats.packets, stats.malformed_packets
    );
    print_plot(&plot);
    rig.shutdown()?;
    Ok(())
}

fn led(
    settings: Settings,
    port: Option<String>,
    channels: Vec<u8>,
    mode: Option<String>,
    off: bool,
) -> Result<()> {
    let channels = ChannelSet::from_numbers(&channels)?;
    let mode = mode
        .map(|label| {
            LedMode::from_label(&label).with_context(|| {
                let labels: Vec<&str> = LedMode::ALL.iter().map(|m| m.label()).collect();
                format!("Unknown LED mode '{label}', expected one of {}", labels.join(", "))
            })
        })
        .transpose()?;

    let mut rig = RigController::with_ffmpeg(settings);
    rig.connect_serial_port(port.as_deref())?;
    if off {
        rig.led_off(channels)?;
    } else {
        rig.led_on(channels)?;
        if let Some(mode) = mode {
            rig.set_led_mode(channels, mode)?;
        }
    }
    rig.shutdown()?;
    Ok(())
}

async fn simulate(
    settings: Settings,
    duration: f64,
    rate_hz: f64,
    cameras: usize,
    dry_run: bool,
) -> Result<()> {
    let fps = settings.video.target_fps;
    let channels = selected_channels(&settings, &[])?;
    let mut plot = PlotBuffer::new(settings.signal.plot_window_secs);
    let mut rig = if dry_run {
        RigController::new(settings, Box::new(MemoryEncoderFactory::new()))
    } else {
        RigController::with_ffmpeg(settings)
    };

    for slot in 1..=cameras {
        rig.open_camera(slot, Box::new(SyntheticCamera::new(320, 240, fps)))?;
    }
    rig.connect_serial(Box::new(SimulatedBoard::new(rate_hz)))?;

    let paths = rig.start_record_receive(channels)?;
    for path in &paths {
        println!("Writing {}", path.display());
    }

    run_until_done(&mut rig, Some(duration), Some(&mut plot)).await?;
    rig.stop_record_receive()?;
    print_plot(&plot);
    rig.shutdown()?;
    Ok(())
}

fn selected_channels(settings: &Settings, numbers: &[u8]) -> Result<ChannelSet> {
    let numbers = if numbers.is_empty() {
        &settings.signal.receive_channels[..]
    } else {
        numbers
    };
    Ok(ChannelSet::from_numbers(numbers)?)
}

/// Pump status and plot events until Ctrl-C, the deadline, or link loss.
async fn run_until_done(
    rig: &mut RigController,
    duration: Option<f64>,
    mut plot: Option<&mut PlotBuffer>,
) -> Result<()> {
    let status = rig.status_events();
    let plot_events = rig.plot_events();
    let deadline = duration.map(|secs| Instant::now() + Duration::from_secs_f64(secs.max(0.0)));
    let mut tick = interval(Duration::from_millis(200));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            result = &mut ctrl_c => {
                result.context("Failed to listen for Ctrl-C")?;
                println!("Stopping...");
                break;
            }
            _ = tick.tick() => {
                for event in status.try_iter() {
                    println!("{event}");
                }
                if let Some(plot) = plot.as_deref_mut() {
                    plot.drain(&plot_events);
                }
                if rig.handle_link_loss()? {
                    break;
                }
                if deadline.is_some_and(|d| Instant::now() >= d) {
                    break;
                }
            }
        }
    }
    Ok(())
}

fn print_plot(plot: &PlotBuffer) {
    let view = plot.view();
    println!(
        "Plot view: t = [{:.1}, {:.1}] s, v = [{:.3}, {:.3}] V, {} marker(s)",
        view.x_range.0,
        view.x_range.1,
        view.y_range.0,
        view.y_range.1,
        plot.markers().len()
    );
}
