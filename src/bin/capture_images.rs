use std::path::PathBuf;

use clap::Parser;
use webcam_calibration::capture::{SystemClock, run_capture};
use webcam_calibration::config::{CaptureConfig, load_or_default};
use webcam_calibration::device::{WebcamProvider, WindowPreview};

#[derive(Parser)]
#[command(version, about, author)]
struct CaptureCli {
    /// JSON capture config; missing fields keep their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// directory the frames are saved to
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// seconds between two saved frames
    #[arg(long)]
    interval: Option<f64>,

    /// device indices to probe, e.g. `--devices 0,2`
    #[arg(long, value_delimiter = ',')]
    devices: Option<Vec<u32>>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = CaptureCli::parse();

    let mut config: CaptureConfig = load_or_default(cli.config.as_deref())?;
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }
    if let Some(secs) = cli.interval {
        config.save_interval_secs = secs;
    }
    if let Some(devices) = cli.devices {
        config.device_indices = devices;
    }

    let summary = run_capture(
        &config,
        &mut WebcamProvider,
        &mut WindowPreview::default(),
        &SystemClock,
    )?;
    println!(
        "{} images saved from {} camera(s)",
        summary.saved.len(),
        summary.opened.len()
    );
    Ok(())
}
