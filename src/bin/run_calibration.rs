use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use rerun::RecordingStream;
use webcam_calibration::config::{CalibrationConfig, load_or_default};
#[cfg(not(feature = "device"))]
use webcam_calibration::display::HeadlessPreview;
use webcam_calibration::estimator::{EstimationReport, run_estimation};

#[derive(Parser)]
#[command(version, about, author)]
struct RunCalibrationCli {
    /// JSON calibration config; missing fields keep their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// glob matching the calibration images
    #[arg(long)]
    input_glob: Option<String>,

    /// image undistorted with the estimated calibration
    #[arg(long)]
    test_image: Option<PathBuf>,

    /// directory for calibration.json and report.txt
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// directory for the undistorted test images
    #[arg(long)]
    result_dir: Option<PathBuf>,

    /// free scaling parameter of the new camera matrix, in [0, 1]
    #[arg(long)]
    alpha: Option<f64>,

    /// how long each detection stays on screen
    #[arg(long)]
    preview_ms: Option<u64>,

    /// do not open preview windows
    #[arg(long, default_value_t = false)]
    headless: bool,

    /// save a rerun recording of the detections
    #[arg(long)]
    rrd: Option<PathBuf>,
}

impl RunCalibrationCli {
    fn resolve_config(&self) -> Result<CalibrationConfig, Box<dyn std::error::Error>> {
        let mut config: CalibrationConfig = load_or_default(self.config.as_deref())?;
        if let Some(g) = &self.input_glob {
            config.input_glob = g.clone();
        }
        if let Some(p) = &self.test_image {
            config.test_image = p.clone();
        }
        if let Some(p) = &self.output_dir {
            config.output_dir = p.clone();
        }
        if let Some(p) = &self.result_dir {
            config.result_dir = p.clone();
        }
        if let Some(a) = self.alpha {
            config.alpha = a;
        }
        if let Some(ms) = self.preview_ms {
            config.preview_duration_ms = ms;
        }
        Ok(config)
    }
}

#[cfg(feature = "device")]
fn estimate(
    config: &CalibrationConfig,
    headless: bool,
    recording: Option<&RecordingStream>,
) -> webcam_calibration::Result<EstimationReport> {
    use webcam_calibration::device::WindowPreview;
    use webcam_calibration::display::HeadlessPreview;
    if headless {
        run_estimation(config, &mut HeadlessPreview::default(), recording)
    } else {
        run_estimation(config, &mut WindowPreview::default(), recording)
    }
}

#[cfg(not(feature = "device"))]
fn estimate(
    config: &CalibrationConfig,
    _headless: bool,
    recording: Option<&RecordingStream>,
) -> webcam_calibration::Result<EstimationReport> {
    run_estimation(config, &mut HeadlessPreview::default(), recording)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = RunCalibrationCli::parse();
    let config = cli.resolve_config()?;

    let recording = match &cli.rrd {
        Some(path) => Some(rerun::RecordingStreamBuilder::new("calibration").save(path)?),
        None => None,
    };

    let now = Instant::now();
    let report = estimate(&config, cli.headless, recording.as_ref())?;
    log::info!("estimation took {:.3} sec", now.elapsed().as_secs_f64());

    println!(
        "board found in {} of {} images",
        report.observations.len(),
        report.images_read
    );
    println!(
        "Camera calibration parameters saved in {}",
        report.calibration_path.display()
    );
    println!(
        "roi: x={} y={} w={} h={}",
        report.roi.x, report.roi.y, report.roi.width, report.roi.height
    );
    for p in &report.result_paths {
        println!("undistorted test image saved as {}", p.display());
    }
    println!("total error: {}", report.mean_error);
    Ok(())
}
