use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use webcam_calibration::io::{CalibrationRecord, load_calibration};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Part {
    All,
    CameraMatrix,
    Dist,
}

#[derive(Parser)]
#[command(version, about, author)]
struct ViewCalibrationCli {
    /// calibration file written by run-calibration
    #[arg(default_value = "camera_calib_pkl/calibration.json")]
    path: PathBuf,

    #[arg(long, value_enum, default_value = "all")]
    part: Part,
}

fn print_camera_matrix(record: &CalibrationRecord) {
    println!("camera matrix:");
    println!("{}", record.camera_matrix());
}

fn print_dist(record: &CalibrationRecord) {
    let d = record.distortion();
    println!("distortion coefficients [k1, k2, p1, p2, k3]:");
    println!("[{}, {}, {}, {}, {}]", d[0], d[1], d[2], d[3], d[4]);
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = ViewCalibrationCli::parse();
    let record = load_calibration(&cli.path)?;

    match cli.part {
        Part::CameraMatrix => print_camera_matrix(&record),
        Part::Dist => print_dist(&record),
        Part::All => {
            println!("image size: {} x {}", record.image_size.0, record.image_size.1);
            print_camera_matrix(&record);
            print_dist(&record);
            println!("rms: {}", record.rms);
            println!("created at: {}", record.created_at);
        }
    }
    Ok(())
}
