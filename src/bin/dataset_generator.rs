use std::path::PathBuf;

use clap::Parser;
use webcam_calibration::board::{Board, ChessboardConfig};
use webcam_calibration::config::load_or_default;
use webcam_calibration::synthetic::{default_synthetic_camera, random_poses, render_checkerboard};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Output directory
    #[arg(short, long, default_value = "images")]
    output: PathBuf,

    /// Board configuration JSON
    #[arg(short, long)]
    board_config: Option<PathBuf>,

    /// Number of frames to generate
    #[arg(short, long, default_value = "20")]
    num_frames: usize,

    /// Distance from camera to board centre, in board units
    #[arg(long, default_value = "550")]
    distance: f64,

    #[arg(long, default_value = "0")]
    seed: u64,

    /// Also write a held-out view here
    #[arg(long)]
    test_image: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let board_config: ChessboardConfig = load_or_default(args.board_config.as_deref())?;
    let board = Board::from_config(&board_config);
    let model = default_synthetic_camera();
    let size = (model.width, model.height);

    std::fs::create_dir_all(&args.output)?;
    let poses = random_poses(&board, args.num_frames + 1, args.distance, args.seed);
    let (held_out, frames) = poses.split_last().ok_or("no poses generated")?;

    for (i, pose) in frames.iter().enumerate() {
        let path = args.output.join(format!("img{i}.png"));
        render_checkerboard(&model, &board, pose, size).save(&path)?;
        log::debug!("wrote {}", path.display());
    }

    if let Some(test_image) = &args.test_image {
        if let Some(parent) = test_image.parent() {
            std::fs::create_dir_all(parent)?;
        }
        render_checkerboard(&model, &board, held_out, size).save(test_image)?;
        println!("test image saved as {}", test_image.display());
    }

    println!("Generated {} frames in {}", frames.len(), args.output.display());
    Ok(())
}
