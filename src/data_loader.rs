use std::path::{Path, PathBuf};

use glob::glob;
use image::{ImageReader, RgbImage};
use indicatif::ParallelProgressIterator;
use rayon::prelude::*;

use crate::board::Board;
use crate::chessboard::detect_refined_corners;
use crate::config::SubPixConfig;
use crate::detected_points::PatternObservation;
use crate::error::Result;

/// A loaded calibration image and, when the board was found, its observation.
pub struct DetectedImage {
    pub path: PathBuf,
    pub image: RgbImage,
    pub observation: Option<PatternObservation>,
}

fn img_filter(rp: glob::GlobResult) -> Option<PathBuf> {
    match rp {
        Ok(p) => p.is_file().then_some(p),
        Err(e) => {
            log::debug!("skipping unreadable glob entry: {e}");
            None
        }
    }
}

/// Files matching `pattern`, sorted by path.
pub fn image_paths(pattern: &str) -> Result<Vec<PathBuf>> {
    let mut sorted_path: Vec<PathBuf> = glob(pattern)?.filter_map(img_filter).collect();
    sorted_path.sort();
    Ok(sorted_path)
}

fn load_rgb(path: &Path) -> Option<RgbImage> {
    match ImageReader::open(path).and_then(|r| r.with_guessed_format()) {
        Ok(reader) => match reader.decode() {
            Ok(img) => Some(img.to_rgb8()),
            Err(e) => {
                log::debug!("skipping {}: {e}", path.display());
                None
            }
        },
        Err(e) => {
            log::debug!("skipping {}: {e}", path.display());
            None
        }
    }
}

/// Loads every readable image and searches it for the board.
///
/// Images that cannot be decoded are skipped; images without a complete
/// board are kept with `observation = None`. Input order is preserved.
pub fn load_and_detect(
    paths: &[PathBuf],
    board: &Board,
    subpix: &SubPixConfig,
) -> Vec<DetectedImage> {
    paths
        .par_iter()
        .progress_count(paths.len() as u64)
        .filter_map(|path| {
            let image = load_rgb(path)?;
            let gray = image::DynamicImage::ImageRgb8(image.clone()).to_luma8();
            let observation = detect_refined_corners(&gray, board, subpix).and_then(|corners| {
                PatternObservation::from_corners(
                    path.clone(),
                    (image.width(), image.height()),
                    board,
                    &corners,
                )
            });
            match &observation {
                Some(_) => log::debug!("board found in {}", path.display()),
                None => log::debug!("no board in {}", path.display()),
            }
            Some(DetectedImage {
                path: path.clone(),
                image,
                observation,
            })
        })
        .collect()
}
