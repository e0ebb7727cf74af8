//! The calibration estimator stage: detect, calibrate, persist, undistort
//! the test image and report the reprojection error.

use std::path::{Path, PathBuf};

use image::{DynamicImage, RgbImage};
use log::{info, warn};
use nalgebra as na;
use rerun::RecordingStream;

use crate::board::Board;
use crate::camera_model::{OpenCVModel5, Roi, init_undistort_map, optimal_new_camera_matrix, remap, undistort};
use crate::config::CalibrationConfig;
use crate::data_loader::{image_paths, load_and_detect};
use crate::detected_points::PatternObservation;
use crate::display::Preview;
use crate::error::{CalibError, Result};
use crate::io::{CalibrationRecord, save_calibration, write_report};
use crate::optimization::{CalibrationOutput, calibrate_camera};
use crate::util::{median, per_view_errors, reprojection_error};
use crate::visualization::{draw_chessboard_corners, log_corners, log_rgb_image};

const PREVIEW_TITLE: &str = "img.png";

#[derive(Debug)]
pub struct EstimationReport {
    /// Number of input images that could be read.
    pub images_read: usize,
    pub observations: Vec<PatternObservation>,
    pub calibration: CalibrationOutput,
    pub record: CalibrationRecord,
    pub calibration_path: PathBuf,
    pub new_camera_matrix: na::Matrix3<f64>,
    pub roi: Roi,
    /// Direct undistortion result followed by the remap result.
    pub result_paths: [PathBuf; 2],
    pub per_view_errors: Vec<f64>,
    pub mean_error: f64,
}

/// Shows each successful detection and optionally logs it to rerun.
fn review_detections<V: Preview>(
    detected: &[(RgbImage, PatternObservation)],
    board: &Board,
    config: &CalibrationConfig,
    preview: &mut V,
    recording: Option<&RecordingStream>,
) -> Result<()> {
    for (i, (image, obs)) in detected.iter().enumerate() {
        let corners = obs.points_2d();
        let mut overlay = image.clone();
        draw_chessboard_corners(&mut overlay, board.cols, &corners);
        // a cancel here only cuts the review short
        preview.show(PREVIEW_TITLE, &overlay, config.preview_duration())?;

        if let Some(recording) = recording {
            recording.set_time("image", rerun::TimeCell::from_sequence(i as i64));
            log_rgb_image(recording, "calibration", image)?;
            log_corners(recording, "calibration", board.cols, &corners)?;
        }
    }
    preview.close_all();
    Ok(())
}

fn crop_to_roi(img: &DynamicImage, roi: &Roi) -> DynamicImage {
    img.crop_imm(roi.x, roi.y, roi.width, roi.height)
}

/// Undistorts the test image twice, directly and through precomputed maps,
/// and writes both crops to the result directory.
pub fn undistort_test_image(
    model: &OpenCVModel5<f64>,
    test_image: &Path,
    result_dir: &Path,
    alpha: f64,
) -> Result<(na::Matrix3<f64>, Roi, [PathBuf; 2])> {
    let img = image::open(test_image)
        .map_err(|_| CalibError::MissingTestImage(test_image.to_path_buf()))?;
    let img = DynamicImage::ImageRgb8(img.to_rgb8());
    let (w, h) = (img.width(), img.height());

    let model_at_size = OpenCVModel5 {
        width: w,
        height: h,
        ..model.clone()
    };
    let (new_camera, roi) = optimal_new_camera_matrix(&model_at_size, alpha, (w, h));
    if roi.is_empty() {
        return Err(CalibError::EmptyRegionOfInterest);
    }

    let direct = undistort(&img, &model_at_size, &new_camera);
    let result1 = result_dir.join("result1_test_img.png");
    crop_to_roi(&direct, &roi).save(&result1)?;

    let (map_x, map_y) = init_undistort_map(&model_at_size, &new_camera, (w, h));
    let remapped = remap(&img, &map_x, &map_y);
    let result2 = result_dir.join("result2_test_img.png");
    crop_to_roi(&remapped, &roi).save(&result2)?;

    info!("undistorted test image written to {}", result_dir.display());
    Ok((new_camera, roi, [result1, result2]))
}

/// Runs the whole estimation stage.
pub fn run_estimation<V: Preview>(
    config: &CalibrationConfig,
    preview: &mut V,
    recording: Option<&RecordingStream>,
) -> Result<EstimationReport> {
    let board = Board::from_config(&config.board);
    let paths = image_paths(&config.input_glob)?;
    info!("{} images match {}", paths.len(), config.input_glob);

    let loaded = load_and_detect(&paths, &board, &config.subpix);
    let images_read = loaded.len();
    let detected: Vec<(RgbImage, PatternObservation)> = loaded
        .into_iter()
        .filter_map(|d| d.observation.map(|o| (d.image, o)))
        .collect();
    info!("board found in {} of {} images", detected.len(), images_read);

    review_detections(&detected, &board, config, preview, recording)?;
    let observations: Vec<PatternObservation> = detected.into_iter().map(|(_, o)| o).collect();

    let calibration = calibrate_camera(&observations, config.frame_size)?;
    let record = CalibrationRecord::from_model(&calibration.model, calibration.rms);
    let calibration_path = config.calibration_path();
    save_calibration(&calibration_path, &record)?;
    info!("calibration saved to {}", calibration_path.display());

    std::fs::create_dir_all(&config.result_dir)?;
    let (new_camera_matrix, roi, result_paths) = undistort_test_image(
        &calibration.model,
        &config.test_image,
        &config.result_dir,
        config.alpha,
    )?;

    let per_view = per_view_errors(&observations, &calibration.model, &calibration.poses);
    let mean_error = reprojection_error(&observations, &calibration.model, &calibration.poses);
    let named: Vec<(String, f64)> = observations
        .iter()
        .zip(&per_view)
        .map(|(o, e)| (o.source.display().to_string(), *e))
        .collect();
    if let Err(e) = write_report(&config.report_path(), &record, &named, mean_error, median(&per_view)) {
        warn!("could not write report: {e}");
    }

    Ok(EstimationReport {
        images_read,
        observations,
        calibration,
        record,
        calibration_path,
        new_camera_matrix,
        roi,
        result_paths,
        per_view_errors: per_view,
        mean_error,
    })
}
