use image::{DynamicImage, GrayImage, Luma};
use nalgebra as na;
use webcam_calibration::board::{Board, create_default_9x9_board};
use webcam_calibration::camera_model::CameraModel;
use webcam_calibration::chessboard::{detect_refined_corners, find_chessboard_corners};
use webcam_calibration::config::SubPixConfig;
use webcam_calibration::synthetic::{default_synthetic_camera, random_poses, render_checkerboard};
use webcam_calibration::types::RvecTvec;

#[test]
fn test_detect_rendered_board() {
    let board = create_default_9x9_board();
    let model = default_synthetic_camera();
    let poses = random_poses(&board, 3, 550.0, 11);

    for pose in &poses {
        let rgb = render_checkerboard(&model, &board, pose, (640, 480));
        let gray = DynamicImage::ImageRgb8(rgb).to_luma8();
        let corners = detect_refined_corners(&gray, &board, &SubPixConfig::default())
            .expect("board should be found");
        assert_eq!(corners.len(), 81);

        let mut max_err = 0.0f64;
        for (c, p3d) in corners.iter().zip(&board.points_3d) {
            let pc = pose.transform_point(&na::Vector3::new(p3d.x as f64, p3d.y as f64, 0.0));
            let truth = model.project_one(&pc);
            let err = ((c.x as f64 - truth.x).powi(2) + (c.y as f64 - truth.y).powi(2)).sqrt();
            max_err = max_err.max(err);
        }
        assert!(max_err < 0.5, "max corner error {max_err}");
    }
}

#[test]
fn test_row_major_order() {
    let board = create_default_9x9_board();
    let model = default_synthetic_camera();
    let pose = &random_poses(&board, 1, 500.0, 3)[0];
    let gray = DynamicImage::ImageRgb8(render_checkerboard(&model, &board, pose, (640, 480)))
        .to_luma8();
    let corners = find_chessboard_corners(&gray, &board).unwrap();
    // columns advance to the right, rows advance downwards
    assert!(corners[1].x > corners[0].x);
    assert!(corners[board.cols].y > corners[0].y);
}

#[test]
fn test_no_board_in_blank_image() {
    let board = create_default_9x9_board();
    let gray = GrayImage::from_pixel(320, 240, Luma([128]));
    assert!(find_chessboard_corners(&gray, &board).is_none());
    assert!(detect_refined_corners(&gray, &board, &SubPixConfig::default()).is_none());
}

#[test]
fn test_partially_visible_board_is_rejected() {
    let board = create_default_9x9_board();
    let model = default_synthetic_camera();
    let pose = &random_poses(&board, 1, 550.0, 5)[0];
    let rgb = render_checkerboard(&model, &board, pose, (640, 480));
    // keep only the left part of the frame
    let cropped = image::imageops::crop_imm(&rgb, 0, 0, 300, 480).to_image();
    let gray = DynamicImage::ImageRgb8(cropped).to_luma8();
    assert!(find_chessboard_corners(&gray, &board).is_none());
}

#[test]
fn test_quarter_turned_board_is_not_mirrored() {
    let board = Board::init_chessboard(7, 5, 20.0);
    let model = default_synthetic_camera();
    let rvec = na::Vector3::new(0.15, -0.1, std::f64::consts::FRAC_PI_2);
    let c = board.center();
    let center = na::Vector3::new(c.x as f64, c.y as f64, c.z as f64);
    let rotated_center = RvecTvec::new(rvec, na::Vector3::zeros()).transform_point(&center);
    let pose = RvecTvec::new(rvec, na::Vector3::new(0.0, 0.0, 500.0) - rotated_center);

    let gray =
        DynamicImage::ImageRgb8(render_checkerboard(&model, &board, &pose, (640, 480))).to_luma8();
    let corners = detect_refined_corners(&gray, &board, &SubPixConfig::default())
        .expect("board should be found");

    let truth: Vec<na::Vector2<f64>> = board
        .points_3d
        .iter()
        .map(|p| model.project_one(&pose.transform_point(&na::Vector3::new(p.x as f64, p.y as f64, 0.0))))
        .collect();
    let max_err = |order: &mut dyn Iterator<Item = &na::Vector2<f64>>| {
        corners
            .iter()
            .zip(order)
            .map(|(c, t)| ((c.x as f64 - t.x).powi(2) + (c.y as f64 - t.y).powi(2)).sqrt())
            .fold(0.0f64, f64::max)
    };
    // the board's own order or its half turn; a mirror matches neither
    let direct = max_err(&mut truth.iter());
    let half_turn = max_err(&mut truth.iter().rev());
    assert!(direct.min(half_turn) < 0.5, "direct {direct}, half turn {half_turn}");

    let along_row = corners[1] - corners[0];
    let down_col = corners[board.cols] - corners[0];
    assert!(along_row.perp_dot(down_col) > 0.0);
}
