//! Rendered checkerboard views with known camera and poses.

use image::{Rgb, RgbImage};
use nalgebra as na;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::board::Board;
use crate::camera_model::{CameraModel, OpenCVModel5};
use crate::types::RvecTvec;

const BLACK: u8 = 30;
const WHITE: u8 = 225;
const BACKGROUND: u8 = 128;
/// Samples per pixel along each axis.
const SUPERSAMPLE: u32 = 2;

/// The camera the dataset generator renders with.
pub fn default_synthetic_camera() -> OpenCVModel5<f64> {
    OpenCVModel5::new(
        &na::dvector![600.0, 600.0, 319.5, 239.5, -0.08, 0.02, 0.0, 0.0, 0.0],
        640,
        480,
    )
}

/// Intensity of the board plane at `(x, y)` in board units.
///
/// Interior corner `(c, r)` sits at `(c, r) * square`; the squares around the
/// corners are surrounded by a one square wide white margin.
fn board_intensity(board: &Board, x: f64, y: f64) -> u8 {
    let s = board.square_size as f64;
    let i = (x / s).floor() as i64 + 1;
    let j = (y / s).floor() as i64 + 1;
    let squares_x = board.cols as i64 + 1;
    let squares_y = board.rows as i64 + 1;
    if (0..squares_x).contains(&i) && (0..squares_y).contains(&j) {
        if (i + j) % 2 == 0 { BLACK } else { WHITE }
    } else if (-1..=squares_x).contains(&i) && (-1..=squares_y).contains(&j) {
        WHITE
    } else {
        BACKGROUND
    }
}

/// Ray-casts every pixel through the distortion model onto the board plane.
pub fn render_checkerboard(
    model: &OpenCVModel5<f64>,
    board: &Board,
    pose: &RvecTvec,
    img_w_h: (u32, u32),
) -> RgbImage {
    let iso = pose.to_na_isometry3();
    let rot_t = iso.rotation.inverse();
    // camera origin expressed in the board frame
    let origin = rot_t * (-iso.translation.vector);
    let step = 1.0 / SUPERSAMPLE as f64;

    RgbImage::from_par_fn(img_w_h.0, img_w_h.1, |x, y| {
        let mut acc = 0u32;
        for sy in 0..SUPERSAMPLE {
            for sx in 0..SUPERSAMPLE {
                let u = x as f64 + (sx as f64 + 0.5) * step - 0.5;
                let v = y as f64 + (sy as f64 + 0.5) * step - 0.5;
                let ray = rot_t * model.unproject_one(&na::Vector2::new(u, v));
                let value = if ray.z.abs() <= f64::EPSILON {
                    BACKGROUND
                } else {
                    let lambda = -origin.z / ray.z;
                    if lambda <= 0.0 {
                        BACKGROUND
                    } else {
                        let p = origin + ray * lambda;
                        board_intensity(board, p.x, p.y)
                    }
                };
                acc += value as u32;
            }
        }
        let g = (acc / (SUPERSAMPLE * SUPERSAMPLE)) as u8;
        Rgb([g, g, g])
    })
}

/// Varied board poses looking at the board centre from about `distance` away.
pub fn random_poses(board: &Board, n: usize, distance: f64, seed: u64) -> Vec<RvecTvec> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let c = board.center();
    let center = na::Vector3::new(c.x as f64, c.y as f64, c.z as f64);
    (0..n)
        .map(|_| {
            let rvec = na::Vector3::new(
                rng.random_range(-0.35..0.35),
                rng.random_range(-0.35..0.35),
                rng.random_range(-0.2..0.2),
            );
            let target = na::Vector3::new(
                rng.random_range(-30.0..30.0),
                rng.random_range(-30.0..30.0),
                distance + rng.random_range(-40.0..40.0),
            );
            let rotated_center = RvecTvec::new(rvec, na::Vector3::zeros()).transform_point(&center);
            RvecTvec::new(rvec, target - rotated_center)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn board_layout_has_x_junction_at_origin() {
        let board = Board::init_chessboard(9, 9, 20.0);
        assert_eq!(board_intensity(&board, -1.0, -1.0), BLACK);
        assert_eq!(board_intensity(&board, 1.0, 1.0), BLACK);
        assert_eq!(board_intensity(&board, 1.0, -1.0), WHITE);
        assert_eq!(board_intensity(&board, -25.0, 50.0), WHITE);
        assert_eq!(board_intensity(&board, -45.0, 50.0), BACKGROUND);
    }

    #[test]
    fn poses_put_board_centre_in_front() {
        let board = Board::init_chessboard(9, 9, 20.0);
        let c = board.center();
        for pose in random_poses(&board, 5, 550.0, 7) {
            let pc = pose.transform_point(&na::Vector3::new(c.x as f64, c.y as f64, 0.0));
            assert!(pc.z > 450.0 && pc.z < 650.0);
            assert!(pc.x.abs() <= 30.0 && pc.y.abs() <= 30.0);
        }
    }
}
