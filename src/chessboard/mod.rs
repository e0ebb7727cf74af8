//! Checkerboard corner detection.
//!
//! Candidates come from the `chess-corners` ChESS detector, are assembled
//! into the board's lattice and finally refined to sub-pixel accuracy.

pub mod grid;
pub mod subpix;

use chess_corners::{ChessConfig, ThresholdMode, find_chess_corners_image};
use glam::Vec2;
use image::GrayImage;

use crate::board::Board;
use crate::config::SubPixConfig;

pub use grid::assemble_grid;
pub use subpix::corner_sub_pix;

/// ChESS settings that hold up on webcam frames of a printed board.
pub fn default_chess_config() -> ChessConfig {
    let mut cfg = ChessConfig::single_scale();
    cfg.threshold_mode = ThresholdMode::Relative;
    cfg.threshold_value = 0.2;
    cfg.nms_radius = 2;
    cfg
}

/// Corner candidates, strongest first.
pub fn detect_candidates(gray: &GrayImage, cfg: &ChessConfig) -> Vec<Vec2> {
    let mut corners = match find_chess_corners_image(gray, cfg) {
        Ok(corners) => corners,
        Err(e) => {
            log::warn!("ChESS detection failed: {e}");
            return Vec::new();
        }
    };
    corners.sort_by(|a, b| b.response.total_cmp(&a.response));
    corners.iter().map(|c| Vec2::new(c.x, c.y)).collect()
}

/// Finds all interior corners of `board` in `gray`, ordered row-major
/// (`k = r * cols + c`). `None` when the full pattern is not visible.
pub fn find_chessboard_corners(gray: &GrayImage, board: &Board) -> Option<Vec<Vec2>> {
    find_chessboard_corners_with(gray, board, &default_chess_config())
}

pub fn find_chessboard_corners_with(
    gray: &GrayImage,
    board: &Board,
    cfg: &ChessConfig,
) -> Option<Vec<Vec2>> {
    let candidates = detect_candidates(gray, cfg);
    if candidates.len() < board.cols * board.rows {
        log::trace!(
            "only {} candidates for a {}x{} board",
            candidates.len(),
            board.cols,
            board.rows
        );
        return None;
    }
    assemble_grid(&candidates, board.cols, board.rows)
}

/// Detection followed by sub-pixel refinement; the refined corners are returned.
pub fn detect_refined_corners(
    gray: &GrayImage,
    board: &Board,
    subpix: &SubPixConfig,
) -> Option<Vec<Vec2>> {
    let mut corners = find_chessboard_corners(gray, board)?;
    corner_sub_pix(gray, &mut corners, subpix);
    Some(corners)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::{default_synthetic_camera, random_poses, render_checkerboard};
    use image::DynamicImage;

    #[test]
    fn candidates_cover_rendered_board() {
        let board = Board::init_chessboard(5, 4, 25.0);
        let model = default_synthetic_camera();
        let pose = &random_poses(&board, 1, 450.0, 3)[0];
        let gray =
            DynamicImage::ImageRgb8(render_checkerboard(&model, &board, pose, (640, 480))).to_luma8();

        let candidates = detect_candidates(&gray, &default_chess_config());
        assert!(candidates.len() >= 20);
        assert!(find_chessboard_corners(&gray, &board).is_some());
    }

    #[test]
    fn flat_image_has_no_candidates() {
        let gray = GrayImage::from_pixel(64, 48, image::Luma([128]));
        assert!(detect_candidates(&gray, &default_chess_config()).is_empty());
        let board = Board::init_chessboard(3, 3, 10.0);
        assert!(find_chessboard_corners(&gray, &board).is_none());
    }
}
