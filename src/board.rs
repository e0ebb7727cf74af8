use glam;
use serde::{Deserialize, Serialize};

/// Checkerboard geometry: number of interior corners and the square edge
/// length in world units (millimetres by default).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChessboardConfig {
    pub inner_cols: usize,
    pub inner_rows: usize,
    pub square_size: f32,
}

impl Default for ChessboardConfig {
    fn default() -> Self {
        Self {
            inner_cols: 9,
            inner_rows: 9,
            square_size: 20.0,
        }
    }
}

impl ChessboardConfig {
    pub fn corner_count(&self) -> usize {
        self.inner_cols * self.inner_rows
    }
}

pub struct Board {
    pub cols: usize,
    pub rows: usize,
    pub square_size: f32,
    /// Row-major object points, `k = r * cols + c` sits at `(c, r, 0) * square_size`.
    pub points_3d: Vec<glam::Vec3>,
}

impl Board {
    pub fn from_config(board_config: &ChessboardConfig) -> Board {
        Self::init_chessboard(
            board_config.inner_cols,
            board_config.inner_rows,
            board_config.square_size,
        )
    }
    pub fn init_chessboard(cols: usize, rows: usize, square_size: f32) -> Board {
        let mut points_3d = Vec::with_capacity(cols * rows);
        for r in 0..rows {
            for c in 0..cols {
                points_3d.push(glam::Vec3 {
                    x: c as f32 * square_size,
                    y: r as f32 * square_size,
                    z: 0.0,
                });
            }
        }
        Board {
            cols,
            rows,
            square_size,
            points_3d,
        }
    }

    /// Centre of the interior-corner grid on the board plane.
    pub fn center(&self) -> glam::Vec3 {
        glam::Vec3::new(
            (self.cols.saturating_sub(1)) as f32 * self.square_size / 2.0,
            (self.rows.saturating_sub(1)) as f32 * self.square_size / 2.0,
            0.0,
        )
    }
}

pub fn create_default_9x9_board() -> Board {
    Board::from_config(&ChessboardConfig::default())
}
