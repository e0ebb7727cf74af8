use glam;
use std::path::PathBuf;

use crate::board::Board;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeaturePoint {
    pub p2d: glam::Vec2,
    pub p3d: glam::Vec3,
}

/// Detected corners of one calibration image paired with the board points
/// they correspond to. Pairs are stored together so the 2D and 3D sequences
/// always have the same length and index alignment.
#[derive(Debug, Clone)]
pub struct PatternObservation {
    pub source: PathBuf,
    pub img_w_h: (u32, u32),
    pub features: Vec<FeaturePoint>,
}

impl PatternObservation {
    /// Pairs refined corners with the board's object points, in board order.
    ///
    /// Returns `None` when the corner count does not match the board.
    pub fn from_corners(
        source: PathBuf,
        img_w_h: (u32, u32),
        board: &Board,
        corners: &[glam::Vec2],
    ) -> Option<PatternObservation> {
        if corners.len() != board.points_3d.len() {
            return None;
        }
        let features = corners
            .iter()
            .zip(&board.points_3d)
            .map(|(p2d, p3d)| FeaturePoint {
                p2d: *p2d,
                p3d: *p3d,
            })
            .collect();
        Some(PatternObservation {
            source,
            img_w_h,
            features,
        })
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn points_2d(&self) -> Vec<glam::Vec2> {
        self.features.iter().map(|f| f.p2d).collect()
    }

    pub fn points_3d(&self) -> Vec<glam::Vec3> {
        self.features.iter().map(|f| f.p3d).collect()
    }
}
