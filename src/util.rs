use nalgebra as na;
use rayon::prelude::*;

use crate::camera_model::{CameraModel, OpenCVModel5};
use crate::detected_points::PatternObservation;
use crate::types::RvecTvec;

/// Projected minus observed pixel for every corner of one view.
fn view_residuals(
    observation: &PatternObservation,
    model: &OpenCVModel5<f64>,
    pose: &RvecTvec,
) -> Vec<na::Vector2<f64>> {
    observation
        .features
        .iter()
        .map(|f| {
            let p3d = na::Vector3::new(f.p3d.x as f64, f.p3d.y as f64, f.p3d.z as f64);
            let p2d = model.project_one(&pose.transform_point(&p3d));
            p2d - na::Vector2::new(f.p2d.x as f64, f.p2d.y as f64)
        })
        .collect()
}

/// Error of one view: L2 norm over all its coordinate differences, divided
/// by the number of points.
pub fn view_reprojection_error(
    observation: &PatternObservation,
    model: &OpenCVModel5<f64>,
    pose: &RvecTvec,
) -> f64 {
    if observation.is_empty() {
        return 0.0;
    }
    let sq: f64 = view_residuals(observation, model, pose)
        .iter()
        .map(|d| d.norm_squared())
        .sum();
    sq.sqrt() / observation.len() as f64
}

/// Per-view errors, in observation order.
pub fn per_view_errors(
    observations: &[PatternObservation],
    model: &OpenCVModel5<f64>,
    poses: &[RvecTvec],
) -> Vec<f64> {
    observations
        .par_iter()
        .zip(poses.par_iter())
        .map(|(o, p)| view_reprojection_error(o, model, p))
        .collect()
}

/// Mean of the per-view errors; zero without observations.
pub fn reprojection_error(
    observations: &[PatternObservation],
    model: &OpenCVModel5<f64>,
    poses: &[RvecTvec],
) -> f64 {
    let errors = per_view_errors(observations, model, poses);
    if errors.is_empty() {
        return 0.0;
    }
    errors.iter().sum::<f64>() / errors.len() as f64
}

/// Root mean square point error in pixels.
pub fn rms_reprojection_error(
    observations: &[PatternObservation],
    model: &OpenCVModel5<f64>,
    poses: &[RvecTvec],
) -> f64 {
    let (sq, n) = observations
        .iter()
        .zip(poses)
        .flat_map(|(o, p)| view_residuals(o, model, p))
        .fold((0.0, 0usize), |(s, n), d| (s + d.norm_squared(), n + 1));
    if n == 0 { 0.0 } else { (sq / n as f64).sqrt() }
}

/// Median of a list of errors.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut v = values.to_vec();
    v.sort_by(|a, b| a.total_cmp(b));
    let mid = v.len() / 2;
    if v.len() % 2 == 0 {
        (v[mid - 1] + v[mid]) / 2.0
    } else {
        v[mid]
    }
}
