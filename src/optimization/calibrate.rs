use std::collections::HashMap;

use log::{debug, info};
use nalgebra as na;
use tiny_solver::LevenbergMarquardtOptimizer;
use tiny_solver::optimizer::{Optimizer, OptimizerOptions};
use tiny_solver::problem::Problem;

use super::factors::ReprojectionFactor;
use super::homography::board_homography;
use super::linear::{init_intrinsics, init_pose};
use crate::camera_model::OpenCVModel5;
use crate::detected_points::PatternObservation;
use crate::error::{CalibError, Result};
use crate::types::RvecTvec;
use crate::util::rms_reprojection_error;

const INTRINSICS: &str = "intrinsics";
const DISTORTION: &str = "distortion";

/// Result of a calibration run.
#[derive(Debug, Clone)]
pub struct CalibrationOutput {
    pub model: OpenCVModel5<f64>,
    /// Board pose of every observation, in input order.
    pub poses: Vec<RvecTvec>,
    /// Root mean square reprojection error over all points, in pixels.
    pub rms: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct SolverOptions {
    pub max_iterations: usize,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self { max_iterations: 100 }
    }
}

fn rvec_key(i: usize) -> String {
    format!("rvec{i}")
}

fn tvec_key(i: usize) -> String {
    format!("tvec{i}")
}

/// Estimates intrinsics, distortion and per-view poses from board observations.
pub fn calibrate_camera(
    observations: &[PatternObservation],
    img_w_h: (u32, u32),
) -> Result<CalibrationOutput> {
    calibrate_camera_with(observations, img_w_h, &SolverOptions::default())
}

pub fn calibrate_camera_with(
    observations: &[PatternObservation],
    img_w_h: (u32, u32),
    options: &SolverOptions,
) -> Result<CalibrationOutput> {
    if observations.is_empty() {
        return Err(CalibError::NoObservations);
    }
    if let Some(bad) = observations.iter().find(|o| o.len() < 4) {
        return Err(CalibError::Degenerate(format!(
            "{} has only {} points",
            bad.source.display(),
            bad.len()
        )));
    }

    let homographies = observations
        .iter()
        .map(|o| {
            board_homography(o).ok_or_else(|| {
                CalibError::Degenerate(format!("no homography for {}", o.source.display()))
            })
        })
        .collect::<Result<Vec<_>>>()?;
    let intrinsics = init_intrinsics(&homographies, img_w_h).ok_or_else(|| {
        CalibError::Degenerate("focal length initialisation is not finite".to_string())
    })?;
    info!(
        "initial intrinsics fx {:.2} fy {:.2} cx {:.2} cy {:.2}",
        intrinsics[0], intrinsics[1], intrinsics[2], intrinsics[3]
    );

    let mut initial_values = HashMap::<String, na::DVector<f64>>::new();
    initial_values.insert(INTRINSICS.to_string(), na::DVector::from_row_slice(&intrinsics));
    initial_values.insert(DISTORTION.to_string(), na::DVector::zeros(5));

    let mut problem = Problem::new();
    for (i, obs) in observations.iter().enumerate() {
        let pose = init_pose(obs, &intrinsics).ok_or_else(|| {
            CalibError::Degenerate(format!("no initial pose for {}", obs.source.display()))
        })?;
        let (rk, tk) = (rvec_key(i), tvec_key(i));
        initial_values.insert(rk.clone(), pose.na_rvec());
        initial_values.insert(tk.clone(), pose.na_tvec());
        for f in &obs.features {
            let cost = ReprojectionFactor::new(&f.p3d, &f.p2d);
            problem.add_residual_block(
                2,
                &[INTRINSICS, DISTORTION, rk.as_str(), tk.as_str()],
                Box::new(cost),
                None,
            );
        }
    }

    let optimizer = LevenbergMarquardtOptimizer::default();
    let solver_options = OptimizerOptions {
        max_iteration: options.max_iterations,
        ..Default::default()
    };
    let result = optimizer
        .optimize(&problem, &initial_values, Some(solver_options))
        .ok_or(CalibError::SolverFailed)?;

    let block = |key: &str| result.get(key).ok_or(CalibError::SolverFailed);
    let intr = block(INTRINSICS)?;
    let dist = block(DISTORTION)?;
    let params = na::DVector::from_iterator(9, intr.iter().chain(dist.iter()).cloned());
    if params.iter().any(|v| !v.is_finite()) {
        return Err(CalibError::SolverFailed);
    }
    let model = OpenCVModel5::new(&params, img_w_h.0, img_w_h.1);

    let poses = (0..observations.len())
        .map(|i| {
            let r = block(&rvec_key(i))?;
            let t = block(&tvec_key(i))?;
            Ok(RvecTvec::from_slices(r.as_slice(), t.as_slice()))
        })
        .collect::<Result<Vec<_>>>()?;

    let rms = rms_reprojection_error(observations, &model, &poses);
    debug!("calibrated params {:?}", params.as_slice());
    info!("calibration rms {rms:.4} px over {} views", observations.len());
    Ok(CalibrationOutput { model, poses, rms })
}
