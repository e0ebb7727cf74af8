use log::debug;
use nalgebra as na;
use sqpnp_simple::sqpnp_solve_glam;

use crate::detected_points::PatternObservation;
use crate::types::{RvecTvec, ToRvecTvec};

/// Initial `[fx, fy, cx, cy]` from board homographies.
///
/// The principal point is fixed at the image centre; the focal lengths come
/// from the orthogonality of the rotation columns (and of their bisectors)
/// encoded in every view's homography, solved in the least-squares sense.
pub fn init_intrinsics(homographies: &[na::Matrix3<f64>], img_w_h: (u32, u32)) -> Option<[f64; 4]> {
    if homographies.is_empty() {
        return None;
    }
    let cx = (img_w_h.0 as f64 - 1.0) * 0.5;
    let cy = (img_w_h.1 as f64 - 1.0) * 0.5;

    let n = homographies.len();
    let mut a = na::DMatrix::<f64>::zeros(2 * n, 2);
    let mut b = na::DVector::<f64>::zeros(2 * n);
    for (i, hm) in homographies.iter().enumerate() {
        let mut hm = *hm;
        for c in 0..3 {
            hm[(0, c)] -= hm[(2, c)] * cx;
            hm[(1, c)] -= hm[(2, c)] * cy;
        }
        let h = hm.column(0).normalize();
        let v = hm.column(1).normalize();
        let d1 = ((hm.column(0) + hm.column(1)) * 0.5).normalize();
        let d2 = ((hm.column(0) - hm.column(1)) * 0.5).normalize();

        a[(2 * i, 0)] = h[0] * v[0];
        a[(2 * i, 1)] = h[1] * v[1];
        b[2 * i] = -h[2] * v[2];
        a[(2 * i + 1, 0)] = d1[0] * d2[0];
        a[(2 * i + 1, 1)] = d1[1] * d2[1];
        b[2 * i + 1] = -d1[2] * d2[2];
    }

    let f = a.svd(true, true).solve(&b, 1e-12).ok()?;
    let fx = (1.0 / f[0]).abs().sqrt();
    let fy = (1.0 / f[1]).abs().sqrt();
    debug!("initial focal lengths fx {fx:.2} fy {fy:.2}");
    (fx.is_finite() && fy.is_finite() && fx > 0.0 && fy > 0.0).then_some([fx, fy, cx, cy])
}

fn normalized_points(observation: &PatternObservation, intrinsics: &[f64; 4]) -> Vec<glam::Vec2> {
    let [fx, fy, cx, cy] = *intrinsics;
    observation
        .features
        .iter()
        .map(|f| {
            glam::Vec2::new(
                ((f.p2d.x as f64 - cx) / fx) as f32,
                ((f.p2d.y as f64 - cy) / fy) as f32,
            )
        })
        .collect()
}

/// Pose from the plane homography of normalised points (Zhang's decomposition).
pub fn pose_from_homography(h: &na::Matrix3<f64>) -> Option<RvecTvec> {
    let h1 = h.column(0).into_owned();
    let h2 = h.column(1).into_owned();
    let h3 = h.column(2).into_owned();
    let norm = h1.norm();
    if norm <= f64::EPSILON {
        return None;
    }
    let mut lambda = 1.0 / norm;
    // board in front of the camera
    if h3.z * lambda < 0.0 {
        lambda = -lambda;
    }
    let r1 = h1 * lambda;
    let r2 = h2 * lambda;
    let r3 = r1.cross(&r2);
    let t = h3 * lambda;

    let approx = na::Matrix3::from_columns(&[r1, r2, r3]);
    let svd = approx.svd(true, true);
    let (u, v_t) = (svd.u?, svd.v_t?);
    let mut rot = u * v_t;
    if rot.determinant() < 0.0 {
        let mut u = u;
        u.column_mut(2).neg_mut();
        rot = u * v_t;
    }
    let rotation = na::Rotation3::from_matrix_unchecked(rot);
    let iso = na::Isometry3::from_parts(na::Translation3::from(t), rotation.into());
    Some(iso.to_rvec_tvec())
}

fn mean_normalized_error(pose: &RvecTvec, p3ds: &[glam::Vec3], p2ds: &[glam::Vec2]) -> f64 {
    let total: f64 = p3ds
        .iter()
        .zip(p2ds)
        .map(|(p3, p2)| {
            let pc = pose.transform_point(&na::Vector3::new(p3.x as f64, p3.y as f64, p3.z as f64));
            if pc.z <= 0.0 {
                return f64::INFINITY;
            }
            let dx = pc.x / pc.z - p2.x as f64;
            let dy = pc.y / pc.z - p2.y as f64;
            (dx * dx + dy * dy).sqrt()
        })
        .sum();
    total / p3ds.len().max(1) as f64
}

/// Initial board pose of one view with distortion assumed zero.
///
/// Runs SQPnP on normalised coordinates and the homography decomposition,
/// keeping whichever explains the points better.
pub fn init_pose(observation: &PatternObservation, intrinsics: &[f64; 4]) -> Option<RvecTvec> {
    let p2ds = normalized_points(observation, intrinsics);
    let p3ds = observation.points_3d();

    let from_h = {
        let src: Vec<_> = p3ds
            .iter()
            .map(|p| na::Vector2::new(p.x as f64, p.y as f64))
            .collect();
        let dst: Vec<_> = p2ds
            .iter()
            .map(|p| na::Vector2::new(p.x as f64, p.y as f64))
            .collect();
        super::homography::find_homography(&src, &dst).and_then(|h| pose_from_homography(&h))
    };
    let from_pnp = sqpnp_solve_glam(&p3ds, &p2ds).map(|(r, t)| {
        RvecTvec::new(na::Vector3::new(r.0, r.1, r.2), na::Vector3::new(t.0, t.1, t.2))
    });

    [from_pnp, from_h]
        .into_iter()
        .flatten()
        .map(|pose| (mean_normalized_error(&pose, &p3ds, &p2ds), pose))
        .filter(|(err, _)| err.is_finite())
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(err, pose)| {
            debug!("initial pose error {err:.2e} (normalised units)");
            pose
        })
}
