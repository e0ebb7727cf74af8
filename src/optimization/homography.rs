use nalgebra as na;

use crate::detected_points::PatternObservation;

/// Similarity moving the centroid to the origin with mean distance sqrt(2).
fn normalization_transform(points: &[na::Vector2<f64>]) -> Option<na::Matrix3<f64>> {
    let n = points.len() as f64;
    let centroid = points.iter().fold(na::Vector2::zeros(), |acc, p| acc + p) / n;
    let mean_dist = points.iter().map(|p| (p - centroid).norm()).sum::<f64>() / n;
    if mean_dist <= f64::EPSILON {
        return None;
    }
    let s = std::f64::consts::SQRT_2 / mean_dist;
    Some(na::Matrix3::new(
        s,
        0.0,
        -s * centroid.x,
        0.0,
        s,
        -s * centroid.y,
        0.0,
        0.0,
        1.0,
    ))
}

fn apply(t: &na::Matrix3<f64>, p: &na::Vector2<f64>) -> na::Vector2<f64> {
    let q = t * na::Vector3::new(p.x, p.y, 1.0);
    na::Vector2::new(q.x / q.z, q.y / q.z)
}

/// Normalised DLT estimate of `H` with `dst ~ H * src`, scaled so `H[(2, 2)] = 1`.
///
/// Needs at least four correspondences in general position.
pub fn find_homography(
    src: &[na::Vector2<f64>],
    dst: &[na::Vector2<f64>],
) -> Option<na::Matrix3<f64>> {
    if src.len() != dst.len() || src.len() < 4 {
        return None;
    }
    let t_src = normalization_transform(src)?;
    let t_dst = normalization_transform(dst)?;

    let mut ata = na::SMatrix::<f64, 9, 9>::zeros();
    for (s, d) in src.iter().zip(dst) {
        let s = apply(&t_src, s);
        let d = apply(&t_dst, d);
        let r0 = na::SVector::<f64, 9>::from_column_slice(&[
            -s.x,
            -s.y,
            -1.0,
            0.0,
            0.0,
            0.0,
            d.x * s.x,
            d.x * s.y,
            d.x,
        ]);
        let r1 = na::SVector::<f64, 9>::from_column_slice(&[
            0.0,
            0.0,
            0.0,
            -s.x,
            -s.y,
            -1.0,
            d.y * s.x,
            d.y * s.y,
            d.y,
        ]);
        ata += r0 * r0.transpose() + r1 * r1.transpose();
    }

    let eigen = na::SymmetricEigen::new(ata);
    let (min_idx, _) = eigen
        .eigenvalues
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))?;
    let h = eigen.eigenvectors.column(min_idx);
    let hn = na::Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8]);

    let h_full = t_dst.try_inverse()? * hn * t_src;
    let scale = h_full[(2, 2)];
    if scale.abs() <= f64::EPSILON {
        return None;
    }
    let h_full = h_full / scale;
    h_full.iter().all(|v| v.is_finite()).then_some(h_full)
}

/// Homography from the board plane (`z = 0`) to the detected pixels.
pub fn board_homography(observation: &PatternObservation) -> Option<na::Matrix3<f64>> {
    let (src, dst): (Vec<_>, Vec<_>) = observation
        .features
        .iter()
        .map(|f| {
            (
                na::Vector2::new(f.p3d.x as f64, f.p3d.y as f64),
                na::Vector2::new(f.p2d.x as f64, f.p2d.y as f64),
            )
        })
        .unzip();
    find_homography(&src, &dst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn recovers_known_homography() {
        let h = na::Matrix3::new(1.2, 0.1, 30.0, -0.05, 0.9, 12.0, 1e-4, -2e-4, 1.0);
        let src: Vec<_> = (0..5)
            .flat_map(|r| (0..4).map(move |c| na::Vector2::new(c as f64 * 20.0, r as f64 * 20.0)))
            .collect();
        let dst: Vec<_> = src.iter().map(|p| apply(&h, p)).collect();
        let est = find_homography(&src, &dst).unwrap();
        assert_relative_eq!(est, h, epsilon = 1e-6);
    }

    #[test]
    fn too_few_points() {
        let pts = vec![na::Vector2::new(0.0, 0.0); 3];
        assert!(find_homography(&pts, &pts).is_none());
    }
}
