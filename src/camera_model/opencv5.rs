use super::generic::CameraModel;
use nalgebra as na;

/// Iterations of the fixed-point distortion inversion.
const UNDISTORT_ITERATIONS: usize = 20;

/// Pinhole camera with Brown-Conrady distortion.
///
/// Parameter order is `[fx, fy, cx, cy, k1, k2, p1, p2, k3]`, so the last five
/// entries are the classic distortion vector.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenCVModel5<T: na::RealField + Clone> {
    pub fx: T,
    pub fy: T,
    pub cx: T,
    pub cy: T,
    pub k1: T,
    pub k2: T,
    pub p1: T,
    pub p2: T,
    pub k3: T,
    pub width: u32,
    pub height: u32,
}

impl<T: na::RealField + Clone> OpenCVModel5<T> {
    pub fn new(params: &na::DVector<T>, width: u32, height: u32) -> OpenCVModel5<T> {
        OpenCVModel5 {
            fx: params[0].clone(),
            fy: params[1].clone(),
            cx: params[2].clone(),
            cy: params[3].clone(),
            k1: params[4].clone(),
            k2: params[5].clone(),
            p1: params[6].clone(),
            p2: params[7].clone(),
            k3: params[8].clone(),
            width,
            height,
        }
    }

    /// Applies the distortion polynomial to a normalised image point.
    pub fn distort_impl(dist: &[T], xn: T, yn: T) -> (T, T) {
        let (k1, k2, p1, p2, k3) = (
            dist[0].clone(),
            dist[1].clone(),
            dist[2].clone(),
            dist[3].clone(),
            dist[4].clone(),
        );
        let one: T = na::convert(1.0);
        let two: T = na::convert(2.0);

        let x2 = xn.clone() * xn.clone();
        let y2 = yn.clone() * yn.clone();
        let xy = xn.clone() * yn.clone();
        let r2 = x2.clone() + y2.clone();
        let r4 = r2.clone() * r2.clone();
        let r6 = r4.clone() * r2.clone();
        let radial = one + k1 * r2.clone() + k2 * r4 + k3 * r6;

        let xd = xn * radial.clone()
            + two.clone() * p1.clone() * xy.clone()
            + p2.clone() * (r2.clone() + two.clone() * x2);
        let yd = yn * radial + p1 * (r2 + two.clone() * y2) + two * p2 * xy;
        (xd, yd)
    }

    /// Projects a camera-frame point with intrinsics `[fx, fy, cx, cy]` and
    /// distortion `[k1, k2, p1, p2, k3]`.
    pub fn project_one_impl(intrinsics: &[T], dist: &[T], pt: &na::Vector3<T>) -> na::Vector2<T> {
        let xn = pt[0].clone() / pt[2].clone();
        let yn = pt[1].clone() / pt[2].clone();
        let (xd, yd) = Self::distort_impl(dist, xn, yn);
        na::Vector2::new(
            intrinsics[0].clone() * xd + intrinsics[2].clone(),
            intrinsics[1].clone() * yd + intrinsics[3].clone(),
        )
    }

    fn intrinsics(&self) -> [T; 4] {
        [
            self.fx.clone(),
            self.fy.clone(),
            self.cx.clone(),
            self.cy.clone(),
        ]
    }

    fn dist(&self) -> [T; 5] {
        [
            self.k1.clone(),
            self.k2.clone(),
            self.p1.clone(),
            self.p2.clone(),
            self.k3.clone(),
        ]
    }
}

impl OpenCVModel5<f64> {
    pub fn from_matrix(
        camera_matrix: &na::Matrix3<f64>,
        dist_coeffs: &[f64; 5],
        width: u32,
        height: u32,
    ) -> OpenCVModel5<f64> {
        OpenCVModel5 {
            fx: camera_matrix[(0, 0)],
            fy: camera_matrix[(1, 1)],
            cx: camera_matrix[(0, 2)],
            cy: camera_matrix[(1, 2)],
            k1: dist_coeffs[0],
            k2: dist_coeffs[1],
            p1: dist_coeffs[2],
            p2: dist_coeffs[3],
            k3: dist_coeffs[4],
            width,
            height,
        }
    }

    pub fn camera_matrix(&self) -> na::Matrix3<f64> {
        na::Matrix3::new(
            self.fx, 0.0, self.cx, //
            0.0, self.fy, self.cy, //
            0.0, 0.0, 1.0,
        )
    }

    pub fn distortion(&self) -> [f64; 5] {
        [self.k1, self.k2, self.p1, self.p2, self.k3]
    }

    /// Pixel to normalised, distortion-free coordinates `(x, y)` with `z = 1`.
    pub fn undistort_normalized(&self, p: &na::Vector2<f64>) -> na::Vector2<f64> {
        let x0 = (p.x - self.cx) / self.fx;
        let y0 = (p.y - self.cy) / self.fy;
        let (mut x, mut y) = (x0, y0);
        for _ in 0..UNDISTORT_ITERATIONS {
            let r2 = x * x + y * y;
            let icdist = 1.0 / (1.0 + ((self.k3 * r2 + self.k2) * r2 + self.k1) * r2);
            if !icdist.is_finite() || icdist < 0.0 {
                return na::Vector2::new(x0, y0);
            }
            let dx = 2.0 * self.p1 * x * y + self.p2 * (r2 + 2.0 * x * x);
            let dy = self.p1 * (r2 + 2.0 * y * y) + 2.0 * self.p2 * x * y;
            let nx = (x0 - dx) * icdist;
            let ny = (y0 - dy) * icdist;
            let step = (nx - x).abs() + (ny - y).abs();
            x = nx;
            y = ny;
            if step < 1e-12 {
                break;
            }
        }
        na::Vector2::new(x, y)
    }
}

impl CameraModel<f64> for OpenCVModel5<f64> {
    fn params(&self) -> na::DVector<f64> {
        na::dvector![
            self.fx, self.fy, self.cx, self.cy, self.k1, self.k2, self.p1, self.p2, self.k3
        ]
    }

    fn width(&self) -> f64 {
        self.width as f64
    }

    fn height(&self) -> f64 {
        self.height as f64
    }

    fn project_one(&self, pt: &na::Vector3<f64>) -> na::Vector2<f64> {
        Self::project_one_impl(&self.intrinsics(), &self.dist(), pt)
    }

    fn unproject_one(&self, pt: &na::Vector2<f64>) -> na::Vector3<f64> {
        let xy = self.undistort_normalized(pt);
        na::Vector3::new(xy.x, xy.y, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn model() -> OpenCVModel5<f64> {
        OpenCVModel5::new(
            &na::dvector![600.0, 590.0, 320.0, 240.0, -0.12, 0.05, 0.001, -0.0005, 0.0],
            640,
            480,
        )
    }

    #[test]
    fn zero_distortion_is_pinhole() {
        let m = OpenCVModel5::<f64>::new(
            &na::dvector![500.0, 500.0, 320.0, 240.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            640,
            480,
        );
        let p = m.project_one(&na::Vector3::new(0.1, -0.2, 2.0));
        assert_relative_eq!(p, na::Vector2::new(345.0, 190.0), epsilon = 1e-12);
    }

    #[test]
    fn unproject_inverts_project() {
        let m = model();
        for (u, v) in [(10.0, 15.0), (320.0, 240.0), (600.0, 400.0), (100.0, 470.0)] {
            let ray = m.unproject_one(&na::Vector2::new(u, v));
            let back = m.project_one(&ray);
            assert_relative_eq!(back, na::Vector2::new(u, v), epsilon = 1e-6);
        }
    }

    #[test]
    fn matrix_round_trip() {
        let m = model();
        let again = OpenCVModel5::from_matrix(&m.camera_matrix(), &m.distortion(), 640, 480);
        assert_eq!(m, again);
    }

    #[test]
    fn tangential_terms_follow_opencv() {
        // xd = x + 2 p1 xy + p2 (r2 + 2x^2), yd = y + p1 (r2 + 2y^2) + 2 p2 xy
        let (xd, yd) = OpenCVModel5::<f64>::distort_impl(&[0.0, 0.0, 0.01, 0.02, 0.0], 0.2, -0.1);
        assert_relative_eq!(xd, 0.2022, epsilon = 1e-12);
        assert_relative_eq!(yd, -0.1001, epsilon = 1e-12);
    }

    #[test]
    fn optical_axis_hits_principal_point() {
        let m = OpenCVModel5::<f64>::new(
            &na::dvector![600.0, 590.0, 320.0, 240.0, -0.4, 0.2, 0.01, -0.01, 0.05],
            640,
            480,
        );
        let p = m.project_one(&na::Vector3::new(0.0, 0.0, 3.0));
        assert_eq!(p, na::Vector2::new(320.0, 240.0));
        let ray = m.unproject_one(&na::Vector2::new(320.0, 240.0));
        assert_relative_eq!(ray.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(ray.y, 0.0, epsilon = 1e-12);
    }
}
