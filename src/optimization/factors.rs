use nalgebra as na;
use tiny_solver::factors::Factor;

use crate::camera_model::OpenCVModel5;
use crate::types::rotate_by_rvec;

/// Reprojection residual of one board corner.
///
/// Parameter blocks: `[intrinsics(4), distortion(5), rvec(3), tvec(3)]`.
#[derive(Debug, Clone)]
pub struct ReprojectionFactor {
    pub p3d: na::Vector3<f64>,
    pub p2d: na::Vector2<f64>,
}

impl ReprojectionFactor {
    pub fn new(p3d: &glam::Vec3, p2d: &glam::Vec2) -> ReprojectionFactor {
        ReprojectionFactor {
            p3d: na::Vector3::new(p3d.x as f64, p3d.y as f64, p3d.z as f64),
            p2d: na::Vector2::new(p2d.x as f64, p2d.y as f64),
        }
    }
}

impl<T: na::RealField> Factor<T> for ReprojectionFactor {
    fn residual_func(&self, params: &[na::DVector<T>]) -> na::DVector<T> {
        let p3d = na::Vector3::<T>::new(
            na::convert(self.p3d.x),
            na::convert(self.p3d.y),
            na::convert(self.p3d.z),
        );
        let tvec = na::Vector3::new(
            params[3][0].clone(),
            params[3][1].clone(),
            params[3][2].clone(),
        );
        let p3d_t = rotate_by_rvec(params[2].as_slice(), &p3d) + tvec;
        let p2d_p =
            OpenCVModel5::<T>::project_one_impl(params[0].as_slice(), params[1].as_slice(), &p3d_t);

        let u: T = na::convert(self.p2d.x);
        let v: T = na::convert(self.p2d.y);
        na::dvector![p2d_p[0].clone() - u, p2d_p[1].clone() - v]
    }
}
