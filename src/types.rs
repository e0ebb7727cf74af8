use nalgebra as na;

/// Board-to-camera pose as a Rodrigues rotation vector and a translation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RvecTvec {
    pub rvec: na::Vector3<f64>,
    pub tvec: na::Vector3<f64>,
}

impl RvecTvec {
    pub fn new(rvec: na::Vector3<f64>, tvec: na::Vector3<f64>) -> RvecTvec {
        RvecTvec { rvec, tvec }
    }

    pub fn from_slices(rvec: &[f64], tvec: &[f64]) -> RvecTvec {
        RvecTvec {
            rvec: na::Vector3::new(rvec[0], rvec[1], rvec[2]),
            tvec: na::Vector3::new(tvec[0], tvec[1], tvec[2]),
        }
    }

    pub fn na_rvec(&self) -> na::DVector<f64> {
        na::dvector![self.rvec.x, self.rvec.y, self.rvec.z]
    }

    pub fn na_tvec(&self) -> na::DVector<f64> {
        na::dvector![self.tvec.x, self.tvec.y, self.tvec.z]
    }

    pub fn to_na_isometry3(&self) -> na::Isometry3<f64> {
        na::Isometry3::new(self.tvec, self.rvec)
    }

    pub fn transform_point(&self, p: &na::Vector3<f64>) -> na::Vector3<f64> {
        rotate_by_rvec(&[self.rvec.x, self.rvec.y, self.rvec.z], p) + self.tvec
    }
}

pub trait ToRvecTvec {
    fn to_rvec_tvec(&self) -> RvecTvec;
}

impl ToRvecTvec for na::Isometry3<f64> {
    fn to_rvec_tvec(&self) -> RvecTvec {
        RvecTvec {
            rvec: self.rotation.scaled_axis(),
            tvec: self.translation.vector,
        }
    }
}

/// Rotates `p` by the axis-angle vector `rvec` (Rodrigues' formula).
///
/// Generic over the scalar so the solver can differentiate through it. Close
/// to the identity the first-order form is used, which keeps the derivative
/// finite at `rvec = 0`.
pub fn rotate_by_rvec<T: na::RealField>(rvec: &[T], p: &na::Vector3<T>) -> na::Vector3<T> {
    let (rx, ry, rz) = (rvec[0].clone(), rvec[1].clone(), rvec[2].clone());
    let (px, py, pz) = (p[0].clone(), p[1].clone(), p[2].clone());

    // r x p
    let cx = ry.clone() * pz.clone() - rz.clone() * py.clone();
    let cy = rz.clone() * px.clone() - rx.clone() * pz.clone();
    let cz = rx.clone() * py.clone() - ry.clone() * px.clone();

    let theta2 = rx.clone() * rx.clone() + ry.clone() * ry.clone() + rz.clone() * rz.clone();
    let eps: T = na::convert(1e-16);
    if theta2 < eps {
        return na::Vector3::new(px + cx, py + cy, pz + cz);
    }
    let theta = theta2.clone().sqrt();
    let sin_t = theta.clone().sin();
    let cos_t = theta.clone().cos();
    let one: T = na::convert(1.0);

    let a = sin_t / theta.clone();
    let b = (one.clone() - cos_t.clone()) / theta2;
    let dot = rx.clone() * px.clone() + ry.clone() * py.clone() + rz.clone() * pz.clone();

    na::Vector3::new(
        px * cos_t.clone() + cx * a.clone() + rx * dot.clone() * b.clone(),
        py * cos_t.clone() + cy * a.clone() + ry * dot.clone() * b.clone(),
        pz * cos_t + cz * a + rz * dot * b,
    )
}
