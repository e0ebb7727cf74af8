use nalgebra as na;
use serde::{Deserialize, Serialize};

use super::opencv5::OpenCVModel5;

/// Sampling density along each image axis.
const GRID_N: usize = 9;

/// Rectangle of valid pixels in a rectified image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roi {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Roi {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

#[derive(Debug, Clone, Copy)]
struct RectF {
    x: f64,
    y: f64,
    w: f64,
    h: f64,
}

/// Inner and outer rectangles of the undistorted image border.
///
/// The inner rectangle contains only points that have a source pixel, the
/// outer one contains every source pixel. With `new_camera` the rectangles
/// are in that camera's pixels, otherwise in normalised coordinates.
fn undistorted_rectangles(
    model: &OpenCVModel5<f64>,
    new_camera: Option<&na::Matrix3<f64>>,
) -> (RectF, RectF) {
    let (w, h) = (model.width as f64, model.height as f64);
    let (mut ix0, mut ix1, mut iy0, mut iy1) = (f64::MIN, f64::MAX, f64::MIN, f64::MAX);
    let (mut ox0, mut ox1, mut oy0, mut oy1) = (f64::MAX, f64::MIN, f64::MAX, f64::MIN);

    for yi in 0..GRID_N {
        for xi in 0..GRID_N {
            let src = na::Vector2::new(
                xi as f64 * w / (GRID_N - 1) as f64,
                yi as f64 * h / (GRID_N - 1) as f64,
            );
            let n = model.undistort_normalized(&src);
            let p = match new_camera {
                Some(k) => na::Vector2::new(
                    k[(0, 0)] * n.x + k[(0, 2)],
                    k[(1, 1)] * n.y + k[(1, 2)],
                ),
                None => n,
            };
            ox0 = ox0.min(p.x);
            ox1 = ox1.max(p.x);
            oy0 = oy0.min(p.y);
            oy1 = oy1.max(p.y);
            if xi == 0 {
                ix0 = ix0.max(p.x);
            }
            if xi == GRID_N - 1 {
                ix1 = ix1.min(p.x);
            }
            if yi == 0 {
                iy0 = iy0.max(p.y);
            }
            if yi == GRID_N - 1 {
                iy1 = iy1.min(p.y);
            }
        }
    }
    (
        RectF {
            x: ix0,
            y: iy0,
            w: ix1 - ix0,
            h: iy1 - iy0,
        },
        RectF {
            x: ox0,
            y: oy0,
            w: ox1 - ox0,
            h: oy1 - oy0,
        },
    )
}

/// New camera matrix for undistortion and the region of valid pixels.
///
/// `alpha = 0` zooms in until every output pixel has a source pixel,
/// `alpha = 1` zooms out until every source pixel is kept; values in between
/// interpolate. The returned region is clipped to `new_size`.
pub fn optimal_new_camera_matrix(
    model: &OpenCVModel5<f64>,
    alpha: f64,
    new_size: (u32, u32),
) -> (na::Matrix3<f64>, Roi) {
    let alpha = alpha.clamp(0.0, 1.0);
    let (nw, nh) = if new_size.0 == 0 || new_size.1 == 0 {
        (model.width, model.height)
    } else {
        new_size
    };
    let (inner, outer) = undistorted_rectangles(model, None);

    let fx0 = (nw as f64 - 1.0) / inner.w;
    let fy0 = (nh as f64 - 1.0) / inner.h;
    let cx0 = -fx0 * inner.x;
    let cy0 = -fy0 * inner.y;

    let fx1 = (nw as f64 - 1.0) / outer.w;
    let fy1 = (nh as f64 - 1.0) / outer.h;
    let cx1 = -fx1 * outer.x;
    let cy1 = -fy1 * outer.y;

    let new_camera = na::Matrix3::new(
        fx0 * (1.0 - alpha) + fx1 * alpha,
        0.0,
        cx0 * (1.0 - alpha) + cx1 * alpha,
        0.0,
        fy0 * (1.0 - alpha) + fy1 * alpha,
        cy0 * (1.0 - alpha) + cy1 * alpha,
        0.0,
        0.0,
        1.0,
    );

    let (valid, _) = undistorted_rectangles(model, Some(&new_camera));
    let roi = clip_rect(valid, nw, nh);
    log::debug!("new camera matrix {new_camera:?}, valid region {roi:?}");
    (new_camera, roi)
}

fn clip_rect(r: RectF, w: u32, h: u32) -> Roi {
    if !(r.x.is_finite() && r.y.is_finite() && r.w.is_finite() && r.h.is_finite()) {
        return Roi {
            x: 0,
            y: 0,
            width: 0,
            height: 0,
        };
    }
    let x0 = r.x.round() as i64;
    let y0 = r.y.round() as i64;
    let x1 = x0 + r.w.round() as i64;
    let y1 = y0 + r.h.round() as i64;

    let cx0 = x0.clamp(0, w as i64);
    let cy0 = y0.clamp(0, h as i64);
    let cx1 = x1.clamp(0, w as i64);
    let cy1 = y1.clamp(0, h as i64);
    Roi {
        x: cx0 as u32,
        y: cy0 as u32,
        width: (cx1 - cx0).max(0) as u32,
        height: (cy1 - cy0).max(0) as u32,
    }
}
