//! Iterative sub-pixel corner refinement.
//!
//! At a saddle point every image gradient in the neighbourhood is orthogonal
//! to the vector from the corner to the gradient's location. Each iteration
//! solves the weighted least-squares system expressing that condition over a
//! Gaussian-weighted window and moves the estimate to its solution.

use glam::Vec2;
use image::GrayImage;

use crate::config::SubPixConfig;

/// Refines every corner in place. Corners whose update escapes the search
/// window keep their initial position.
pub fn corner_sub_pix(gray: &GrayImage, corners: &mut [Vec2], cfg: &SubPixConfig) {
    let win = cfg.half_window.max(1) as i32;
    let weights = gaussian_mask(win);
    for c in corners.iter_mut() {
        *c = refine_one(gray, *c, win, &weights, cfg);
    }
}

fn gaussian_mask(win: i32) -> Vec<f32> {
    let side = (2 * win + 1) as usize;
    let inv = 1.0 / (win * win) as f32;
    let axis: Vec<f32> = (-win..=win)
        .map(|x| (-(x * x) as f32 * inv).exp())
        .collect();
    let mut mask = Vec::with_capacity(side * side);
    for wy in &axis {
        for wx in &axis {
            mask.push(wx * wy);
        }
    }
    mask
}

#[inline]
fn sample(gray: &GrayImage, x: f32, y: f32) -> f32 {
    let (w, h) = (gray.width() as i32, gray.height() as i32);
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;
    let at = |xx: i32, yy: i32| {
        let xx = xx.clamp(0, w - 1) as u32;
        let yy = yy.clamp(0, h - 1) as u32;
        gray.get_pixel(xx, yy).0[0] as f32
    };
    let (x0, y0) = (x0 as i32, y0 as i32);
    let top = at(x0, y0) * (1.0 - fx) + at(x0 + 1, y0) * fx;
    let bottom = at(x0, y0 + 1) * (1.0 - fx) + at(x0 + 1, y0 + 1) * fx;
    top * (1.0 - fy) + bottom * fy
}

fn refine_one(gray: &GrayImage, start: Vec2, win: i32, mask: &[f32], cfg: &SubPixConfig) -> Vec2 {
    // patch with a one pixel apron for the central differences
    let side = (2 * win + 3) as usize;
    let mut patch = vec![0.0f32; side * side];
    let eps2 = cfg.epsilon * cfg.epsilon;

    let mut ci = start;
    for _ in 0..cfg.max_iterations.max(1) {
        for (row, py) in (-win - 1..=win + 1).enumerate() {
            for (col, px) in (-win - 1..=win + 1).enumerate() {
                patch[row * side + col] = sample(gray, ci.x + px as f32, ci.y + py as f32);
            }
        }

        let (mut a, mut b, mut c, mut bb1, mut bb2) = (0.0f64, 0.0f64, 0.0f64, 0.0f64, 0.0f64);
        for i in 0..(2 * win + 1) as usize {
            let py = i as f64 - win as f64;
            for j in 0..(2 * win + 1) as usize {
                let px = j as f64 - win as f64;
                let m = mask[i * (2 * win + 1) as usize + j] as f64;
                let (r, k) = (i + 1, j + 1);
                let gx = (patch[r * side + k + 1] - patch[r * side + k - 1]) as f64 * 0.5;
                let gy = (patch[(r + 1) * side + k] - patch[(r - 1) * side + k]) as f64 * 0.5;
                let gxx = gx * gx * m;
                let gxy = gx * gy * m;
                let gyy = gy * gy * m;
                a += gxx;
                b += gxy;
                c += gyy;
                bb1 += gxx * px + gxy * py;
                bb2 += gxy * px + gyy * py;
            }
        }

        let det = a * c - b * b;
        if det.abs() <= f64::EPSILON {
            break;
        }
        let scale = 1.0 / det;
        let next = Vec2::new(
            (ci.x as f64 + c * scale * bb1 - b * scale * bb2) as f32,
            (ci.y as f64 - b * scale * bb1 + a * scale * bb2) as f32,
        );
        let moved = next.distance_squared(ci);
        ci = next;
        if moved <= eps2 {
            break;
        }
    }

    if (ci.x - start.x).abs() > win as f32 || (ci.y - start.y).abs() > win as f32 {
        start
    } else {
        ci
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Anti-aliased X-junction centred at `(cx, cy)`.
    fn saddle(cx: f32, cy: f32) -> GrayImage {
        GrayImage::from_fn(40, 40, |x, y| {
            let mut acc = 0.0;
            for sy in 0..4 {
                for sx in 0..4 {
                    let u = x as f32 + (sx as f32 + 0.5) / 4.0 - 0.5 - cx;
                    let v = y as f32 + (sy as f32 + 0.5) / 4.0 - 0.5 - cy;
                    acc += if (u > 0.0) == (v > 0.0) { 30.0 } else { 220.0 };
                }
            }
            image::Luma([(acc / 16.0) as u8])
        })
    }

    #[test]
    fn converges_to_subpixel_saddle() {
        let img = saddle(19.3, 20.6);
        let mut corners = [Vec2::new(18.0, 22.0)];
        corner_sub_pix(&img, &mut corners, &SubPixConfig::default());
        assert!((corners[0].x - 19.3).abs() < 0.2, "{:?}", corners[0]);
        assert!((corners[0].y - 20.6).abs() < 0.2, "{:?}", corners[0]);
    }

    #[test]
    fn flat_region_keeps_estimate() {
        let img = GrayImage::from_pixel(30, 30, image::Luma([100]));
        let mut corners = [Vec2::new(15.0, 15.0)];
        corner_sub_pix(&img, &mut corners, &SubPixConfig::default());
        assert_eq!(corners[0], Vec2::new(15.0, 15.0));
    }
}
