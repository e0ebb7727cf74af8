use image::{DynamicImage, Pixel, RgbImage};
use nalgebra as na;
use rayon::prelude::*;

pub trait CameraModel<T: na::RealField + Clone>
where
    Self: Sync,
{
    fn params(&self) -> na::DVector<T>;
    fn width(&self) -> T;
    fn height(&self) -> T;
    fn project_one(&self, pt: &na::Vector3<T>) -> na::Vector2<T>;
    /// Ray through a pixel, scaled to `z = 1`.
    fn unproject_one(&self, pt: &na::Vector2<T>) -> na::Vector3<T>;
    /// Projects points, `None` for those landing outside the image.
    fn project(&self, p3d: &[na::Vector3<T>]) -> Vec<Option<na::Vector2<T>>> {
        let zero: T = na::convert(0.0);
        p3d.par_iter()
            .map(|pt| {
                if pt[2] <= zero {
                    return None;
                }
                let p2d = self.project_one(pt);
                if p2d[0] < zero
                    || p2d[0] > self.width()
                    || p2d[1] < zero
                    || p2d[1] > self.height()
                {
                    None
                } else {
                    Some(p2d)
                }
            })
            .collect()
    }
    fn unproject(&self, p2d: &[na::Vector2<T>]) -> Vec<na::Vector3<T>> {
        p2d.par_iter().map(|p| self.unproject_one(p)).collect()
    }
}

/// Source coordinates of every pixel of the rectified image.
///
/// Each destination pixel is back-projected through `projection_mat` onto the
/// `z = 1` plane and forward-projected through the distorted `camera_model`.
/// Maps are `height x width`; pixels with no source are NaN.
pub fn init_undistort_map(
    camera_model: &dyn CameraModel<f64>,
    projection_mat: &na::Matrix3<f64>,
    new_w_h: (u32, u32),
) -> (na::DMatrix<f32>, na::DMatrix<f32>) {
    let (w, h) = (new_w_h.0 as usize, new_w_h.1 as usize);
    let fx = projection_mat[(0, 0)];
    let fy = projection_mat[(1, 1)];
    let cx = projection_mat[(0, 2)];
    let cy = projection_mat[(1, 2)];
    let p3ds: Vec<na::Vector3<f64>> = (0..h)
        .into_par_iter()
        .flat_map_iter(|y| {
            (0..w).map(move |x| na::Vector3::new((x as f64 - cx) / fx, (y as f64 - cy) / fy, 1.0))
        })
        .collect();
    let p2ds = camera_model.project(&p3ds);
    let (xvec, yvec): (Vec<f32>, Vec<f32>) = p2ds
        .par_iter()
        .map(|xy| match xy {
            Some(xy) => (xy[0] as f32, xy[1] as f32),
            None => (f32::NAN, f32::NAN),
        })
        .unzip();
    let xmap = na::DMatrix::from_row_slice(h, w, &xvec);
    let ymap = na::DMatrix::from_row_slice(h, w, &yvec);
    (xmap, ymap)
}

/// Bilinear sample of `img` at `(x, y)`; `None` outside the image.
#[inline]
fn sample_bilinear<P>(img: &image::ImageBuffer<P, Vec<u8>>, x: f32, y: f32) -> Option<P>
where
    P: Pixel<Subpixel = u8>,
{
    if x.is_nan() || y.is_nan() {
        return None;
    }
    let (w, h) = (img.width() as f32, img.height() as f32);
    if x < 0.0 || y < 0.0 || x > w - 1.0 || y > h - 1.0 {
        return None;
    }
    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(img.width() - 1);
    let y1 = (y0 + 1).min(img.height() - 1);
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = img.get_pixel(x0, y0);
    let p10 = img.get_pixel(x1, y0);
    let p01 = img.get_pixel(x0, y1);
    let p11 = img.get_pixel(x1, y1);
    let mut out = *p00;
    for (c, o) in out.channels_mut().iter_mut().enumerate() {
        let top = p00.channels()[c] as f32 * (1.0 - fx) + p10.channels()[c] as f32 * fx;
        let bottom = p01.channels()[c] as f32 * (1.0 - fx) + p11.channels()[c] as f32 * fx;
        *o = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
    }
    Some(out)
}

fn remap_buffer<P>(
    img: &image::ImageBuffer<P, Vec<u8>>,
    map0: &na::DMatrix<f32>,
    map1: &na::DMatrix<f32>,
) -> image::ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8> + Send + Sync,
{
    let (r, c) = map0.shape();
    let black = P::from_slice(&[0u8; 4][..P::CHANNEL_COUNT as usize]).to_owned();
    image::ImageBuffer::from_par_fn(c as u32, r as u32, |x, y| {
        let (ys, xs) = (y as usize, x as usize);
        sample_bilinear(img, map0[(ys, xs)], map1[(ys, xs)]).unwrap_or(black)
    })
}

/// Resamples `src` through precomputed maps; unmapped pixels are black.
pub fn remap(src: &DynamicImage, map0: &na::DMatrix<f32>, map1: &na::DMatrix<f32>) -> DynamicImage {
    match src {
        DynamicImage::ImageLuma8(img) => DynamicImage::ImageLuma8(remap_buffer(img, map0, map1)),
        DynamicImage::ImageRgb8(img) => DynamicImage::ImageRgb8(remap_buffer(img, map0, map1)),
        other => DynamicImage::ImageRgb8(remap_buffer(&other.to_rgb8(), map0, map1)),
    }
}

fn undistort_buffer<P>(
    img: &image::ImageBuffer<P, Vec<u8>>,
    camera_model: &dyn CameraModel<f64>,
    new_camera: &na::Matrix3<f64>,
) -> image::ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8> + Send + Sync,
{
    let (fx, fy) = (new_camera[(0, 0)], new_camera[(1, 1)]);
    let (cx, cy) = (new_camera[(0, 2)], new_camera[(1, 2)]);
    let black = P::from_slice(&[0u8; 4][..P::CHANNEL_COUNT as usize]).to_owned();
    image::ImageBuffer::from_par_fn(img.width(), img.height(), |x, y| {
        let ray = na::Vector3::new((x as f64 - cx) / fx, (y as f64 - cy) / fy, 1.0);
        let src = camera_model.project_one(&ray);
        sample_bilinear(img, src.x as f32, src.y as f32).unwrap_or(black)
    })
}

/// Undistorts `src` directly, computing each source coordinate on the fly.
/// The output keeps the input size.
pub fn undistort(
    src: &DynamicImage,
    camera_model: &dyn CameraModel<f64>,
    new_camera: &na::Matrix3<f64>,
) -> DynamicImage {
    match src {
        DynamicImage::ImageLuma8(img) => {
            DynamicImage::ImageLuma8(undistort_buffer(img, camera_model, new_camera))
        }
        DynamicImage::ImageRgb8(img) => {
            DynamicImage::ImageRgb8(undistort_buffer(img, camera_model, new_camera))
        }
        other => DynamicImage::ImageRgb8(undistort_buffer(&other.to_rgb8(), camera_model, new_camera)),
    }
}

pub fn undistort_rgb(
    src: &RgbImage,
    camera_model: &dyn CameraModel<f64>,
    new_camera: &na::Matrix3<f64>,
) -> RgbImage {
    undistort_buffer(src, camera_model, new_camera)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera_model::OpenCVModel5;

    fn distorted() -> OpenCVModel5<f64> {
        OpenCVModel5::new(
            &na::dvector![300.0, 300.0, 32.0, 24.0, -0.2, 0.03, 0.0, 0.0, 0.0],
            64,
            48,
        )
    }

    #[test]
    fn map_has_requested_shape() {
        let m = distorted();
        let (mx, my) = init_undistort_map(&m, &m.camera_matrix(), (64, 48));
        assert_eq!(mx.shape(), (48, 64));
        assert_eq!(my.shape(), (48, 64));
        // principal point maps onto itself
        assert!((mx[(24, 32)] - 32.0).abs() < 1e-4);
        assert!((my[(24, 32)] - 24.0).abs() < 1e-4);
    }

    #[test]
    fn remap_matches_direct_undistort() {
        let m = distorted();
        let src = RgbImage::from_fn(64, 48, |x, y| image::Rgb([(x * 4) as u8, (y * 5) as u8, 90]));
        let k = m.camera_matrix();
        let (mx, my) = init_undistort_map(&m, &k, (64, 48));
        let a = remap(&DynamicImage::ImageRgb8(src.clone()), &mx, &my).to_rgb8();
        let b = undistort_rgb(&src, &m, &k);
        assert_eq!(a.dimensions(), b.dimensions());
        let max_diff = a
            .pixels()
            .zip(b.pixels())
            .flat_map(|(p, q)| p.0.iter().zip(q.0).map(|(u, v)| (*u as i32 - v as i32).abs()))
            .max()
            .unwrap_or(0);
        assert!(max_diff <= 1);
    }
}
