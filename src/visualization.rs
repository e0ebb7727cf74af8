use glam::Vec2;
use image::{Rgb, RgbImage};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rerun::RecordingStream;

use crate::error::Result;

pub fn id_to_color(id: usize) -> (u8, u8, u8, u8) {
    let mut rng = ChaCha8Rng::seed_from_u64(id as u64);
    let color_num = rng.random_range(0..2u32.pow(24));
    (
        ((color_num >> 16) % 256) as u8,
        ((color_num >> 8) % 256) as u8,
        (color_num % 256) as u8,
        255,
    )
}

/// rerun use top left corner as (0, 0)
pub fn rerun_shift(p2ds: &[(f32, f32)]) -> Vec<(f32, f32)> {
    p2ds.iter().map(|(x, y)| (*x + 0.5, *y + 0.5)).collect()
}

fn put(img: &mut RgbImage, x: i32, y: i32, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && x < img.width() as i32 && y < img.height() as i32 {
        img.put_pixel(x as u32, y as u32, color);
    }
}

fn draw_line(img: &mut RgbImage, a: Vec2, b: Vec2, color: Rgb<u8>) {
    let (mut x0, mut y0) = (a.x.round() as i32, a.y.round() as i32);
    let (x1, y1) = (b.x.round() as i32, b.y.round() as i32);
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    loop {
        put(img, x0, y0, color);
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

fn draw_circle(img: &mut RgbImage, c: Vec2, radius: i32, color: Rgb<u8>) {
    let (cx, cy) = (c.x.round() as i32, c.y.round() as i32);
    let r2_outer = radius * radius + radius;
    let r2_inner = radius * radius - radius;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let d2 = dx * dx + dy * dy;
            if d2 <= r2_outer && d2 >= r2_inner {
                put(img, cx + dx, cy + dy, color);
            }
        }
    }
}

/// Diagnostic overlay of a detected board: a ring per corner coloured by
/// row, with consecutive corners joined in detection order.
pub fn draw_chessboard_corners(img: &mut RgbImage, cols: usize, corners: &[Vec2]) {
    let cols = cols.max(1);
    let mut prev: Option<Vec2> = None;
    for (k, p) in corners.iter().enumerate() {
        let (r, g, b, _) = id_to_color(k / cols);
        let color = Rgb([r, g, b]);
        if let Some(q) = prev {
            draw_line(img, q, *p, color);
        }
        draw_circle(img, *p, 4, color);
        prev = Some(*p);
    }
}

pub fn log_rgb_image(recording: &RecordingStream, topic: &str, img: &RgbImage) -> Result<()> {
    recording.log(
        format!("{}/image", topic),
        &rerun::Image::from_rgb24(img.as_raw().clone(), [img.width(), img.height()]),
    )?;
    Ok(())
}

pub fn log_corners(
    recording: &RecordingStream,
    topic: &str,
    cols: usize,
    corners: &[Vec2],
) -> Result<()> {
    let cols = cols.max(1);
    let (pts, colors): (Vec<_>, Vec<_>) = corners
        .iter()
        .enumerate()
        .map(|(k, p)| {
            let (r, g, b, a) = id_to_color(k / cols);
            ((p.x, p.y), rerun::Color::from_unmultiplied_rgba(r, g, b, a))
        })
        .unzip();
    let pts = rerun_shift(&pts);
    recording.log(
        format!("{}/pts", topic),
        &rerun::Points2D::new(pts)
            .with_colors(colors)
            .with_radii([rerun::Radius::new_ui_points(5.0)]),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colors_are_deterministic() {
        assert_eq!(id_to_color(3), id_to_color(3));
        assert_eq!(id_to_color(0).3, 255);
    }

    #[test]
    fn overlay_marks_corners_and_stays_in_bounds() {
        let mut img = RgbImage::from_pixel(40, 30, Rgb([0, 0, 0]));
        let corners = [Vec2::new(5.0, 5.0), Vec2::new(20.0, 5.0), Vec2::new(39.0, 29.0)];
        draw_chessboard_corners(&mut img, 2, &corners);
        // line between the first two corners
        assert_ne!(*img.get_pixel(12, 5), Rgb([0, 0, 0]));
        assert_eq!(img.dimensions(), (40, 30));
    }
}
