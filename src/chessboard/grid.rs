//! Lattice assembly: grows a `cols x rows` grid of corners from a seed
//! candidate by stepping along locally estimated lattice axes.

use std::collections::{HashMap, VecDeque};

use glam::Vec2;

/// Seeds tried before giving up on an image.
const MAX_SEEDS: usize = 12;
/// Neighbours inspected when estimating the seed axes.
const SEED_NEIGHBOURS: usize = 8;
/// Match radius as a fraction of the local lattice step.
const MATCH_RADIUS: f32 = 0.35;

#[derive(Clone, Copy)]
struct Node {
    idx: usize,
    axis_i: Vec2,
    axis_j: Vec2,
}

/// Orders `points` into a full `cols x rows` lattice.
///
/// Returns the points in row-major order: columns run left to right and
/// rows top to bottom in the image. `None` unless every lattice position is
/// found exactly once.
pub fn assemble_grid(points: &[Vec2], cols: usize, rows: usize) -> Option<Vec<Vec2>> {
    let need = cols * rows;
    if cols < 2 || rows < 2 || points.len() < need {
        return None;
    }
    for seed in 0..points.len().min(MAX_SEEDS) {
        let Some((a, b)) = seed_axes(points, seed) else {
            continue;
        };
        let Some(lattice) = grow(points, seed, a, b, cols.max(rows)) else {
            continue;
        };
        if let Some(ordered) = canonical_order(points, &lattice, cols, rows) {
            return Some(ordered);
        }
    }
    None
}

fn seed_axes(points: &[Vec2], seed: usize) -> Option<(Vec2, Vec2)> {
    let p = points[seed];
    let mut near: Vec<(f32, Vec2)> = points
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != seed)
        .map(|(_, q)| (q.distance_squared(p), *q - p))
        .collect();
    near.sort_by(|x, y| x.0.total_cmp(&y.0));
    near.truncate(SEED_NEIGHBOURS);

    let a = near.first()?.1;
    let la = a.length();
    if la <= f32::EPSILON {
        return None;
    }
    let b = near.iter().skip(1).map(|(_, v)| *v).find(|v| {
        let lb = v.length();
        let ratio = lb / la;
        let cos = a.dot(*v) / (la * lb);
        cos.abs() < 0.5 && (0.5..=2.0).contains(&ratio)
    })?;
    Some((a, b))
}

fn nearest_unused(
    points: &[Vec2],
    used: &HashMap<usize, (i32, i32)>,
    target: Vec2,
    radius: f32,
) -> Option<usize> {
    let r2 = radius * radius;
    points
        .iter()
        .enumerate()
        .filter(|(i, q)| !used.contains_key(i) && q.distance_squared(target) <= r2)
        .min_by(|x, y| {
            x.1.distance_squared(target)
                .total_cmp(&y.1.distance_squared(target))
        })
        .map(|(i, _)| i)
}

/// Breadth-first growth; returns lattice coordinates of every reached point.
fn grow(
    points: &[Vec2],
    seed: usize,
    a: Vec2,
    b: Vec2,
    max_span: usize,
) -> Option<HashMap<(i32, i32), usize>> {
    let mut lattice: HashMap<(i32, i32), usize> = HashMap::new();
    let mut used: HashMap<usize, (i32, i32)> = HashMap::new();
    let mut queue = VecDeque::new();

    lattice.insert((0, 0), seed);
    used.insert(seed, (0, 0));
    queue.push_back((
        (0, 0),
        Node {
            idx: seed,
            axis_i: a,
            axis_j: b,
        },
    ));

    let (mut min_i, mut max_i, mut min_j, mut max_j) = (0i32, 0i32, 0i32, 0i32);

    while let Some(((i, j), node)) = queue.pop_front() {
        let p = points[node.idx];
        // refine the local axes from already placed neighbours
        let axis_i = local_axis(points, &lattice, (i, j), (1, 0)).unwrap_or(node.axis_i);
        let axis_j = local_axis(points, &lattice, (i, j), (0, 1)).unwrap_or(node.axis_j);

        for (di, dj) in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
            let key = (i + di, j + dj);
            if lattice.contains_key(&key) {
                continue;
            }
            let step = axis_i * di as f32 + axis_j * dj as f32;
            let radius = MATCH_RADIUS * step.length();
            let Some(found) = nearest_unused(points, &used, p + step, radius) else {
                continue;
            };
            let actual = points[found] - p;
            let next = Node {
                idx: found,
                axis_i: if di != 0 { actual * di as f32 } else { axis_i },
                axis_j: if dj != 0 { actual * dj as f32 } else { axis_j },
            };
            lattice.insert(key, found);
            used.insert(found, key);
            min_i = min_i.min(key.0);
            max_i = max_i.max(key.0);
            min_j = min_j.min(key.1);
            max_j = max_j.max(key.1);
            if (max_i - min_i) as usize >= max_span || (max_j - min_j) as usize >= max_span {
                return None;
            }
            queue.push_back((key, next));
        }
    }
    Some(lattice)
}

fn local_axis(
    points: &[Vec2],
    lattice: &HashMap<(i32, i32), usize>,
    (i, j): (i32, i32),
    (di, dj): (i32, i32),
) -> Option<Vec2> {
    let here = points[*lattice.get(&(i, j))?];
    if let Some(fwd) = lattice.get(&(i + di, j + dj)) {
        return Some(points[*fwd] - here);
    }
    lattice
        .get(&(i - di, j - dj))
        .map(|back| here - points[*back])
}

fn canonical_order(
    points: &[Vec2],
    lattice: &HashMap<(i32, i32), usize>,
    cols: usize,
    rows: usize,
) -> Option<Vec<Vec2>> {
    if lattice.len() != cols * rows {
        return None;
    }
    let min_i = lattice.keys().map(|k| k.0).min()?;
    let max_i = lattice.keys().map(|k| k.0).max()?;
    let min_j = lattice.keys().map(|k| k.1).min()?;
    let max_j = lattice.keys().map(|k| k.1).max()?;
    let ni = (max_i - min_i + 1) as usize;
    let nj = (max_j - min_j + 1) as usize;

    // mean image direction of each lattice axis
    let mut dir_i = Vec2::ZERO;
    let mut dir_j = Vec2::ZERO;
    for (&(i, j), &idx) in lattice {
        if let Some(n) = lattice.get(&(i + 1, j)) {
            dir_i += points[*n] - points[idx];
        }
        if let Some(n) = lattice.get(&(i, j + 1)) {
            dir_j += points[*n] - points[idx];
        }
    }

    // image y points down, so a board read left-to-right then top-to-bottom
    // has a positive cross product between its column and row directions
    let cross = dir_i.perp_dot(dir_j);
    if cross.abs() <= f32::EPSILON * dir_i.length() * dir_j.length() {
        return None;
    }

    // (column axis is i, column sign, row sign, score); only rotations survive
    let mut best: Option<(bool, f32, f32, f32)> = None;
    for i_is_col in [true, false] {
        if (i_is_col && (ni, nj) != (cols, rows)) || (!i_is_col && (ni, nj) != (rows, cols)) {
            continue;
        }
        let (axis_c, axis_r) = if i_is_col { (dir_i, dir_j) } else { (dir_j, dir_i) };
        for sc in [1.0f32, -1.0] {
            let sr = (sc * axis_c.perp_dot(axis_r)).signum();
            let col_dir = (axis_c * sc).normalize_or_zero();
            let row_dir = (axis_r * sr).normalize_or_zero();
            let score = col_dir.x + row_dir.y;
            if best.is_none_or(|b| score > b.3) {
                best = Some((i_is_col, sc, sr, score));
            }
        }
    }
    let (i_is_col, sc, sr, _) = best?;

    let mut ordered = vec![Vec2::ZERO; cols * rows];
    for (&(i, j), &idx) in lattice {
        let (li, lj) = ((i - min_i) as usize, (j - min_j) as usize);
        let (mut c, mut r) = if i_is_col { (li, lj) } else { (lj, li) };
        if sc < 0.0 {
            c = cols - 1 - c;
        }
        if sr < 0.0 {
            r = rows - 1 - r;
        }
        ordered[r * cols + c] = points[idx];
    }
    Some(ordered)
}
