//! Pyramidal Lucas-Kanade point tracker.

use crate::pyramid::{GrayImage, ImagePyramid};
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Outcome of tracking a point set into a new frame.
///
/// `positions[i]` and `found[i]` belong to the i-th source point.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackResult {
    pub positions: Vec<Vec2>,
    pub found: Vec<bool>,
}

impl TrackResult {
    /// Pairs of (source, tracked) for successfully tracked points only.
    pub fn correspondences(&self, source: &[Vec2]) -> (Vec<Vec2>, Vec<Vec2>) {
        source
            .iter()
            .zip(&self.positions)
            .zip(&self.found)
            .filter(|(_, found)| **found)
            .map(|((&src, &dst), _)| (src, dst))
            .unzip()
    }

    pub fn found_count(&self) -> usize {
        self.found.iter().filter(|&&f| f).count()
    }
}

/// Lucas-Kanade parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LucasKanadeParams {
    pub window_size: u32,
    pub pyramid_levels: u32,
    pub max_iterations: u32,
    pub epsilon: f32,
    /// Tracks moving further than this many pixels are dropped.
    pub max_displacement: f32,
    /// Minimum eigenvalue of the normalized gradient matrix.
    pub min_eigen_threshold: f32,
}

impl Default for LucasKanadeParams {
    fn default() -> Self {
        Self {
            window_size: 21,
            pyramid_levels: 3,
            max_iterations: 30,
            epsilon: 0.01,
            max_displacement: 40.0,
            min_eigen_threshold: 1e-6,
        }
    }
}

/// Lucas-Kanade optical flow point tracker with pyramidal support.
#[derive(Debug, Clone, Default)]
pub struct PointTracker {
    pub params: LucasKanadeParams,
}

impl PointTracker {
    pub fn new(params: LucasKanadeParams) -> Self {
        Self { params }
    }

    pub fn track(&self, prev: &GrayImage, curr: &GrayImage, points: &[Vec2]) -> TrackResult {
        let prev_pyr = ImagePyramid::build(prev, self.params.pyramid_levels);
        let curr_pyr = ImagePyramid::build(curr, self.params.pyramid_levels);
        self.track_pyramids(&prev_pyr, &curr_pyr, points)
    }

    pub fn track_pyramids(
        &self,
        prev_pyr: &ImagePyramid,
        curr_pyr: &ImagePyramid,
        points: &[Vec2],
    ) -> TrackResult {
        let mut result = TrackResult {
            positions: Vec::with_capacity(points.len()),
            found: Vec::with_capacity(points.len()),
        };
        let base = &curr_pyr.levels[0];
        for &point in points {
            let tracked = self
                .track_point(prev_pyr, curr_pyr, point)
                .filter(|p| base.contains(p.x, p.y))
                .filter(|p| p.distance(point) <= self.params.max_displacement);
            match tracked {
                Some(p) => {
                    result.positions.push(p);
                    result.found.push(true);
                }
                None => {
                    result.positions.push(point);
                    result.found.push(false);
                }
            }
        }
        result
    }

    fn track_point(
        &self,
        prev_pyr: &ImagePyramid,
        curr_pyr: &ImagePyramid,
        position: Vec2,
    ) -> Option<Vec2> {
        let levels = prev_pyr.levels.len().min(curr_pyr.levels.len());
        let hw = (self.params.window_size / 2) as i32;
        let area = ((2 * hw + 1) * (2 * hw + 1)) as f32;
        let mut guess = Vec2::ZERO;

        for level in (0..levels).rev() {
            let scale = 1.0 / (1u32 << level) as f32;
            let p = position * scale;
            let prev_img = &prev_pyr.levels[level];
            let curr_img = &curr_pyr.levels[level];

            let window = Window::sample(prev_img, p, hw);
            let (g11, g12, g22) = window.gradient_matrix();
            let det = g11 * g22 - g12 * g12;
            let half_trace = (g11 + g22) * 0.5;
            let diff = (g11 - g22) * 0.5;
            let min_eigen = half_trace - (diff * diff + g12 * g12).sqrt();
            if min_eigen / area < self.params.min_eigen_threshold || det.abs() < f32::EPSILON {
                if level == 0 {
                    return None;
                }
                guess *= 2.0;
                continue;
            }
            let inv_det = 1.0 / det;

            let mut d = guess;
            for _ in 0..self.params.max_iterations {
                let (bx, by) = window.mismatch(curr_img, p + d);
                let step = Vec2::new(
                    inv_det * (g22 * bx - g12 * by),
                    inv_det * (-g12 * bx + g11 * by),
                );
                d += step;
                if step.length_squared() < self.params.epsilon * self.params.epsilon {
                    break;
                }
            }
            guess = if level > 0 { d * 2.0 } else { d };
        }

        let tracked = position + guess;
        tracked.is_finite().then_some(tracked)
    }
}

/// Intensities and gradients of the template window around a point.
struct Window {
    hw: i32,
    values: Vec<f32>,
    ix: Vec<f32>,
    iy: Vec<f32>,
}

impl Window {
    fn sample(img: &GrayImage, center: Vec2, hw: i32) -> Self {
        let n = ((2 * hw + 1) * (2 * hw + 1)) as usize;
        let mut values = Vec::with_capacity(n);
        let mut ix = Vec::with_capacity(n);
        let mut iy = Vec::with_capacity(n);
        for wy in -hw..=hw {
            for wx in -hw..=hw {
                let x = center.x + wx as f32;
                let y = center.y + wy as f32;
                values.push(img.sample(x, y));
                ix.push((img.sample(x + 1.0, y) - img.sample(x - 1.0, y)) * 0.5);
                iy.push((img.sample(x, y + 1.0) - img.sample(x, y - 1.0)) * 0.5);
            }
        }
        Self { hw, values, ix, iy }
    }

    fn gradient_matrix(&self) -> (f32, f32, f32) {
        self.ix
            .iter()
            .zip(&self.iy)
            .fold((0.0, 0.0, 0.0), |(g11, g12, g22), (&gx, &gy)| {
                (g11 + gx * gx, g12 + gx * gy, g22 + gy * gy)
            })
    }

    /// Gradient-weighted intensity difference between the template and
    /// `img` around `center`.
    fn mismatch(&self, img: &GrayImage, center: Vec2) -> (f32, f32) {
        let mut bx = 0.0f32;
        let mut by = 0.0f32;
        let mut i = 0;
        for wy in -self.hw..=self.hw {
            for wx in -self.hw..=self.hw {
                let it = self.values[i] - img.sample(center.x + wx as f32, center.y + wy as f32);
                bx += it * self.ix[i];
                by += it * self.iy[i];
                i += 1;
            }
        }
        (bx, by)
    }
}
