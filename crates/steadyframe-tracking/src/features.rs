//! Shi-Tomasi corner detection ("good features to track").

use crate::pyramid::{compute_gradients, GrayImage};
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Corner detection parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureParams {
    /// Maximum number of corners returned.
    pub max_corners: usize,
    /// Minimum accepted response, relative to the strongest corner.
    pub quality_level: f32,
    /// Minimum Euclidean distance between returned corners, in pixels.
    pub min_distance: f32,
}

impl Default for FeatureParams {
    fn default() -> Self {
        Self {
            max_corners: 200,
            quality_level: 1e-4,
            min_distance: 10.0,
        }
    }
}

/// Detect strong corners, strongest first.
///
/// The response is the smaller eigenvalue of the gradient structure tensor
/// summed over a 3x3 block. Candidates must be 3x3 local maxima and reach
/// `quality_level` times the best response; they are then accepted greedily
/// while keeping `min_distance` from every accepted corner.
pub fn detect_corners(img: &GrayImage, params: &FeatureParams) -> Vec<Vec2> {
    let (w, h) = (img.width as i32, img.height as i32);
    if params.max_corners == 0 || w < 5 || h < 5 {
        return Vec::new();
    }

    let response = min_eigen_response(img);
    let max_response = response.iter().copied().fold(0.0f32, f32::max);
    if max_response <= 0.0 {
        return Vec::new();
    }
    let threshold = max_response * params.quality_level;

    let at = |x: i32, y: i32| response[(y * w + x) as usize];
    let mut candidates: Vec<(f32, i32, i32)> = Vec::new();
    for y in 2..h - 2 {
        for x in 2..w - 2 {
            let r = at(x, y);
            if r < threshold || r <= 0.0 {
                continue;
            }
            let is_peak = (-1..=1)
                .flat_map(|dy| (-1..=1).map(move |dx| (dx, dy)))
                .all(|(dx, dy)| at(x + dx, y + dy) <= r);
            if is_peak {
                candidates.push((r, x, y));
            }
        }
    }
    // Stable sort keeps raster order among equal responses.
    candidates.sort_by(|a, b| b.0.total_cmp(&a.0));

    let min_dist_sq = params.min_distance * params.min_distance;
    let mut corners: Vec<Vec2> = Vec::with_capacity(params.max_corners.min(candidates.len()));
    for (_, x, y) in candidates {
        let p = Vec2::new(x as f32, y as f32);
        if corners.iter().all(|c| c.distance_squared(p) >= min_dist_sq) {
            corners.push(p);
            if corners.len() >= params.max_corners {
                break;
            }
        }
    }
    corners
}

/// Minimum eigenvalue of the 3x3-summed structure tensor at every pixel.
fn min_eigen_response(img: &GrayImage) -> Vec<f32> {
    let (w, h) = (img.width as i32, img.height as i32);
    let (ix, iy) = compute_gradients(img);
    let mut response = vec![0.0f32; (w * h) as usize];
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let (mut sxx, mut sxy, mut syy) = (0.0f32, 0.0f32, 0.0f32);
            for dy in -1..=1 {
                for dx in -1..=1 {
                    let idx = ((y + dy) * w + (x + dx)) as usize;
                    sxx += ix[idx] * ix[idx];
                    sxy += ix[idx] * iy[idx];
                    syy += iy[idx] * iy[idx];
                }
            }
            let half_trace = (sxx + syy) * 0.5;
            let diff = (sxx - syy) * 0.5;
            let lambda_min = half_trace - (diff * diff + sxy * sxy).sqrt();
            response[(y * w + x) as usize] = lambda_min.max(0.0);
        }
    }
    response
}
