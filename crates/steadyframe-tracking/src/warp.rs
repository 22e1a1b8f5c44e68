//! Affine frame resampling.

use glam::DVec2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use steadyframe_core::{LumaFrame, Result, SteadyError, Transform2D};
use tracing::warn;

/// Sub-pixel interpolation method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    Nearest,
    #[default]
    Bilinear,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarpParams {
    pub interpolation: Interpolation,
    /// Value used for samples falling outside the source frame.
    pub border_value: u8,
}

impl Default for WarpParams {
    fn default() -> Self {
        Self {
            interpolation: Interpolation::Bilinear,
            border_value: 0,
        }
    }
}

/// Warp `frame` by the forward affine `map` onto a raster of the same size.
///
/// Each output pixel `p` takes the source value at `map⁻¹(p)`. Fails if
/// `map` is not invertible.
pub fn resample_affine(
    frame: &LumaFrame,
    map: &Transform2D,
    params: &WarpParams,
) -> Result<LumaFrame> {
    let backward = map.try_inverse()?;
    Ok(resample_backward(frame, &backward, params))
}

/// Resample `frame` so each output pixel `p` takes the source value at
/// `backward(p)`.
fn resample_backward(frame: &LumaFrame, backward: &Transform2D, params: &WarpParams) -> LumaFrame {
    let (width, height) = frame.dimensions();
    let mut out = LumaFrame::new(width, height);
    if width == 0 || height == 0 {
        return out;
    }

    let origin = backward.transform_point(DVec2::ZERO);
    let step_x = backward.transform_point(DVec2::X) - origin;
    let step_y = backward.transform_point(DVec2::Y) - origin;

    out.data
        .par_chunks_mut(width as usize)
        .enumerate()
        .for_each(|(y, row)| {
            let row_start = origin + step_y * y as f64;
            for (x, px) in row.iter_mut().enumerate() {
                let src = row_start + step_x * x as f64;
                *px = match params.interpolation {
                    Interpolation::Nearest => sample_nearest(frame, src, params.border_value),
                    Interpolation::Bilinear => sample_bilinear(frame, src, params.border_value),
                };
            }
        });
    out
}

#[inline]
fn pixel_or(frame: &LumaFrame, x: i64, y: i64, border: u8) -> f64 {
    if x < 0 || y < 0 || x >= frame.width as i64 || y >= frame.height as i64 {
        border as f64
    } else {
        frame.data[(y as usize) * frame.width as usize + x as usize] as f64
    }
}

fn sample_nearest(frame: &LumaFrame, p: DVec2, border: u8) -> u8 {
    pixel_or(frame, p.x.round() as i64, p.y.round() as i64, border) as u8
}

fn sample_bilinear(frame: &LumaFrame, p: DVec2, border: u8) -> u8 {
    if !p.is_finite() {
        return border;
    }
    let x0 = p.x.floor();
    let y0 = p.y.floor();
    let (fx, fy) = (p.x - x0, p.y - y0);
    let (ix, iy) = (x0 as i64, y0 as i64);
    if ix < -1 || iy < -1 || ix >= frame.width as i64 || iy >= frame.height as i64 {
        return border;
    }
    let top = pixel_or(frame, ix, iy, border) * (1.0 - fx) + pixel_or(frame, ix + 1, iy, border) * fx;
    let bottom = pixel_or(frame, ix, iy + 1, border) * (1.0 - fx)
        + pixel_or(frame, ix + 1, iy + 1, border) * fx;
    (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8
}

/// Produces stabilized frames from trajectory entries.
#[derive(Debug, Clone, Default)]
pub struct FrameWarper {
    pub params: WarpParams,
}

impl FrameWarper {
    pub fn new(params: WarpParams) -> Self {
        Self { params }
    }

    /// Resample `frame` through the inverse of `entry`, cancelling the
    /// accumulated camera motion.
    pub fn warp(&self, frame: &LumaFrame, entry: &Transform2D) -> Result<LumaFrame> {
        entry.try_inverse()?;
        Ok(resample_backward(frame, entry, &self.params))
    }

    /// [`warp`](Self::warp), passing the frame through unchanged when the
    /// entry is singular. The flag is `false` for a pass-through.
    pub fn warp_or_passthrough(&self, frame: &LumaFrame, entry: &Transform2D) -> (LumaFrame, bool) {
        match self.warp(frame, entry) {
            Ok(warped) => (warped, true),
            Err(SteadyError::SingularTransform { determinant }) => {
                warn!(determinant, "singular trajectory entry, frame left unstabilized");
                (frame.clone(), false)
            }
            Err(e) => {
                warn!(error = %e, "warp failed, frame left unstabilized");
                (frame.clone(), false)
            }
        }
    }
}
