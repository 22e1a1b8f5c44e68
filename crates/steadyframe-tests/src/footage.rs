//! Synthetic test footage.

use glam::DVec2;
use steadyframe_core::LumaFrame;

/// Smooth, corner-rich texture whose content is moved by `shift`.
pub fn textured(width: u32, height: u32, shift: DVec2) -> LumaFrame {
    let mut frame = LumaFrame::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let (fx, fy) = (x as f64 - shift.x, y as f64 - shift.y);
            let v = 128.0
                + 60.0 * (fx * 0.31).sin() * (fy * 0.23).cos()
                + 45.0 * ((fx + 2.0 * fy) * 0.11).sin();
            frame.set(x, y, v.round().clamp(0.0, 255.0) as u8);
        }
    }
    frame
}

/// A shaky clip: frame `k` shows the texture moved by `shifts[k]`.
pub fn shaky_clip(width: u32, height: u32, shifts: &[DVec2]) -> Vec<LumaFrame> {
    shifts.iter().map(|s| textured(width, height, *s)).collect()
}

/// Left (stabilized) half of a side-by-side raster.
pub fn left_half(raster: &LumaFrame) -> LumaFrame {
    crop(raster, 0, raster.width / 2)
}

/// Right (original) half of a side-by-side raster.
pub fn right_half(raster: &LumaFrame) -> LumaFrame {
    crop(raster, raster.width / 2, raster.width / 2)
}

fn crop(raster: &LumaFrame, x0: u32, width: u32) -> LumaFrame {
    let mut out = LumaFrame::new(width, raster.height);
    for y in 0..raster.height {
        for x in 0..width {
            out.set(x, y, raster.get(x0 + x, y));
        }
    }
    out
}

/// Mean absolute difference over the interior, `margin` pixels in from
/// each edge.
pub fn interior_mad(a: &LumaFrame, b: &LumaFrame, margin: u32) -> f64 {
    let mut total = 0u64;
    let mut count = 0u64;
    for y in margin..a.height - margin {
        for x in margin..a.width - margin {
            total += (a.get(x, y) as i32 - b.get(x, y) as i32).unsigned_abs() as u64;
            count += 1;
        }
    }
    total as f64 / count as f64
}
