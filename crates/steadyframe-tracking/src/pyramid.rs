//! Image pyramid utilities for multi-scale tracking.

use steadyframe_core::LumaFrame;

/// A grayscale image stored as f32 values [0, 1].
#[derive(Debug, Clone)]
pub struct GrayImage {
    pub data: Vec<f32>,
    pub width: u32,
    pub height: u32,
}

impl GrayImage {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            data: vec![0.0; (width * height) as usize],
            width,
            height,
        }
    }

    /// Normalize an 8-bit luma frame to [0, 1].
    pub fn from_luma(frame: &LumaFrame) -> Self {
        Self {
            data: frame.data.iter().map(|&v| v as f32 / 255.0).collect(),
            width: frame.width,
            height: frame.height,
        }
    }

    /// Pixel value with coordinates clamped to the border.
    #[inline]
    pub fn get(&self, x: i32, y: i32) -> f32 {
        let x = x.clamp(0, self.width as i32 - 1) as u32;
        let y = y.clamp(0, self.height as i32 - 1) as u32;
        self.data[(y * self.width + x) as usize]
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, val: f32) {
        if x < self.width && y < self.height {
            self.data[(y * self.width + x) as usize] = val;
        }
    }

    /// Bilinear sample at a sub-pixel position, replicating the border.
    #[inline]
    pub fn sample(&self, x: f32, y: f32) -> f32 {
        let x0 = x.floor();
        let y0 = y.floor();
        let fx = x - x0;
        let fy = y - y0;
        let (ix, iy) = (x0 as i32, y0 as i32);
        let top = self.get(ix, iy) * (1.0 - fx) + self.get(ix + 1, iy) * fx;
        let bottom = self.get(ix, iy + 1) * (1.0 - fx) + self.get(ix + 1, iy + 1) * fx;
        top * (1.0 - fy) + bottom * fy
    }

    #[inline]
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= 0.0 && y >= 0.0 && x <= (self.width - 1) as f32 && y <= (self.height - 1) as f32
    }
}

/// Multi-scale image pyramid.
pub struct ImagePyramid {
    pub levels: Vec<GrayImage>,
}

impl ImagePyramid {
    /// Build `num_levels` levels by 2x2 box downsampling. Levels stop early
    /// once an image would shrink below 8 pixels on a side.
    pub fn build(gray: &GrayImage, num_levels: u32) -> Self {
        let mut levels = vec![gray.clone()];
        for _ in 1..num_levels {
            let prev = &levels[levels.len() - 1];
            if prev.width < 16 || prev.height < 16 {
                break;
            }
            let next = downsample(prev);
            levels.push(next);
        }
        Self { levels }
    }
}

fn downsample(prev: &GrayImage) -> GrayImage {
    let nw = prev.width.div_ceil(2);
    let nh = prev.height.div_ceil(2);
    let mut level = GrayImage::new(nw, nh);
    for y in 0..nh {
        for x in 0..nw {
            let sx = (x * 2) as i32;
            let sy = (y * 2) as i32;
            let avg = (prev.get(sx, sy)
                + prev.get(sx + 1, sy)
                + prev.get(sx, sy + 1)
                + prev.get(sx + 1, sy + 1))
                * 0.25;
            level.set(x, y, avg);
        }
    }
    level
}

/// Compute spatial gradients (Ix, Iy) using central differences.
pub fn compute_gradients(img: &GrayImage) -> (Vec<f32>, Vec<f32>) {
    let size = (img.width * img.height) as usize;
    let mut ix = vec![0.0f32; size];
    let mut iy = vec![0.0f32; size];
    for y in 1..(img.height as i32 - 1) {
        for x in 1..(img.width as i32 - 1) {
            let idx = (y as u32 * img.width + x as u32) as usize;
            ix[idx] = (img.get(x + 1, y) - img.get(x - 1, y)) * 0.5;
            iy[idx] = (img.get(x, y + 1) - img.get(x, y - 1)) * 0.5;
        }
    }
    (ix, iy)
}
