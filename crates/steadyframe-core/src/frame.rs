//! Single-channel frame buffers.
//!
//! Every frame handled by the stabilizer is an 8-bit luma raster. Color
//! input is reduced to luma once at the decoder boundary.

use crate::error::{Result, SteadyError};

/// An 8-bit grayscale frame stored row-major without padding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LumaFrame {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Pixel data, `width * height` bytes
    pub data: Vec<u8>,
}

impl LumaFrame {
    /// Create a black frame with the given dimensions.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0u8; width as usize * height as usize],
        }
    }

    /// Wrap existing luma bytes, checking the buffer length.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(SteadyError::InvalidParameter(format!(
                "luma buffer has {} bytes, expected {} for {}x{}",
                data.len(),
                expected,
                width,
                height
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Convert packed RGB24 data to luma (BT.601 weights).
    pub fn from_rgb24(rgb: &[u8], width: u32, height: u32) -> Result<Self> {
        Self::from_packed(rgb, width, height, 3)
    }

    /// Convert packed RGBA8 data to luma, ignoring alpha.
    pub fn from_rgba8(rgba: &[u8], width: u32, height: u32) -> Result<Self> {
        Self::from_packed(rgba, width, height, 4)
    }

    fn from_packed(src: &[u8], width: u32, height: u32, channels: usize) -> Result<Self> {
        let pixels = width as usize * height as usize;
        if src.len() < pixels * channels {
            return Err(SteadyError::InvalidParameter(format!(
                "{}-channel buffer has {} bytes, expected {} for {}x{}",
                channels,
                src.len(),
                pixels * channels,
                width,
                height
            )));
        }
        let data = src
            .chunks_exact(channels)
            .take(pixels)
            .map(|px| {
                let y = 0.299 * px[0] as f32 + 0.587 * px[1] as f32 + 0.114 * px[2] as f32;
                y.round().clamp(0.0, 255.0) as u8
            })
            .collect();
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Pixel value at (x, y). Panics when out of bounds.
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.data[(y * self.width + x) as usize]
    }

    /// Set the pixel at (x, y); writes outside the frame are ignored.
    #[inline]
    pub fn set(&mut self, x: u32, y: u32, val: u8) {
        if x < self.width && y < self.height {
            self.data[(y * self.width + x) as usize] = val;
        }
    }

    /// Get a row of pixel data.
    #[inline]
    pub fn row(&self, y: u32) -> &[u8] {
        let start = (y * self.width) as usize;
        &self.data[start..start + self.width as usize]
    }

    /// Dimensions as `(width, height)`.
    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn same_dimensions(&self, other: &Self) -> bool {
        self.width == other.width && self.height == other.height
    }

    /// Return an error unless this frame is `width`x`height`.
    pub fn expect_dimensions(&self, width: u32, height: u32) -> Result<()> {
        if self.width != width || self.height != height {
            return Err(SteadyError::DimensionMismatch {
                expected_width: width,
                expected_height: height,
                actual_width: self.width,
                actual_height: self.height,
            });
        }
        Ok(())
    }

    /// Concatenate two frames horizontally, `left` then `right`.
    pub fn side_by_side(left: &Self, right: &Self) -> Result<Self> {
        if left.height != right.height {
            return Err(SteadyError::DimensionMismatch {
                expected_width: right.width,
                expected_height: left.height,
                actual_width: right.width,
                actual_height: right.height,
            });
        }
        let width = left.width + right.width;
        let mut data = Vec::with_capacity(width as usize * left.height as usize);
        for y in 0..left.height {
            data.extend_from_slice(left.row(y));
            data.extend_from_slice(right.row(y));
        }
        Ok(Self {
            width,
            height: left.height,
            data,
        })
    }

    /// Memory usage of the pixel buffer in bytes.
    pub fn memory_size(&self) -> usize {
        self.data.len()
    }
}
